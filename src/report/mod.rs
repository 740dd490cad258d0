//! Rendering of analysis runs.

pub mod generator;

pub use generator::*;
