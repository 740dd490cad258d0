//! Analysis helpers.
//!
//! Extraction of the result field from flow responses and decoding of
//! sentiment values.

pub mod extract;
pub mod sentiment;

pub use extract::*;
pub use sentiment::*;
