//! Flow definition tooling for the Langflow host.
//!
//! Lists the flows a host already has and bulk-imports local flow
//! definition files, skipping any whose name already exists.

pub mod client;
pub mod import;

pub use client::FlowClient;
