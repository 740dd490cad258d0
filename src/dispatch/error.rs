//! Endpoint call failures.

use serde::{Deserialize, Serialize};

/// Errors that stop a run at the failing endpoint.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchError {
    /// Connection refused, timeout, DNS failure and the like.
    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
    /// The endpoint answered with a non-2xx status.
    #[error("{url} returned HTTP {status}: {body}")]
    HttpStatus {
        url: String,
        status: u16,
        body: String,
    },
    /// The endpoint answered 2xx but the body is not JSON.
    #[error("{url} returned a response that is not JSON: {reason}")]
    InvalidBody { url: String, reason: String },
}

impl DispatchError {
    /// URL of the endpoint that failed.
    pub fn url(&self) -> &str {
        match self {
            DispatchError::Transport { url, .. }
            | DispatchError::HttpStatus { url, .. }
            | DispatchError::InvalidBody { url, .. } => url,
        }
    }
}
