//! Analysis dispatch.
//!
//! Sends one submission to every configured endpoint in order and
//! collects the results into a run.

pub mod dispatcher;
pub mod error;
pub mod transport;

#[cfg(test)]
pub mod testing;

pub use dispatcher::{Dispatcher, Submission};
pub use error::DispatchError;
pub use transport::{HttpTransport, Transport};
