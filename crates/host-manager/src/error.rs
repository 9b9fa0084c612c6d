//! Engine errors

use host_utils::HostError;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by `HostManager` operations
#[derive(Debug, Error)]
pub enum HostManagerError {
    /// The device spec cannot be applied to this device. Not retryable without a spec change.
    #[error("Incorrect spec: {0}")]
    IncorrectSpec(String),

    /// Host query or configuration failed
    #[error("Host error: {0}")]
    Host(#[from] HostError),

    /// A host call did not finish in time
    #[error("{operation} on {pci} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        pci: String,
        timeout: Duration,
    },

    /// The NicDevice lacks data the engine needs (status, ports, configuration)
    #[error("Invalid device: {0}")]
    InvalidDevice(String),
}

impl HostManagerError {
    /// True for errors that will not go away by retrying
    pub fn is_spec_error(&self) -> bool {
        matches!(self, HostManagerError::IncorrectSpec(_))
    }
}
