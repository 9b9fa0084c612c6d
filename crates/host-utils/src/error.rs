//! Host access errors

use thiserror::Error;

/// Errors that can occur when querying or configuring the host
#[derive(Debug, Error)]
pub enum HostError {
    /// sysfs / filesystem access failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// External tool could not be started
    #[error("Failed to run `{command}`: {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// External tool exited with a non-zero status
    #[error("`{command}` failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    /// Tool output or sysfs attribute could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Requested attribute is missing on the device
    #[error("Not found: {0}")]
    NotFound(String),

    /// Value cannot be applied to the device
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
