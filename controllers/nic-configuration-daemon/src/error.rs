//! Controller-specific error types.

use host_manager::HostManagerError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the NIC configuration daemon.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Discovery or device configuration failed
    #[error("Host manager error: {0}")]
    HostManager(#[from] HostManagerError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch or background task failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
