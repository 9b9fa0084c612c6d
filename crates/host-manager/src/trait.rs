//! HostManager trait for mocking
//!
//! The daemon drives devices through this trait so its reconciler can be
//! tested against `MockHostManager`.

use crate::error::HostManagerError;
use crate::types::NvSpecValidation;
use crds::{NicDevice, NicDeviceStatus};
use std::collections::HashMap;

/// Operations the reconciliation loop calls per node and per device
#[async_trait::async_trait]
pub trait HostManager: Send + Sync {
    /// Discovers NICs on the host, keyed by serial number
    async fn discover_devices(&self) -> Result<HashMap<String, NicDeviceStatus>, HostManagerError>;

    /// Compares the device's NV configuration with its spec. Does not change the host.
    async fn validate_nv_spec(&self, device: &NicDevice) -> Result<NvSpecValidation, HostManagerError>;

    /// Stages the NV changes the spec needs. Returns whether a reboot is required.
    async fn apply_nv_spec(&self, device: &NicDevice) -> Result<bool, HostManagerError>;

    /// Applies runtime settings (max read request size, trust, PFC) to every port
    async fn apply_runtime_spec(&self, device: &NicDevice) -> Result<(), HostManagerError>;
}
