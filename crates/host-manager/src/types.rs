//! Engine value types

use host_utils::{PfcConfig, TrustMode};
use std::collections::BTreeMap;
use std::time::Duration;

/// Desired NV parameters, ordered by name so writes happen in a stable order
pub type DesiredNvConfig = BTreeMap<String, String>;

/// Outcome of comparing a device's NV configuration with its spec
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NvSpecValidation {
    /// Some next-boot values differ from the spec and must be written
    pub update_needed: bool,
    /// Some current values differ from the spec, so a reboot is needed after writing
    pub reboot_needed: bool,
}

impl NvSpecValidation {
    pub fn new(update_needed: bool, reboot_needed: bool) -> Self {
        Self {
            update_needed,
            reboot_needed,
        }
    }
}

/// Desired runtime settings, shared by all ports of a card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeDesired {
    /// 0 leaves the live value untouched
    pub max_read_request_size: u32,
    pub trust: TrustMode,
    pub pfc: PfcConfig,
}

/// Bounds for slow host calls
#[derive(Debug, Clone, Copy)]
pub struct HostManagerConfig {
    pub nv_query_timeout: Duration,
    pub firmware_reset_timeout: Duration,
}

impl Default for HostManagerConfig {
    fn default() -> Self {
        Self {
            nv_query_timeout: Duration::from_secs(60),
            firmware_reset_timeout: Duration::from_secs(300),
        }
    }
}

impl HostManagerConfig {
    /// Same bound for every host call
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            nv_query_timeout: timeout,
            firmware_reset_timeout: timeout,
        }
    }
}
