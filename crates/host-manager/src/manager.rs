//! `NicHostManager`: the production `HostManager`
//!
//! Operations are split by concern across `discovery`, `nv_validator`,
//! `nv_applier` and `runtime_applier`, each adding an `impl NicHostManager`
//! block. This module holds the shared state and the device accessors.

use crate::config_validation::ConfigValidation;
use crate::error::HostManagerError;
use crate::host_manager_trait::HostManager;
use crate::types::{HostManagerConfig, NvSpecValidation};
use crds::{NicDevice, NicDeviceConfigurationSpec, NicDevicePortSpec, NicDeviceStatus};
use host_utils::{HostUtils, NvConfigQuery};
use kube::ResourceExt;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

/// Discovers and configures the NICs of one node
pub struct NicHostManager {
    pub(crate) node_name: String,
    pub(crate) host: Arc<dyn HostUtils>,
    pub(crate) validation: ConfigValidation,
    pub(crate) config: HostManagerConfig,
}

impl std::fmt::Debug for NicHostManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NicHostManager")
            .field("node_name", &self.node_name)
            .field("config", &self.config)
            .finish()
    }
}

impl NicHostManager {
    /// Creates a manager with default timeouts
    pub fn new(node_name: impl Into<String>, host: Arc<dyn HostUtils>) -> Self {
        Self::with_config(node_name, host, HostManagerConfig::default())
    }

    pub fn with_config(
        node_name: impl Into<String>,
        host: Arc<dyn HostUtils>,
        config: HostManagerConfig,
    ) -> Self {
        Self {
            node_name: node_name.into(),
            validation: ConfigValidation::new(host.clone()),
            host,
            config,
        }
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// Queries NV configuration, bounded by `nv_query_timeout`
    pub(crate) async fn query_nv_config(&self, pci_addr: &str) -> Result<NvConfigQuery, HostManagerError> {
        with_timeout(
            "NV config query",
            pci_addr,
            self.config.nv_query_timeout,
            self.host.query_nv_config(pci_addr),
        )
        .await
    }

    /// Resets NIC firmware, bounded by `firmware_reset_timeout`
    pub(crate) async fn reset_firmware(&self, pci_addr: &str) -> Result<(), HostManagerError> {
        with_timeout(
            "firmware reset",
            pci_addr,
            self.config.firmware_reset_timeout,
            self.host.reset_firmware(pci_addr),
        )
        .await
    }
}

async fn with_timeout<T>(
    operation: &'static str,
    pci_addr: &str,
    timeout: Duration,
    call: impl Future<Output = Result<T, host_utils::HostError>>,
) -> Result<T, HostManagerError> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            error!("{} on {} timed out after {:?}", operation, pci_addr, timeout);
            Err(HostManagerError::Timeout {
                operation,
                pci: pci_addr.to_string(),
                timeout,
            })
        }
    }
}

/// Returns the discovered ports of a device, port 0 first
pub(crate) fn device_ports(device: &NicDevice) -> Result<&[NicDevicePortSpec], HostManagerError> {
    device
        .status
        .as_ref()
        .map(|status| status.ports.as_slice())
        .filter(|ports| !ports.is_empty())
        .ok_or_else(|| {
            HostManagerError::InvalidDevice(format!("NicDevice {} has no discovered ports", device.name_any()))
        })
}

/// Returns the configuration section of a device spec
pub(crate) fn device_configuration(device: &NicDevice) -> Result<&NicDeviceConfigurationSpec, HostManagerError> {
    device.spec.configuration.as_ref().ok_or_else(|| {
        HostManagerError::InvalidDevice(format!("NicDevice {} has no configuration", device.name_any()))
    })
}

#[async_trait::async_trait]
impl HostManager for NicHostManager {
    async fn discover_devices(&self) -> Result<HashMap<String, NicDeviceStatus>, HostManagerError> {
        self.discover().await
    }

    async fn validate_nv_spec(&self, device: &NicDevice) -> Result<NvSpecValidation, HostManagerError> {
        self.validate_nv(device).await
    }

    async fn apply_nv_spec(&self, device: &NicDevice) -> Result<bool, HostManagerError> {
        self.apply_nv(device).await
    }

    async fn apply_runtime_spec(&self, device: &NicDevice) -> Result<(), HostManagerError> {
        self.apply_runtime(device).await
    }
}
