//! HostUtils trait for mocking
//!
//! This trait abstracts host access so the configuration engine can run
//! against `SystemHostUtils` in production and an in-memory mock in tests.

use crate::error::HostError;
use crate::models::{NvConfigQuery, PciDevice, PfcConfig, TrustMode};

/// Trait for host query and configuration operations
///
/// PCI addresses are full addresses ("0000:3b:00.0"). All methods must be
/// `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait HostUtils: Send + Sync {
    // Discovery
    async fn list_pci_devices(&self) -> Result<Vec<PciDevice>, HostError>;
    async fn is_virtual_function(&self, pci_addr: &str) -> bool;
    /// Returns (part number, serial number)
    async fn get_part_and_serial_number(&self, pci_addr: &str) -> Result<(String, String), HostError>;
    /// Returns (firmware version, PSID)
    async fn get_firmware_version_and_psid(&self, pci_addr: &str) -> Result<(String, String), HostError>;
    async fn get_interface_name(&self, pci_addr: &str) -> Option<String>;
    async fn get_rdma_interface_name(&self, pci_addr: &str) -> Option<String>;
    /// Maximum PCIe link speed in GT/s (8 = Gen3, 16 = Gen4, 32 = Gen5)
    async fn get_pci_link_speed(&self, pci_addr: &str) -> Result<u32, HostError>;

    // NV configuration
    async fn query_nv_config(&self, pci_addr: &str) -> Result<NvConfigQuery, HostError>;
    async fn set_nv_config_parameter(&self, pci_addr: &str, name: &str, value: &str) -> Result<(), HostError>;
    /// Stages factory defaults for every NV parameter
    async fn reset_nv_config(&self, pci_addr: &str) -> Result<(), HostError>;
    /// Live firmware reset. Staged NV values become current without a reboot.
    async fn reset_firmware(&self, pci_addr: &str) -> Result<(), HostError>;

    // Runtime configuration
    async fn get_max_read_request_size(&self, pci_addr: &str) -> Result<u32, HostError>;
    async fn set_max_read_request_size(&self, pci_addr: &str, size: u32) -> Result<(), HostError>;
    async fn get_trust_and_pfc(&self, interface: &str) -> Result<(TrustMode, PfcConfig), HostError>;
    async fn set_trust_and_pfc(&self, interface: &str, trust: TrustMode, pfc: PfcConfig) -> Result<(), HostError>;
}
