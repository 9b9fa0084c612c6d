//! NicDevice CRD
//!
//! Represents one physical NIC on a node. Ports sharing a serial number are
//! grouped into a single resource. The spec carries the desired firmware (NV)
//! and runtime configuration, the status carries the discovered identity and
//! the outcome of the last reconciliation.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "configuration.net.nvidia.com",
    version = "v1alpha1",
    kind = "NicDevice",
    namespaced,
    status = "NicDeviceStatus",
    shortname = "nicdev"
)]
#[serde(rename_all = "camelCase")]
pub struct NicDeviceSpec {
    /// Desired configuration. Devices without one are discovered but left untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<NicDeviceConfigurationSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NicDeviceConfigurationSpec {
    /// Reset all NV parameters to factory defaults. Takes precedence over the template.
    #[serde(default)]
    pub reset_to_default: bool,

    /// Configuration template applied to the device
    #[serde(default)]
    pub template: ConfigurationTemplateSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationTemplateSpec {
    /// Number of SR-IOV virtual functions to expose (0 disables SR-IOV)
    #[serde(default)]
    pub num_vfs: u32,

    /// Port link type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<LinkType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pci_performance_optimized: Option<PciPerformanceOptimizedSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roce_optimized: Option<RoceOptimizedSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_direct_optimized: Option<GpuDirectOptimizedSpec>,

    /// Raw NV parameters, applied verbatim on top of the computed ones
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub raw_nv_config: Vec<NvConfigParam>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum LinkType {
    Ethernet,
    Infiniband,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PciPerformanceOptimizedSpec {
    pub enabled: bool,

    /// MAX_ACC_OUT_READ value. 0 picks a value based on the PCIe link generation.
    #[serde(default)]
    pub max_acc_out_read: u32,

    /// PCIe max read request size in bytes. 0 means 4096.
    #[serde(default)]
    pub max_read_request: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoceOptimizedSpec {
    pub enabled: bool,

    /// Overrides the default trust mode and PFC map
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qos: Option<QosSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QosSpec {
    /// Trust mode, "pcp" or "dscp"
    pub trust: String,

    /// Comma separated per-priority PFC flags, e.g. "0,0,0,1,0,0,0,0"
    pub pfc: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GpuDirectOptimizedSpec {
    pub enabled: bool,

    /// Deployment environment. Only "Baremetal" is supported.
    pub env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NvConfigParam {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NicDeviceStatus {
    /// Node the device is attached to
    #[serde(default)]
    pub node: String,

    /// PCI product id
    #[serde(rename = "type", default)]
    pub device_type: String,

    #[serde(default)]
    pub serial_number: String,

    #[serde(default)]
    pub part_number: String,

    /// Parameter-set identifier of the board
    #[serde(default)]
    pub psid: String,

    #[serde(default)]
    pub firmware_version: String,

    /// Physical function ports, port 0 first
    #[serde(default)]
    pub ports: Vec<NicDevicePortSpec>,

    /// Configuration state
    #[serde(default)]
    pub state: ConfigurationState,

    /// A reboot is needed for staged NV changes to take effect
    #[serde(default)]
    pub reboot_required: bool,

    /// Error message if the last reconciliation failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Last reconciliation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reconciled: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NicDevicePortSpec {
    /// PCI address, e.g. "0000:3b:00.0"
    pub pci: String,

    #[serde(default)]
    pub network_interface: String,

    #[serde(default)]
    pub rdma_interface: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
/// Configuration state of a NicDevice
///
/// Serializes as PascalCase ("Applied", "RebootRequired", etc.)
#[serde(rename_all = "PascalCase")]
pub enum ConfigurationState {
    /// Nothing evaluated yet
    #[default]
    Pending,

    /// NV or runtime changes are being written
    Updating,

    /// NV changes are staged and wait for a reboot
    RebootRequired,

    /// Device matches its spec
    Applied,

    /// Spec references parameters the device does not support
    SpecError,

    /// Host failure, will be retried
    Failed,
}

impl NicDevice {
    /// Returns the PCI address of port 0, if the device has been discovered
    pub fn first_port_pci(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|status| status.ports.first())
            .map(|port| port.pci.as_str())
    }

    /// Returns true if the spec asks for a reset to factory defaults
    pub fn reset_to_default_requested(&self) -> bool {
        self.spec
            .configuration
            .as_ref()
            .is_some_and(|config| config.reset_to_default)
    }
}
