//! Mock HostUtils for unit testing
//!
//! This module provides an in-memory implementation of `HostUtils` that models
//! the firmware's three-state NV configuration closely enough to exercise the
//! reconciliation engine without hardware:
//!
//! - `set_nv_config_parameter` stages a value in next-boot config
//! - `reset_nv_config` stages factory defaults
//! - `reset_firmware` makes next-boot config current
//! - parameters registered as advanced are missing from current and next-boot
//!   config until `ADVANCED_PCI_SETTINGS` is `1` in current config, but always
//!   listed in default config
//!
//! Every call is recorded so tests can assert on exactly what was written.

use crate::error::HostError;
use crate::host_trait::HostUtils;
use crate::models::{NvConfigQuery, PciDevice, PfcConfig, TrustMode};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const ADVANCED_PCI_SETTINGS: &str = "ADVANCED_PCI_SETTINGS";

/// Host operations, used to inject failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOperation {
    ListPciDevices,
    GetPartAndSerialNumber,
    GetFirmwareVersionAndPsid,
    GetPciLinkSpeed,
    QueryNvConfig,
    SetNvConfigParameter,
    ResetNvConfig,
    ResetFirmware,
    GetMaxReadRequestSize,
    SetMaxReadRequestSize,
    GetTrustAndPfc,
    SetTrustAndPfc,
}

/// Recorded calls that query NV state or change the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    QueryNvConfig { pci: String },
    SetNvConfigParameter { pci: String, name: String, value: String },
    ResetNvConfig { pci: String },
    ResetFirmware { pci: String },
    SetMaxReadRequestSize { pci: String, size: u32 },
    SetTrustAndPfc { interface: String, trust: TrustMode, pfc: PfcConfig },
}

/// NV parameters of one device
#[derive(Debug, Clone, Default)]
struct NvState {
    default: HashMap<String, String>,
    current: HashMap<String, String>,
    next_boot: HashMap<String, String>,
    advanced: HashSet<String>,
}

#[derive(Debug, Default)]
struct MockState {
    pci_devices: Vec<PciDevice>,
    virtual_functions: HashSet<String>,
    identities: HashMap<String, (String, String)>,
    firmware: HashMap<String, (String, String)>,
    interfaces: HashMap<String, String>,
    rdma_interfaces: HashMap<String, String>,
    link_speeds: HashMap<String, u32>,
    nv: HashMap<String, NvState>,
    max_read_request: HashMap<String, u32>,
    qos: HashMap<String, (TrustMode, PfcConfig)>,
    failing_operations: HashSet<HostOperation>,
    failing_parameters: HashSet<String>,
    firmware_reset_delay: Option<Duration>,
    calls: Vec<HostCall>,
}

/// Mock HostUtils for testing
///
/// Clones share state, so a test can hand one clone to the engine and keep
/// another for setup and assertions.
#[derive(Debug, Clone, Default)]
pub struct MockHostUtils {
    state: Arc<Mutex<MockState>>,
}

impl MockHostUtils {
    /// Create an empty mock host
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self, operation: HostOperation) -> Result<(), HostError> {
        if self.state().failing_operations.contains(&operation) {
            return Err(HostError::CommandFailed {
                command: format!("{:?}", operation),
                status: "exit status: 1".to_string(),
                stderr: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    /// Add a PCI function with its identity (for test setup)
    ///
    /// `serial` groups functions into one card; firmware version and PSID are
    /// reported for every function of the card.
    pub fn add_pci_device(&self, device: PciDevice, part_number: &str, serial: &str, firmware: &str, psid: &str) {
        let mut state = self.state();
        state.identities.insert(
            device.address.clone(),
            (part_number.to_string(), serial.to_string()),
        );
        state.firmware.insert(
            device.address.clone(),
            (firmware.to_string(), psid.to_string()),
        );
        state.pci_devices.push(device);
    }

    /// Add a PCI function without identity data (for test setup)
    pub fn add_raw_pci_device(&self, device: PciDevice) {
        self.state().pci_devices.push(device);
    }

    /// Mark a PCI function as an SR-IOV virtual function (for test setup)
    pub fn mark_virtual_function(&self, pci_addr: &str) {
        self.state().virtual_functions.insert(pci_addr.to_string());
    }

    /// Set network and RDMA interface names of a PCI function (for test setup)
    pub fn set_interfaces(&self, pci_addr: &str, interface: &str, rdma_interface: &str) {
        let mut state = self.state();
        state.interfaces.insert(pci_addr.to_string(), interface.to_string());
        state.rdma_interfaces.insert(pci_addr.to_string(), rdma_interface.to_string());
    }

    /// Set the PCIe link speed in GT/s (for test setup)
    pub fn set_link_speed(&self, pci_addr: &str, speed: u32) {
        self.state().link_speeds.insert(pci_addr.to_string(), speed);
    }

    /// Add an NV parameter with its default, current and next-boot values (for test setup)
    pub fn set_nv_parameter(&self, pci_addr: &str, name: &str, default: &str, current: &str, next_boot: &str) {
        let mut state = self.state();
        let nv = state.nv.entry(pci_addr.to_string()).or_default();
        nv.default.insert(name.to_string(), default.to_string());
        nv.current.insert(name.to_string(), current.to_string());
        nv.next_boot.insert(name.to_string(), next_boot.to_string());
    }

    /// Add an NV parameter whose current and next-boot values are only visible
    /// with advanced PCI settings enabled (for test setup)
    pub fn set_advanced_nv_parameter(&self, pci_addr: &str, name: &str, default: &str, current: &str, next_boot: &str) {
        self.set_nv_parameter(pci_addr, name, default, current, next_boot);
        self.state()
            .nv
            .entry(pci_addr.to_string())
            .or_default()
            .advanced
            .insert(name.to_string());
    }

    /// Remove an NV parameter from current config only (for test setup)
    pub fn remove_current_nv_parameter(&self, pci_addr: &str, name: &str) {
        if let Some(nv) = self.state().nv.get_mut(pci_addr) {
            nv.current.remove(name);
        }
    }

    /// Add an NV parameter that only reports a default value (for test setup)
    pub fn set_default_only_nv_parameter(&self, pci_addr: &str, name: &str, default: &str) {
        self.state()
            .nv
            .entry(pci_addr.to_string())
            .or_default()
            .default
            .insert(name.to_string(), default.to_string());
    }

    /// Set the live max read request size (for test setup)
    pub fn set_max_read_request(&self, pci_addr: &str, size: u32) {
        self.state().max_read_request.insert(pci_addr.to_string(), size);
    }

    /// Set the live trust mode and PFC map of an interface (for test setup)
    pub fn set_qos(&self, interface: &str, trust: TrustMode, pfc: PfcConfig) {
        self.state().qos.insert(interface.to_string(), (trust, pfc));
    }

    /// Make every call of `operation` fail
    pub fn fail_operation(&self, operation: HostOperation) {
        self.state().failing_operations.insert(operation);
    }

    /// Make writes of one NV parameter fail
    pub fn fail_parameter(&self, name: &str) {
        self.state().failing_parameters.insert(name.to_string());
    }

    /// Delay firmware resets, to exercise timeouts
    pub fn set_firmware_reset_delay(&self, delay: Duration) {
        self.state().firmware_reset_delay = Some(delay);
    }

    /// Recorded calls, in order
    pub fn calls(&self) -> Vec<HostCall> {
        self.state().calls.clone()
    }

    /// Recorded NV parameter writes as (name, value), in order
    pub fn nv_writes(&self) -> Vec<(String, String)> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                HostCall::SetNvConfigParameter { name, value, .. } => {
                    Some((name.clone(), value.clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// Recorded calls that changed the host
    pub fn mutating_calls(&self) -> Vec<HostCall> {
        self.state()
            .calls
            .iter()
            .filter(|call| !matches!(call, HostCall::QueryNvConfig { .. }))
            .cloned()
            .collect()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Current value of an NV parameter, ignoring visibility
    pub fn current_value(&self, pci_addr: &str, name: &str) -> Option<String> {
        self.state().nv.get(pci_addr)?.current.get(name).cloned()
    }

    /// Next-boot value of an NV parameter, ignoring visibility
    pub fn next_boot_value(&self, pci_addr: &str, name: &str) -> Option<String> {
        self.state().nv.get(pci_addr)?.next_boot.get(name).cloned()
    }

    fn record(&self, call: HostCall) {
        self.state().calls.push(call);
    }
}

fn visible(nv: &NvState, map: &HashMap<String, String>) -> HashMap<String, String> {
    let advanced_enabled = nv.current.get(ADVANCED_PCI_SETTINGS).is_some_and(|v| v == "1");
    map.iter()
        .filter(|(name, _)| advanced_enabled || !nv.advanced.contains(*name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

#[async_trait::async_trait]
impl HostUtils for MockHostUtils {
    async fn list_pci_devices(&self) -> Result<Vec<PciDevice>, HostError> {
        self.check(HostOperation::ListPciDevices)?;
        Ok(self.state().pci_devices.clone())
    }

    async fn is_virtual_function(&self, pci_addr: &str) -> bool {
        self.state().virtual_functions.contains(pci_addr)
    }

    async fn get_part_and_serial_number(&self, pci_addr: &str) -> Result<(String, String), HostError> {
        self.check(HostOperation::GetPartAndSerialNumber)?;
        self.state()
            .identities
            .get(pci_addr)
            .cloned()
            .ok_or_else(|| HostError::NotFound(format!("VPD of {}", pci_addr)))
    }

    async fn get_firmware_version_and_psid(&self, pci_addr: &str) -> Result<(String, String), HostError> {
        self.check(HostOperation::GetFirmwareVersionAndPsid)?;
        self.state()
            .firmware
            .get(pci_addr)
            .cloned()
            .ok_or_else(|| HostError::NotFound(format!("firmware of {}", pci_addr)))
    }

    async fn get_interface_name(&self, pci_addr: &str) -> Option<String> {
        self.state().interfaces.get(pci_addr).cloned()
    }

    async fn get_rdma_interface_name(&self, pci_addr: &str) -> Option<String> {
        self.state().rdma_interfaces.get(pci_addr).cloned()
    }

    async fn get_pci_link_speed(&self, pci_addr: &str) -> Result<u32, HostError> {
        self.check(HostOperation::GetPciLinkSpeed)?;
        self.state()
            .link_speeds
            .get(pci_addr)
            .copied()
            .ok_or_else(|| HostError::NotFound(format!("link speed of {}", pci_addr)))
    }

    async fn query_nv_config(&self, pci_addr: &str) -> Result<NvConfigQuery, HostError> {
        self.record(HostCall::QueryNvConfig { pci: pci_addr.to_string() });
        self.check(HostOperation::QueryNvConfig)?;
        let state = self.state();
        let nv = state
            .nv
            .get(pci_addr)
            .ok_or_else(|| HostError::NotFound(format!("NV config of {}", pci_addr)))?;
        Ok(NvConfigQuery {
            current_config: visible(nv, &nv.current),
            next_boot_config: visible(nv, &nv.next_boot),
            default_config: nv.default.clone(),
        })
    }

    async fn set_nv_config_parameter(&self, pci_addr: &str, name: &str, value: &str) -> Result<(), HostError> {
        self.record(HostCall::SetNvConfigParameter {
            pci: pci_addr.to_string(),
            name: name.to_string(),
            value: value.to_string(),
        });
        self.check(HostOperation::SetNvConfigParameter)?;

        let mut state = self.state();
        if state.failing_parameters.contains(name) {
            return Err(HostError::CommandFailed {
                command: format!("mstconfig set {}={}", name, value),
                status: "exit status: 1".to_string(),
                stderr: "injected failure".to_string(),
            });
        }
        let nv = state
            .nv
            .get_mut(pci_addr)
            .ok_or_else(|| HostError::NotFound(format!("NV config of {}", pci_addr)))?;
        if !nv.default.contains_key(name) {
            return Err(HostError::InvalidArgument(format!("unknown parameter {}", name)));
        }
        nv.next_boot.insert(name.to_string(), value.to_string());
        Ok(())
    }

    async fn reset_nv_config(&self, pci_addr: &str) -> Result<(), HostError> {
        self.record(HostCall::ResetNvConfig { pci: pci_addr.to_string() });
        self.check(HostOperation::ResetNvConfig)?;
        let mut state = self.state();
        let nv = state
            .nv
            .get_mut(pci_addr)
            .ok_or_else(|| HostError::NotFound(format!("NV config of {}", pci_addr)))?;
        nv.next_boot = nv.default.clone();
        Ok(())
    }

    async fn reset_firmware(&self, pci_addr: &str) -> Result<(), HostError> {
        self.record(HostCall::ResetFirmware { pci: pci_addr.to_string() });
        self.check(HostOperation::ResetFirmware)?;
        let delay = self.state().firmware_reset_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state();
        let nv = state
            .nv
            .get_mut(pci_addr)
            .ok_or_else(|| HostError::NotFound(format!("NV config of {}", pci_addr)))?;
        nv.current = nv.next_boot.clone();
        Ok(())
    }

    async fn get_max_read_request_size(&self, pci_addr: &str) -> Result<u32, HostError> {
        self.check(HostOperation::GetMaxReadRequestSize)?;
        self.state()
            .max_read_request
            .get(pci_addr)
            .copied()
            .ok_or_else(|| HostError::NotFound(format!("max read request of {}", pci_addr)))
    }

    async fn set_max_read_request_size(&self, pci_addr: &str, size: u32) -> Result<(), HostError> {
        self.record(HostCall::SetMaxReadRequestSize { pci: pci_addr.to_string(), size });
        self.check(HostOperation::SetMaxReadRequestSize)?;
        self.state().max_read_request.insert(pci_addr.to_string(), size);
        Ok(())
    }

    async fn get_trust_and_pfc(&self, interface: &str) -> Result<(TrustMode, PfcConfig), HostError> {
        self.check(HostOperation::GetTrustAndPfc)?;
        self.state()
            .qos
            .get(interface)
            .copied()
            .ok_or_else(|| HostError::NotFound(format!("QoS of {}", interface)))
    }

    async fn set_trust_and_pfc(&self, interface: &str, trust: TrustMode, pfc: PfcConfig) -> Result<(), HostError> {
        self.record(HostCall::SetTrustAndPfc {
            interface: interface.to_string(),
            trust,
            pfc,
        });
        self.check(HostOperation::SetTrustAndPfc)?;
        self.state().qos.insert(interface.to_string(), (trust, pfc));
        Ok(())
    }
}
