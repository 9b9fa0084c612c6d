//! Configuration calculator
//!
//! Turns a NicDevice template into the NV parameters and runtime settings it
//! implies, and compares them with what the device reports.

use crate::consts::*;
use crate::error::HostManagerError;
use crate::manager::{device_configuration, device_ports};
use crate::types::{DesiredNvConfig, NvSpecValidation, RuntimeDesired};
use crds::{ConfigurationTemplateSpec, LinkType, NicDevice};
use host_utils::{HostUtils, NvConfigQuery, PfcConfig, TrustMode};
use kube::ResourceExt;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Computes desired configuration for a device. Holds no state besides the host handle.
#[derive(Clone)]
pub struct ConfigValidation {
    host: Arc<dyn HostUtils>,
}

impl ConfigValidation {
    pub fn new(host: Arc<dyn HostUtils>) -> Self {
        Self { host }
    }

    /// Builds the NV parameters the device's template asks for.
    ///
    /// Every produced parameter must exist in `default_config`, otherwise the
    /// device does not support it and the spec is rejected.
    pub async fn build_desired_nv_config(
        &self,
        device: &NicDevice,
        default_config: &HashMap<String, String>,
    ) -> Result<DesiredNvConfig, HostManagerError> {
        let template = &device_configuration(device)?.template;
        let ports = device_ports(device)?;
        let dual_port = ports.len() > 1;
        let mut desired = DesiredNvConfig::new();

        if template.num_vfs > 0 {
            desired.insert(SRIOV_EN.to_string(), NV_PARAM_TRUE.to_string());
            desired.insert(NUM_OF_VFS.to_string(), template.num_vfs.to_string());
        } else {
            desired.insert(SRIOV_EN.to_string(), NV_PARAM_FALSE.to_string());
            desired.insert(NUM_OF_VFS.to_string(), "0".to_string());
        }

        if let Some(link_type) = template.link_type {
            let value = match link_type {
                LinkType::Ethernet => NV_PARAM_LINK_TYPE_ETHERNET,
                LinkType::Infiniband => NV_PARAM_LINK_TYPE_INFINIBAND,
            };
            desired.insert(LINK_TYPE_P1.to_string(), value.to_string());
            if dual_port {
                desired.insert(LINK_TYPE_P2.to_string(), value.to_string());
            }
        }

        if let Some(pci) = template.pci_performance_optimized.as_ref().filter(|p| p.enabled) {
            if pci.max_acc_out_read != 0 {
                desired.insert(MAX_ACC_OUT_READ.to_string(), pci.max_acc_out_read.to_string());
            } else {
                let link_speed = self.host.get_pci_link_speed(&ports[0].pci).await?;
                match max_acc_out_read_for_link_speed(link_speed) {
                    Some(value) => {
                        desired.insert(MAX_ACC_OUT_READ.to_string(), value.to_string());
                    }
                    None => debug!(
                        "Leaving {} untouched on {} (link speed {} GT/s)",
                        MAX_ACC_OUT_READ,
                        device.name_any(),
                        link_speed
                    ),
                }
            }
        }

        let roce_params: &[(&str, &str)] = if dual_port {
            &[
                (ROCE_CC_PRIO_MASK_P1, ROCE_CC_PRIO_MASK_ENABLED),
                (CNP_DSCP_P1, CNP_DSCP_ENABLED),
                (CNP_802P_PRIO_P1, CNP_802P_PRIO_ENABLED),
                (ROCE_CC_PRIO_MASK_P2, ROCE_CC_PRIO_MASK_ENABLED),
                (CNP_DSCP_P2, CNP_DSCP_ENABLED),
                (CNP_802P_PRIO_P2, CNP_802P_PRIO_ENABLED),
            ]
        } else {
            &[
                (ROCE_CC_PRIO_MASK_P1, ROCE_CC_PRIO_MASK_ENABLED),
                (CNP_DSCP_P1, CNP_DSCP_ENABLED),
                (CNP_802P_PRIO_P1, CNP_802P_PRIO_ENABLED),
            ]
        };
        if roce_enabled(template) {
            for (name, value) in roce_params {
                desired.insert(name.to_string(), value.to_string());
            }
        } else {
            // Pin to factory values so a previously enabled profile is undone
            for (name, _) in roce_params {
                if let Some(default) = default_config.get(*name) {
                    desired.insert(name.to_string(), default.clone());
                }
            }
        }

        if let Some(gpu) = template.gpu_direct_optimized.as_ref().filter(|g| g.enabled) {
            if gpu.env != ENV_BAREMETAL {
                return Err(HostManagerError::IncorrectSpec(format!(
                    "GPUDirect optimization is only supported in the {} environment, got {:?}",
                    ENV_BAREMETAL, gpu.env
                )));
            }
            if !template.pci_performance_optimized.as_ref().is_some_and(|p| p.enabled) {
                return Err(HostManagerError::IncorrectSpec(
                    "GPUDirect optimization requires PCI performance optimization to be enabled".to_string(),
                ));
            }
            desired.insert(ATS_ENABLED.to_string(), NV_PARAM_FALSE.to_string());
        }

        for param in &template.raw_nv_config {
            if !dual_port && param.name.ends_with(SECOND_PORT_SUFFIX) {
                debug!("Skipping {} on single port device {}", param.name, device.name_any());
                continue;
            }
            desired.insert(param.name.clone(), param.value.clone());
        }

        if let Some(unsupported) = desired.keys().find(|name| !default_config.contains_key(*name)) {
            return Err(HostManagerError::IncorrectSpec(format!(
                "Parameter {} unsupported for device {}",
                unsupported,
                device.name_any()
            )));
        }

        Ok(desired)
    }

    /// Computes the runtime settings the device's template asks for
    pub fn calculate_desired_runtime_config(&self, device: &NicDevice) -> Result<RuntimeDesired, HostManagerError> {
        let template = &device_configuration(device)?.template;

        let max_read_request_size = match template.pci_performance_optimized.as_ref() {
            Some(pci) if pci.enabled && pci.max_read_request != 0 => pci.max_read_request,
            Some(pci) if pci.enabled => DEFAULT_MAX_READ_REQUEST_SIZE,
            _ => 0,
        };

        let roce = template.roce_optimized.as_ref().filter(|roce| roce.enabled);
        let (trust, pfc) = match roce.and_then(|roce| roce.qos.as_ref()) {
            Some(qos) => {
                let trust = qos
                    .trust
                    .parse::<TrustMode>()
                    .map_err(|e| HostManagerError::IncorrectSpec(format!("invalid qos trust: {}", e)))?;
                let pfc = qos
                    .pfc
                    .parse::<PfcConfig>()
                    .map_err(|e| HostManagerError::IncorrectSpec(format!("invalid qos pfc: {}", e)))?;
                (trust, pfc)
            }
            None if roce.is_some() => (TrustMode::Dscp, PfcConfig::with_enabled(&[ROCE_PFC_PRIORITY])),
            None => (TrustMode::Pcp, PfcConfig::default()),
        };

        Ok(RuntimeDesired {
            max_read_request_size,
            trust,
            pfc,
        })
    }

    /// Returns true when every port already runs with the desired runtime settings
    pub async fn runtime_config_applied(&self, device: &NicDevice) -> Result<bool, HostManagerError> {
        let desired = self.calculate_desired_runtime_config(device)?;

        for port in device_ports(device)?.iter().take(2) {
            if desired.max_read_request_size != 0 {
                let actual = self.host.get_max_read_request_size(&port.pci).await?;
                if actual != desired.max_read_request_size {
                    debug!(
                        "Max read request size on {} is {}, want {}",
                        port.pci, actual, desired.max_read_request_size
                    );
                    return Ok(false);
                }
            }

            if port.network_interface.is_empty() {
                return Err(HostManagerError::InvalidDevice(format!(
                    "port {} of {} has no network interface",
                    port.pci,
                    device.name_any()
                )));
            }
            let (trust, pfc) = self.host.get_trust_and_pfc(&port.network_interface).await?;
            if trust != desired.trust || pfc != desired.pfc {
                debug!(
                    "QoS on {} is trust {} pfc {}, want trust {} pfc {}",
                    port.network_interface, trust, pfc, desired.trust, desired.pfc
                );
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// True when the advanced PCI settings gate is on in the given configuration
    pub fn advanced_pci_settings_enabled(current_config: &HashMap<String, String>) -> bool {
        current_config
            .get(ADVANCED_PCI_SETTINGS)
            .is_some_and(|value| value == NV_PARAM_TRUE)
    }

    /// Decides whether a reset to factory defaults is needed or pending.
    ///
    /// `ADVANCED_PCI_SETTINGS` is ignored, it is re-enabled after every reset.
    pub fn validate_reset_to_default(nv_config: &NvConfigQuery) -> NvSpecValidation {
        let matches_default = |config: &HashMap<String, String>| {
            nv_config
                .default_config
                .iter()
                .filter(|(name, _)| name.as_str() != ADVANCED_PCI_SETTINGS)
                .all(|(name, default)| config.get(name).is_none_or(|value| value == default))
        };

        if matches_default(&nv_config.current_config) {
            NvSpecValidation::new(false, false)
        } else if matches_default(&nv_config.next_boot_config) {
            NvSpecValidation::new(false, true)
        } else {
            debug!("NV configuration differs from factory defaults");
            NvSpecValidation::new(true, true)
        }
    }
}

fn roce_enabled(template: &ConfigurationTemplateSpec) -> bool {
    template.roce_optimized.as_ref().is_some_and(|roce| roce.enabled)
}

/// MAX_ACC_OUT_READ for a PCIe link speed, None when the device default should stay
fn max_acc_out_read_for_link_speed(speed: u32) -> Option<&'static str> {
    if speed >= PCI_GEN5_SPEED {
        Some(MAX_ACC_OUT_READ_GEN5)
    } else if speed == PCI_GEN4_SPEED {
        Some(MAX_ACC_OUT_READ_GEN4)
    } else {
        None
    }
}

#[cfg(test)]
#[path = "config_validation_test.rs"]
mod config_validation_test;
