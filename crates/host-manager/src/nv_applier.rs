//! NV spec apply
//!
//! Two phases. The first makes sure the advanced PCI settings gate is on,
//! resetting firmware when it had to be enabled so the advanced parameters
//! show up. The second writes every desired parameter whose next-boot value
//! differs. Writes stop at the first failure and are not rolled back; the next
//! reconciliation picks up from the live state.

use crate::config_validation::ConfigValidation;
use crate::consts::{ADVANCED_PCI_SETTINGS, NV_PARAM_TRUE};
use crate::error::HostManagerError;
use crate::manager::{device_configuration, device_ports, NicHostManager};
use crds::NicDevice;
use kube::ResourceExt;
use tracing::{debug, error, info};

impl NicHostManager {
    /// Returns whether a reboot is needed for the staged values to take effect
    pub(crate) async fn apply_nv(&self, device: &NicDevice) -> Result<bool, HostManagerError> {
        let name = device.name_any();
        info!("Applying NV spec to NicDevice {}", name);

        let configuration = device_configuration(device)?;
        let pci_addr = device_ports(device)?[0].pci.as_str();

        if configuration.reset_to_default {
            info!("Resetting NV config of {} to defaults", name);
            self.host.reset_nv_config(pci_addr).await.map_err(|e| {
                error!("Failed to reset NV config of {}: {}", name, e);
                HostManagerError::from(e)
            })?;
            self.enable_advanced_pci_settings(&name, pci_addr).await?;
            return Ok(true);
        }

        let mut nv_config = self.query_nv_config(pci_addr).await.map_err(|e| {
            error!("Failed to query NV config of {}: {}", name, e);
            e
        })?;

        if !ConfigValidation::advanced_pci_settings_enabled(&nv_config.current_config) {
            info!("Advanced PCI settings not enabled on {}, firmware reset required", name);
            self.enable_advanced_pci_settings(&name, pci_addr).await?;
            self.reset_firmware(pci_addr).await.map_err(|e| {
                error!("Failed to reset firmware of {}: {}", name, e);
                e
            })?;
            // Additional parameters become visible after the reset
            nv_config = self.query_nv_config(pci_addr).await.map_err(|e| {
                error!("Failed to query NV config of {}: {}", name, e);
                e
            })?;
        }

        let desired = self
            .validation
            .build_desired_nv_config(device, &nv_config.default_config)
            .await
            .map_err(|e| {
                error!("Failed to calculate desired NV config of {}: {}", name, e);
                e
            })?;

        let mut params_to_apply = Vec::new();
        for (param, value) in &desired {
            match nv_config.next_boot_config.get(param) {
                None => {
                    let err = HostManagerError::IncorrectSpec(format!(
                        "Parameter {} unsupported for device {}",
                        param, name
                    ));
                    error!("Can't set NV config parameter: {}", err);
                    return Err(err);
                }
                Some(next_boot) if next_boot != value => params_to_apply.push((param, value)),
                Some(_) => {}
            }
        }

        debug!("Applying {} NV parameters to {}: {:?}", params_to_apply.len(), name, params_to_apply);

        for (param, value) in params_to_apply {
            self.host
                .set_nv_config_parameter(pci_addr, param, value)
                .await
                .map_err(|e| {
                    error!("Failed to set NV parameter {}={} on {}: {}", param, value, name, e);
                    HostManagerError::from(e)
                })?;
        }

        info!("NV config applied to NicDevice {}", name);
        Ok(true)
    }

    async fn enable_advanced_pci_settings(&self, name: &str, pci_addr: &str) -> Result<(), HostManagerError> {
        self.host
            .set_nv_config_parameter(pci_addr, ADVANCED_PCI_SETTINGS, NV_PARAM_TRUE)
            .await
            .map_err(|e| {
                error!(
                    "Failed to set NV parameter {}={} on {}: {}",
                    ADVANCED_PCI_SETTINGS, NV_PARAM_TRUE, name, e
                );
                HostManagerError::from(e)
            })
    }
}

#[cfg(test)]
#[path = "nv_applier_test.rs"]
mod nv_applier_test;
