//! NV spec validation
//!
//! Three-way comparison of current, next-boot and desired values. Never
//! writes to the device.

use crate::config_validation::ConfigValidation;
use crate::error::HostManagerError;
use crate::manager::{device_configuration, device_ports, NicHostManager};
use crate::types::NvSpecValidation;
use crds::NicDevice;
use kube::ResourceExt;
use tracing::{debug, error, info};

impl NicHostManager {
    /// - every desired value current: `(false, false)`
    /// - every desired value staged for next boot, some not current: `(false, true)`
    /// - some desired value not staged: `(true, true)`
    pub(crate) async fn validate_nv(&self, device: &NicDevice) -> Result<NvSpecValidation, HostManagerError> {
        let name = device.name_any();
        info!("Validating NV spec of NicDevice {}", name);

        let configuration = device_configuration(device)?;
        let pci_addr = &device_ports(device)?[0].pci;

        let nv_config = self.query_nv_config(pci_addr).await.map_err(|e| {
            error!("Failed to query NV config of {}: {}", name, e);
            e
        })?;

        if configuration.reset_to_default {
            return Ok(ConfigValidation::validate_reset_to_default(&nv_config));
        }

        let desired = self
            .validation
            .build_desired_nv_config(device, &nv_config.default_config)
            .await
            .map_err(|e| {
                error!("Failed to calculate desired NV config of {}: {}", name, e);
                e
            })?;

        // With the gate off advanced parameters are missing from current config
        let advanced_enabled = ConfigValidation::advanced_pci_settings_enabled(&nv_config.current_config);
        let mut result = NvSpecValidation::default();

        for (param, desired_value) in &desired {
            let current = nv_config.current_config.get(param);
            let next_boot = nv_config.next_boot_config.get(param);

            if advanced_enabled && current.is_none() {
                let err = HostManagerError::IncorrectSpec(format!(
                    "Parameter {} unsupported for device {}",
                    param, name
                ));
                error!("Can't set NV config parameter: {}", err);
                return Err(err);
            }

            if next_boot == Some(desired_value) {
                if current != Some(desired_value) {
                    debug!("{} staged as {} on {}, reboot pending", param, desired_value, name);
                    result.reboot_needed = true;
                }
            } else {
                debug!("{} must change to {} on {}", param, desired_value, name);
                result.update_needed = true;
                result.reboot_needed = true;
            }
        }

        info!(
            "NV spec of NicDevice {}: update needed {}, reboot needed {}",
            name, result.update_needed, result.reboot_needed
        );
        Ok(result)
    }
}

#[cfg(test)]
#[path = "nv_validator_test.rs"]
mod nv_validator_test;
