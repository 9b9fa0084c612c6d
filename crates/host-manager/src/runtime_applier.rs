//! Runtime spec apply
//!
//! Max read request size is set per PCI function, trust and PFC per network
//! interface. Both apply to port 0 and, on dual-port cards, port 1.

use crate::error::HostManagerError;
use crate::manager::{device_ports, NicHostManager};
use crds::NicDevice;
use kube::ResourceExt;
use tracing::{debug, error, info, warn};

impl NicHostManager {
    pub(crate) async fn apply_runtime(&self, device: &NicDevice) -> Result<(), HostManagerError> {
        let name = device.name_any();
        info!("Applying runtime spec to NicDevice {}", name);

        match self.validation.runtime_config_applied(device).await {
            Ok(true) => {
                debug!("Runtime config already applied to {}", name);
                return Ok(());
            }
            Ok(false) => {}
            // A failed read-back only means we cannot skip the writes
            Err(e) if e.is_spec_error() => return Err(e),
            Err(e) => warn!("Failed to verify runtime config of {}: {}", name, e),
        }

        let desired = self.validation.calculate_desired_runtime_config(device)?;
        let ports = device_ports(device)?;
        let ports = &ports[..ports.len().min(2)];

        if desired.max_read_request_size != 0 {
            for port in ports {
                self.host
                    .set_max_read_request_size(&port.pci, desired.max_read_request_size)
                    .await
                    .map_err(|e| {
                        error!("Failed to set max read request size on {}: {}", port.pci, e);
                        HostManagerError::from(e)
                    })?;
            }
        }

        for port in ports {
            if port.network_interface.is_empty() {
                return Err(HostManagerError::InvalidDevice(format!(
                    "port {} of {} has no network interface",
                    port.pci, name
                )));
            }
            self.host
                .set_trust_and_pfc(&port.network_interface, desired.trust, desired.pfc)
                .await
                .map_err(|e| {
                    error!("Failed to set trust and PFC on {}: {}", port.network_interface, e);
                    HostManagerError::from(e)
                })?;
        }

        info!("Runtime config applied to NicDevice {}", name);
        Ok(())
    }
}

#[cfg(test)]
#[path = "runtime_applier_test.rs"]
mod runtime_applier_test;
