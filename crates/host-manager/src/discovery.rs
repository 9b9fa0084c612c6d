//! Device discovery and grouping
//!
//! Network-class Mellanox physical functions are grouped into one
//! `NicDeviceStatus` per card, keyed by serial number. Ports are appended in
//! PCI enumeration order, so the lowest address becomes port 0.

use crate::consts::{MELLANOX_VENDOR, NET_CLASS};
use crate::error::HostManagerError;
use crate::manager::NicHostManager;
use crds::{NicDevicePortSpec, NicDeviceStatus};
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

impl NicHostManager {
    pub(crate) async fn discover(&self) -> Result<HashMap<String, NicDeviceStatus>, HostManagerError> {
        let pci_devices = self.host.list_pci_devices().await.map_err(|e| {
            error!("Failed to list PCI devices: {}", e);
            HostManagerError::from(e)
        })?;

        let mut devices: HashMap<String, NicDeviceStatus> = HashMap::new();

        for device in pci_devices {
            if device.vendor_id != MELLANOX_VENDOR {
                continue;
            }

            let class = match u32::from_str_radix(&device.class_id, 16) {
                Ok(class) => class,
                Err(e) => {
                    warn!(
                        "Unable to parse class {:?} of device {}, skipping: {}",
                        device.class_id, device.address, e
                    );
                    continue;
                }
            };
            if class != NET_CLASS {
                debug!("Device {} is not a network device, skipping", device.address);
                continue;
            }

            if self.host.is_virtual_function(&device.address).await {
                debug!("Device {} is an SR-IOV VF, skipping", device.address);
                continue;
            }

            info!(
                "Found Mellanox device {} ({})",
                device.address,
                device.product_name.as_deref().unwrap_or(&device.product_id)
            );

            let (part_number, serial_number) = self
                .host
                .get_part_and_serial_number(&device.address)
                .await
                .map_err(|e| {
                    error!("Failed to get part and serial numbers of {}: {}", device.address, e);
                    HostManagerError::from(e)
                })?;

            if !devices.contains_key(&serial_number) {
                let (firmware_version, psid) = self
                    .host
                    .get_firmware_version_and_psid(&device.address)
                    .await
                    .map_err(|e| {
                        error!("Failed to get firmware version and PSID of {}: {}", device.address, e);
                        HostManagerError::from(e)
                    })?;

                devices.insert(
                    serial_number.clone(),
                    NicDeviceStatus {
                        device_type: device.product_id.clone(),
                        serial_number: serial_number.clone(),
                        part_number,
                        psid,
                        firmware_version,
                        ..Default::default()
                    },
                );
            }

            let port = NicDevicePortSpec {
                network_interface: self.host.get_interface_name(&device.address).await.unwrap_or_default(),
                rdma_interface: self.host.get_rdma_interface_name(&device.address).await.unwrap_or_default(),
                pci: device.address,
            };

            if let Some(status) = devices.get_mut(&serial_number) {
                status.ports.push(port);
                status.node = self.node_name.clone();
            }
        }

        info!("Discovered {} NIC devices on node {}", devices.len(), self.node_name);
        Ok(devices)
    }
}

#[cfg(test)]
#[path = "discovery_test.rs"]
mod discovery_test;
