//! Test utilities for unit testing the reconcilers
//!
//! This module provides NicDevice builders and a `StatusWriter` that records
//! status updates instead of patching the API server.

#[cfg(test)]
use crate::error::ControllerError;
#[cfg(test)]
use crate::reconciler::status::{StatusUpdate, StatusWriter};
#[cfg(test)]
use crds::*;
#[cfg(test)]
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
#[cfg(test)]
use std::sync::{Arc, Mutex};

#[cfg(test)]
pub const TEST_NODE: &str = "worker-1";
#[cfg(test)]
pub const TEST_NAMESPACE: &str = "nic-configuration";

/// Helper to create a discovered NicDevice with an SR-IOV configuration
#[cfg(test)]
pub fn create_test_nic_device(name: &str, node: &str) -> NicDevice {
    NicDevice {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(TEST_NAMESPACE.to_string()),
            ..Default::default()
        },
        spec: NicDeviceSpec {
            configuration: Some(NicDeviceConfigurationSpec {
                reset_to_default: false,
                template: ConfigurationTemplateSpec {
                    num_vfs: 8,
                    link_type: Some(LinkType::Ethernet),
                    ..Default::default()
                },
            }),
        },
        status: Some(create_test_status(node)),
    }
}

/// Helper to create the discovered identity of a dual-port ConnectX card
#[cfg(test)]
pub fn create_test_status(node: &str) -> NicDeviceStatus {
    NicDeviceStatus {
        node: node.to_string(),
        device_type: "101d".to_string(),
        serial_number: "mt2232t13210".to_string(),
        part_number: "MCX623106AN-CDAT".to_string(),
        psid: "MT_0000000359".to_string(),
        firmware_version: "22.35.1012".to_string(),
        ports: vec![
            NicDevicePortSpec {
                pci: "0000:3b:00.0".to_string(),
                network_interface: "enp59s0f0np0".to_string(),
                rdma_interface: "mlx5_0".to_string(),
            },
            NicDevicePortSpec {
                pci: "0000:3b:00.1".to_string(),
                network_interface: "enp59s0f1np1".to_string(),
                rdma_interface: "mlx5_1".to_string(),
            },
        ],
        ..Default::default()
    }
}

/// `StatusWriter` that keeps every update in memory
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct RecordingStatusWriter {
    updates: Arc<Mutex<Vec<(String, StatusUpdate)>>>,
    fail: Arc<Mutex<bool>>,
}

#[cfg(test)]
impl RecordingStatusWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// States written so far, in order
    pub fn states(&self) -> Vec<ConfigurationState> {
        self.updates().into_iter().map(|(_, update)| update.state).collect()
    }

    pub fn updates(&self) -> Vec<(String, StatusUpdate)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<StatusUpdate> {
        self.updates().pop().map(|(_, update)| update)
    }

    /// Make every following write fail
    pub fn fail_writes(&self) {
        *self.fail.lock().unwrap() = true;
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl StatusWriter for RecordingStatusWriter {
    async fn write_status(&self, device: &NicDevice, update: &StatusUpdate) -> Result<(), ControllerError> {
        if *self.fail.lock().unwrap() {
            return Err(ControllerError::Watch("status write rejected".to_string()));
        }
        let name = device.metadata.name.clone().unwrap_or_default();
        self.updates.lock().unwrap().push((name, update.clone()));
        Ok(())
    }
}
