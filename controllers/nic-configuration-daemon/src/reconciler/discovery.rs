//! NicDevice publishing
//!
//! Mirrors the NICs found on this node into NicDevice resources: one resource
//! per card, created on first sight, identity kept in sync, and removed once
//! the card disappears from the node.

use super::status::{identity_changed, identity_patch};
use super::{node_selector, Reconciler, NODE_LABEL};
use crate::error::ControllerError;
use crds::{NicDevice, NicDeviceSpec, NicDeviceStatus};
use kube::api::{DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::ResourceExt;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

/// Resource name of a discovered device: `<node>-<type>-<serial>`, lowercased
pub fn device_name(node_name: &str, status: &NicDeviceStatus) -> String {
    format!("{}-{}-{}", node_name, status.device_type, status.serial_number).to_lowercase()
}

impl Reconciler {
    /// Discovers the NICs of this node and publishes them as NicDevices.
    ///
    /// Returns the number of devices published.
    pub async fn discover_and_publish(&self) -> Result<usize, ControllerError> {
        let discovered = self.host_manager.discover_devices().await?;
        let mut published = HashSet::with_capacity(discovered.len());

        for status in discovered.values() {
            let name = device_name(&self.node_name, status);
            self.publish_device(&name, status).await?;
            published.insert(name);
        }

        self.remove_stale_devices(&published).await?;

        info!("Published {} NicDevice(s) for node {}", published.len(), self.node_name);
        Ok(published.len())
    }

    async fn publish_device(&self, name: &str, discovered: &NicDeviceStatus) -> Result<(), ControllerError> {
        let existing = match self.api.get_opt(name).await? {
            Some(existing) => existing,
            None => {
                info!("Creating NicDevice {}/{}", self.namespace, name);
                let mut device = NicDevice::new(name, NicDeviceSpec::default());
                device.metadata.namespace = Some(self.namespace.clone());
                device.metadata.labels = Some(BTreeMap::from([(
                    NODE_LABEL.to_string(),
                    self.node_name.clone(),
                )]));
                self.api.create(&PostParams::default(), &device).await?
            }
        };

        if identity_changed(existing.status.as_ref(), discovered) {
            debug!("Updating identity of NicDevice {}/{}", self.namespace, name);
            self.api
                .patch_status(name, &PatchParams::default(), &Patch::Merge(&identity_patch(discovered)))
                .await?;
        }
        Ok(())
    }

    async fn remove_stale_devices(&self, published: &HashSet<String>) -> Result<(), ControllerError> {
        let params = ListParams::default().labels(&node_selector(&self.node_name));
        let devices = self.api.list(&params).await?;

        for device in devices.items {
            let name = device.name_any();
            if published.contains(&name) {
                continue;
            }
            warn!("NIC of NicDevice {}/{} is gone from node {}, deleting", self.namespace, name, self.node_name);
            self.api.delete(&name, &DeleteParams::default()).await?;
        }
        Ok(())
    }
}
