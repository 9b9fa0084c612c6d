//! NicDevice reconciliation
//!
//! One pass per device: validate the NV spec, stage NV changes when needed,
//! stop at `RebootRequired` while staged values wait for a reboot, otherwise
//! apply runtime settings. The daemon never reboots the node itself.

use super::status::{StatusUpdate, StatusWriter};
use super::Reconciler;
use crate::error::ControllerError;
use crds::{ConfigurationState, NicDevice};
use host_manager::HostManager;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How often settled devices are re-checked for runtime drift
pub const RESYNC_INTERVAL: Duration = Duration::from_secs(600);

/// Result of one reconciliation pass, as reported in status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceOutcome {
    Applied,
    RebootRequired,
    SpecError,
    Failed,
}

/// Runs one configuration pass and records the outcome in status.
///
/// Host manager errors end up in status and the returned outcome; only status
/// write failures are returned as errors.
pub async fn configure_device(
    host_manager: &dyn HostManager,
    status_writer: &dyn StatusWriter,
    device: &NicDevice,
) -> Result<DeviceOutcome, ControllerError> {
    let mut status_dirty = false;
    let result = apply_configuration(host_manager, status_writer, device, &mut status_dirty).await;

    let (outcome, update) = match result {
        Ok(outcome @ DeviceOutcome::RebootRequired) => (outcome, StatusUpdate::reboot_required()),
        Ok(outcome) => (outcome, StatusUpdate::new(ConfigurationState::Applied)),
        Err(ControllerError::HostManager(e)) if e.is_spec_error() => {
            warn!("NicDevice {} has an invalid spec: {}", device.name_any(), e);
            (
                DeviceOutcome::SpecError,
                StatusUpdate::with_error(ConfigurationState::SpecError, &e),
            )
        }
        Err(ControllerError::HostManager(e)) => {
            error!("Failed to configure NicDevice {}: {}", device.name_any(), e);
            (
                DeviceOutcome::Failed,
                StatusUpdate::with_error(ConfigurationState::Failed, &e),
            )
        }
        Err(e) => return Err(e),
    };

    if status_dirty || !update.matches(device.status.as_ref()) {
        status_writer.write_status(device, &update).await?;
    }
    Ok(outcome)
}

async fn apply_configuration(
    host_manager: &dyn HostManager,
    status_writer: &dyn StatusWriter,
    device: &NicDevice,
    status_dirty: &mut bool,
) -> Result<DeviceOutcome, ControllerError> {
    let name = device.name_any();
    let validation = host_manager.validate_nv_spec(device).await?;
    debug!("NicDevice {} validation: {:?}", name, validation);

    if validation.update_needed {
        let updating = StatusUpdate::new(ConfigurationState::Updating);
        if !updating.matches(device.status.as_ref()) {
            status_writer.write_status(device, &updating).await?;
            *status_dirty = true;
        }

        if host_manager.apply_nv_spec(device).await? {
            info!("NV configuration staged on NicDevice {}, reboot required", name);
            return Ok(DeviceOutcome::RebootRequired);
        }
    } else if validation.reboot_needed {
        info!("NicDevice {} waits for a reboot to apply staged NV configuration", name);
        return Ok(DeviceOutcome::RebootRequired);
    }

    host_manager.apply_runtime_spec(device).await?;
    Ok(DeviceOutcome::Applied)
}

impl Reconciler {
    /// True for devices discovered on this node that carry a configuration
    pub fn is_managed(&self, device: &NicDevice) -> bool {
        is_managed_by(device, &self.node_name)
    }

    /// Reconciles a NicDevice.
    pub async fn reconcile_nic_device(&self, device: &NicDevice) -> Result<Action, ControllerError> {
        let name = device.name_any();
        let namespace = device.namespace().unwrap_or_else(|| self.namespace.clone());
        let device_key = format!("{}/{}", namespace, name);

        if !self.is_managed(device) {
            debug!("NicDevice {} is not configured on node {}, skipping", device_key, self.node_name);
            return Ok(Action::await_change());
        }

        info!("Reconciling NicDevice {}", device_key);

        let outcome = configure_device(self.host_manager.as_ref(), self.status_writer.as_ref(), device).await?;

        match outcome {
            DeviceOutcome::Applied | DeviceOutcome::RebootRequired => {
                self.backoffs.reset(&device_key);
                Ok(Action::requeue(RESYNC_INTERVAL))
            }
            DeviceOutcome::SpecError => {
                self.backoffs.reset(&device_key);
                Ok(Action::await_change())
            }
            DeviceOutcome::Failed => {
                let (delay, error_count) = self.backoffs.record_failure(&device_key);
                warn!(
                    "NicDevice {} failed {} time(s) in a row, retrying in {:?}",
                    device_key, error_count, delay
                );
                Ok(Action::requeue(delay))
            }
        }
    }
}

/// True when `device` was discovered on `node_name` and has a configuration
pub fn is_managed_by(device: &NicDevice, node_name: &str) -> bool {
    device.spec.configuration.is_some()
        && device
            .status
            .as_ref()
            .is_some_and(|status| status.node == node_name && !status.ports.is_empty())
}

#[cfg(test)]
#[path = "device_test.rs"]
mod device_test;
