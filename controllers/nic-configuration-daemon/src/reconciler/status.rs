//! NicDevice status writes
//!
//! The configuration outcome (`state`, `rebootRequired`, `error`) and the
//! discovered identity (`node`, `type`, serial, firmware, ports) are written
//! as separate merge patches, so neither side overwrites the other.

use crate::error::ControllerError;
use crds::{ConfigurationState, NicDevice, NicDeviceStatus};
use kube::api::{Patch, PatchParams};
use kube::{Api, ResourceExt};
use tracing::debug;

/// Configuration outcome of one reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub state: ConfigurationState,
    pub reboot_required: bool,
    pub error: Option<String>,
}

impl StatusUpdate {
    pub fn new(state: ConfigurationState) -> Self {
        Self {
            state,
            reboot_required: false,
            error: None,
        }
    }

    pub fn reboot_required() -> Self {
        Self {
            state: ConfigurationState::RebootRequired,
            reboot_required: true,
            error: None,
        }
    }

    pub fn with_error(state: ConfigurationState, error: impl ToString) -> Self {
        Self {
            state,
            reboot_required: false,
            error: Some(error.to_string()),
        }
    }

    /// True when the device status already reports this outcome
    pub fn matches(&self, status: Option<&NicDeviceStatus>) -> bool {
        status.is_some_and(|status| {
            status.state == self.state
                && status.reboot_required == self.reboot_required
                && status.error == self.error
        })
    }

    /// Merge patch body for this outcome
    ///
    /// `lastReconciled` is only stamped here, i.e. when the outcome changes,
    /// so repeated reconciliations of a settled device do not produce events.
    pub fn to_patch(&self) -> serde_json::Value {
        serde_json::json!({
            "status": {
                "state": self.state,
                "rebootRequired": self.reboot_required,
                "error": self.error,
                "lastReconciled": chrono::Utc::now(),
            }
        })
    }
}

/// Writes configuration outcomes to NicDevice status
#[async_trait::async_trait]
pub trait StatusWriter: Send + Sync {
    async fn write_status(&self, device: &NicDevice, update: &StatusUpdate) -> Result<(), ControllerError>;
}

/// `StatusWriter` backed by the Kubernetes status subresource
pub struct KubeStatusWriter {
    api: Api<NicDevice>,
}

impl KubeStatusWriter {
    pub fn new(api: Api<NicDevice>) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl StatusWriter for KubeStatusWriter {
    async fn write_status(&self, device: &NicDevice, update: &StatusUpdate) -> Result<(), ControllerError> {
        let name = device.name_any();
        debug!("Updating NicDevice {} status to {:?}", name, update.state);
        self.api
            .patch_status(&name, &PatchParams::default(), &Patch::Merge(&update.to_patch()))
            .await?;
        Ok(())
    }
}

/// Merge patch body for the discovered identity of a device
pub fn identity_patch(discovered: &NicDeviceStatus) -> serde_json::Value {
    serde_json::json!({
        "status": {
            "node": discovered.node,
            "type": discovered.device_type,
            "serialNumber": discovered.serial_number,
            "partNumber": discovered.part_number,
            "psid": discovered.psid,
            "firmwareVersion": discovered.firmware_version,
            "ports": discovered.ports,
        }
    })
}

/// True when the published status lacks or disagrees with the discovered identity
pub fn identity_changed(existing: Option<&NicDeviceStatus>, discovered: &NicDeviceStatus) -> bool {
    match existing {
        None => true,
        Some(existing) => {
            existing.node != discovered.node
                || existing.device_type != discovered.device_type
                || existing.serial_number != discovered.serial_number
                || existing.part_number != discovered.part_number
                || existing.psid != discovered.psid
                || existing.firmware_version != discovered.firmware_version
                || existing.ports != discovered.ports
        }
    }
}
