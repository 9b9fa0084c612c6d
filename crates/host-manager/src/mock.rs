//! Mock HostManager for unit testing
//!
//! Returns canned results and records which devices each operation was called
//! with. Failures are injected per operation as error messages, because
//! `HostManagerError` is not `Clone`.

use crate::error::HostManagerError;
use crate::host_manager_trait::HostManager;
use crate::types::NvSpecValidation;
use crds::{NicDevice, NicDeviceStatus};
use host_utils::HostError;
use kube::ResourceExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Injected failure of one operation
#[derive(Debug, Clone)]
pub enum MockFailure {
    /// Returned as `HostManagerError::IncorrectSpec`
    Spec(String),
    /// Returned as `HostManagerError::Host`
    Host(String),
}

impl MockFailure {
    fn to_error(&self) -> HostManagerError {
        match self {
            MockFailure::Spec(message) => HostManagerError::IncorrectSpec(message.clone()),
            MockFailure::Host(message) => HostManagerError::Host(HostError::NotFound(message.clone())),
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    devices: HashMap<String, NicDeviceStatus>,
    validation: NvSpecValidation,
    reboot_needed: bool,
    discover_failure: Option<MockFailure>,
    validate_failure: Option<MockFailure>,
    apply_nv_failure: Option<MockFailure>,
    apply_runtime_failure: Option<MockFailure>,
    validated: Vec<String>,
    nv_applied: Vec<String>,
    runtime_applied: Vec<String>,
}

/// Mock HostManager for testing
#[derive(Debug, Clone, Default)]
pub struct MockHostManager {
    state: Arc<Mutex<MockState>>,
}

impl MockHostManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a device returned by `discover_devices` (for test setup)
    pub fn add_device(&self, status: NicDeviceStatus) {
        self.state().devices.insert(status.serial_number.clone(), status);
    }

    /// Set the result of `validate_nv_spec`
    pub fn set_validation(&self, validation: NvSpecValidation) {
        self.state().validation = validation;
    }

    /// Set the result of `apply_nv_spec`
    pub fn set_reboot_needed(&self, reboot_needed: bool) {
        self.state().reboot_needed = reboot_needed;
    }

    pub fn fail_discover(&self, failure: MockFailure) {
        self.state().discover_failure = Some(failure);
    }

    pub fn fail_validate(&self, failure: MockFailure) {
        self.state().validate_failure = Some(failure);
    }

    pub fn fail_apply_nv(&self, failure: MockFailure) {
        self.state().apply_nv_failure = Some(failure);
    }

    pub fn fail_apply_runtime(&self, failure: MockFailure) {
        self.state().apply_runtime_failure = Some(failure);
    }

    /// Names of devices passed to `validate_nv_spec`
    pub fn validated(&self) -> Vec<String> {
        self.state().validated.clone()
    }

    /// Names of devices passed to `apply_nv_spec`
    pub fn nv_applied(&self) -> Vec<String> {
        self.state().nv_applied.clone()
    }

    /// Names of devices passed to `apply_runtime_spec`
    pub fn runtime_applied(&self) -> Vec<String> {
        self.state().runtime_applied.clone()
    }
}

#[async_trait::async_trait]
impl HostManager for MockHostManager {
    async fn discover_devices(&self) -> Result<HashMap<String, NicDeviceStatus>, HostManagerError> {
        let state = self.state();
        if let Some(failure) = &state.discover_failure {
            return Err(failure.to_error());
        }
        Ok(state.devices.clone())
    }

    async fn validate_nv_spec(&self, device: &NicDevice) -> Result<NvSpecValidation, HostManagerError> {
        let mut state = self.state();
        state.validated.push(device.name_any());
        if let Some(failure) = &state.validate_failure {
            return Err(failure.to_error());
        }
        Ok(state.validation)
    }

    async fn apply_nv_spec(&self, device: &NicDevice) -> Result<bool, HostManagerError> {
        let mut state = self.state();
        state.nv_applied.push(device.name_any());
        if let Some(failure) = &state.apply_nv_failure {
            return Err(failure.to_error());
        }
        Ok(state.reboot_needed)
    }

    async fn apply_runtime_spec(&self, device: &NicDevice) -> Result<(), HostManagerError> {
        let mut state = self.state();
        state.runtime_applied.push(device.name_any());
        if let Some(failure) = &state.apply_runtime_failure {
            return Err(failure.to_error());
        }
        Ok(())
    }
}
