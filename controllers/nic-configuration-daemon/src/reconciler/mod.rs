//! Reconciliation logic for NicDevice resources.
//!
//! - `discovery`: publishes the NICs found on this node as NicDevice resources
//! - `device`: drives one device through validate, NV apply and runtime apply
//! - `status`: status patches and the `StatusWriter` seam

pub mod device;
pub mod discovery;
pub mod status;

use crate::backoff::FibonacciBackoff;
use crds::NicDevice;
use host_manager::HostManager;
use kube::Api;
use status::{KubeStatusWriter, StatusWriter};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

/// Label carrying the node a NicDevice was discovered on
pub const NODE_LABEL: &str = "configuration.net.nvidia.com/node";

/// Label selector for the NicDevices of one node
pub fn node_selector(node_name: &str) -> String {
    format!("{}={}", NODE_LABEL, node_name)
}

/// Backoff state for a device
#[derive(Debug, Clone)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
}

impl BackoffState {
    fn new() -> Self {
        Self {
            backoff: FibonacciBackoff::new(Duration::from_secs(30), Duration::from_secs(600)),
            error_count: 0,
        }
    }
}

/// Per-device retry delays for host failures
#[derive(Debug, Default)]
pub struct DeviceBackoffs {
    states: Mutex<HashMap<String, BackoffState>>,
}

impl DeviceBackoffs {
    /// Records a failure and returns (retry delay, consecutive failures)
    pub fn record_failure(&self, device_key: &str) -> (Duration, u32) {
        match self.states.lock() {
            Ok(mut states) => {
                let state = states
                    .entry(device_key.to_string())
                    .or_insert_with(BackoffState::new);
                state.error_count += 1;
                (state.backoff.next_backoff(), state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff states: {}, using default backoff", e);
                (Duration::from_secs(60), 0)
            }
        }
    }

    /// Forgets failures of a device after a successful reconciliation
    pub fn reset(&self, device_key: &str) {
        if let Ok(mut states) = self.states.lock() {
            if let Some(state) = states.get_mut(device_key) {
                state.backoff.reset();
                state.error_count = 0;
            }
        }
    }
}

/// Reconciles the NicDevices of one node.
pub struct Reconciler {
    pub(crate) host_manager: Arc<dyn HostManager>,
    pub(crate) api: Api<NicDevice>,
    pub(crate) status_writer: Arc<dyn StatusWriter>,
    pub(crate) node_name: String,
    pub(crate) namespace: String,
    pub(crate) backoffs: DeviceBackoffs,
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(
        host_manager: Arc<dyn HostManager>,
        api: Api<NicDevice>,
        node_name: String,
        namespace: String,
    ) -> Self {
        Self {
            host_manager,
            status_writer: Arc::new(KubeStatusWriter::new(api.clone())),
            api,
            node_name,
            namespace,
            backoffs: DeviceBackoffs::default(),
        }
    }
}
