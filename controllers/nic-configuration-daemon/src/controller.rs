//! Main controller implementation.
//!
//! Wires the host engine to the Kubernetes API and runs the two long-lived
//! tasks of the daemon: periodic NIC discovery and the NicDevice watcher.

use crate::config::Config;
use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::watcher::watch_nic_devices;
use crds::NicDevice;
use host_manager::{HostManagerConfig, NicHostManager};
use host_utils::SystemHostUtils;
use kube::{Api, Client};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Per-node NIC configuration controller.
pub struct Controller {
    discovery_loop: JoinHandle<Result<(), ControllerError>>,
    nic_device_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance and starts its tasks.
    pub async fn new(config: Config) -> Result<Self, ControllerError> {
        info!("Initializing NIC configuration daemon for node {}", config.node_name);

        let kube_client = Client::try_default().await?;

        let host = Arc::new(SystemHostUtils::with_sysfs_root(config.sysfs_root.clone()));
        let manager_config = config
            .host_call_timeout
            .map(HostManagerConfig::with_timeout)
            .unwrap_or_default();
        let host_manager = Arc::new(NicHostManager::with_config(
            config.node_name.clone(),
            host,
            manager_config,
        ));

        let nic_device_api: Api<NicDevice> = Api::namespaced(kube_client, &config.namespace);
        let reconciler = Arc::new(Reconciler::new(
            host_manager,
            nic_device_api.clone(),
            config.node_name.clone(),
            config.namespace.clone(),
        ));

        // Publish devices before watching so the first reconciliations see them
        if let Err(e) = reconciler.discover_and_publish().await {
            warn!("Initial NIC discovery failed: {}", e);
        }

        let discovery_reconciler = reconciler.clone();
        let discovery_interval = config.discovery_interval;
        let discovery_loop = tokio::spawn(async move {
            run_discovery_loop(discovery_reconciler, discovery_interval).await
        });

        let nic_device_watcher = tokio::spawn(async move {
            watch_nic_devices(nic_device_api, reconciler).await
        });

        Ok(Self {
            discovery_loop,
            nic_device_watcher,
        })
    }

    /// Runs the controller until shutdown.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("NIC configuration daemon running");

        // Both tasks run forever; whichever exits first ends the daemon
        tokio::select! {
            result = &mut self.discovery_loop => {
                result.map_err(|e| ControllerError::Watch(format!("Discovery loop panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("Discovery loop error: {}", e)))?;
            }
            result = &mut self.nic_device_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("NicDevice watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("NicDevice watcher error: {}", e)))?;
            }
        }

        Ok(())
    }
}

async fn run_discovery_loop(reconciler: Arc<Reconciler>, interval: Duration) -> Result<(), ControllerError> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately and startup already ran discovery
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if let Err(e) = reconciler.discover_and_publish().await {
            warn!("NIC discovery failed: {}", e);
        }
    }
}
