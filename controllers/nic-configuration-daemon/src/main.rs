//! NIC Configuration Daemon
//!
//! Runs on every node with Mellanox NICs:
//! - Discovery: publishes each NIC of the node as a `NicDevice` resource
//! - Configuration: reconciles NV (firmware) and runtime settings of the
//!   node's NicDevices and reports the outcome in their status
//!
//! NV changes only take effect after a reboot; the daemon reports
//! `RebootRequired` and leaves the reboot to the cluster's maintenance flow.

mod backoff;
mod config;
mod controller;
mod error;
mod reconciler;
mod watcher;
#[cfg(test)]
mod test_utils;

use crate::config::Config;
use crate::error::ControllerError;
use controller::Controller;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting NIC Configuration Daemon");

    let config = Config::from_env()?;

    info!("Configuration:");
    info!("  Node: {}", config.node_name);
    info!("  Namespace: {}", config.namespace);
    info!("  Discovery interval: {:?}", config.discovery_interval);
    info!("  sysfs root: {}", config.sysfs_root.display());

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
