//! NicDevice watcher.
//!
//! Runs `kube_runtime::Controller` over the NicDevices labelled with this
//! node, so each daemon only reconciles its own cards.

use crate::error::ControllerError;
use crate::reconciler::{node_selector, Reconciler};
use crds::NicDevice;
use futures::StreamExt;
use kube::Api;
use kube_runtime::{controller::{Action, Config as ControllerConfig}, watcher, Controller};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Watches the NicDevices of this node until the stream ends.
pub async fn watch_nic_devices(api: Api<NicDevice>, reconciler: Arc<Reconciler>) -> Result<(), ControllerError> {
    let selector = node_selector(&reconciler.node_name);
    info!("Starting NicDevice watcher ({})", selector);

    // Only Kubernetes errors land here; host failures use the per-device backoff
    let error_policy = |device: Arc<NicDevice>, error: &ControllerError, _ctx: Arc<Reconciler>| {
        error!(
            "Reconciliation error for NicDevice {}: {}",
            device.metadata.name.as_deref().unwrap_or("<unnamed>"),
            error
        );
        Action::requeue(Duration::from_secs(60))
    };

    let reconcile = |device: Arc<NicDevice>, ctx: Arc<Reconciler>| async move {
        debug!("Reconciling NicDevice {:?}", device.metadata.name);
        ctx.reconcile_nic_device(&device).await
    };

    // Debounce batches status updates written by the previous pass
    let controller_config = ControllerConfig::default()
        .debounce(Duration::from_secs(5))
        .concurrency(3);

    Controller::new(api, watcher::Config::default().labels(&selector))
        .with_config(controller_config)
        .run(reconcile, error_policy, reconciler)
        .for_each(|res| async move {
            if let Err(e) = res {
                error!("Controller error for NicDevice: {}", e);
            }
        })
        .await;

    Ok(())
}
