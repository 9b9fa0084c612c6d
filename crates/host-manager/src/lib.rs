//! NIC configuration engine
//!
//! Discovers the Mellanox NICs of a node and reconciles their NV (firmware)
//! and runtime configuration against a `NicDevice` spec. The engine decides
//! and applies; the caller owns retries, status and reboots.
//!
//! # Example
//!
//! ```no_run
//! use host_manager::{HostManager, NicHostManager};
//! use host_utils::SystemHostUtils;
//! use std::sync::Arc;
//!
//! # async fn example(device: crds::NicDevice) -> Result<(), host_manager::HostManagerError> {
//! let manager = NicHostManager::new("worker-1", Arc::new(SystemHostUtils::new()));
//!
//! let devices = manager.discover_devices().await?;
//! println!("found {} NICs", devices.len());
//!
//! let validation = manager.validate_nv_spec(&device).await?;
//! if validation.update_needed {
//!     let reboot_needed = manager.apply_nv_spec(&device).await?;
//!     println!("reboot needed: {}", reboot_needed);
//! }
//! manager.apply_runtime_spec(&device).await?;
//! # Ok(())
//! # }
//! ```

pub mod config_validation;
pub mod consts;
pub mod error;
#[path = "trait.rs"]
pub mod host_manager_trait;
pub mod manager;
pub mod types;
#[cfg(feature = "test-util")]
pub mod mock;

mod discovery;
mod nv_applier;
mod nv_validator;
mod runtime_applier;
#[cfg(test)]
mod test_utils;

pub use config_validation::ConfigValidation;
pub use error::HostManagerError;
pub use host_manager_trait::HostManager;
pub use manager::NicHostManager;
pub use types::*;
#[cfg(feature = "test-util")]
pub use mock::MockHostManager;
