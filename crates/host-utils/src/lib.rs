//! Host access for NIC configuration
//!
//! Everything the configuration engine needs from the node: PCI enumeration
//! through sysfs, and device identity, NV configuration and runtime QoS through
//! the Mellanox firmware tools.
//!
//! # Example
//!
//! ```no_run
//! use host_utils::{HostUtils, SystemHostUtils};
//!
//! # async fn example() -> Result<(), host_utils::HostError> {
//! let host = SystemHostUtils::new();
//!
//! for device in host.list_pci_devices().await? {
//!     if device.vendor_id == "15b3" {
//!         let nv = host.query_nv_config(&device.address).await?;
//!         println!("{}: {} NV parameters", device.address, nv.default_config.len());
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `test-util`: in-memory `MockHostUtils` with call recording and failure injection

mod command;
pub mod error;
#[path = "trait.rs"]
pub mod host_trait;
pub mod models;
pub mod parse;
pub mod system;
#[cfg(feature = "test-util")]
pub mod mock;

pub use error::HostError;
pub use host_trait::HostUtils;
pub use models::*;
pub use system::SystemHostUtils;
#[cfg(feature = "test-util")]
pub use mock::{HostCall, HostOperation, MockHostUtils};
