//! NIC Configuration CRD Definitions
//!
//! Kubernetes Custom Resource Definitions shared by the host engine and the
//! per-node configuration daemon.

pub mod nic_device;

pub use nic_device::*;
