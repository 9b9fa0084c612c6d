//! Vendor identifiers and NV parameter names

/// PCI vendor id of Mellanox / NVIDIA networking
pub const MELLANOX_VENDOR: &str = "15b3";
/// PCI base class of network controllers
pub const NET_CLASS: u32 = 0x02;

/// Gate that exposes the advanced NV parameters once enabled in current config
pub const ADVANCED_PCI_SETTINGS: &str = "ADVANCED_PCI_SETTINGS";

pub const SRIOV_EN: &str = "SRIOV_EN";
pub const NUM_OF_VFS: &str = "NUM_OF_VFS";
pub const LINK_TYPE_P1: &str = "LINK_TYPE_P1";
pub const LINK_TYPE_P2: &str = "LINK_TYPE_P2";
pub const MAX_ACC_OUT_READ: &str = "MAX_ACC_OUT_READ";
pub const ROCE_CC_PRIO_MASK_P1: &str = "ROCE_CC_PRIO_MASK_P1";
pub const ROCE_CC_PRIO_MASK_P2: &str = "ROCE_CC_PRIO_MASK_P2";
pub const CNP_DSCP_P1: &str = "CNP_DSCP_P1";
pub const CNP_DSCP_P2: &str = "CNP_DSCP_P2";
pub const CNP_802P_PRIO_P1: &str = "CNP_802P_PRIO_P1";
pub const CNP_802P_PRIO_P2: &str = "CNP_802P_PRIO_P2";
pub const ATS_ENABLED: &str = "ATS_ENABLED";

pub const NV_PARAM_TRUE: &str = "1";
pub const NV_PARAM_FALSE: &str = "0";

pub const NV_PARAM_LINK_TYPE_INFINIBAND: &str = "1";
pub const NV_PARAM_LINK_TYPE_ETHERNET: &str = "2";

/// RoCE-optimized congestion control values
pub const ROCE_CC_PRIO_MASK_ENABLED: &str = "255";
pub const CNP_DSCP_ENABLED: &str = "4";
pub const CNP_802P_PRIO_ENABLED: &str = "6";

/// MAX_ACC_OUT_READ on PCIe Gen4 links. Gen5 and later use 0 (device picks).
pub const MAX_ACC_OUT_READ_GEN4: &str = "44";
pub const MAX_ACC_OUT_READ_GEN5: &str = "0";
/// PCIe link speeds in GT/s
pub const PCI_GEN4_SPEED: u32 = 16;
pub const PCI_GEN5_SPEED: u32 = 32;

/// Max read request size used when PCI performance optimization is on and none is given
pub const DEFAULT_MAX_READ_REQUEST_SIZE: u32 = 4096;
/// Priority that carries RoCE traffic and gets PFC
pub const ROCE_PFC_PRIORITY: usize = 3;

/// Suffix of parameters that only exist on dual-port devices
pub const SECOND_PORT_SUFFIX: &str = "_P2";

/// Only supported environment for GPUDirect optimization
pub const ENV_BAREMETAL: &str = "Baremetal";
