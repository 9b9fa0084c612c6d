//! Host data models

use crate::error::HostError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// PCI function as reported by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PciDevice {
    /// Full PCI address, e.g. "0000:3b:00.0"
    pub address: String,
    /// Vendor id as lowercase hex without prefix, e.g. "15b3"
    pub vendor_id: String,
    /// Base class code as hex without prefix, e.g. "02"
    pub class_id: String,
    /// Device (product) id as lowercase hex without prefix, e.g. "101d"
    pub product_id: String,
    /// Product name from the PCI id database, if known
    pub product_name: Option<String>,
}

/// Snapshot of a device's NV configuration
///
/// All three maps are keyed by parameter name. Values are normalized to the
/// raw numeric form the firmware tools accept on `set` (e.g. "ETH(2)" → "2").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NvConfigQuery {
    /// Values currently in effect
    pub current_config: HashMap<String, String>,
    /// Values that take effect after the next reboot or firmware reset
    pub next_boot_config: HashMap<String, String>,
    /// Factory defaults. Also the list of parameters the device exposes.
    pub default_config: HashMap<String, String>,
}

/// QoS trust mode of a network interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustMode {
    Pcp,
    Dscp,
}

impl fmt::Display for TrustMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrustMode::Pcp => write!(f, "pcp"),
            TrustMode::Dscp => write!(f, "dscp"),
        }
    }
}

impl FromStr for TrustMode {
    type Err = HostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pcp" => Ok(TrustMode::Pcp),
            "dscp" => Ok(TrustMode::Dscp),
            other => Err(HostError::Parse(format!("unknown trust mode: {}", other))),
        }
    }
}

/// Number of 802.1p priorities
pub const PRIORITY_COUNT: usize = 8;

/// Priority flow control flags, indexed by priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PfcConfig(pub [bool; PRIORITY_COUNT]);

impl PfcConfig {
    /// PFC enabled on the given priorities only
    pub fn with_enabled(priorities: &[usize]) -> Self {
        let mut flags = [false; PRIORITY_COUNT];
        for &priority in priorities {
            if priority < PRIORITY_COUNT {
                flags[priority] = true;
            }
        }
        Self(flags)
    }

    pub fn is_enabled(&self, priority: usize) -> bool {
        self.0.get(priority).copied().unwrap_or(false)
    }
}

/// Formats as the comma separated list `mlnx_qos --pfc` expects
impl fmt::Display for PfcConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags: Vec<&str> = self.0.iter().map(|&on| if on { "1" } else { "0" }).collect();
        write!(f, "{}", flags.join(","))
    }
}

impl FromStr for PfcConfig {
    type Err = HostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != PRIORITY_COUNT {
            return Err(HostError::Parse(format!(
                "PFC map must have {} entries, got {}: {}",
                PRIORITY_COUNT,
                parts.len(),
                s
            )));
        }

        let mut flags = [false; PRIORITY_COUNT];
        for (flag, part) in flags.iter_mut().zip(parts) {
            *flag = match part {
                "0" => false,
                "1" => true,
                other => {
                    return Err(HostError::Parse(format!("invalid PFC flag: {}", other)));
                }
            };
        }
        Ok(Self(flags))
    }
}
