//! Daemon configuration from environment variables.

use crate::error::ControllerError;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_NAMESPACE: &str = "nic-configuration-operator";
const DEFAULT_DISCOVERY_INTERVAL_SECS: u64 = 300;
const DEFAULT_SYSFS_ROOT: &str = "/sys";

/// Runtime configuration of the daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Node this daemon runs on (`NODE_NAME`, required)
    pub node_name: String,
    /// Namespace NicDevices are published in (`WATCH_NAMESPACE`)
    pub namespace: String,
    /// Period of NIC discovery (`DISCOVERY_INTERVAL_SECS`)
    pub discovery_interval: Duration,
    /// Bound for every host call (`HOST_CALL_TIMEOUT_SECS`), engine defaults when unset
    pub host_call_timeout: Option<Duration>,
    /// sysfs mount point (`SYSFS_ROOT`)
    pub sysfs_root: PathBuf,
}

impl Config {
    /// Loads configuration from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which returns the value of a variable if set
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let node_name = lookup("NODE_NAME")
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                ControllerError::InvalidConfig("NODE_NAME environment variable is required".to_string())
            })?;
        let namespace = lookup("WATCH_NAMESPACE")
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        let discovery_interval = match lookup("DISCOVERY_INTERVAL_SECS") {
            Some(value) => parse_seconds("DISCOVERY_INTERVAL_SECS", &value)?,
            None => Duration::from_secs(DEFAULT_DISCOVERY_INTERVAL_SECS),
        };
        let host_call_timeout = lookup("HOST_CALL_TIMEOUT_SECS")
            .map(|value| parse_seconds("HOST_CALL_TIMEOUT_SECS", &value))
            .transpose()?;
        let sysfs_root = PathBuf::from(lookup("SYSFS_ROOT").unwrap_or_else(|| DEFAULT_SYSFS_ROOT.to_string()));

        Ok(Self {
            node_name,
            namespace,
            discovery_interval,
            host_call_timeout,
            sysfs_root,
        })
    }
}

fn parse_seconds(key: &str, value: &str) -> Result<Duration, ControllerError> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ControllerError::InvalidConfig(format!(
            "{} must be a positive number of seconds, got '{}'",
            key, value
        ))),
    }
}
