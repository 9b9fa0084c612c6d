//! Host access backed by sysfs and the Mellanox firmware tools.
//!
//! - PCI enumeration, VF detection, interface names and link speed come from
//!   `<sysfs>/bus/pci/devices/<addr>/`.
//! - VPD, firmware identity and NV configuration go through `mstvpd`,
//!   `mstflint` and `mstconfig`; live firmware reset through `mstfwreset`.
//! - Max read request size is read and written with `setpci`, trust and PFC
//!   with `mlnx_qos`.

use crate::command::run;
use crate::error::HostError;
use crate::host_trait::HostUtils;
use crate::models::{NvConfigQuery, PciDevice, PfcConfig, TrustMode};
use crate::parse;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// PCIe Device Control register, relative to the Express capability
const DEVICE_CONTROL_REGISTER: &str = "CAP_EXP+08.w";
/// Bits 14:12 of Device Control hold the max read request size
const MAX_READ_REQUEST_MASK: u16 = 0x7000;

/// Production `HostUtils` implementation
#[derive(Debug, Clone)]
pub struct SystemHostUtils {
    sysfs_root: PathBuf,
}

impl Default for SystemHostUtils {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemHostUtils {
    /// Uses the host's `/sys`
    pub fn new() -> Self {
        Self::with_sysfs_root("/sys")
    }

    /// Uses an alternative sysfs mount, e.g. the host's `/sys` bind-mounted into a container
    pub fn with_sysfs_root(root: impl Into<PathBuf>) -> Self {
        Self {
            sysfs_root: root.into(),
        }
    }

    fn pci_devices_dir(&self) -> PathBuf {
        self.sysfs_root.join("bus/pci/devices")
    }

    fn pci_device_dir(&self, pci_addr: &str) -> PathBuf {
        self.pci_devices_dir().join(pci_addr)
    }

    async fn read_attribute(&self, pci_addr: &str, attribute: &str) -> Result<String, HostError> {
        let path = self.pci_device_dir(pci_addr).join(attribute);
        Ok(tokio::fs::read_to_string(&path).await?)
    }

    async fn read_pci_device(&self, pci_addr: &str) -> Result<PciDevice, HostError> {
        let vendor_id = parse::strip_hex_prefix(&self.read_attribute(pci_addr, "vendor").await?);
        let product_id = parse::strip_hex_prefix(&self.read_attribute(pci_addr, "device").await?);
        // Class is kept raw here; callers decide how to treat unparseable values
        let class_raw = self.read_attribute(pci_addr, "class").await?;
        let class_id = parse::parse_class_id(&class_raw)
            .unwrap_or_else(|_| parse::strip_hex_prefix(&class_raw));

        Ok(PciDevice {
            address: pci_addr.to_string(),
            product_name: lookup_product_name(&vendor_id, &product_id),
            vendor_id,
            class_id,
            product_id,
        })
    }
}

fn lookup_product_name(vendor_id: &str, product_id: &str) -> Option<String> {
    let vid = u16::from_str_radix(vendor_id, 16).ok()?;
    let pid = u16::from_str_radix(product_id, 16).ok()?;
    pci_ids::Device::from_vid_pid(vid, pid).map(|device| device.name().to_string())
}

/// Returns the first entry name of a sysfs directory, if any
async fn first_dir_entry(dir: &Path) -> Option<String> {
    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    let mut names = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    names.into_iter().next()
}

#[async_trait::async_trait]
impl HostUtils for SystemHostUtils {
    async fn list_pci_devices(&self) -> Result<Vec<PciDevice>, HostError> {
        let mut entries = tokio::fs::read_dir(self.pci_devices_dir()).await?;
        let mut devices = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let address = entry.file_name().to_string_lossy().into_owned();
            match self.read_pci_device(&address).await {
                Ok(device) => devices.push(device),
                Err(e) => warn!("Failed to read PCI device {}, skipping: {}", address, e),
            }
        }

        devices.sort_by(|a, b| a.address.cmp(&b.address));
        debug!("Found {} PCI devices", devices.len());
        Ok(devices)
    }

    async fn is_virtual_function(&self, pci_addr: &str) -> bool {
        tokio::fs::try_exists(self.pci_device_dir(pci_addr).join("physfn"))
            .await
            .unwrap_or(false)
    }

    async fn get_part_and_serial_number(&self, pci_addr: &str) -> Result<(String, String), HostError> {
        let output = run("mstvpd", &[pci_addr]).await?;
        parse::parse_vpd(&output)
    }

    async fn get_firmware_version_and_psid(&self, pci_addr: &str) -> Result<(String, String), HostError> {
        let output = run("mstflint", &["-d", pci_addr, "q"]).await?;
        parse::parse_flint_query(&output)
    }

    async fn get_interface_name(&self, pci_addr: &str) -> Option<String> {
        first_dir_entry(&self.pci_device_dir(pci_addr).join("net")).await
    }

    async fn get_rdma_interface_name(&self, pci_addr: &str) -> Option<String> {
        first_dir_entry(&self.pci_device_dir(pci_addr).join("infiniband")).await
    }

    async fn get_pci_link_speed(&self, pci_addr: &str) -> Result<u32, HostError> {
        let raw = self.read_attribute(pci_addr, "max_link_speed").await?;
        parse::parse_link_speed(&raw)
    }

    async fn query_nv_config(&self, pci_addr: &str) -> Result<NvConfigQuery, HostError> {
        let output = run("mstconfig", &["-d", pci_addr, "-e", "query"]).await?;
        parse::parse_nv_config_query(&output)
    }

    async fn set_nv_config_parameter(&self, pci_addr: &str, name: &str, value: &str) -> Result<(), HostError> {
        info!("Setting NV parameter {}={} on {}", name, value, pci_addr);
        let assignment = format!("{}={}", name, value);
        run("mstconfig", &["-d", pci_addr, "--yes", "set", &assignment]).await?;
        Ok(())
    }

    async fn reset_nv_config(&self, pci_addr: &str) -> Result<(), HostError> {
        info!("Resetting NV configuration of {} to defaults", pci_addr);
        run("mstconfig", &["-d", pci_addr, "--yes", "reset"]).await?;
        Ok(())
    }

    async fn reset_firmware(&self, pci_addr: &str) -> Result<(), HostError> {
        info!("Resetting firmware of {}", pci_addr);
        run("mstfwreset", &["-d", pci_addr, "--yes", "reset"]).await?;
        Ok(())
    }

    async fn get_max_read_request_size(&self, pci_addr: &str) -> Result<u32, HostError> {
        let output = run("setpci", &["-s", pci_addr, DEVICE_CONTROL_REGISTER]).await?;
        parse::parse_max_read_request(&output)
    }

    async fn set_max_read_request_size(&self, pci_addr: &str, size: u32) -> Result<(), HostError> {
        let encoded = parse::encode_max_read_request(size)?;
        info!("Setting max read request size {} on {}", size, pci_addr);
        let assignment = format!(
            "{}={:04x}:{:04x}",
            DEVICE_CONTROL_REGISTER, encoded, MAX_READ_REQUEST_MASK
        );
        run("setpci", &["-s", pci_addr, &assignment]).await?;
        Ok(())
    }

    async fn get_trust_and_pfc(&self, interface: &str) -> Result<(TrustMode, PfcConfig), HostError> {
        let output = run("mlnx_qos", &["-i", interface]).await?;
        parse::parse_mlnx_qos(&output)
    }

    async fn set_trust_and_pfc(&self, interface: &str, trust: TrustMode, pfc: PfcConfig) -> Result<(), HostError> {
        info!("Setting trust {} and PFC {} on {}", trust, pfc, interface);
        let trust = trust.to_string();
        let pfc = pfc.to_string();
        run("mlnx_qos", &["-i", interface, "--trust", &trust, "--pfc", &pfc]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_pci_device(root: &TempDir, addr: &str, vendor: &str, class: &str, device: &str) -> PathBuf {
        let dir = root.path().join("bus/pci/devices").join(addr);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("vendor"), format!("{}\n", vendor)).unwrap();
        fs::write(dir.join("class"), format!("{}\n", class)).unwrap();
        fs::write(dir.join("device"), format!("{}\n", device)).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_list_pci_devices() {
        let root = TempDir::new().unwrap();
        create_pci_device(&root, "0000:3b:00.1", "0x15b3", "0x020000", "0x101d");
        create_pci_device(&root, "0000:3b:00.0", "0x15b3", "0x020000", "0x101d");
        create_pci_device(&root, "0000:00:1f.0", "0x8086", "0x060100", "0xa1c1");
        let host = SystemHostUtils::with_sysfs_root(root.path());

        let devices = host.list_pci_devices().await.unwrap();

        assert_eq!(devices.len(), 3);
        assert_eq!(devices[0].address, "0000:00:1f.0");
        assert_eq!(devices[1].address, "0000:3b:00.0");
        assert_eq!(devices[1].vendor_id, "15b3");
        assert_eq!(devices[1].class_id, "02");
        assert_eq!(devices[1].product_id, "101d");
        assert_eq!(devices[0].class_id, "06");
    }

    #[tokio::test]
    async fn test_list_pci_devices_skips_incomplete_entries() {
        let root = TempDir::new().unwrap();
        create_pci_device(&root, "0000:3b:00.0", "0x15b3", "0x020000", "0x101d");
        fs::create_dir_all(root.path().join("bus/pci/devices/0000:af:00.0")).unwrap();
        let host = SystemHostUtils::with_sysfs_root(root.path());

        let devices = host.list_pci_devices().await.unwrap();
        assert_eq!(devices.len(), 1);
    }

    #[tokio::test]
    async fn test_virtual_function_and_interface_names() {
        let root = TempDir::new().unwrap();
        let pf = create_pci_device(&root, "0000:3b:00.0", "0x15b3", "0x020000", "0x101d");
        fs::create_dir_all(pf.join("net/enp59s0f0np0")).unwrap();
        fs::create_dir_all(pf.join("infiniband/mlx5_0")).unwrap();
        fs::write(pf.join("max_link_speed"), "16.0 GT/s PCIe\n").unwrap();
        let vf = create_pci_device(&root, "0000:3b:00.2", "0x15b3", "0x020000", "0x101e");
        fs::create_dir_all(vf.join("physfn")).unwrap();
        let host = SystemHostUtils::with_sysfs_root(root.path());

        assert!(!host.is_virtual_function("0000:3b:00.0").await);
        assert!(host.is_virtual_function("0000:3b:00.2").await);
        assert_eq!(host.get_interface_name("0000:3b:00.0").await.as_deref(), Some("enp59s0f0np0"));
        assert_eq!(host.get_rdma_interface_name("0000:3b:00.0").await.as_deref(), Some("mlx5_0"));
        assert_eq!(host.get_interface_name("0000:3b:00.2").await, None);
        assert_eq!(host.get_pci_link_speed("0000:3b:00.0").await.unwrap(), 16);
        assert!(host.get_pci_link_speed("0000:3b:00.2").await.is_err());
    }
}
