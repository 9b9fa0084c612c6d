//! Test utilities for unit testing the engine
//!
//! This module provides helpers for creating NicDevices and mock hosts that
//! model a ConnectX card with one or two ports.

use crate::manager::NicHostManager;
use crds::*;
use host_utils::{MockHostUtils, PciDevice, PfcConfig, TrustMode};
use std::sync::Arc;

pub const TEST_NODE: &str = "worker-1";
pub const TEST_SERIAL: &str = "mt2232t13210";
pub const TEST_PART_NUMBER: &str = "MCX623106AN-CDAT";
pub const TEST_FIRMWARE: &str = "22.35.1012";
pub const TEST_PSID: &str = "MT_0000000359";
pub const TEST_PRODUCT_ID: &str = "101d";

pub const PORT0_PCI: &str = "0000:3b:00.0";
pub const PORT1_PCI: &str = "0000:3b:00.1";
pub const PORT0_INTERFACE: &str = "enp59s0f0np0";
pub const PORT1_INTERFACE: &str = "enp59s0f1np1";

/// Helper to create a Mellanox network PCI function
pub fn create_test_pci_device(address: &str) -> PciDevice {
    PciDevice {
        address: address.to_string(),
        vendor_id: "15b3".to_string(),
        class_id: "02".to_string(),
        product_id: TEST_PRODUCT_ID.to_string(),
        product_name: Some("MT2892 Family [ConnectX-6 Dx]".to_string()),
    }
}

/// Helper to create a discovered NicDevice with the given template
pub fn create_test_device(template: ConfigurationTemplateSpec, dual_port: bool) -> NicDevice {
    create_device_with_configuration(
        NicDeviceConfigurationSpec {
            reset_to_default: false,
            template,
        },
        dual_port,
    )
}

/// Helper to create a discovered NicDevice that asks for a reset to defaults
pub fn create_reset_device(dual_port: bool) -> NicDevice {
    create_device_with_configuration(
        NicDeviceConfigurationSpec {
            reset_to_default: true,
            template: ConfigurationTemplateSpec::default(),
        },
        dual_port,
    )
}

fn create_device_with_configuration(configuration: NicDeviceConfigurationSpec, dual_port: bool) -> NicDevice {
    let mut ports = vec![NicDevicePortSpec {
        pci: PORT0_PCI.to_string(),
        network_interface: PORT0_INTERFACE.to_string(),
        rdma_interface: "mlx5_0".to_string(),
    }];
    if dual_port {
        ports.push(NicDevicePortSpec {
            pci: PORT1_PCI.to_string(),
            network_interface: PORT1_INTERFACE.to_string(),
            rdma_interface: "mlx5_1".to_string(),
        });
    }

    let mut device = NicDevice::new(
        TEST_SERIAL,
        NicDeviceSpec {
            configuration: Some(configuration),
        },
    );
    device.metadata.namespace = Some("nic-configuration".to_string());
    device.status = Some(NicDeviceStatus {
        node: TEST_NODE.to_string(),
        device_type: TEST_PRODUCT_ID.to_string(),
        serial_number: TEST_SERIAL.to_string(),
        part_number: TEST_PART_NUMBER.to_string(),
        psid: TEST_PSID.to_string(),
        firmware_version: TEST_FIRMWARE.to_string(),
        ports,
        ..Default::default()
    });
    device
}

/// Helper to create a template with SR-IOV enabled
pub fn create_sriov_template(num_vfs: u32) -> ConfigurationTemplateSpec {
    ConfigurationTemplateSpec {
        num_vfs,
        link_type: Some(LinkType::Ethernet),
        ..Default::default()
    }
}

/// Helper to create a mock host with a ConnectX card in factory state and the
/// advanced PCI settings gate enabled
///
/// `MAX_ACC_OUT_READ` and `ATS_ENABLED` are advanced parameters.
pub fn create_test_host(dual_port: bool) -> MockHostUtils {
    let host = MockHostUtils::new();

    let ports: &[(&str, &str, &str)] = if dual_port {
        &[(PORT0_PCI, PORT0_INTERFACE, "mlx5_0"), (PORT1_PCI, PORT1_INTERFACE, "mlx5_1")]
    } else {
        &[(PORT0_PCI, PORT0_INTERFACE, "mlx5_0")]
    };
    for (pci, interface, rdma) in ports {
        host.add_pci_device(create_test_pci_device(pci), TEST_PART_NUMBER, TEST_SERIAL, TEST_FIRMWARE, TEST_PSID);
        host.set_interfaces(pci, interface, rdma);
        host.set_link_speed(pci, 16);
        host.set_max_read_request(pci, 512);
        host.set_qos(interface, TrustMode::Pcp, PfcConfig::default());
    }

    host.set_nv_parameter(PORT0_PCI, "ADVANCED_PCI_SETTINGS", "0", "1", "1");
    host.set_nv_parameter(PORT0_PCI, "SRIOV_EN", "0", "0", "0");
    host.set_nv_parameter(PORT0_PCI, "NUM_OF_VFS", "0", "0", "0");
    host.set_nv_parameter(PORT0_PCI, "LINK_TYPE_P1", "2", "2", "2");
    host.set_nv_parameter(PORT0_PCI, "ROCE_CC_PRIO_MASK_P1", "0", "0", "0");
    host.set_nv_parameter(PORT0_PCI, "CNP_DSCP_P1", "0", "0", "0");
    host.set_nv_parameter(PORT0_PCI, "CNP_802P_PRIO_P1", "0", "0", "0");
    if dual_port {
        host.set_nv_parameter(PORT0_PCI, "LINK_TYPE_P2", "2", "2", "2");
        host.set_nv_parameter(PORT0_PCI, "ROCE_CC_PRIO_MASK_P2", "0", "0", "0");
        host.set_nv_parameter(PORT0_PCI, "CNP_DSCP_P2", "0", "0", "0");
        host.set_nv_parameter(PORT0_PCI, "CNP_802P_PRIO_P2", "0", "0", "0");
    }
    host.set_advanced_nv_parameter(PORT0_PCI, "MAX_ACC_OUT_READ", "0", "0", "0");
    host.set_advanced_nv_parameter(PORT0_PCI, "ATS_ENABLED", "1", "1", "1");

    host
}

/// Helper to create a mock host whose advanced PCI settings gate is still off
pub fn create_test_host_without_advanced_settings(dual_port: bool) -> MockHostUtils {
    let host = create_test_host(dual_port);
    host.set_nv_parameter(PORT0_PCI, "ADVANCED_PCI_SETTINGS", "0", "0", "0");
    host
}

/// Helper to create an engine on top of a mock host
pub fn create_test_manager(host: &MockHostUtils) -> NicHostManager {
    NicHostManager::new(TEST_NODE, Arc::new(host.clone()))
}
