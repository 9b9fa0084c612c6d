//! Unit tests for the configuration calculator

#[cfg(test)]
mod tests {
    use crate::config_validation::ConfigValidation;
    use crate::test_utils::*;
    use crate::{HostManagerError, NvSpecValidation};
    use crds::*;
    use host_utils::{HostUtils, MockHostUtils, NvConfigQuery, PfcConfig, TrustMode};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn validation(host: &MockHostUtils) -> ConfigValidation {
        ConfigValidation::new(Arc::new(host.clone()))
    }

    async fn defaults(host: &MockHostUtils) -> HashMap<String, String> {
        host.query_nv_config(PORT0_PCI).await.unwrap().default_config
    }

    fn pci_performance(max_acc_out_read: u32, max_read_request: u32) -> Option<PciPerformanceOptimizedSpec> {
        Some(PciPerformanceOptimizedSpec {
            enabled: true,
            max_acc_out_read,
            max_read_request,
        })
    }

    fn config(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test]
    async fn test_build_sriov_and_link_type_dual_port() {
        let host = create_test_host(true);
        let device = create_test_device(create_sriov_template(8), true);

        let desired = validation(&host)
            .build_desired_nv_config(&device, &defaults(&host).await)
            .await
            .unwrap();

        assert_eq!(desired["SRIOV_EN"], "1");
        assert_eq!(desired["NUM_OF_VFS"], "8");
        assert_eq!(desired["LINK_TYPE_P1"], "2");
        assert_eq!(desired["LINK_TYPE_P2"], "2");
        // RoCE disabled pins congestion control to defaults
        assert_eq!(desired["ROCE_CC_PRIO_MASK_P1"], "0");
        assert_eq!(desired["CNP_DSCP_P2"], "0");
        assert!(!desired.contains_key("MAX_ACC_OUT_READ"));
        assert!(!desired.contains_key("ATS_ENABLED"));
    }

    #[tokio::test]
    async fn test_build_without_vfs_disables_sriov() {
        let host = create_test_host(false);
        let device = create_test_device(
            ConfigurationTemplateSpec {
                link_type: Some(LinkType::Infiniband),
                ..Default::default()
            },
            false,
        );

        let desired = validation(&host)
            .build_desired_nv_config(&device, &defaults(&host).await)
            .await
            .unwrap();

        assert_eq!(desired["SRIOV_EN"], "0");
        assert_eq!(desired["NUM_OF_VFS"], "0");
        assert_eq!(desired["LINK_TYPE_P1"], "1");
        assert!(!desired.contains_key("LINK_TYPE_P2"));
    }

    #[tokio::test]
    async fn test_build_max_acc_out_read_follows_link_speed() {
        let host = create_test_host(false);
        let device = create_test_device(
            ConfigurationTemplateSpec {
                pci_performance_optimized: pci_performance(0, 0),
                ..Default::default()
            },
            false,
        );
        let default_config = defaults(&host).await;

        let desired = validation(&host).build_desired_nv_config(&device, &default_config).await.unwrap();
        assert_eq!(desired["MAX_ACC_OUT_READ"], "44");

        host.set_link_speed(PORT0_PCI, 32);
        let desired = validation(&host).build_desired_nv_config(&device, &default_config).await.unwrap();
        assert_eq!(desired["MAX_ACC_OUT_READ"], "0");

        host.set_link_speed(PORT0_PCI, 8);
        let desired = validation(&host).build_desired_nv_config(&device, &default_config).await.unwrap();
        assert!(!desired.contains_key("MAX_ACC_OUT_READ"));
    }

    #[tokio::test]
    async fn test_build_explicit_max_acc_out_read() {
        let host = create_test_host(false);
        host.set_link_speed(PORT0_PCI, 32);
        let device = create_test_device(
            ConfigurationTemplateSpec {
                pci_performance_optimized: pci_performance(128, 0),
                ..Default::default()
            },
            false,
        );

        let desired = validation(&host)
            .build_desired_nv_config(&device, &defaults(&host).await)
            .await
            .unwrap();
        assert_eq!(desired["MAX_ACC_OUT_READ"], "128");
    }

    #[tokio::test]
    async fn test_build_roce_optimized() {
        let host = create_test_host(true);
        let device = create_test_device(
            ConfigurationTemplateSpec {
                roce_optimized: Some(RoceOptimizedSpec {
                    enabled: true,
                    qos: None,
                }),
                ..Default::default()
            },
            true,
        );

        let desired = validation(&host)
            .build_desired_nv_config(&device, &defaults(&host).await)
            .await
            .unwrap();

        for suffix in ["P1", "P2"] {
            assert_eq!(desired[&format!("ROCE_CC_PRIO_MASK_{}", suffix)], "255");
            assert_eq!(desired[&format!("CNP_DSCP_{}", suffix)], "4");
            assert_eq!(desired[&format!("CNP_802P_PRIO_{}", suffix)], "6");
        }
    }

    #[tokio::test]
    async fn test_build_gpu_direct() {
        let host = create_test_host(false);
        let mut template = ConfigurationTemplateSpec {
            pci_performance_optimized: pci_performance(44, 0),
            gpu_direct_optimized: Some(GpuDirectOptimizedSpec {
                enabled: true,
                env: "Baremetal".to_string(),
            }),
            ..Default::default()
        };
        let default_config = defaults(&host).await;

        let desired = validation(&host)
            .build_desired_nv_config(&create_test_device(template.clone(), false), &default_config)
            .await
            .unwrap();
        assert_eq!(desired["ATS_ENABLED"], "0");

        template.pci_performance_optimized = None;
        let err = validation(&host)
            .build_desired_nv_config(&create_test_device(template.clone(), false), &default_config)
            .await
            .unwrap_err();
        assert!(err.is_spec_error());

        template.pci_performance_optimized = pci_performance(44, 0);
        template.gpu_direct_optimized = Some(GpuDirectOptimizedSpec {
            enabled: true,
            env: "Kubernetes".to_string(),
        });
        let err = validation(&host)
            .build_desired_nv_config(&create_test_device(template, false), &default_config)
            .await
            .unwrap_err();
        assert!(err.is_spec_error());
    }

    #[tokio::test]
    async fn test_build_raw_nv_config() {
        let host = create_test_host(false);
        let device = create_test_device(
            ConfigurationTemplateSpec {
                raw_nv_config: vec![
                    NvConfigParam {
                        name: "LINK_TYPE_P1".to_string(),
                        value: "1".to_string(),
                    },
                    NvConfigParam {
                        name: "LINK_TYPE_P2".to_string(),
                        value: "1".to_string(),
                    },
                ],
                ..Default::default()
            },
            false,
        );

        let desired = validation(&host)
            .build_desired_nv_config(&device, &defaults(&host).await)
            .await
            .unwrap();

        assert_eq!(desired["LINK_TYPE_P1"], "1");
        // Second port parameters are dropped on single port cards
        assert!(!desired.contains_key("LINK_TYPE_P2"));
    }

    #[tokio::test]
    async fn test_build_rejects_unknown_parameter() {
        let host = create_test_host(false);
        let device = create_test_device(
            ConfigurationTemplateSpec {
                raw_nv_config: vec![NvConfigParam {
                    name: "UNKNOWN_PARAM".to_string(),
                    value: "1".to_string(),
                }],
                ..Default::default()
            },
            false,
        );

        let err = validation(&host)
            .build_desired_nv_config(&device, &defaults(&host).await)
            .await
            .unwrap_err();

        assert!(matches!(err, HostManagerError::IncorrectSpec(ref msg) if msg.contains("UNKNOWN_PARAM")));
    }

    #[test]
    fn test_desired_runtime_config() {
        let host = MockHostUtils::new();
        let validation = validation(&host);

        let desired = validation
            .calculate_desired_runtime_config(&create_test_device(ConfigurationTemplateSpec::default(), false))
            .unwrap();
        assert_eq!(desired.max_read_request_size, 0);
        assert_eq!(desired.trust, TrustMode::Pcp);
        assert_eq!(desired.pfc, PfcConfig::default());

        let desired = validation
            .calculate_desired_runtime_config(&create_test_device(
                ConfigurationTemplateSpec {
                    pci_performance_optimized: pci_performance(0, 0),
                    roce_optimized: Some(RoceOptimizedSpec {
                        enabled: true,
                        qos: None,
                    }),
                    ..Default::default()
                },
                false,
            ))
            .unwrap();
        assert_eq!(desired.max_read_request_size, 4096);
        assert_eq!(desired.trust, TrustMode::Dscp);
        assert_eq!(desired.pfc.to_string(), "0,0,0,1,0,0,0,0");
    }

    #[test]
    fn test_desired_runtime_config_qos_override() {
        let host = MockHostUtils::new();
        let mut template = ConfigurationTemplateSpec {
            pci_performance_optimized: pci_performance(0, 1024),
            roce_optimized: Some(RoceOptimizedSpec {
                enabled: true,
                qos: Some(QosSpec {
                    trust: "pcp".to_string(),
                    pfc: "0,0,0,0,1,0,0,0".to_string(),
                }),
            }),
            ..Default::default()
        };

        let desired = validation(&host)
            .calculate_desired_runtime_config(&create_test_device(template.clone(), false))
            .unwrap();
        assert_eq!(desired.max_read_request_size, 1024);
        assert_eq!(desired.trust, TrustMode::Pcp);
        assert_eq!(desired.pfc, PfcConfig::with_enabled(&[4]));

        template.roce_optimized = Some(RoceOptimizedSpec {
            enabled: true,
            qos: Some(QosSpec {
                trust: "dscp".to_string(),
                pfc: "0,1".to_string(),
            }),
        });
        let err = validation(&host)
            .calculate_desired_runtime_config(&create_test_device(template, false))
            .unwrap_err();
        assert!(err.is_spec_error());
    }

    #[tokio::test]
    async fn test_runtime_config_applied() {
        let host = create_test_host(true);
        let device = create_test_device(
            ConfigurationTemplateSpec {
                pci_performance_optimized: pci_performance(0, 0),
                roce_optimized: Some(RoceOptimizedSpec {
                    enabled: true,
                    qos: None,
                }),
                ..Default::default()
            },
            true,
        );
        let validation = validation(&host);

        assert!(!validation.runtime_config_applied(&device).await.unwrap());

        let roce_pfc = PfcConfig::with_enabled(&[3]);
        host.set_max_read_request(PORT0_PCI, 4096);
        host.set_max_read_request(PORT1_PCI, 4096);
        host.set_qos(PORT0_INTERFACE, TrustMode::Dscp, roce_pfc);
        assert!(!validation.runtime_config_applied(&device).await.unwrap());

        host.set_qos(PORT1_INTERFACE, TrustMode::Dscp, roce_pfc);
        assert!(validation.runtime_config_applied(&device).await.unwrap());
    }

    #[test]
    fn test_advanced_pci_settings_enabled() {
        assert!(ConfigValidation::advanced_pci_settings_enabled(&config(&[("ADVANCED_PCI_SETTINGS", "1")])));
        assert!(!ConfigValidation::advanced_pci_settings_enabled(&config(&[("ADVANCED_PCI_SETTINGS", "0")])));
        assert!(!ConfigValidation::advanced_pci_settings_enabled(&HashMap::new()));
    }

    #[test]
    fn test_validate_reset_to_default() {
        let default_config = config(&[("ADVANCED_PCI_SETTINGS", "0"), ("SRIOV_EN", "0"), ("NUM_OF_VFS", "0")]);
        let modified = config(&[("ADVANCED_PCI_SETTINGS", "1"), ("SRIOV_EN", "1"), ("NUM_OF_VFS", "8")]);
        let factory = config(&[("ADVANCED_PCI_SETTINGS", "1"), ("SRIOV_EN", "0"), ("NUM_OF_VFS", "0")]);

        // Gate differs from its default but is ignored
        let settled = NvConfigQuery {
            current_config: factory.clone(),
            next_boot_config: factory.clone(),
            default_config: default_config.clone(),
        };
        assert_eq!(ConfigValidation::validate_reset_to_default(&settled), NvSpecValidation::new(false, false));

        let staged = NvConfigQuery {
            current_config: modified.clone(),
            next_boot_config: factory,
            default_config: default_config.clone(),
        };
        assert_eq!(ConfigValidation::validate_reset_to_default(&staged), NvSpecValidation::new(false, true));

        let pending = NvConfigQuery {
            current_config: modified.clone(),
            next_boot_config: modified,
            default_config,
        };
        assert_eq!(ConfigValidation::validate_reset_to_default(&pending), NvSpecValidation::new(true, true));
    }
}
