//! Tests for loading `dbaas.yaml`.

use dbaas_core::DbaasConfig;
use std::io::Write;

/// An empty file yields the documented defaults.
#[test]
fn test_empty_config_uses_defaults() {
    let config = DbaasConfig::from_yaml("").unwrap();
    assert_eq!(config.plans.ha_min_number_of_bundles, 3);
    assert_eq!(config.workflow.retry.max_attempts, 1);
    assert_eq!(config.host_provider.timeout_secs, 60);
    assert!(config.integrations.cloudstack);
    assert_eq!(config.dashboard.listen_addr(), "127.0.0.1:8080");
    assert_eq!(config.observability.log_level, "info");
}

/// Sections present in the file override defaults; the rest keep them.
#[test]
fn test_partial_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "plans:\n  ha_min_number_of_bundles: 1\nworkflow:\n  retry:\n    max_attempts: 4\n    backoff_ms: 10\nintegrations:\n  cloudstack: false\n"
    )
    .unwrap();

    let config = DbaasConfig::from_file(file.path()).unwrap();
    assert_eq!(config.plans.ha_min_number_of_bundles, 1);
    assert_eq!(config.workflow.retry.max_attempts, 4);
    assert_eq!(config.workflow.retry.backoff_ms, 10);
    assert_eq!(config.workflow.retry.backoff_factor, 2);
    assert!(!config.integrations.cloudstack);
}

#[test]
fn test_zero_attempts_rejected() {
    let err = DbaasConfig::from_yaml("workflow:\n  retry:\n    max_attempts: 0\n").unwrap_err();
    assert!(err.to_string().contains("max_attempts"));
}

#[test]
fn test_missing_file_is_io_error() {
    let err = DbaasConfig::from_file("/nonexistent/dbaas.yaml").unwrap_err();
    assert!(matches!(err, dbaas_core::ConfigError::Io(_)));
}

#[test]
fn test_load_or_default_without_path() {
    let config = DbaasConfig::load_or_default(None).unwrap();
    assert_eq!(config.plans.ha_min_number_of_bundles, 3);
}

/// The sample files shipped under `demos/` stay loadable.
#[test]
fn test_demo_files_parse() {
    let manifest = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    let demos = manifest.join("../../demos");

    let config = DbaasConfig::from_file(demos.join("dbaas.yaml")).unwrap();
    assert_eq!(config.workflow.retry.max_attempts, 3);

    let inventory = dbaas_core::Inventory::from_file(demos.join("inventory.yaml")).unwrap();
    assert_eq!(inventory.plans.len(), 3);
    assert!(inventory.instance("cache-redis-01").unwrap().hostname.is_none());
}
