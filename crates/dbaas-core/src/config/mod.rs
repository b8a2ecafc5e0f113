//! Configuration types for the DBaaS control plane.
//!
//! Configuration is loaded from a single YAML file (`dbaas.yaml`). Every
//! section and field has a default, so an empty file is a valid configuration.
//!
//! # Sections
//!
//! - **host_provider**: HTTP client settings for the host provider API
//! - **plans**: plan validation thresholds (`ha_min_number_of_bundles`)
//! - **integrations**: optional integrations enabled for this deployment
//! - **workflow**: retry policy applied by the step pipeline
//! - **dashboard**: admin JSON dashboard listener
//! - **observability**: log level

pub mod dashboard;
pub mod host_provider;
pub mod plans;
pub mod workflow;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use dashboard::DashboardConfig;
pub use host_provider::HostProviderConfig;
pub use plans::{IntegrationsConfig, PlansConfig};
pub use workflow::{RetryConfig, WorkflowConfig};

/// Complete DBaaS configuration loaded from file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DbaasConfig {
    /// Host provider client settings.
    #[serde(default)]
    pub host_provider: HostProviderConfig,

    /// Plan validation settings.
    #[serde(default)]
    pub plans: PlansConfig,

    /// Optional integrations.
    #[serde(default)]
    pub integrations: IntegrationsConfig,

    /// Workflow pipeline settings.
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Dashboard configuration.
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Default `tracing` filter directive, used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbaasConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // serde_yaml maps an empty document to unit, not to an empty mapping
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.workflow.retry.max_attempts == 0 {
            return Err(ConfigError::Config(
                "workflow.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.host_provider.timeout_secs == 0 {
            return Err(ConfigError::Config(
                "host_provider.timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
