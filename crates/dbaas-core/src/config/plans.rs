//! Plan validation and integration settings.

use serde::{Deserialize, Serialize};

/// Thresholds used when validating plans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlansConfig {
    /// Minimum number of active bundles an HA plan on a bundle-based cloud
    /// provider must reference.
    #[serde(default = "default_ha_min_number_of_bundles")]
    pub ha_min_number_of_bundles: u32,
}

impl Default for PlansConfig {
    fn default() -> Self {
        Self {
            ha_min_number_of_bundles: default_ha_min_number_of_bundles(),
        }
    }
}

fn default_ha_min_number_of_bundles() -> u32 {
    3
}

/// Optional integrations available in this deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationsConfig {
    /// Cloudstack integration: plans carry bundle attributes only when enabled.
    #[serde(default = "default_true")]
    pub cloudstack: bool,
}

impl Default for IntegrationsConfig {
    fn default() -> Self {
        Self { cloudstack: true }
    }
}

fn default_true() -> bool {
    true
}
