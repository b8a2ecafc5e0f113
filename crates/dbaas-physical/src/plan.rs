//! Plan validation.

use crate::error::PhysicalError;
use dbaas_core::{IntegrationsConfig, Plan, PlansConfig};

/// Validates plans against deployment-wide thresholds.
///
/// The minimum bundle count is injected at construction, so the check is a
/// pure function of the plan and this validator.
#[derive(Debug, Clone, Copy)]
pub struct PlanValidator {
    /// Minimum active bundles for HA plans on bundle-based providers.
    ha_min_number_of_bundles: u32,
    /// Whether the bundle-based cloud integration is deployed.
    cloudstack_enabled: bool,
}

impl PlanValidator {
    /// Create a validator requiring `ha_min_number_of_bundles` bundles.
    pub fn new(ha_min_number_of_bundles: u32) -> Self {
        Self {
            ha_min_number_of_bundles,
            cloudstack_enabled: true,
        }
    }

    /// Build a validator from configuration sections.
    pub fn from_config(plans: &PlansConfig, integrations: &IntegrationsConfig) -> Self {
        Self::new(plans.ha_min_number_of_bundles).with_cloudstack(integrations.cloudstack)
    }

    /// Toggle the cloud integration. Without it, plans carry no bundle
    /// attributes and the bundle rule does not apply.
    pub fn with_cloudstack(mut self, enabled: bool) -> Self {
        self.cloudstack_enabled = enabled;
        self
    }

    pub fn ha_min_number_of_bundles(&self) -> u32 {
        self.ha_min_number_of_bundles
    }

    /// Check that an HA plan on a bundle-based provider references enough
    /// active bundles.
    ///
    /// Non-HA plans and plans on other providers always pass.
    pub fn validate_min_environment_bundles(&self, plan: &Plan) -> Result<(), PhysicalError> {
        if !plan.is_ha || !plan.provider.is_bundle_based() || !self.cloudstack_enabled {
            return Ok(());
        }

        let found = plan.active_bundle_count();
        if found < self.ha_min_number_of_bundles as usize {
            tracing::warn!(
                plan = %plan.name,
                found,
                required = self.ha_min_number_of_bundles,
                "HA plan has too few bundles"
            );
            return Err(PhysicalError::EnvironmentConfiguration {
                plan: plan.name.clone(),
                provider: plan.provider.to_string(),
                found,
                required: self.ha_min_number_of_bundles,
            });
        }

        Ok(())
    }

    /// Run every plan check.
    pub fn validate(&self, plan: &Plan) -> Result<(), PhysicalError> {
        self.validate_min_environment_bundles(plan)
    }
}
