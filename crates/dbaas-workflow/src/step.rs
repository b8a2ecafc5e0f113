//! Workflow steps.
//!
//! A step is one unit of a provisioning pipeline: `execute` moves the
//! infrastructure forward, `undo` reverts it when a later step fails.
//! Steps do not retry; the pipeline owns retry and rollback.

use crate::host_provider::Provider;
use async_trait::async_trait;
use dbaas_core::Plan;
use dbaas_physical::PlanValidator;
use std::sync::Arc;

#[async_trait]
pub trait Step: Send + Sync {
    /// Human-readable name for logs and audit events.
    fn name(&self) -> &str;

    async fn execute(&self) -> anyhow::Result<()>;

    /// Revert the effects of `execute`. Read-only steps keep the default no-op.
    async fn undo(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Start the instance's VM; undo stops it.
pub struct StartVm {
    provider: Arc<Provider>,
}

impl StartVm {
    pub fn new(provider: Arc<Provider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Step for StartVm {
    fn name(&self) -> &str {
        "start_vm"
    }

    async fn execute(&self) -> anyhow::Result<()> {
        self.provider.start().await?;
        Ok(())
    }

    async fn undo(&self) -> anyhow::Result<()> {
        self.provider.stop().await?;
        Ok(())
    }
}

/// Stop the instance's VM; undo starts it again.
pub struct StopVm {
    provider: Arc<Provider>,
}

impl StopVm {
    pub fn new(provider: Arc<Provider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Step for StopVm {
    fn name(&self) -> &str {
        "stop_vm"
    }

    async fn execute(&self) -> anyhow::Result<()> {
        self.provider.stop().await?;
        Ok(())
    }

    async fn undo(&self) -> anyhow::Result<()> {
        self.provider.start().await?;
        Ok(())
    }
}

/// Check the plan against deployment thresholds before touching hosts.
pub struct ValidatePlan {
    plan: Plan,
    validator: PlanValidator,
}

impl ValidatePlan {
    pub fn new(plan: Plan, validator: PlanValidator) -> Self {
        Self { plan, validator }
    }
}

#[async_trait]
impl Step for ValidatePlan {
    fn name(&self) -> &str {
        "validate_plan"
    }

    async fn execute(&self) -> anyhow::Result<()> {
        self.validator.validate(&self.plan)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HostProviderError;
    use crate::host_provider::tests::{RecordingTransport, provider};
    use dbaas_core::{Bundle, Provider as InfraProvider};
    use dbaas_physical::PhysicalError;

    #[tokio::test]
    async fn test_start_vm_undo_stops_host() {
        let transport = Arc::new(RecordingTransport::default());
        let step = StartVm::new(Arc::new(provider(transport.clone())));

        step.execute().await.unwrap();
        step.undo().await.unwrap();

        assert_eq!(
            transport.urls(),
            vec![
                "fake_endpoint/fake_project/fake_env/host/start",
                "fake_endpoint/fake_project/fake_env/host/stop"
            ]
        );
    }

    #[tokio::test]
    async fn test_start_vm_error_keeps_its_type() {
        let transport = Arc::new(RecordingTransport::answering([404]));
        let step = StartVm::new(Arc::new(provider(transport)));

        let err = step.execute().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HostProviderError>(),
            Some(HostProviderError::StartVm { .. })
        ));
    }

    #[tokio::test]
    async fn test_validate_plan_step() {
        let mut plan = Plan::new(1, "ha", 1);
        plan.is_ha = true;
        plan.provider = InfraProvider::Cloudstack;
        plan.bundles = vec![Bundle::new("a"), Bundle::new("b")];

        assert!(
            ValidatePlan::new(plan.clone(), PlanValidator::new(1))
                .execute()
                .await
                .is_ok()
        );

        let err = ValidatePlan::new(plan, PlanValidator::new(3))
            .execute()
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PhysicalError>(),
            Some(PhysicalError::EnvironmentConfiguration { .. })
        ));
    }
}
