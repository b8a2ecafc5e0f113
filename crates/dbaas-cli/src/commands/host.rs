//! `dbaas host start|stop` - VM lifecycle through the host provider.

use super::Context;
use anyhow::anyhow;
use dbaas_core::PlanId;
use dbaas_workflow::{
    HostAction, InMemoryCredentials, Pipeline, Provider, ReqwestTransport, RetryPolicy,
    StartVm, StopVm, TracingAuditSink, ValidatePlan,
};
use std::sync::Arc;

pub async fn start(
    ctx: &Context,
    instance: &str,
    env: &str,
    plan: Option<PlanId>,
) -> anyhow::Result<()> {
    let pipeline = build(ctx, HostAction::Start, instance, env, plan).await?;
    run(pipeline, instance).await
}

pub async fn stop(ctx: &Context, instance: &str, env: &str) -> anyhow::Result<()> {
    let pipeline = build(ctx, HostAction::Stop, instance, env, None).await?;
    run(pipeline, instance).await
}

async fn run(pipeline: Pipeline, instance: &str) -> anyhow::Result<()> {
    let report = pipeline.run().await?;
    println!("✔ Job {} finished for instance {}", report.job_id, instance);
    for step in &report.completed {
        println!("  - {}", step);
    }
    Ok(())
}

async fn build(
    ctx: &Context,
    action: HostAction,
    instance: &str,
    env: &str,
    plan: Option<PlanId>,
) -> anyhow::Result<Pipeline> {
    let instance = ctx
        .inventory
        .instance(instance)
        .ok_or_else(|| anyhow!("unknown instance '{}'", instance))?
        .clone();
    let environment = ctx
        .inventory
        .environment(env)
        .ok_or_else(|| anyhow!("unknown environment '{}'", env))?
        .clone();

    let provider = Provider::new(
        instance,
        environment,
        Arc::new(InMemoryCredentials::new(ctx.inventory.credentials.clone())),
        Arc::new(ReqwestTransport::new(&ctx.config.host_provider)?),
    );
    let host_id = provider.host()?.identifier.clone();
    let provider = Arc::new(provider);

    let mut pipeline = Pipeline::new(format!("host_{}", action))
        .with_retry(RetryPolicy::from_config(&ctx.config.workflow.retry))
        .with_audit(Arc::new(TracingAuditSink))
        .serialized_on(ctx.locks.clone(), host_id);

    if let Some(plan_id) = plan {
        let plan = ctx
            .plans()
            .get(plan_id)
            .await?
            .ok_or_else(|| anyhow!("unknown plan {}", plan_id))?;
        pipeline = pipeline.step(ValidatePlan::new(plan, ctx.validator()));
    }

    pipeline = match action {
        HostAction::Start => pipeline.step(StartVm::new(provider)),
        HostAction::Stop => pipeline.step(StopVm::new(provider)),
    };
    Ok(pipeline)
}
