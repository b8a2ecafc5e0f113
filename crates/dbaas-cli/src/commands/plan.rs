//! `dbaas plan` - default plan and deployment checks.

use super::Context;
use anyhow::anyhow;
use dbaas_core::{EngineId, PlanId};

/// Promote `plan_id` to the default of `engine_id` and persist the change.
pub async fn set_default(ctx: &Context, engine_id: EngineId, plan_id: PlanId) -> anyhow::Result<()> {
    let plan = ctx.plans().set_default(engine_id, plan_id).await?;
    ctx.persist_plans().await?;

    println!(
        "✔ Plan {} ({}) is now the default for engine {}",
        plan.id, plan.name, engine_id
    );
    Ok(())
}

pub async fn validate(ctx: &Context, plan_id: PlanId) -> anyhow::Result<()> {
    let plan = ctx
        .plans()
        .get(plan_id)
        .await?
        .ok_or_else(|| anyhow!("unknown plan {}", plan_id))?;

    ctx.validator().validate(&plan)?;

    println!("✔ Plan {} ({}) is valid.", plan.id, plan.name);
    println!("  - provider: {}", plan.provider);
    println!("  - HA: {}", plan.is_ha);
    println!("  - active bundles: {}", plan.active_bundle_count());
    Ok(())
}
