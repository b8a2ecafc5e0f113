//! `dbaas admin plans` - plan changelist as JSON.

use super::Context;
use dbaas_admin::{PlanAdmin, PlanQuery};

pub async fn plans(ctx: &Context, search: Option<String>) -> anyhow::Result<()> {
    let admin = PlanAdmin::new(ctx.inventory.clone(), ctx.plans());
    let query = PlanQuery {
        search,
        ..PlanQuery::default()
    };

    let rows = admin.changelist(&query).await?;
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}
