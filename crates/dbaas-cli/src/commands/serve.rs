//! `dbaas serve` - admin JSON dashboard.

use super::Context;
use dbaas_admin::{AppState, DashboardServer, PlanAdmin};

pub async fn run(ctx: &Context) -> anyhow::Result<()> {
    if !ctx.config.dashboard.enabled {
        anyhow::bail!("dashboard is disabled (dashboard.enabled = false)");
    }

    let admin = PlanAdmin::new(ctx.inventory.clone(), ctx.plans());
    let server = DashboardServer::new(ctx.config.dashboard.clone(), AppState::new(admin));
    println!("Admin dashboard on http://{}", server.listen_addr());

    server.run().await?;
    Ok(())
}
