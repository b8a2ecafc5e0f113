use clap::{Parser, Subcommand};
use dbaas_core::{DbaasConfig, EngineId, PlanId};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::Context;

#[derive(Parser, Debug)]
#[command(name = "dbaas", version, about = "DBaaS host provisioning control plane")]
struct Cli {
    /// Path to dbaas.yaml. Defaults apply when omitted.
    #[arg(long, global = true, env = "DBAAS_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the inventory file (engines, environments, credentials, instances, plans).
    #[arg(long, global = true, env = "DBAAS_INVENTORY", default_value = "inventory.yaml")]
    inventory: PathBuf,

    /// Store plans in Postgres instead of the inventory file.
    #[arg(long, global = true, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start or stop the VM behind an instance.
    Host {
        #[command(subcommand)]
        cmd: HostCommand,
    },

    /// Plan operations (default plan, deployment checks).
    Plan {
        #[command(subcommand)]
        cmd: PlanCommand,
    },

    /// Admin listings.
    Admin {
        #[command(subcommand)]
        cmd: AdminCommand,
    },

    /// Serve the admin JSON dashboard.
    Serve,
}

#[derive(Subcommand, Debug)]
enum HostCommand {
    /// Start the instance's VM through the host provider.
    Start {
        #[arg(long)]
        instance: String,
        #[arg(long)]
        env: String,
        /// Check this plan's deployment rules before starting.
        #[arg(long)]
        plan: Option<PlanId>,
    },

    /// Stop the instance's VM through the host provider.
    Stop {
        #[arg(long)]
        instance: String,
        #[arg(long)]
        env: String,
    },
}

#[derive(Subcommand, Debug)]
enum PlanCommand {
    /// Make a plan the default of its engine, demoting the previous default.
    SetDefault {
        #[arg(long)]
        engine: EngineId,
        #[arg(long)]
        plan: PlanId,
    },

    /// Check a plan against the deployment rules (HA bundle minimum).
    Validate {
        #[arg(long)]
        plan: PlanId,
    },
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    /// Print the plan changelist as JSON.
    Plans {
        /// Case-insensitive match on plan names.
        #[arg(long)]
        search: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = DbaasConfig::load_or_default(cli.config.as_deref())?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let ctx = Context::load(config, &cli.inventory, cli.database_url.as_deref()).await?;

    match cli.cmd {
        Command::Host { cmd } => match cmd {
            HostCommand::Start {
                instance,
                env,
                plan,
            } => commands::host::start(&ctx, &instance, &env, plan).await?,
            HostCommand::Stop { instance, env } => {
                commands::host::stop(&ctx, &instance, &env).await?
            }
        },

        Command::Plan { cmd } => match cmd {
            PlanCommand::SetDefault { engine, plan } => {
                commands::plan::set_default(&ctx, engine, plan).await?
            }
            PlanCommand::Validate { plan } => commands::plan::validate(&ctx, plan).await?,
        },

        Command::Admin { cmd } => match cmd {
            AdminCommand::Plans { search } => commands::admin::plans(&ctx, search).await?,
        },

        Command::Serve => commands::serve::run(&ctx).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_host_start() {
        let cli = Cli::try_parse_from([
            "dbaas", "host", "start", "--instance", "db1", "--env", "dev", "--plan", "3",
        ])
        .unwrap();

        match cli.cmd {
            Command::Host {
                cmd:
                    HostCommand::Start {
                        instance,
                        env,
                        plan,
                    },
            } => {
                assert_eq!(instance, "db1");
                assert_eq!(env, "dev");
                assert_eq!(plan, Some(3));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "dbaas",
            "plan",
            "set-default",
            "--engine",
            "1",
            "--plan",
            "2",
            "--inventory",
            "/tmp/inv.yaml",
        ])
        .unwrap();

        assert_eq!(cli.inventory, PathBuf::from("/tmp/inv.yaml"));
        assert!(matches!(
            cli.cmd,
            Command::Plan {
                cmd: PlanCommand::SetDefault { engine: 1, plan: 2 }
            }
        ));
    }
}
