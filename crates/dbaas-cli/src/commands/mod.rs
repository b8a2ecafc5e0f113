//! CLI command implementations.

pub mod admin;
pub mod host;
pub mod plan;
pub mod serve;

use anyhow::Context as _;
use dbaas_core::{DbaasConfig, Inventory};
use dbaas_physical::{InMemoryPlanRepository, PgPlanRepository, PlanRepository, PlanValidator};
use dbaas_workflow::JobLocks;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where plans are read from and written to.
pub enum PlanStore {
    /// The `plans` section of the inventory file.
    Inventory {
        path: PathBuf,
        repository: Arc<InMemoryPlanRepository>,
    },
    Postgres(Arc<PgPlanRepository>),
}

/// Everything a command needs: configuration, inventory, plan storage and
/// the host locks shared by every pipeline the process runs.
pub struct Context {
    pub config: DbaasConfig,
    pub inventory: Arc<Inventory>,
    pub store: PlanStore,
    pub locks: JobLocks,
}

impl Context {
    pub async fn load(
        config: DbaasConfig,
        inventory_path: &Path,
        database_url: Option<&str>,
    ) -> anyhow::Result<Self> {
        let inventory = Inventory::from_file(inventory_path)
            .with_context(|| format!("loading inventory {}", inventory_path.display()))?;

        let store = match database_url {
            Some(url) => {
                let repository = PgPlanRepository::connect(url).await?;
                repository.ensure_schema().await?;
                tracing::info!("Using Postgres plan storage");
                PlanStore::Postgres(Arc::new(repository))
            }
            None => PlanStore::Inventory {
                path: inventory_path.to_path_buf(),
                repository: Arc::new(InMemoryPlanRepository::with_plans(
                    inventory.plans.clone(),
                )?),
            },
        };

        Ok(Self {
            config,
            inventory: Arc::new(inventory),
            store,
            locks: JobLocks::new(),
        })
    }

    pub fn plans(&self) -> Arc<dyn PlanRepository> {
        match &self.store {
            PlanStore::Inventory { repository, .. } => repository.clone(),
            PlanStore::Postgres(repository) => repository.clone(),
        }
    }

    pub fn validator(&self) -> PlanValidator {
        PlanValidator::from_config(&self.config.plans, &self.config.integrations)
    }

    /// Write plan changes back to the inventory file. Postgres writes are
    /// already committed.
    pub async fn persist_plans(&self) -> anyhow::Result<()> {
        let PlanStore::Inventory { path, repository } = &self.store else {
            return Ok(());
        };

        let mut inventory = (*self.inventory).clone();
        inventory.plans = repository.list().await?;
        let content = serde_yaml::to_string(&inventory)?;
        fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;

        tracing::debug!(path = %path.display(), "Inventory updated");
        Ok(())
    }
}
