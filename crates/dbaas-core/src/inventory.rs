//! Inventory snapshot.
//!
//! The control plane's records (engines, environments, credentials, instances
//! and plans) as loaded from an `inventory.yaml` file. The CLI and dashboard
//! build their repositories from it.

use crate::config::ConfigError;
use crate::credentials::Credential;
use crate::physical::{Engine, EngineId, EngineType, Environment, Instance, Plan, ReplicationTopology};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub engine_types: Vec<EngineType>,

    #[serde(default)]
    pub engines: Vec<Engine>,

    #[serde(default)]
    pub environments: Vec<Environment>,

    #[serde(default)]
    pub credentials: Vec<Credential>,

    #[serde(default)]
    pub instances: Vec<Instance>,

    #[serde(default)]
    pub plans: Vec<Plan>,

    #[serde(default)]
    pub replication_topologies: Vec<ReplicationTopology>,
}

impl Inventory {
    /// Load an inventory from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse an inventory from YAML content and check its references.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let inventory: Self = serde_yaml::from_str(content)?;
        inventory.check_references()?;
        Ok(inventory)
    }

    pub fn engine(&self, id: EngineId) -> Option<&Engine> {
        self.engines.iter().find(|e| e.id == id)
    }

    pub fn engine_type(&self, name: &str) -> Option<&EngineType> {
        self.engine_types.iter().find(|t| t.name == name)
    }

    pub fn environment(&self, name: &str) -> Option<&Environment> {
        self.environments.iter().find(|e| e.name == name)
    }

    pub fn instance(&self, name: &str) -> Option<&Instance> {
        self.instances.iter().find(|i| i.name == name)
    }

    fn check_references(&self) -> Result<(), ConfigError> {
        for engine in &self.engines {
            if self.engine_type(&engine.engine_type).is_none() {
                return Err(ConfigError::Config(format!(
                    "engine {} references unknown engine type '{}'",
                    engine.id, engine.engine_type
                )));
            }
        }

        for plan in &self.plans {
            if self.engine(plan.engine_id).is_none() {
                return Err(ConfigError::Config(format!(
                    "plan '{}' references unknown engine {}",
                    plan.name, plan.engine_id
                )));
            }
            if let Some(env) = plan
                .environments
                .iter()
                .find(|e| self.environment(e).is_none())
            {
                return Err(ConfigError::Config(format!(
                    "plan '{}' references unknown environment '{}'",
                    plan.name, env
                )));
            }
        }

        for topology in &self.replication_topologies {
            if let Some(id) = topology
                .engine_ids
                .iter()
                .find(|id| self.engine(**id).is_none())
            {
                return Err(ConfigError::Config(format!(
                    "replication topology '{}' references unknown engine {}",
                    topology.name, id
                )));
            }
        }

        for credential in &self.credentials {
            if let Some(env) = credential
                .environments
                .iter()
                .find(|e| self.environment(e).is_none())
            {
                return Err(ConfigError::Config(format!(
                    "{} credential references unknown environment '{}'",
                    credential.integration_type, env
                )));
            }
        }

        Ok(())
    }
}
