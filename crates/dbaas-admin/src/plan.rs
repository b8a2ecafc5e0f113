//! Plan admin contract.

use crate::error::AdminError;
use dbaas_core::{EngineId, Inventory, Plan, PlanId, Provider};
use dbaas_physical::PlanRepository;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Listing options of the plan changelist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminListing {
    pub search_fields: &'static [&'static str],
    pub list_filter: &'static [&'static str],
    pub list_display: &'static [&'static str],
    pub save_on_top: bool,
}

/// Changelist query. Every filter is optional; `search` matches plan names
/// case-insensitively.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanQuery {
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub engine: Option<EngineId>,
    /// Environment name the plan must be offered in.
    pub environments: Option<String>,
    pub is_ha: Option<bool>,
    pub has_persistence: Option<bool>,
}

impl PlanQuery {
    fn matches(&self, plan: &Plan) -> bool {
        if let Some(search) = &self.search {
            let needle = search.trim().to_lowercase();
            if !needle.is_empty() && !plan.name.to_lowercase().contains(&needle) {
                return false;
            }
        }

        self.is_active.is_none_or(|v| plan.is_active == v)
            && self.engine.is_none_or(|id| plan.engine_id == id)
            && self
                .environments
                .as_ref()
                .is_none_or(|env| plan.environments.iter().any(|e| e == env))
            && self.is_ha.is_none_or(|v| plan.is_ha == v)
            && self.has_persistence.is_none_or(|v| plan.has_persistence == v)
    }
}

/// One changelist row, limited to the display columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanRow {
    pub id: PlanId,
    pub name: String,
    pub engine: String,
    pub environment: String,
    pub is_active: bool,
    pub is_default: bool,
    pub provider: Provider,
    pub is_ha: bool,
}

/// Admin view over the plan repository and the inventory's engines.
pub struct PlanAdmin {
    inventory: Arc<Inventory>,
    plans: Arc<dyn PlanRepository>,
}

impl PlanAdmin {
    pub const SEARCH_FIELDS: &'static [&'static str] = &["name"];
    pub const LIST_FILTER: &'static [&'static str] = &[
        "is_active",
        "engine",
        "environments",
        "is_ha",
        "has_persistence",
    ];
    pub const LIST_DISPLAY: &'static [&'static str] = &[
        "name",
        "engine",
        "environment",
        "is_active",
        "is_default",
        "provider",
        "is_ha",
    ];
    pub const SAVE_ON_TOP: bool = true;

    pub fn new(inventory: Arc<Inventory>, plans: Arc<dyn PlanRepository>) -> Self {
        Self { inventory, plans }
    }

    pub fn listing() -> AdminListing {
        AdminListing {
            search_fields: Self::SEARCH_FIELDS,
            list_filter: Self::LIST_FILTER,
            list_display: Self::LIST_DISPLAY,
            save_on_top: Self::SAVE_ON_TOP,
        }
    }

    /// Extend the change-form context with engine metadata. Caller keys are
    /// kept; `None` yields a fresh context.
    pub fn add_extra_context(&self, context: Option<Map<String, Value>>) -> Map<String, Value> {
        let mut context = context.unwrap_or_default();

        let topologies = self
            .replication_topologies_engines()
            .into_iter()
            .map(|(name, engines)| {
                let engines = engines.into_iter().map(Value::String).collect();
                (name, Value::Array(engines))
            })
            .collect::<Map<_, _>>();
        let engines = self
            .engines_type()
            .into_iter()
            .map(|(name, in_memory)| (name, Value::Bool(in_memory)))
            .collect::<Map<_, _>>();

        context.insert(
            "replication_topologies_engines".to_string(),
            Value::Object(topologies),
        );
        context.insert("engines".to_string(), Value::Object(engines));
        context
    }

    /// Engine display name to whether its engine type is in-memory.
    pub fn engines_type(&self) -> BTreeMap<String, bool> {
        self.inventory
            .engines
            .iter()
            .map(|engine| {
                let in_memory = self
                    .inventory
                    .engine_type(&engine.engine_type)
                    .is_some_and(|t| t.is_in_memory);
                (engine.full_name(), in_memory)
            })
            .collect()
    }

    /// Replication topology name to the display names of its engines.
    pub fn replication_topologies_engines(&self) -> BTreeMap<String, Vec<String>> {
        self.inventory
            .replication_topologies
            .iter()
            .map(|topology| {
                let engines = topology
                    .engine_ids
                    .iter()
                    .filter_map(|id| self.inventory.engine(*id))
                    .map(|engine| engine.full_name())
                    .collect();
                (topology.name.clone(), engines)
            })
            .collect()
    }

    /// Plans matching `query`, in id order.
    pub async fn changelist(&self, query: &PlanQuery) -> Result<Vec<PlanRow>, AdminError> {
        let plans = self.plans.list().await?;
        let rows: Vec<PlanRow> = plans
            .iter()
            .filter(|plan| query.matches(plan))
            .map(|plan| self.row(plan))
            .collect();

        tracing::debug!(rows = rows.len(), search = ?query.search, "Plan changelist");
        Ok(rows)
    }

    pub async fn plan(&self, id: PlanId) -> Result<PlanRow, AdminError> {
        let plan = self
            .plans
            .get(id)
            .await?
            .ok_or_else(|| AdminError::NotFound(format!("plan {}", id)))?;
        Ok(self.row(&plan))
    }

    fn row(&self, plan: &Plan) -> PlanRow {
        let engine = self
            .inventory
            .engine(plan.engine_id)
            .map(|e| e.full_name())
            .unwrap_or_else(|| plan.engine_id.to_string());

        PlanRow {
            id: plan.id,
            name: plan.name.clone(),
            engine,
            environment: plan.environments.join(", "),
            is_active: plan.is_active,
            is_default: plan.is_default,
            provider: plan.provider,
            is_ha: plan.is_ha,
        }
    }
}
