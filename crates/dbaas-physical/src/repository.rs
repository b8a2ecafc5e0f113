//! Plan storage.
//!
//! Every write that touches `is_default` goes through a single transaction
//! that demotes the engine's other plans, so at most one plan per engine is
//! the default at any observable point.

use crate::error::PhysicalError;
use async_trait::async_trait;
use dbaas_core::{EngineId, Plan, PlanId};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Trait for plan storage backends.
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Get a plan by id.
    async fn get(&self, id: PlanId) -> Result<Option<Plan>, PhysicalError>;

    /// List all plans, ordered by id.
    async fn list(&self) -> Result<Vec<Plan>, PhysicalError>;

    /// Insert or replace a plan.
    ///
    /// When the plan is saved as default, every other default plan of the
    /// same engine is demoted in the same transaction.
    async fn save(&self, plan: Plan) -> Result<Plan, PhysicalError>;

    /// Make `plan_id` the only default plan of `engine_id`, atomically.
    async fn set_default(&self, engine_id: EngineId, plan_id: PlanId)
    -> Result<Plan, PhysicalError>;

    /// The default plan of an engine, if any.
    async fn default_for_engine(&self, engine_id: EngineId)
    -> Result<Option<Plan>, PhysicalError>;
}

/// In-memory plan store. The write lock is the transaction boundary.
pub struct InMemoryPlanRepository {
    plans: RwLock<BTreeMap<PlanId, Plan>>,
}

impl InMemoryPlanRepository {
    pub fn new() -> Self {
        Self {
            plans: RwLock::new(BTreeMap::new()),
        }
    }

    /// Seed the store. Plans are saved in order, so when several defaults
    /// share an engine the last one wins.
    pub fn with_plans(plans: impl IntoIterator<Item = Plan>) -> Result<Self, PhysicalError> {
        let repo = Self::new();
        {
            let mut guard = repo.plans.write().map_err(|_| PhysicalError::LockPoisoned)?;
            for plan in plans {
                Self::upsert(&mut guard, plan);
            }
        }
        Ok(repo)
    }

    fn upsert(plans: &mut BTreeMap<PlanId, Plan>, plan: Plan) -> Plan {
        if plan.is_default {
            Self::demote_others(plans, plan.engine_id, plan.id);
        }
        plans.insert(plan.id, plan.clone());
        plan
    }

    fn demote_others(plans: &mut BTreeMap<PlanId, Plan>, engine_id: EngineId, keep: PlanId) {
        for other in plans.values_mut() {
            if other.engine_id == engine_id && other.id != keep && other.is_default {
                tracing::info!(
                    plan = other.id,
                    engine = engine_id,
                    "Demoting previous default plan"
                );
                other.is_default = false;
            }
        }
    }
}

impl Default for InMemoryPlanRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlanRepository for InMemoryPlanRepository {
    async fn get(&self, id: PlanId) -> Result<Option<Plan>, PhysicalError> {
        let plans = self.plans.read().map_err(|_| PhysicalError::LockPoisoned)?;
        Ok(plans.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Plan>, PhysicalError> {
        let plans = self.plans.read().map_err(|_| PhysicalError::LockPoisoned)?;
        Ok(plans.values().cloned().collect())
    }

    async fn save(&self, plan: Plan) -> Result<Plan, PhysicalError> {
        let mut plans = self.plans.write().map_err(|_| PhysicalError::LockPoisoned)?;
        Ok(Self::upsert(&mut plans, plan))
    }

    async fn set_default(
        &self,
        engine_id: EngineId,
        plan_id: PlanId,
    ) -> Result<Plan, PhysicalError> {
        let mut plans = self.plans.write().map_err(|_| PhysicalError::LockPoisoned)?;

        let actual = plans
            .get(&plan_id)
            .map(|p| p.engine_id)
            .ok_or(PhysicalError::PlanNotFound(plan_id))?;
        if actual != engine_id {
            return Err(PhysicalError::EngineMismatch {
                plan: plan_id,
                expected: engine_id,
                actual,
            });
        }

        Self::demote_others(&mut plans, engine_id, plan_id);
        let plan = plans
            .get_mut(&plan_id)
            .ok_or(PhysicalError::PlanNotFound(plan_id))?;
        plan.is_default = true;

        tracing::info!(plan = plan_id, engine = engine_id, "Default plan set");
        Ok(plan.clone())
    }

    async fn default_for_engine(
        &self,
        engine_id: EngineId,
    ) -> Result<Option<Plan>, PhysicalError> {
        let plans = self.plans.read().map_err(|_| PhysicalError::LockPoisoned)?;
        Ok(plans
            .values()
            .find(|p| p.engine_id == engine_id && p.is_default)
            .cloned())
    }
}
