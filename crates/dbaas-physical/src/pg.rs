//! Postgres-backed plan repository.
//!
//! A partial unique index on `(engine_id) WHERE is_default` backs the
//! one-default-per-engine rule at the database level. Writes demote the
//! previous default before promoting the new one, inside one transaction
//! that holds the engine's advisory lock, so concurrent promotions on one
//! engine queue up instead of colliding on the index.

use crate::error::PhysicalError;
use crate::repository::PlanRepository;
use async_trait::async_trait;
use dbaas_core::{Bundle, EngineId, Plan, PlanId, Provider};
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::Row;

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS physical_plan (
        id BIGINT PRIMARY KEY,
        name TEXT NOT NULL,
        engine_id BIGINT NOT NULL,
        environments TEXT[] NOT NULL DEFAULT '{}',
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        is_default BOOLEAN NOT NULL DEFAULT FALSE,
        is_ha BOOLEAN NOT NULL DEFAULT FALSE,
        has_persistence BOOLEAN NOT NULL DEFAULT TRUE,
        provider TEXT NOT NULL,
        bundles JSONB NOT NULL DEFAULT '[]'
    )"#,
    "CREATE UNIQUE INDEX IF NOT EXISTS physical_plan_one_default_per_engine \
     ON physical_plan (engine_id) WHERE is_default",
];

const SELECT_COLUMNS: &str = "id, name, engine_id, environments, is_active, is_default, \
     is_ha, has_persistence, provider, bundles";

pub struct PgPlanRepository {
    pool: PgPool,
}

impl PgPlanRepository {
    pub async fn connect(database_url: &str) -> Result<Self, PhysicalError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the plan table and its indexes if missing.
    pub async fn ensure_schema(&self) -> Result<(), PhysicalError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

/// Serialize default-plan writes per engine until the transaction ends.
async fn lock_engine(conn: &mut PgConnection, engine_id: EngineId) -> Result<(), PhysicalError> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(engine_id)
        .execute(conn)
        .await?;
    Ok(())
}

fn plan_from_row(row: &PgRow) -> Result<Plan, PhysicalError> {
    let id: i64 = row.try_get("id")?;
    let provider: String = row.try_get("provider")?;
    let provider = provider
        .parse::<Provider>()
        .map_err(|reason| PhysicalError::InvalidRecord { plan: id, reason })?;
    let bundles: Json<Vec<Bundle>> = row.try_get("bundles")?;

    Ok(Plan {
        id,
        name: row.try_get("name")?,
        engine_id: row.try_get("engine_id")?,
        environments: row.try_get("environments")?,
        is_active: row.try_get("is_active")?,
        is_default: row.try_get("is_default")?,
        is_ha: row.try_get("is_ha")?,
        has_persistence: row.try_get("has_persistence")?,
        provider,
        bundles: bundles.0,
    })
}

#[async_trait]
impl PlanRepository for PgPlanRepository {
    async fn get(&self, id: PlanId) -> Result<Option<Plan>, PhysicalError> {
        let sql = format!("SELECT {} FROM physical_plan WHERE id = $1", SELECT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(plan_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<Plan>, PhysicalError> {
        let sql = format!("SELECT {} FROM physical_plan ORDER BY id", SELECT_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(plan_from_row).collect()
    }

    async fn save(&self, plan: Plan) -> Result<Plan, PhysicalError> {
        let mut tx = self.pool.begin().await?;

        if plan.is_default {
            lock_engine(&mut tx, plan.engine_id).await?;
            let demoted = sqlx::query(
                "UPDATE physical_plan SET is_default = FALSE \
                 WHERE engine_id = $1 AND id <> $2 AND is_default",
            )
            .bind(plan.engine_id)
            .bind(plan.id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
            if demoted > 0 {
                tracing::info!(engine = plan.engine_id, plan = plan.id, "Demoted previous default plan");
            }
        }

        sqlx::query(
            "INSERT INTO physical_plan \
             (id, name, engine_id, environments, is_active, is_default, is_ha, has_persistence, provider, bundles) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (id) DO UPDATE SET \
             name = EXCLUDED.name, engine_id = EXCLUDED.engine_id, \
             environments = EXCLUDED.environments, is_active = EXCLUDED.is_active, \
             is_default = EXCLUDED.is_default, is_ha = EXCLUDED.is_ha, \
             has_persistence = EXCLUDED.has_persistence, provider = EXCLUDED.provider, \
             bundles = EXCLUDED.bundles",
        )
        .bind(plan.id)
        .bind(&plan.name)
        .bind(plan.engine_id)
        .bind(&plan.environments)
        .bind(plan.is_active)
        .bind(plan.is_default)
        .bind(plan.is_ha)
        .bind(plan.has_persistence)
        .bind(plan.provider.as_str())
        .bind(Json(&plan.bundles))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(plan)
    }

    async fn set_default(
        &self,
        engine_id: EngineId,
        plan_id: PlanId,
    ) -> Result<Plan, PhysicalError> {
        let mut tx = self.pool.begin().await?;
        lock_engine(&mut tx, engine_id).await?;

        let actual: Option<i64> =
            sqlx::query_scalar("SELECT engine_id FROM physical_plan WHERE id = $1 FOR UPDATE")
                .bind(plan_id)
                .fetch_optional(&mut *tx)
                .await?;
        let actual = actual.ok_or(PhysicalError::PlanNotFound(plan_id))?;
        if actual != engine_id {
            return Err(PhysicalError::EngineMismatch {
                plan: plan_id,
                expected: engine_id,
                actual,
            });
        }

        // Unique indexes are checked per row, so demote before promoting.
        sqlx::query(
            "UPDATE physical_plan SET is_default = FALSE \
             WHERE engine_id = $1 AND id <> $2 AND is_default",
        )
        .bind(engine_id)
        .bind(plan_id)
        .execute(&mut *tx)
        .await?;

        let sql = format!(
            "UPDATE physical_plan SET is_default = TRUE WHERE id = $1 RETURNING {}",
            SELECT_COLUMNS
        );
        let row = sqlx::query(&sql).bind(plan_id).fetch_one(&mut *tx).await?;
        let plan = plan_from_row(&row)?;

        tx.commit().await?;
        tracing::info!(plan = plan_id, engine = engine_id, "Default plan set");
        Ok(plan)
    }

    async fn default_for_engine(
        &self,
        engine_id: EngineId,
    ) -> Result<Option<Plan>, PhysicalError> {
        let sql = format!(
            "SELECT {} FROM physical_plan WHERE engine_id = $1 AND is_default",
            SELECT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(engine_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(plan_from_row).transpose()
    }
}
