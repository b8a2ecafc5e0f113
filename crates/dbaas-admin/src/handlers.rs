//! Request handlers for the dashboard.

use crate::error::AdminError;
use crate::plan::{AdminListing, PlanAdmin, PlanQuery, PlanRow};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Query, State};
use dbaas_core::PlanId;
use serde_json::{Map, Value};

pub async fn healthz() -> Json<Value> {
    Json(serde_json::json!({ "ok": true, "service": "dbaas-admin" }))
}

/// Plan changelist.
pub async fn plans_list(
    State(state): State<AppState>,
    Query(query): Query<PlanQuery>,
) -> Result<Json<Vec<PlanRow>>, AdminError> {
    let rows = state.plans().changelist(&query).await?;
    Ok(Json(rows))
}

pub async fn plan_detail(
    State(state): State<AppState>,
    Path(id): Path<PlanId>,
) -> Result<Json<PlanRow>, AdminError> {
    Ok(Json(state.plans().plan(id).await?))
}

/// Listing options, for clients that render the changelist.
pub async fn plans_config() -> Json<AdminListing> {
    Json(PlanAdmin::listing())
}

/// Change-form context: engine memory flags and replication topologies.
pub async fn plans_engines(State(state): State<AppState>) -> Json<Map<String, Value>> {
    Json(state.plans().add_extra_context(None))
}
