//! Route definitions for the dashboard.

use crate::handlers;
use crate::state::AppState;
use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

/// Create the dashboard router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/admin/plans", get(handlers::plans_list))
        .route("/admin/plans/config", get(handlers::plans_config))
        .route("/admin/plans/engines", get(handlers::plans_engines))
        .route("/admin/plans/{id}", get(handlers::plan_detail))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
