//! Error types for the admin crate.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use dbaas_physical::PhysicalError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdminError {
    /// Failed to start the server.
    #[error("failed to start dashboard: {0}")]
    StartupFailed(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Repository(#[from] PhysicalError),
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match &self {
            AdminError::NotFound(_) => StatusCode::NOT_FOUND,
            AdminError::Repository(PhysicalError::PlanNotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Admin request failed");
        }

        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
