//! Dashboard server implementation.

use crate::error::AdminError;
use crate::routes;
use crate::state::AppState;
use dbaas_core::DashboardConfig;
use tokio::net::TcpListener;

/// The admin dashboard server.
pub struct DashboardServer {
    config: DashboardConfig,
    state: AppState,
}

impl DashboardServer {
    pub fn new(config: DashboardConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Serve until the process receives Ctrl-C.
    pub async fn run(&self) -> Result<(), AdminError> {
        let addr = self.config.listen_addr();
        tracing::info!(address = %addr, "Starting DBaaS admin dashboard");

        let app = routes::create_router(self.state.clone());

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| AdminError::StartupFailed(e.to_string()))?;

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Shutting down admin dashboard");
            })
            .await
            .map_err(|e| AdminError::StartupFailed(e.to_string()))?;

        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        self.config.listen_addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::tests::admin;

    #[test]
    fn test_server_creation() {
        let server = DashboardServer::new(DashboardConfig::default(), AppState::new(admin()));
        assert_eq!(server.listen_addr(), "127.0.0.1:8080");
    }
}
