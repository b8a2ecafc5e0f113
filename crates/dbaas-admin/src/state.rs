//! Dashboard application state.

use crate::plan::PlanAdmin;
use std::sync::Arc;

/// Shared application state for the dashboard.
#[derive(Clone)]
pub struct AppState {
    plans: Arc<PlanAdmin>,
}

impl AppState {
    pub fn new(plans: PlanAdmin) -> Self {
        Self {
            plans: Arc::new(plans),
        }
    }

    pub fn plans(&self) -> &PlanAdmin {
        &self.plans
    }
}
