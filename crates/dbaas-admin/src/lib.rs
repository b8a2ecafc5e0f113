//! # dbaas-admin
//!
//! Admin surface for physical plans.
//!
//! [`PlanAdmin`] carries the listing contract (search fields, filters,
//! display columns) and the extra context the plan change form needs. The
//! [`DashboardServer`] exposes it as read-only JSON:
//!
//! - `GET /healthz`
//! - `GET /admin/plans?search=&is_active=&engine=&environments=&is_ha=&has_persistence=`
//! - `GET /admin/plans/{id}`
//! - `GET /admin/plans/config`
//! - `GET /admin/plans/engines`

pub mod error;
pub mod handlers;
pub mod plan;
pub mod routes;
pub mod server;
pub mod state;

pub use error::AdminError;
pub use plan::{AdminListing, PlanAdmin, PlanQuery, PlanRow};
pub use server::DashboardServer;
pub use state::AppState;
