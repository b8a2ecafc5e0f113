//! # dbaas-physical
//!
//! Plan invariants for the DBaaS control plane.
//!
//! - [`PlanValidator`] checks that HA plans on bundle-based cloud providers
//!   reference enough bundles.
//! - [`PlanRepository`] stores plans and keeps exactly one default plan per
//!   engine. Promoting a plan demotes the previous default in the same
//!   transaction, so readers never see zero or two defaults.
//!
//! Two repositories are provided: [`InMemoryPlanRepository`] for the CLI,
//! dashboard and tests, and [`PgPlanRepository`] backed by Postgres.

pub mod error;
pub mod pg;
pub mod plan;
pub mod repository;

pub use error::PhysicalError;
pub use pg::PgPlanRepository;
pub use plan::PlanValidator;
pub use repository::{InMemoryPlanRepository, PlanRepository};
