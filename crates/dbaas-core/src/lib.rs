//! # dbaas-core
//!
//! Data model and configuration shared by every DBaaS control-plane crate.
//!
//! - [`physical`]: engines, environments, hosts, instances, plans and bundles
//! - [`credentials`]: integration credentials scoped to environments
//! - [`inventory`]: a YAML snapshot of the above, used by the CLI and dashboard
//! - [`config`]: process configuration (`dbaas.yaml`)

// Configuration types shared across all DBaaS crates
pub mod config;

pub mod credentials;
pub mod inventory;
pub mod physical;

// Re-export commonly used types for convenience
pub use config::{
    ConfigError, DashboardConfig, DbaasConfig, HostProviderConfig, IntegrationsConfig,
    ObservabilityConfig, PlansConfig, RetryConfig, WorkflowConfig,
};
pub use credentials::{Credential, CredentialType};
pub use inventory::Inventory;
pub use physical::{
    Bundle, Engine, EngineId, EngineType, Environment, Host, Instance, Plan, PlanId, Provider,
    ReplicationTopology,
};
