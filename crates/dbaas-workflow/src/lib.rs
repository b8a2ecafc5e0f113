//! # dbaas-workflow
//!
//! Host provisioning workflow for the DBaaS control plane.
//!
//! - [`host_provider`]: one HTTP call per VM action, with a status verdict
//! - [`step`]: the [`Step`] trait and the host/plan steps built on it
//! - [`pipeline`]: ordered execution with retry, rollback and per-host locking
//! - [`credentials`]: environment-scoped credential lookup
//! - [`audit`]: step audit trail
//!
//! ## Example
//!
//! ```rust,no_run
//! use dbaas_core::{Environment, HostProviderConfig, Instance};
//! use dbaas_workflow::{InMemoryCredentials, Pipeline, Provider, ReqwestTransport, StartVm};
//! use std::sync::Arc;
//!
//! # async fn example(instance: Instance) -> Result<(), Box<dyn std::error::Error>> {
//! let transport = Arc::new(ReqwestTransport::new(&HostProviderConfig::default())?);
//! let credentials = Arc::new(InMemoryCredentials::default());
//! let provider = Provider::new(instance, Environment::new("dev"), credentials, transport);
//!
//! let report = Pipeline::new("start_host")
//!     .step(StartVm::new(Arc::new(provider)))
//!     .run()
//!     .await?;
//! println!("job {} done", report.job_id);
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod credentials;
pub mod error;
pub mod host_provider;
pub mod pipeline;
pub mod step;

pub use audit::{AuditEvent, AuditSink, MemoryAuditSink, StepEvent, TracingAuditSink};
pub use credentials::{CredentialResolver, InMemoryCredentials};
pub use error::{HostProviderError, PipelineError};
pub use host_provider::{
    ActionStatus, HostAction, HostProviderTransport, Provider, ProviderRequest, ProviderResponse,
    ReqwestTransport,
};
pub use pipeline::{JobGuard, JobLocks, Pipeline, PipelineReport, RetryPolicy, is_retryable};
pub use step::{StartVm, Step, StopVm, ValidatePlan};
