//! Error types for the physical crate.

use dbaas_core::{EngineId, PlanId};
use thiserror::Error;

/// Errors raised by plan validation and plan repositories.
#[derive(Debug, Error)]
pub enum PhysicalError {
    /// The plan's environment setup cannot host it. Not transient: retrying
    /// will fail the same way until the plan or configuration changes.
    #[error(
        "plan '{plan}' is HA on {provider} but has {found} active bundle(s); at least {required} required"
    )]
    EnvironmentConfiguration {
        plan: String,
        provider: String,
        found: usize,
        required: u32,
    },

    /// No plan with this id.
    #[error("plan not found: {0}")]
    PlanNotFound(PlanId),

    /// The plan does not belong to the engine it was promoted for.
    #[error("plan {plan} belongs to engine {actual}, not engine {expected}")]
    EngineMismatch {
        plan: PlanId,
        expected: EngineId,
        actual: EngineId,
    },

    /// A stored row could not be mapped back to a plan.
    #[error("invalid stored plan {plan}: {reason}")]
    InvalidRecord { plan: PlanId, reason: String },

    /// In-memory store lock was poisoned by a panicking writer.
    #[error("plan store lock poisoned")]
    LockPoisoned,

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
