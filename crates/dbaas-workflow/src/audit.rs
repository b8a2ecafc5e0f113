//! Step audit trail.
//!
//! The pipeline reports every attempt, outcome and rollback of a step to an
//! [`AuditSink`]. Sinks must not fail the job, so `record` returns nothing.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

/// What happened to a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepEvent {
    Started,
    Succeeded,
    Failed,
    RolledBack,
    RollbackFailed,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub job_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub step: String,
    pub event: StepEvent,
    pub attempt: u32,
    pub outcome: serde_json::Value,
}

impl AuditEvent {
    pub fn new(job_id: Uuid, step: &str, event: StepEvent, attempt: u32) -> Self {
        Self {
            job_id,
            occurred_at: Utc::now(),
            step: step.to_string(),
            event,
            attempt,
            outcome: serde_json::Value::Null,
        }
    }

    pub fn with_outcome(mut self, outcome: serde_json::Value) -> Self {
        self.outcome = outcome;
        self
    }
}

/// Trait boundary for step audit trails.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Emits audit events as structured `tracing` records.
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        tracing::info!(
            target: "dbaas::audit",
            job = %event.job_id,
            step = %event.step,
            event = ?event.event,
            attempt = event.attempt,
            outcome = %event.outcome,
            "[AUDIT]"
        );
    }
}

/// Keeps events in memory, for tests and CLI reports.
#[derive(Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// `(step, event)` pairs in recording order.
    pub fn trail(&self) -> Vec<(String, StepEvent)> {
        self.events()
            .into_iter()
            .map(|e| (e.step, e.event))
            .collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
