//! Step pipeline.
//!
//! Runs the steps of one provisioning job strictly in order. A failing step is
//! retried according to the [`RetryPolicy`]; when it still fails, the steps
//! that already completed are undone in reverse order and the original error
//! is returned.
//!
//! Infrastructure actions are stateful, so two jobs on the same host must not
//! interleave. [`JobLocks`] hands out one async mutex per key (usually the host
//! identifier); jobs on different keys run in parallel.

use crate::audit::{AuditEvent, AuditSink, StepEvent, TracingAuditSink};
use crate::error::{HostProviderError, PipelineError};
use crate::host_provider::ActionStatus;
use crate::step::Step;
use dbaas_core::RetryConfig;
use dbaas_physical::PhysicalError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

/// How often a step is attempted and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
    factor: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration, factor: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            factor: factor.max(1),
        }
    }

    /// Single attempt, no retry.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, 1)
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.backoff(), config.backoff_factor)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before attempt `attempt + 1`, where `attempt` starts at 1.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        self.backoff
            .saturating_mul(self.factor.saturating_pow(exponent))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Whether a failed step may succeed on a later attempt.
///
/// Configuration problems (unbound host, missing credential, plan thresholds)
/// fail the same way every time, and so does a provider that rejects the
/// request itself (4xx, or any non-200 outside 5xx). Host actions are not
/// idempotent, so only server-side failures and transport errors are re-sent.
pub fn is_retryable(err: &anyhow::Error) -> bool {
    if let Some(err) = err.downcast_ref::<HostProviderError>() {
        return match err {
            HostProviderError::StartVm { response, .. }
            | HostProviderError::StopVm { response, .. } => {
                response.action_status() == ActionStatus::ServerError
            }
            HostProviderError::Transport(_) => true,
            _ => false,
        };
    }
    if err.downcast_ref::<PhysicalError>().is_some() {
        return false;
    }
    true
}

type LockMap = Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>;

/// Per-key async mutexes serializing jobs that touch the same host.
///
/// A key's entry lives only while some job holds or waits for it.
#[derive(Clone, Default)]
pub struct JobLocks {
    locks: LockMap,
}

impl JobLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other job holds `key`.
    pub async fn acquire(&self, key: &str) -> JobGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(key.to_string()).or_default().clone()
        };
        JobGuard {
            guard: Some(lock.lock_owned().await),
            key: key.to_string(),
            locks: self.locks.clone(),
        }
    }

    /// Number of keys currently held or waited on.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Holds a key of [`JobLocks`]; releasing the last holder drops the entry.
pub struct JobGuard {
    guard: Option<OwnedMutexGuard<()>>,
    key: String,
    locks: LockMap,
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        // Release first, so the count below only sees the map and waiters.
        drop(self.guard.take());

        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub job_id: Uuid,
    pub completed: Vec<String>,
}

/// Ordered steps of one provisioning job.
pub struct Pipeline {
    job_id: Uuid,
    name: String,
    steps: Vec<Box<dyn Step>>,
    retry: RetryPolicy,
    audit: Arc<dyn AuditSink>,
    serialization: Option<(JobLocks, String)>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            name: name.into(),
            steps: Vec::new(),
            retry: RetryPolicy::none(),
            audit: Arc::new(TracingAuditSink),
            serialization: None,
        }
    }

    pub fn step(mut self, step: impl Step + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Hold `key` in `locks` for the whole run.
    pub fn serialized_on(mut self, locks: JobLocks, key: impl Into<String>) -> Self {
        self.serialization = Some((locks, key.into()));
        self
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub async fn run(&self) -> Result<PipelineReport, PipelineError> {
        if self.steps.is_empty() {
            return Err(PipelineError::Empty(self.name.clone()));
        }

        let _guard = match &self.serialization {
            Some((locks, key)) => {
                tracing::debug!(job = %self.job_id, key = %key, "Waiting for job lock");
                Some(locks.acquire(key).await)
            }
            None => None,
        };

        tracing::info!(job = %self.job_id, pipeline = %self.name, steps = self.steps.len(), "Pipeline started");

        let mut completed: Vec<usize> = Vec::new();
        for (idx, step) in self.steps.iter().enumerate() {
            if let Err((attempts, source)) = self.run_step(step.as_ref()).await {
                let rollback_failures = self.rollback(&completed).await;
                tracing::error!(
                    job = %self.job_id,
                    step = step.name(),
                    attempts,
                    error = %source,
                    "Pipeline failed"
                );
                return Err(PipelineError::StepFailed {
                    step: step.name().to_string(),
                    attempts,
                    source,
                    rollback_failures,
                });
            }
            completed.push(idx);
        }

        tracing::info!(job = %self.job_id, pipeline = %self.name, "Pipeline finished");
        Ok(PipelineReport {
            job_id: self.job_id,
            completed: completed
                .into_iter()
                .map(|idx| self.steps[idx].name().to_string())
                .collect(),
        })
    }

    async fn run_step(&self, step: &dyn Step) -> Result<(), (u32, anyhow::Error)> {
        let mut attempt = 1;
        loop {
            self.audit
                .record(AuditEvent::new(self.job_id, step.name(), StepEvent::Started, attempt));

            match step.execute().await {
                Ok(()) => {
                    self.audit.record(AuditEvent::new(
                        self.job_id,
                        step.name(),
                        StepEvent::Succeeded,
                        attempt,
                    ));
                    return Ok(());
                }
                Err(err) => {
                    self.audit.record(
                        AuditEvent::new(self.job_id, step.name(), StepEvent::Failed, attempt)
                            .with_outcome(serde_json::json!({ "error": err.to_string() })),
                    );

                    if attempt >= self.retry.max_attempts() || !is_retryable(&err) {
                        return Err((attempt, err));
                    }

                    let delay = self.retry.delay_after(attempt);
                    tracing::warn!(
                        job = %self.job_id,
                        step = step.name(),
                        attempt,
                        delay = ?delay,
                        error = %err,
                        "Step failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Undo completed steps, newest first. Returns the names whose undo failed.
    async fn rollback(&self, completed: &[usize]) -> Vec<String> {
        let mut failures = Vec::new();
        for &idx in completed.iter().rev() {
            let step = &self.steps[idx];
            match step.undo().await {
                Ok(()) => {
                    self.audit
                        .record(AuditEvent::new(self.job_id, step.name(), StepEvent::RolledBack, 1));
                }
                Err(err) => {
                    tracing::error!(job = %self.job_id, step = step.name(), error = %err, "Rollback failed");
                    self.audit.record(
                        AuditEvent::new(self.job_id, step.name(), StepEvent::RollbackFailed, 1)
                            .with_outcome(serde_json::json!({ "error": err.to_string() })),
                    );
                    failures.push(step.name().to_string());
                }
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use crate::host_provider::tests::{RecordingTransport, provider};
    use crate::step::{StartVm, ValidatePlan};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Test step that fails its first `failures` executions.
    struct Scripted {
        name: &'static str,
        failures: AtomicUsize,
        log: Arc<Mutex<Vec<String>>>,
        undo_fails: bool,
    }

    impl Scripted {
        fn new(name: &'static str, failures: usize, log: Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                name,
                failures: AtomicUsize::new(failures),
                log,
                undo_fails: false,
            }
        }
    }

    #[async_trait]
    impl Step for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        async fn execute(&self) -> anyhow::Result<()> {
            self.log.lock().unwrap().push(format!("do:{}", self.name));
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                anyhow::bail!("{} failed", self.name);
            }
            Ok(())
        }

        async fn undo(&self) -> anyhow::Result<()> {
            self.log.lock().unwrap().push(format!("undo:{}", self.name));
            if self.undo_fails {
                anyhow::bail!("cannot undo {}", self.name);
            }
            Ok(())
        }
    }

    fn log() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[tokio::test]
    async fn test_runs_steps_in_order() {
        let log = log();
        let report = Pipeline::new("create")
            .step(Scripted::new("a", 0, log.clone()))
            .step(Scripted::new("b", 0, log.clone()))
            .step(Scripted::new("c", 0, log.clone()))
            .run()
            .await
            .unwrap();

        assert_eq!(report.completed, vec!["a", "b", "c"]);
        assert_eq!(*log.lock().unwrap(), vec!["do:a", "do:b", "do:c"]);
    }

    #[tokio::test]
    async fn test_failure_rolls_back_in_reverse() {
        let log = log();
        let audit = Arc::new(MemoryAuditSink::new());
        let err = Pipeline::new("create")
            .step(Scripted::new("a", 0, log.clone()))
            .step(Scripted::new("b", 0, log.clone()))
            .step(Scripted::new("c", 1, log.clone()))
            .with_audit(audit.clone())
            .run()
            .await
            .unwrap_err();

        match err {
            PipelineError::StepFailed {
                step,
                attempts,
                rollback_failures,
                ..
            } => {
                assert_eq!(step, "c");
                assert_eq!(attempts, 1);
                assert!(rollback_failures.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            *log.lock().unwrap(),
            vec!["do:a", "do:b", "do:c", "undo:b", "undo:a"]
        );
        let trail = audit.trail();
        assert_eq!(trail.last(), Some(&("a".to_string(), StepEvent::RolledBack)));
    }

    #[tokio::test]
    async fn test_rollback_failures_are_reported() {
        let log = log();
        let mut first = Scripted::new("a", 0, log.clone());
        first.undo_fails = true;

        let err = Pipeline::new("create")
            .step(first)
            .step(Scripted::new("b", 1, log.clone()))
            .run()
            .await
            .unwrap_err();

        match err {
            PipelineError::StepFailed {
                rollback_failures, ..
            } => assert_eq!(rollback_failures, vec!["a"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_retry_until_success() {
        let log = log();
        let report = Pipeline::new("create")
            .step(Scripted::new("flaky", 2, log.clone()))
            .with_retry(RetryPolicy::new(3, Duration::from_millis(1), 2))
            .run()
            .await
            .unwrap();

        assert_eq!(report.completed, vec!["flaky"]);
        assert_eq!(log.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_attempts() {
        let log = log();
        let err = Pipeline::new("create")
            .step(Scripted::new("broken", 5, log.clone()))
            .with_retry(RetryPolicy::new(2, Duration::from_millis(1), 1))
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::StepFailed { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn test_provider_error_retried_then_host_started() {
        let transport = Arc::new(RecordingTransport::answering([500, 200]));
        let report = Pipeline::new("start_host")
            .step(StartVm::new(Arc::new(provider(transport.clone()))))
            .with_retry(RetryPolicy::new(2, Duration::from_millis(1), 1))
            .run()
            .await
            .unwrap();

        assert_eq!(report.completed, vec!["start_vm"]);
        assert_eq!(transport.urls().len(), 2);
    }

    #[tokio::test]
    async fn test_configuration_errors_are_not_retried() {
        let transport = Arc::new(RecordingTransport::default());
        let unbound = crate::host_provider::Provider::new(
            dbaas_core::Instance::new("fresh"),
            dbaas_core::Environment::new("fake_env"),
            crate::host_provider::tests::fake_credentials(),
            transport.clone(),
        );

        let err = Pipeline::new("start_host")
            .step(StartVm::new(Arc::new(unbound)))
            .with_retry(RetryPolicy::new(5, Duration::from_millis(1), 1))
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::StepFailed { attempts: 1, .. }));
        assert!(transport.urls().is_empty());
    }

    #[tokio::test]
    async fn test_client_error_is_sent_once() {
        let transport = Arc::new(RecordingTransport::answering([404, 404, 404]));
        let err = Pipeline::new("start_host")
            .step(StartVm::new(Arc::new(provider(transport.clone()))))
            .with_retry(RetryPolicy::new(3, Duration::from_millis(1), 1))
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::StepFailed { attempts: 1, .. }));
        assert_eq!(
            transport.urls(),
            vec!["fake_endpoint/fake_project/fake_env/host/start"]
        );
    }

    #[tokio::test]
    async fn test_plan_validation_failure_is_not_retried() {
        let mut plan = dbaas_core::Plan::new(1, "ha", 1);
        plan.is_ha = true;
        plan.provider = dbaas_core::Provider::Cloudstack;
        plan.bundles = vec![dbaas_core::Bundle::new("a")];

        let err = Pipeline::new("start_host")
            .step(ValidatePlan::new(plan, dbaas_physical::PlanValidator::new(3)))
            .with_retry(RetryPolicy::new(5, Duration::from_millis(1), 1))
            .run()
            .await
            .unwrap_err();

        match err {
            PipelineError::StepFailed {
                step,
                attempts,
                source,
                ..
            } => {
                assert_eq!(step, "validate_plan");
                assert_eq!(attempts, 1);
                assert!(source.downcast_ref::<PhysicalError>().is_some());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_credential_is_not_retried() {
        let transport = Arc::new(RecordingTransport::default());
        let elsewhere = crate::host_provider::Provider::new(
            crate::host_provider::tests::fake_instance(),
            dbaas_core::Environment::new("other_env"),
            crate::host_provider::tests::fake_credentials(),
            transport.clone(),
        );

        let err = Pipeline::new("start_host")
            .step(StartVm::new(Arc::new(elsewhere)))
            .with_retry(RetryPolicy::new(5, Duration::from_millis(1), 1))
            .run()
            .await
            .unwrap_err();

        match err {
            PipelineError::StepFailed {
                attempts, source, ..
            } => {
                assert_eq!(attempts, 1);
                assert!(matches!(
                    source.downcast_ref::<HostProviderError>(),
                    Some(HostProviderError::CredentialNotFound { .. })
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(transport.urls().is_empty());
    }

    #[test]
    fn test_retry_classification() {
        let rejected = |status| {
            anyhow::Error::from(HostProviderError::StartVm {
                host: "h".to_string(),
                response: crate::host_provider::ProviderResponse::new(status, ""),
            })
        };
        assert!(!is_retryable(&rejected(404)));
        assert!(!is_retryable(&rejected(204)));
        assert!(is_retryable(&rejected(500)));
        assert!(is_retryable(&rejected(503)));
        assert!(!is_retryable(&anyhow::Error::from(
            HostProviderError::HostNotBound {
                instance: "i".to_string()
            }
        )));
        assert!(is_retryable(&anyhow::anyhow!("unclassified")));
    }

    #[tokio::test]
    async fn test_released_locks_leave_no_entries() {
        let locks = JobLocks::new();
        for n in 0..1000 {
            let guard = locks.acquire(&format!("host-{n}")).await;
            assert_eq!(locks.len(), 1);
            drop(guard);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_lock_entry_survives_while_waited_on() {
        let locks = JobLocks::new();
        let first = locks.acquire("host-1").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _second = locks.acquire("host-1").await;
            })
        };
        // Let the waiter register on the key.
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(first);
        assert_eq!(locks.len(), 1);

        waiter.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_empty_pipeline_is_rejected() {
        let err = Pipeline::new("nothing").run().await.unwrap_err();
        assert!(matches!(err, PipelineError::Empty(_)));
    }

    #[test]
    fn test_backoff_grows_by_factor() {
        let policy = RetryPolicy::new(4, Duration::from_millis(100), 2);
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
    }

    /// Step that tracks how many instances run at the same time.
    struct Concurrency {
        running: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Step for Concurrency {
        fn name(&self) -> &str {
            "concurrency"
        }

        async fn execute(&self) -> anyhow::Result<()> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    async fn peak_concurrency(keys: [&'static str; 2]) -> usize {
        let locks = JobLocks::new();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for key in keys {
            let pipeline = Pipeline::new("job")
                .step(Concurrency {
                    running: running.clone(),
                    peak: peak.clone(),
                })
                .serialized_on(locks.clone(), key);
            handles.push(tokio::spawn(async move { pipeline.run().await.map(|_| ()) }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        peak.load(Ordering::SeqCst)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_same_host_jobs_are_serialized() {
        assert_eq!(peak_concurrency(["host-1", "host-1"]).await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_different_host_jobs_run_in_parallel() {
        assert_eq!(peak_concurrency(["host-1", "host-2"]).await, 2);
    }
}
