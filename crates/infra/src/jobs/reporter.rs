//! Job outcome reporting.
//!
//! State machine per job, as seen from the worker:
//!
//! ```text
//! Claimed ──ok──────────────► Completed
//!    └────err──► retries-1 ─┬─ > 0 ──► Failed-Retryable  (engine may redispatch)
//!                           └─ <= 0 ─► Failed-Terminal   (engine raises an incident)
//! ```
//!
//! The decrement happens exactly once per failed attempt, here. Resending a
//! report the engine never acknowledged does not decrement again.

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, warn};

use ecomflow_core::JobKey;

use crate::engine::{EngineError, Job, SharedEngine};

use super::config::RetryPolicy;

/// What the engine was told about a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    Completed,
    FailedRetryable { remaining: i32 },
    FailedTerminal { remaining: i32 },
    /// The engine no longer considers this activation live (timed out,
    /// reclaimed, already finished); the report was dropped.
    Superseded,
}

impl ReportOutcome {
    fn for_failure(remaining: i32) -> Self {
        if remaining > 0 {
            ReportOutcome::FailedRetryable { remaining }
        } else {
            ReportOutcome::FailedTerminal { remaining }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportOutcome::Completed => "completed",
            ReportOutcome::FailedRetryable { .. } => "failed_retryable",
            ReportOutcome::FailedTerminal { .. } => "failed_terminal",
            ReportOutcome::Superseded => "superseded",
        }
    }
}

/// A report could not be delivered to the engine.
#[derive(Debug, Clone, Error)]
#[error("could not report job {key} as {outcome} after {attempts} attempt(s): {source}")]
pub struct ReportError {
    pub key: JobKey,
    pub outcome: &'static str,
    pub attempts: u32,
    #[source]
    pub source: EngineError,
}

/// Reports job completion or failure to the engine.
#[derive(Clone)]
pub struct JobOutcomeReporter {
    engine: SharedEngine,
    retry: RetryPolicy,
}

impl JobOutcomeReporter {
    pub fn new(engine: SharedEngine, retry: RetryPolicy) -> Self {
        Self { engine, retry }
    }

    /// Mark the job completed, optionally carrying updated variables.
    ///
    /// Sent once; an unacknowledged completion leaves the job to time out and
    /// be redispatched by the engine.
    pub async fn complete(
        &self,
        job: &Job,
        variables: Option<String>,
    ) -> Result<ReportOutcome, ReportError> {
        match self.engine.complete_job(job.key, variables).await {
            Ok(()) => Ok(ReportOutcome::Completed),
            Err(EngineError::Rejected(reason)) => {
                warn!(job_key = %job.key, reason = %reason, "completion rejected by engine; job superseded");
                Ok(ReportOutcome::Superseded)
            }
            Err(source) => Err(ReportError {
                key: job.key,
                outcome: "complete",
                attempts: 1,
                source,
            }),
        }
    }

    /// Mark the job attempt failed with one retry less than it had.
    ///
    /// Transport failures are resent per the retry policy until the engine
    /// acknowledges, or until the job's deadline passes (the engine has
    /// reclaimed the job by then).
    pub async fn fail(
        &self,
        job: &Job,
        error_message: &str,
    ) -> Result<ReportOutcome, ReportError> {
        let remaining = job.remaining_after_failure();
        let mut resends = 0u32;

        loop {
            match self.engine.fail_job(job.key, remaining, error_message).await {
                Ok(()) => return Ok(ReportOutcome::for_failure(remaining)),
                Err(EngineError::Rejected(reason)) => {
                    warn!(job_key = %job.key, reason = %reason, "failure report rejected by engine; job superseded");
                    return Ok(ReportOutcome::Superseded);
                }
                Err(source) => {
                    let give_up = !self.retry.should_retry(resends)
                        || job.is_expired_at(Utc::now())
                        || !source.is_transient();
                    if give_up {
                        return Err(ReportError {
                            key: job.key,
                            outcome: "fail",
                            attempts: resends + 1,
                            source,
                        });
                    }

                    resends += 1;
                    let delay = self.retry.delay_for_attempt(resends);
                    debug!(
                        job_key = %job.key,
                        attempt = resends,
                        delay_ms = delay.as_millis() as u64,
                        error = %source,
                        "resending failure report"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::engine::in_memory::JobState;
    use crate::engine::{ActivateJobsRequest, EngineClient, InMemoryEngine};

    async fn claimed(engine: &InMemoryEngine, retries: i32) -> Job {
        engine.create_job("PayOrder", "{}", retries);
        let mut jobs = engine
            .activate_jobs(&ActivateJobsRequest {
                job_type: "PayOrder".to_string(),
                worker: "PayOrderWorker".to_string(),
                max_jobs: 1,
                timeout: Duration::from_secs(10),
                request_timeout: Duration::ZERO,
            })
            .await
            .unwrap();
        jobs.remove(0)
    }

    fn reporter(engine: &Arc<InMemoryEngine>) -> JobOutcomeReporter {
        JobOutcomeReporter::new(
            engine.clone(),
            RetryPolicy::fixed(None, Duration::from_millis(1)),
        )
    }

    #[tokio::test]
    async fn complete_carries_variables() {
        let engine = Arc::new(InMemoryEngine::new());
        let job = claimed(&engine, 3).await;

        let outcome = reporter(&engine)
            .complete(&job, Some("{\"a\":1}".to_string()))
            .await
            .unwrap();

        assert_eq!(outcome, ReportOutcome::Completed);
        assert_eq!(engine.completions(), vec![(job.key, Some("{\"a\":1}".to_string()))]);
    }

    #[tokio::test]
    async fn fail_decrements_retries_once() {
        for (retries, expected) in [
            (3, ReportOutcome::FailedRetryable { remaining: 2 }),
            (1, ReportOutcome::FailedTerminal { remaining: 0 }),
            (0, ReportOutcome::FailedTerminal { remaining: -1 }),
        ] {
            let engine = Arc::new(InMemoryEngine::new());
            let job = claimed(&engine, retries).await;

            let outcome = reporter(&engine).fail(&job, "boom").await.unwrap();

            assert_eq!(outcome, expected);
            let failures = engine.failures();
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].retries, retries - 1);
        }
    }

    #[tokio::test]
    async fn fail_resends_on_transport_error_without_extra_decrement() {
        let engine = Arc::new(InMemoryEngine::new());
        let job = claimed(&engine, 3).await;
        engine.fail_next_failure_reports(2);

        let outcome = reporter(&engine).fail(&job, "boom").await.unwrap();

        assert_eq!(outcome, ReportOutcome::FailedRetryable { remaining: 2 });
        let failures = engine.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].retries, 2);
        assert_eq!(engine.job_state(job.key), Some(JobState::Activatable));
    }

    #[tokio::test]
    async fn fail_gives_up_when_policy_is_exhausted() {
        let engine = Arc::new(InMemoryEngine::new());
        let job = claimed(&engine, 3).await;
        engine.fail_next_failure_reports(5);

        let reporter = JobOutcomeReporter::new(
            engine.clone(),
            RetryPolicy::fixed(Some(2), Duration::from_millis(1)),
        );
        let err = reporter.fail(&job, "boom").await.unwrap_err();

        assert_eq!(err.outcome, "fail");
        assert_eq!(err.attempts, 3);
        assert!(engine.failures().is_empty());
    }

    #[tokio::test]
    async fn fail_stops_resending_after_deadline() {
        let engine = Arc::new(InMemoryEngine::new());
        let mut job = claimed(&engine, 3).await;
        job.deadline = Utc::now() - chrono::Duration::seconds(1);
        engine.fail_next_failure_reports(1);

        let err = reporter(&engine).fail(&job, "boom").await.unwrap_err();
        assert_eq!(err.attempts, 1);
    }

    #[tokio::test]
    async fn reports_after_timeout_are_superseded() {
        let engine = Arc::new(InMemoryEngine::new());
        let job = claimed(&engine, 3).await;
        engine.expire(job.key);

        let reporter = reporter(&engine);
        assert_eq!(
            reporter.complete(&job, None).await.unwrap(),
            ReportOutcome::Superseded
        );
        assert_eq!(
            reporter.fail(&job, "boom").await.unwrap(),
            ReportOutcome::Superseded
        );
    }

    #[tokio::test]
    async fn complete_transport_error_is_not_resent() {
        let engine = Arc::new(InMemoryEngine::new());
        let job = claimed(&engine, 3).await;
        engine.fail_next_completions(1);

        let err = reporter(&engine).complete(&job, None).await.unwrap_err();

        assert_eq!(err.outcome, "complete");
        assert_eq!(err.attempts, 1);
        assert!(engine.completions().is_empty());
    }
}
