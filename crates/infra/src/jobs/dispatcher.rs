//! Per-job dispatch: handler body, then outcome report.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::engine::Job;

use super::handlers::JobHandler;
use super::reporter::{JobOutcomeReporter, ReportError, ReportOutcome};

/// Runs one claimed job to a reported outcome.
///
/// Handler success completes the job. Handler failure fails it with the
/// retry count decremented. A failure to *report* is logged separately from
/// a handler failure and never escalates beyond the job.
#[derive(Clone)]
pub struct JobDispatcher {
    handler: Arc<dyn JobHandler>,
    reporter: JobOutcomeReporter,
}

impl JobDispatcher {
    pub fn new(handler: Arc<dyn JobHandler>, reporter: JobOutcomeReporter) -> Self {
        Self { handler, reporter }
    }

    pub async fn dispatch(&self, job: &Job) -> Result<ReportOutcome, ReportError> {
        debug!(
            worker = %job.worker,
            job_key = %job.key,
            job_type = %job.job_type,
            retries = job.retries,
            process_instance_key = job.process_instance_key,
            "claimed job"
        );

        let reported = match self.handler.handle(job).await {
            Ok(completion) => self.reporter.complete(job, completion.variables).await,
            Err(err) => {
                warn!(
                    job_key = %job.key,
                    job_type = %job.job_type,
                    stage = err.stage(),
                    error = %err,
                    "job handler failed"
                );
                self.reporter.fail(job, &err.to_string()).await
            }
        };

        match &reported {
            Ok(outcome) => info!(
                job_key = %job.key,
                job_type = %job.job_type,
                outcome = outcome.as_str(),
                "job outcome reported"
            ),
            Err(err) => error!(
                job_key = %job.key,
                job_type = %job.job_type,
                outcome = err.outcome,
                attempts = err.attempts,
                error = %err.source,
                "job outcome report failed"
            ),
        }

        reported
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ecomflow_events::JobType;

    use super::*;
    use crate::engine::in_memory::JobState;
    use crate::engine::{ActivateJobsRequest, EngineClient, InMemoryEngine};
    use crate::jobs::config::RetryPolicy;
    use crate::jobs::handlers::MessageThrowHandler;
    use crate::jobs::publisher::MessagePublisher;

    async fn claim(engine: &InMemoryEngine, job_type: JobType, raw: &str, retries: i32) -> Job {
        engine.create_job(job_type.as_str(), raw, retries);
        engine
            .activate_jobs(&ActivateJobsRequest {
                job_type: job_type.as_str().to_string(),
                worker: job_type.worker_name(),
                max_jobs: 1,
                timeout: Duration::from_secs(10),
                request_timeout: Duration::ZERO,
            })
            .await
            .unwrap()
            .remove(0)
    }

    fn dispatcher(engine: &Arc<InMemoryEngine>, job_type: JobType) -> JobDispatcher {
        let handler = MessageThrowHandler::new(
            job_type.route().unwrap(),
            MessagePublisher::new(engine.clone()),
        );
        JobDispatcher::new(
            Arc::new(handler),
            JobOutcomeReporter::new(engine.clone(), RetryPolicy::fixed(None, Duration::from_millis(1))),
        )
    }

    const PAYLOAD: &str = r#"{"order":{"id":42,"item":{"id":7,"variantId":2,"quantity":3}}}"#;

    #[tokio::test]
    async fn place_order_publishes_then_completes() {
        let engine = Arc::new(InMemoryEngine::new());
        let job = claim(&engine, JobType::PlaceOrder, PAYLOAD, 3).await;

        let outcome = dispatcher(&engine, JobType::PlaceOrder)
            .dispatch(&job)
            .await
            .unwrap();

        assert_eq!(outcome, ReportOutcome::Completed);
        let published = engine.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].name, "msgCustomerPlaceOrder");
        assert_eq!(published[0].correlation_key, "42");
        assert!(published[0].variables.is_some());
        assert_eq!(engine.completions(), vec![(job.key, None)]);
        assert!(engine.failures().is_empty());
    }

    #[tokio::test]
    async fn publish_failure_fails_job_with_decrement() {
        for retries in [3, 1, 0] {
            let engine = Arc::new(InMemoryEngine::new());
            let job = claim(&engine, JobType::PayOrder, PAYLOAD, retries).await;
            engine.fail_next_publishes(1);

            let outcome = dispatcher(&engine, JobType::PayOrder)
                .dispatch(&job)
                .await
                .unwrap();

            let failures = engine.failures();
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].retries, retries - 1);
            assert!(failures[0].error_message.contains("msgCustomerPayOrder"));
            assert!(engine.completions().is_empty());
            assert!(engine.published().is_empty());
            if retries - 1 > 0 {
                assert_eq!(outcome, ReportOutcome::FailedRetryable { remaining: retries - 1 });
            } else {
                assert_eq!(outcome, ReportOutcome::FailedTerminal { remaining: retries - 1 });
                assert!(matches!(engine.job_state(job.key), Some(JobState::Incident { .. })));
            }
        }
    }

    #[tokio::test]
    async fn undecodable_payload_fails_job_with_decrement() {
        let engine = Arc::new(InMemoryEngine::new());
        let job = claim(&engine, JobType::ShipOrder, "[]", 3).await;

        let outcome = dispatcher(&engine, JobType::ShipOrder)
            .dispatch(&job)
            .await
            .unwrap();

        assert_eq!(outcome, ReportOutcome::FailedRetryable { remaining: 2 });
        let failures = engine.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].key, job.key);
        assert_eq!(failures[0].retries, 2);
        assert!(engine.published().is_empty());
        assert!(engine.completions().is_empty());
    }

    #[tokio::test]
    async fn missing_order_id_fails_job_with_decrement() {
        let engine = Arc::new(InMemoryEngine::new());
        let job = claim(
            &engine,
            JobType::ShipReturn,
            r#"{"order":{"id":null,"item":{"id":7,"variantId":2,"quantity":3}}}"#,
            3,
        )
        .await;

        let outcome = dispatcher(&engine, JobType::ShipReturn)
            .dispatch(&job)
            .await
            .unwrap();

        assert_eq!(outcome, ReportOutcome::FailedRetryable { remaining: 2 });
        let failures = engine.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].retries, 2);
        assert!(failures[0].error_message.contains("msgCustomerShipReturn"));
        assert!(engine.published().is_empty());
        assert!(engine.completions().is_empty());
    }

    #[tokio::test]
    async fn completion_report_failure_is_distinct_from_publish_failure() {
        let engine = Arc::new(InMemoryEngine::new());
        let job = claim(&engine, JobType::ShipOrder, PAYLOAD, 3).await;
        engine.fail_next_completions(1);

        let err = dispatcher(&engine, JobType::ShipOrder)
            .dispatch(&job)
            .await
            .unwrap_err();

        assert_eq!(err.outcome, "complete");
        // The message went out; the job is not failed on top of it.
        assert_eq!(engine.published().len(), 1);
        assert!(engine.failures().is_empty());
    }

    #[tokio::test]
    async fn redispatch_after_lost_completion_does_not_republish() {
        let engine = Arc::new(InMemoryEngine::new());
        let job = claim(&engine, JobType::OrderCompletion, PAYLOAD, 3).await;
        engine.fail_next_completions(1);
        let dispatcher = dispatcher(&engine, JobType::OrderCompletion);

        dispatcher.dispatch(&job).await.unwrap_err();
        engine.expire(job.key);
        let again = claim(&engine, JobType::OrderCompletion, PAYLOAD, 3).await;
        assert_eq!(again.key, job.key);

        assert_eq!(dispatcher.dispatch(&again).await.unwrap(), ReportOutcome::Completed);
        assert_eq!(engine.published().len(), 1);
        assert_eq!(engine.duplicate_messages(), 1);
    }
}
