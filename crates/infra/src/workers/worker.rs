use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Semaphore, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::engine::{ActivateJobsRequest, SharedEngine};
use crate::jobs::{JobDispatcher, JobHandler, JobOutcomeReporter, ReportOutcome, WorkerConfig};

/// Worker runtime statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkerStats {
    pub jobs_activated: u64,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub jobs_failed_terminal: u64,
    pub jobs_superseded: u64,
    pub report_errors: u64,
    pub in_flight: u64,
}

#[derive(Debug, Default)]
struct Counters {
    activated: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    failed_terminal: AtomicU64,
    superseded: AtomicU64,
    report_errors: AtomicU64,
    in_flight: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> WorkerStats {
        WorkerStats {
            jobs_activated: self.activated.load(Ordering::Relaxed),
            jobs_completed: self.completed.load(Ordering::Relaxed),
            jobs_failed: self.failed.load(Ordering::Relaxed),
            jobs_failed_terminal: self.failed_terminal.load(Ordering::Relaxed),
            jobs_superseded: self.superseded.load(Ordering::Relaxed),
            report_errors: self.report_errors.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
        }
    }

    fn record(&self, reported: &Result<ReportOutcome, crate::jobs::ReportError>) {
        let counter = match reported {
            Ok(ReportOutcome::Completed) => &self.completed,
            Ok(ReportOutcome::FailedRetryable { .. }) => &self.failed,
            Ok(ReportOutcome::FailedTerminal { .. }) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                &self.failed_terminal
            }
            Ok(ReportOutcome::Superseded) => &self.superseded,
            Err(_) => &self.report_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Closing a worker did not go cleanly.
#[derive(Debug, Error)]
pub enum CloseError {
    #[error("worker {0} did not stop within the drain timeout")]
    TimedOut(String),

    #[error("worker {name} poll loop panicked: {source}")]
    Panicked {
        name: String,
        #[source]
        source: tokio::task::JoinError,
    },
}

/// Handle to a running worker.
#[derive(Debug)]
pub struct WorkerHandle {
    job_type: String,
    name: String,
    shutdown: watch::Sender<bool>,
    join: Option<JoinHandle<()>>,
    counters: Arc<Counters>,
    drain_timeout: Duration,
}

impl WorkerHandle {
    pub fn job_type(&self) -> &str {
        &self.job_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get current worker statistics.
    pub fn stats(&self) -> WorkerStats {
        self.counters.snapshot()
    }

    /// Tell the poll loop to stop claiming jobs. Returns immediately.
    pub fn signal(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Wait for a signalled poll loop to drain its in-flight jobs and stop.
    pub async fn join(mut self) -> Result<(), CloseError> {
        let Some(join) = self.join.take() else {
            return Ok(());
        };

        // The loop enforces the drain timeout itself; allow a little on top.
        let grace = self.drain_timeout + Duration::from_secs(1);
        let abort = join.abort_handle();
        match tokio::time::timeout(grace, join).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(CloseError::Panicked {
                name: self.name.clone(),
                source,
            }),
            Err(_) => {
                abort.abort();
                Err(CloseError::TimedOut(self.name.clone()))
            }
        }
    }

    /// Stop claiming jobs, let in-flight jobs finish within the drain
    /// timeout, then stop.
    pub async fn close(self) -> Result<(), CloseError> {
        self.signal();
        self.join().await
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        // A handle dropped without close still stops its loop.
        self.signal();
    }
}

/// Start the poll loop for one worker on the current runtime.
pub(crate) fn spawn(
    engine: SharedEngine,
    job_type: String,
    handler: Arc<dyn JobHandler>,
    config: WorkerConfig,
) -> WorkerHandle {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let counters = Arc::new(Counters::default());
    let reporter = JobOutcomeReporter::new(engine.clone(), config.report_retry.clone());
    let dispatcher = JobDispatcher::new(handler, reporter);

    let name = config.name.clone();
    let drain_timeout = config.drain_timeout;
    let join = tokio::spawn(poll_loop(
        engine,
        job_type.clone(),
        dispatcher,
        config,
        shutdown_rx,
        counters.clone(),
    ));

    WorkerHandle {
        job_type,
        name,
        shutdown: shutdown_tx,
        join: Some(join),
        counters,
        drain_timeout,
    }
}

async fn poll_loop(
    engine: SharedEngine,
    job_type: String,
    dispatcher: JobDispatcher,
    config: WorkerConfig,
    mut shutdown: watch::Receiver<bool>,
    counters: Arc<Counters>,
) {
    info!(worker = %config.name, job_type = %job_type, "job worker started");

    let permits = Arc::new(Semaphore::new(config.max_jobs_active));
    let mut in_flight = JoinSet::new();

    loop {
        if *shutdown.borrow() {
            break;
        }

        while let Some(done) = in_flight.try_join_next() {
            log_join(&config.name, done);
        }

        let capacity = permits.available_permits();
        if capacity == 0 {
            tokio::select! {
                _ = shutdown.changed() => break,
                Some(done) = in_flight.join_next() => log_join(&config.name, done),
            }
            continue;
        }

        let request = ActivateJobsRequest {
            job_type: job_type.clone(),
            worker: config.name.clone(),
            max_jobs: capacity,
            timeout: config.timeout,
            request_timeout: config.poll_request_timeout,
        };

        let activated = tokio::select! {
            _ = shutdown.changed() => break,
            activated = engine.activate_jobs(&request) => activated,
        };

        match activated {
            Ok(jobs) if !jobs.is_empty() => {
                debug!(worker = %config.name, count = jobs.len(), "activated jobs");
                for job in jobs {
                    // Never blocks: at most `capacity` jobs were requested.
                    let Ok(permit) = permits.clone().acquire_owned().await else {
                        break;
                    };
                    counters.activated.fetch_add(1, Ordering::Relaxed);
                    counters.in_flight.fetch_add(1, Ordering::Relaxed);

                    let dispatcher = dispatcher.clone();
                    let counters = counters.clone();
                    in_flight.spawn(async move {
                        let reported = dispatcher.dispatch(&job).await;
                        counters.record(&reported);
                        counters.in_flight.fetch_sub(1, Ordering::Relaxed);
                        drop(permit);
                    });
                }
                continue;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(worker = %config.name, error = %e, "job activation failed");
            }
        }

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tokio::time::sleep(config.poll_interval) => {}
        }
    }

    if !in_flight.is_empty() {
        info!(worker = %config.name, in_flight = in_flight.len(), "draining in-flight jobs");
        let drained = tokio::time::timeout(config.drain_timeout, async {
            while let Some(done) = in_flight.join_next().await {
                log_join(&config.name, done);
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                worker = %config.name,
                abandoned = in_flight.len(),
                "drain timeout elapsed; abandoning in-flight jobs to engine timeout"
            );
            in_flight.abort_all();
        }
    }

    info!(worker = %config.name, "job worker stopped");
}

fn log_join(worker: &str, done: Result<(), tokio::task::JoinError>) {
    if let Err(e) = done {
        if e.is_panic() {
            error!(worker = %worker, error = %e, "job task panicked");
        }
    }
}
