//! In-memory engine for tests/dev.
//!
//! Models the part of the engine's job lifecycle the workers observe:
//! - activation locks a job until its deadline; an expired job is activatable again
//! - completing or failing requires a live activation, otherwise the command is rejected
//! - failing with `retries <= 0` raises an incident instead of re-queueing
//! - messages with an already seen `message_id` are accepted and dropped
//!
//! Faults can be injected per command kind to exercise error paths.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use ecomflow_core::JobKey;
use ecomflow_events::CorrelatedMessage;

use super::{ActivateJobsRequest, EngineClient, EngineError, Job};

/// Lifecycle state of a job inside the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Activatable,
    Activated { worker: String },
    Completed { variables: Option<String> },
    Incident { error_message: String },
}

/// A recorded `fail_job` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailRecord {
    pub key: JobKey,
    pub retries: i32,
    pub error_message: String,
}

#[derive(Debug)]
struct StoredJob {
    job: Job,
    state: JobState,
}

#[derive(Debug, Default)]
struct Faults {
    activate: u32,
    publish: u32,
    complete: u32,
    fail: u32,
}

impl Faults {
    fn take(counter: &mut u32) -> bool {
        if *counter > 0 {
            *counter -= 1;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Default)]
struct EngineState {
    next_key: i64,
    jobs: BTreeMap<JobKey, StoredJob>,
    published: Vec<CorrelatedMessage>,
    seen_message_ids: HashSet<String>,
    duplicate_messages: usize,
    completions: Vec<(JobKey, Option<String>)>,
    failures: Vec<FailRecord>,
    activation_requests: Vec<ActivateJobsRequest>,
    faults: Faults,
}

/// In-process stand-in for the workflow engine.
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    state: Mutex<EngineState>,
    job_created: Notify,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, EngineState> {
        // A panic while holding the lock leaves plain data behind; keep serving it.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Create an activatable job and return its key.
    pub fn create_job(
        &self,
        job_type: impl Into<String>,
        variables: impl Into<String>,
        retries: i32,
    ) -> JobKey {
        let key = {
            let mut state = self.lock();
            state.next_key += 1;
            let key = JobKey::new(state.next_key);
            let process_instance_key = 1_000_000 + state.next_key;
            state.jobs.insert(
                key,
                StoredJob {
                    job: Job {
                        key,
                        job_type: job_type.into(),
                        variables: variables.into(),
                        retries,
                        deadline: Utc::now(),
                        worker: String::new(),
                        process_instance_key,
                    },
                    state: JobState::Activatable,
                },
            );
            key
        };
        self.job_created.notify_waiters();
        key
    }

    pub fn job_state(&self, key: JobKey) -> Option<JobState> {
        self.lock().jobs.get(&key).map(|j| j.state.clone())
    }

    /// Remaining retries as last reported for the job.
    pub fn job_retries(&self, key: JobKey) -> Option<i32> {
        self.lock().jobs.get(&key).map(|j| j.job.retries)
    }

    /// Move an activated job's deadline into the past, as if it timed out.
    pub fn expire(&self, key: JobKey) {
        if let Some(stored) = self.lock().jobs.get_mut(&key) {
            stored.job.deadline = Utc::now() - chrono::Duration::seconds(1);
        }
    }

    pub fn published(&self) -> Vec<CorrelatedMessage> {
        self.lock().published.clone()
    }

    pub fn duplicate_messages(&self) -> usize {
        self.lock().duplicate_messages
    }

    pub fn completions(&self) -> Vec<(JobKey, Option<String>)> {
        self.lock().completions.clone()
    }

    pub fn failures(&self) -> Vec<FailRecord> {
        self.lock().failures.clone()
    }

    pub fn activation_requests(&self) -> Vec<ActivateJobsRequest> {
        self.lock().activation_requests.clone()
    }

    pub fn fail_next_activations(&self, n: u32) {
        self.lock().faults.activate = n;
    }

    pub fn fail_next_publishes(&self, n: u32) {
        self.lock().faults.publish = n;
    }

    pub fn fail_next_completions(&self, n: u32) {
        self.lock().faults.complete = n;
    }

    pub fn fail_next_failure_reports(&self, n: u32) {
        self.lock().faults.fail = n;
    }

    fn try_activate(&self, request: &ActivateJobsRequest) -> Result<Vec<Job>, EngineError> {
        let mut state = self.lock();
        state.activation_requests.push(request.clone());
        if Faults::take(&mut state.faults.activate) {
            return Err(EngineError::transport("injected activation fault"));
        }

        let now = Utc::now();
        let deadline = now
            + chrono::Duration::from_std(request.timeout).unwrap_or_else(|_| chrono::Duration::zero());

        let mut activated = Vec::new();
        for stored in state.jobs.values_mut() {
            if activated.len() >= request.max_jobs {
                break;
            }
            if stored.job.job_type != request.job_type {
                continue;
            }
            let claimable = match stored.state {
                JobState::Activatable => true,
                JobState::Activated { .. } => stored.job.is_expired_at(now),
                _ => false,
            };
            if !claimable {
                continue;
            }
            stored.state = JobState::Activated {
                worker: request.worker.clone(),
            };
            stored.job.deadline = deadline;
            stored.job.worker = request.worker.clone();
            activated.push(stored.job.clone());
        }
        Ok(activated)
    }

    /// Look up a job that is activated and not yet timed out.
    fn live_activation(state: &mut EngineState, key: JobKey) -> Result<&mut StoredJob, EngineError> {
        let stored = state
            .jobs
            .get_mut(&key)
            .ok_or_else(|| EngineError::rejected(format!("job {key} not found")))?;
        if !matches!(stored.state, JobState::Activated { .. }) {
            return Err(EngineError::rejected(format!("job {key} is not activated")));
        }
        if stored.job.is_expired_at(Utc::now()) {
            return Err(EngineError::rejected(format!(
                "job {key} timed out and was reclaimed"
            )));
        }
        Ok(stored)
    }
}

#[async_trait]
impl EngineClient for InMemoryEngine {
    async fn activate_jobs(&self, request: &ActivateJobsRequest) -> Result<Vec<Job>, EngineError> {
        let deadline = tokio::time::Instant::now() + request.request_timeout;

        // Long polling: hold the request open until a matching job appears or
        // the request times out. A job of another type only re-checks.
        loop {
            // Register interest before looking so a job created in between is not missed.
            let created = self.job_created.notified();
            tokio::pin!(created);
            created.as_mut().enable();

            let jobs = self.try_activate(request)?;
            if !jobs.is_empty() || request.request_timeout.is_zero() {
                return Ok(jobs);
            }

            if tokio::time::timeout_at(deadline, created).await.is_err() {
                return Ok(Vec::new());
            }
        }
    }

    async fn publish_message(&self, message: &CorrelatedMessage) -> Result<(), EngineError> {
        let mut state = self.lock();
        if Faults::take(&mut state.faults.publish) {
            return Err(EngineError::transport("injected publish fault"));
        }
        if let Some(id) = &message.message_id {
            if !state.seen_message_ids.insert(id.clone()) {
                state.duplicate_messages += 1;
                return Ok(());
            }
        }
        state.published.push(message.clone());
        Ok(())
    }

    async fn complete_job(
        &self,
        key: JobKey,
        variables: Option<String>,
    ) -> Result<(), EngineError> {
        let mut state = self.lock();
        if Faults::take(&mut state.faults.complete) {
            return Err(EngineError::transport("injected completion fault"));
        }
        let stored = Self::live_activation(&mut state, key)?;
        stored.state = JobState::Completed {
            variables: variables.clone(),
        };
        state.completions.push((key, variables));
        Ok(())
    }

    async fn fail_job(
        &self,
        key: JobKey,
        retries: i32,
        error_message: &str,
    ) -> Result<(), EngineError> {
        let mut state = self.lock();
        if Faults::take(&mut state.faults.fail) {
            return Err(EngineError::transport("injected failure-report fault"));
        }
        let stored = Self::live_activation(&mut state, key)?;
        stored.job.retries = retries;
        stored.state = if retries > 0 {
            JobState::Activatable
        } else {
            JobState::Incident {
                error_message: error_message.to_string(),
            }
        };
        state.failures.push(FailRecord {
            key,
            retries,
            error_message: error_message.to_string(),
        });
        Ok(())
    }
}
