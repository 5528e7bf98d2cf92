//! Workflow engine capability interface.
//!
//! The engine (scheduling, persistence, process state) is a remote service.
//! Workers only ever talk to it through [`EngineClient`]: activate jobs,
//! publish correlated messages, and report job outcomes. The wire protocol
//! behind the trait is not part of this crate.

pub mod in_memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ecomflow_core::JobKey;
use ecomflow_events::CorrelatedMessage;

pub use in_memory::InMemoryEngine;

/// A unit of work claimed from the engine.
///
/// The engine owns the job; a worker holds it only while handling it. After
/// `deadline` the engine may hand the same job to another worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub key: JobKey,
    pub job_type: String,
    /// Serialized process variables (JSON object).
    pub variables: String,
    /// Remaining business retries.
    pub retries: i32,
    pub deadline: DateTime<Utc>,
    /// Name of the worker that activated the job.
    pub worker: String,
    pub process_instance_key: i64,
}

impl Job {
    /// Retry count to report when this attempt fails.
    ///
    /// May go to zero or below; the engine treats that as terminal.
    pub fn remaining_after_failure(&self) -> i32 {
        self.retries.saturating_sub(1)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.deadline
    }

    /// Detached job with a 10s deadline, for handler tests.
    #[cfg(test)]
    pub(crate) fn for_test(job_type: &str, variables: &str, retries: i32) -> Self {
        Self {
            key: JobKey::new(1),
            job_type: job_type.to_string(),
            variables: variables.to_string(),
            retries,
            deadline: Utc::now() + chrono::Duration::seconds(10),
            worker: format!("{job_type}Worker"),
            process_instance_key: 1,
        }
    }
}

/// Parameters of one activation (poll) request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivateJobsRequest {
    pub job_type: String,
    pub worker: String,
    pub max_jobs: usize,
    /// How long an activated job stays locked to this worker.
    pub timeout: Duration,
    /// How long the engine may hold the request open waiting for jobs.
    pub request_timeout: Duration,
}

/// Engine command failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The command did not reach the engine or its answer was lost.
    #[error("transport error: {0}")]
    Transport(String),

    /// The engine processed and refused the command (e.g. the job is unknown,
    /// already completed, or was reclaimed after a timeout).
    #[error("command rejected: {0}")]
    Rejected(String),
}

impl EngineError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    /// Whether resending the same command may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::Transport(_))
    }
}

/// Commands the workers need from the engine.
#[async_trait]
pub trait EngineClient: Send + Sync {
    /// Claim up to `request.max_jobs` jobs of `request.job_type`.
    async fn activate_jobs(&self, request: &ActivateJobsRequest) -> Result<Vec<Job>, EngineError>;

    /// Publish a message to be correlated with a waiting process instance.
    async fn publish_message(&self, message: &CorrelatedMessage) -> Result<(), EngineError>;

    /// Mark a job as done, optionally merging `variables` into the process.
    async fn complete_job(&self, key: JobKey, variables: Option<String>)
    -> Result<(), EngineError>;

    /// Mark a job attempt as failed, leaving `retries` retries.
    async fn fail_job(&self, key: JobKey, retries: i32, error_message: &str)
    -> Result<(), EngineError>;
}

#[async_trait]
impl<C> EngineClient for Arc<C>
where
    C: EngineClient + ?Sized,
{
    async fn activate_jobs(&self, request: &ActivateJobsRequest) -> Result<Vec<Job>, EngineError> {
        (**self).activate_jobs(request).await
    }

    async fn publish_message(&self, message: &CorrelatedMessage) -> Result<(), EngineError> {
        (**self).publish_message(message).await
    }

    async fn complete_job(
        &self,
        key: JobKey,
        variables: Option<String>,
    ) -> Result<(), EngineError> {
        (**self).complete_job(key, variables).await
    }

    async fn fail_job(
        &self,
        key: JobKey,
        retries: i32,
        error_message: &str,
    ) -> Result<(), EngineError> {
        (**self).fail_job(key, retries, error_message).await
    }
}

/// Engine handle shared by every worker.
pub type SharedEngine = Arc<dyn EngineClient>;
