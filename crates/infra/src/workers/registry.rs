use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{info, warn};

use ecomflow_events::JobType;

use crate::engine::SharedEngine;
use crate::jobs::{JobHandler, WorkerConfig};

use super::worker::{self, CloseError, WorkerHandle};

/// Opening a worker failed. Fatal to startup.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no async runtime available to run worker {worker}")]
    NoRuntime { worker: String },

    #[error("invalid configuration for worker {worker}: {reason}")]
    InvalidConfig { worker: String, reason: &'static str },
}

/// Result of closing every registered worker.
#[derive(Debug, Default)]
pub struct CloseReport {
    pub closed: usize,
    pub failures: Vec<CloseError>,
}

impl CloseReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Owns every running worker.
///
/// Filled once at startup through [`WorkerRegistry::open`] and consumed at
/// shutdown by [`WorkerRegistry::close_all`]. Opening the same job type twice
/// starts a second, independent worker.
pub struct WorkerRegistry {
    engine: SharedEngine,
    handles: Vec<WorkerHandle>,
}

impl WorkerRegistry {
    pub fn new(engine: SharedEngine) -> Self {
        Self {
            engine,
            handles: Vec::new(),
        }
    }

    /// Start a worker for `job_type` and keep its handle.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(
        &mut self,
        job_type: JobType,
        handler: Arc<dyn JobHandler>,
        config: WorkerConfig,
    ) -> Result<&WorkerHandle, RegistryError> {
        validate(&config)?;
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(RegistryError::NoRuntime {
                worker: config.name,
            });
        }

        info!(
            worker = %config.name,
            job_type = %job_type,
            max_jobs_active = config.max_jobs_active,
            "opening job worker"
        );
        let handle = worker::spawn(
            self.engine.clone(),
            job_type.as_str().to_string(),
            handler,
            config,
        );
        self.handles.push(handle);
        Ok(&self.handles[self.handles.len() - 1])
    }

    pub fn handles(&self) -> &[WorkerHandle] {
        &self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Close every worker.
    ///
    /// Every worker is told to stop before any is waited on, so none keeps
    /// claiming jobs while another drains. Each close is attempted even when
    /// another fails.
    pub async fn close_all(self) -> CloseReport {
        for handle in &self.handles {
            handle.signal();
        }

        let mut names = HashMap::new();
        let mut closing = JoinSet::new();
        for handle in self.handles {
            let name = handle.name().to_string();
            let task = closing.spawn(handle.join());
            names.insert(task.id(), name);
        }

        let mut report = CloseReport::default();
        while let Some(joined) = closing.join_next_with_id().await {
            let result = match joined {
                Ok((_, result)) => result,
                Err(source) => Err(CloseError::Panicked {
                    name: names.remove(&source.id()).unwrap_or_default(),
                    source,
                }),
            };
            match result {
                Ok(()) => report.closed += 1,
                Err(err) => {
                    warn!(error = %err, "job worker did not close cleanly");
                    report.failures.push(err);
                }
            }
        }
        info!(
            closed = report.closed,
            failed = report.failures.len(),
            "job workers closed"
        );
        report
    }
}

fn validate(config: &WorkerConfig) -> Result<(), RegistryError> {
    let reason = if config.max_jobs_active == 0 {
        Some("max_jobs_active must be at least 1")
    } else if config.timeout.is_zero() {
        Some("job timeout must be non-zero")
    } else if config.name.trim().is_empty() {
        Some("worker name must not be empty")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(RegistryError::InvalidConfig {
            worker: config.name.clone(),
            reason,
        }),
        None => Ok(()),
    }
}
