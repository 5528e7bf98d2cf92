//! Worker configuration and retry policies.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use ecomflow_events::JobType;

/// Backoff strategy for retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed,
    /// Exponential backoff: base * 2^(attempt - 1)
    #[default]
    Exponential,
}

/// Transport-level retry policy.
///
/// Governs resending a command the engine never acknowledged. It is
/// unrelated to a job's business retry budget, which only the outcome of the
/// handler changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of resends (`None` = until acknowledged)
    pub max_attempts: Option<u32>,
    /// Base delay between resends
    pub base_delay: Duration,
    /// Maximum delay cap
    pub max_delay: Duration,
    /// Backoff strategy
    pub strategy: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            strategy: BackoffStrategy::Exponential,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with fixed delays.
    pub fn fixed(max_attempts: Option<u32>, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            max_delay: delay,
            strategy: BackoffStrategy::Fixed,
        }
    }

    /// Calculate delay before resend number `attempt` (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        match self.strategy {
            BackoffStrategy::Fixed => self.base_delay,
            BackoffStrategy::Exponential => {
                let factor = 2u32.saturating_pow(attempt - 1);
                self.base_delay
                    .saturating_mul(factor)
                    .min(self.max_delay)
            }
        }
    }

    /// Check if another resend is allowed after `attempt` resends.
    pub fn should_retry(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt < max)
    }
}

/// Per-worker configuration.
///
/// Defaults are the values every worker runs with: at most 3 jobs in flight,
/// 10s job lock, 30s between empty polls, 10s long-poll request timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Name reported to the engine and used in logs
    pub name: String,
    /// Maximum jobs in flight for this worker
    pub max_jobs_active: usize,
    /// How long a claimed job stays locked to this worker
    pub timeout: Duration,
    /// Wait between polls that returned no jobs
    pub poll_interval: Duration,
    /// How long one poll request may be held open by the engine
    pub poll_request_timeout: Duration,
    /// How long close waits for in-flight jobs before abandoning them
    pub drain_timeout: Duration,
    /// Resend policy for failure reports
    pub report_retry: RetryPolicy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            name: "job-worker".to_string(),
            max_jobs_active: 3,
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_secs(30),
            poll_request_timeout: Duration::from_secs(10),
            drain_timeout: Duration::from_secs(10),
            report_retry: RetryPolicy::default(),
        }
    }
}

impl WorkerConfig {
    /// Default configuration named after the job type (`PayOrderWorker`, ...).
    pub fn for_job_type(job_type: JobType) -> Self {
        Self::default().with_name(job_type.worker_name())
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_max_jobs_active(mut self, max: usize) -> Self {
        self.max_jobs_active = max;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_poll_request_timeout(mut self, timeout: Duration) -> Self {
        self.poll_request_timeout = timeout;
        self
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    pub fn with_report_retry(mut self, policy: RetryPolicy) -> Self {
        self.report_retry = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_backoff_calculates_correctly() {
        let policy = RetryPolicy {
            max_attempts: Some(5),
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            strategy: BackoffStrategy::Exponential,
        };

        assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(800));
    }

    #[test]
    fn exponential_backoff_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(40), policy.max_delay);
    }

    #[test]
    fn fixed_backoff_is_constant() {
        let policy = RetryPolicy::fixed(Some(3), Duration::from_millis(500));

        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(500));
    }

    #[test]
    fn default_policy_retries_until_acknowledged() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(u32::MAX - 1));
    }

    #[test]
    fn should_retry_respects_max_attempts() {
        let policy = RetryPolicy::fixed(Some(2), Duration::from_millis(1));

        assert!(policy.should_retry(0));
        assert!(policy.should_retry(1));
        assert!(!policy.should_retry(2));
        assert!(!RetryPolicy::fixed(Some(0), Duration::ZERO).should_retry(0));
    }

    #[test]
    fn worker_defaults() {
        let cfg = WorkerConfig::for_job_type(JobType::ShipOrder);
        assert_eq!(cfg.name, "ShipOrderWorker");
        assert_eq!(cfg.max_jobs_active, 3);
        assert_eq!(cfg.timeout, Duration::from_secs(10));
        assert_eq!(cfg.poll_interval, Duration::from_secs(30));
        assert_eq!(cfg.poll_request_timeout, Duration::from_secs(10));
    }
}
