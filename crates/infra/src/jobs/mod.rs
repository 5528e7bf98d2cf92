//! Job handling: from a claimed job to a reported outcome.
//!
//! ## Design
//!
//! - Every job is handled in a fixed order: decode → resolve correlation → publish → report
//! - The handler body returns a `Result`; the dispatcher branches on it
//! - Success completes the job; any handler error fails it with one retry decremented
//! - The engine, not the worker, decides whether a failed job runs again
//!
//! ## Components
//!
//! - `JobHandler`: the per-type handler body (message throw, order generation)
//! - `MessagePublisher`: sends correlated messages, no local retry
//! - `JobOutcomeReporter`: complete / fail, with transport-level retry for failures
//! - `JobDispatcher`: sequences handler and reporter for one job

pub mod config;
pub mod dispatcher;
pub mod handlers;
pub mod order_ids;
pub mod publisher;
pub mod reporter;

pub use config::{BackoffStrategy, RetryPolicy, WorkerConfig};
pub use dispatcher::JobDispatcher;
pub use handlers::{
    Completion, GenerateOrderHandler, HandlerError, JobHandler, MessageThrowHandler,
};
pub use order_ids::{OrderIdGenerator, RandomOrderIds, SequentialOrderIds};
pub use publisher::{MessagePublisher, PublishError};
pub use reporter::{JobOutcomeReporter, ReportError, ReportOutcome};
