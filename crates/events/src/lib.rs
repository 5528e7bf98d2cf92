//! Correlated messages and the job-type routing table.
//!
//! A message-throw job does not change anything locally: it tells the engine
//! that something happened to an order, and the engine matches the message to
//! whichever process instance is waiting for it. This crate knows *which*
//! message each job type throws and how to derive its correlation key; it
//! performs no IO.

pub mod correlation;
pub mod message;
pub mod routing;

pub use correlation::{Correlation, CorrelationError, PreconditionFact, resolve};
pub use message::CorrelatedMessage;
pub use routing::{FactKind, JobType, MessageRoute, UnknownJobType, VariablesForwarding};
