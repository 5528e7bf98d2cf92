//! Job handler bodies.

mod generate_order;
mod message_throw;

use async_trait::async_trait;
use thiserror::Error;

use ecomflow_core::DecodeError;
use ecomflow_events::CorrelationError;

use crate::engine::Job;

use super::publisher::PublishError;

pub use generate_order::GenerateOrderHandler;
pub use message_throw::MessageThrowHandler;

/// Successful handler result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    /// Variables to merge into the process on completion.
    pub variables: Option<String>,
}

impl Completion {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_variables(variables: String) -> Self {
        Self {
            variables: Some(variables),
        }
    }
}

/// Failure of a handler body. Every variant fails the job with one retry
/// decremented; the engine decides what happens next.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Correlation(#[from] CorrelationError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl HandlerError {
    /// Step of the handling sequence that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            HandlerError::Decode(_) => "decode",
            HandlerError::Correlation(_) => "correlate",
            HandlerError::Publish(_) => "publish",
        }
    }
}

/// Handler body for one job type.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job) -> Result<Completion, HandlerError>;
}
