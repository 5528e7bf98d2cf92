//! Correlated message publishing.

use thiserror::Error;
use tracing::debug;

use ecomflow_events::CorrelatedMessage;

use crate::engine::{EngineError, SharedEngine};

/// The engine did not accept a correlated message.
#[derive(Debug, Clone, Error)]
#[error("failed to publish {message_name} (correlation key {correlation_key}): {source}")]
pub struct PublishError {
    pub message_name: String,
    pub correlation_key: String,
    #[source]
    pub source: EngineError,
}

/// Sends correlated messages to the engine.
///
/// `publish` completes only once the engine answered, so a caller never
/// reports a job as done for a message that was not accepted. There is no
/// local retry: a failed publish fails the job, and the engine's redispatch
/// is the retry.
#[derive(Clone)]
pub struct MessagePublisher {
    engine: SharedEngine,
}

impl MessagePublisher {
    pub fn new(engine: SharedEngine) -> Self {
        Self { engine }
    }

    pub async fn publish(&self, message: &CorrelatedMessage) -> Result<(), PublishError> {
        debug!(
            message_name = %message.name,
            correlation_key = %message.correlation_key,
            message_id = message.message_id.as_deref().unwrap_or(""),
            with_variables = message.variables.is_some(),
            "publishing message"
        );

        self.engine
            .publish_message(message)
            .await
            .map_err(|source| PublishError {
                message_name: message.name.clone(),
                correlation_key: message.correlation_key.clone(),
                source,
            })
    }
}
