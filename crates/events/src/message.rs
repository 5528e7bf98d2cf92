use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A named message to be correlated by the engine with a waiting process
/// instance.
///
/// - `correlation_key` selects the instance (the order id in string form)
/// - `message_id`, when set, lets the engine drop a duplicate publish of the
///   same message (e.g. after a job was re-dispatched)
/// - `time_to_live` of zero correlates only with instances already waiting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelatedMessage {
    pub name: String,
    pub correlation_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default)]
    pub time_to_live: Duration,
}

impl CorrelatedMessage {
    pub fn new(name: impl Into<String>, correlation_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            correlation_key: correlation_key.into(),
            variables: None,
            message_id: None,
            time_to_live: Duration::ZERO,
        }
    }

    pub fn with_variables(mut self, variables: Option<String>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }
}
