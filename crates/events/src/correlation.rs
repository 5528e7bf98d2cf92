//! Correlation resolution: payload → (message name, correlation key, variables).

use thiserror::Error;
use tracing::info;

use ecomflow_core::{HasOrder, OrderId, ProcessVariables, VariablesKind, encode};

use crate::message::CorrelatedMessage;
use crate::routing::{FactKind, JobType, MessageRoute, VariablesForwarding};

/// Why a payload cannot be correlated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrelationError {
    /// The order has no identifier yet, so there is no correlation key.
    #[error("order has no identifier; cannot correlate {message_name}")]
    MissingOrderId { message_name: &'static str },

    /// The job type does not throw a message.
    #[error("job type {0} has no message route")]
    NoRoute(JobType),

    /// The payload has the wrong shape for the route.
    #[error("{job_type} expects {expected} variables, got {found}")]
    UnexpectedVariables {
        job_type: JobType,
        expected: VariablesKind,
        found: VariablesKind,
    },
}

/// Business fact logged before a message is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionFact {
    OrderedItem {
        item_id: i32,
        variant_id: i32,
        quantity: i32,
    },
    OrderReference {
        order_id: OrderId,
    },
    ReturnDecision {
        order_id: OrderId,
        approved: bool,
    },
}

impl PreconditionFact {
    /// `"approved"` / `"rejected"` for return decisions.
    pub fn decision(&self) -> Option<&'static str> {
        match self {
            PreconditionFact::ReturnDecision { approved: true, .. } => Some("approved"),
            PreconditionFact::ReturnDecision { approved: false, .. } => Some("rejected"),
            _ => None,
        }
    }

    fn log(&self, route: &MessageRoute) {
        match *self {
            PreconditionFact::OrderedItem {
                item_id,
                variant_id,
                quantity,
            } => info!(
                job_type = %route.job_type,
                item_id,
                variant_id,
                quantity,
                "{}", route.summary
            ),
            PreconditionFact::OrderReference { order_id } => info!(
                job_type = %route.job_type,
                order_id = %order_id,
                "{}", route.summary
            ),
            PreconditionFact::ReturnDecision { order_id, .. } => info!(
                job_type = %route.job_type,
                order_id = %order_id,
                decision = self.decision().unwrap_or("rejected"),
                "{}", route.summary
            ),
        }
    }
}

/// Resolved correlation for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correlation {
    pub message_name: &'static str,
    pub correlation_key: String,
    pub variables: Option<String>,
    pub fact: PreconditionFact,
}

impl Correlation {
    /// Build the message to publish.
    ///
    /// `dedupe_scope` identifies the unit of work throwing the message (the job
    /// key); together with the message name it forms the message id.
    pub fn into_message(self, dedupe_scope: impl core::fmt::Display) -> CorrelatedMessage {
        let message_id = format!("{}-{}", self.message_name, dedupe_scope);
        CorrelatedMessage::new(self.message_name, self.correlation_key)
            .with_variables(self.variables)
            .with_message_id(message_id)
    }
}

/// Resolve the message a job of `job_type` throws for `variables`.
///
/// The correlation key is the order id; a payload without one is rejected
/// before anything is logged or sent.
pub fn resolve(
    job_type: JobType,
    variables: &ProcessVariables,
) -> Result<Correlation, CorrelationError> {
    let route = job_type.route().ok_or(CorrelationError::NoRoute(job_type))?;

    if variables.kind() != route.variables_kind {
        return Err(CorrelationError::UnexpectedVariables {
            job_type,
            expected: route.variables_kind,
            found: variables.kind(),
        });
    }

    let order = variables.order();
    let order_id = order.id().ok_or(CorrelationError::MissingOrderId {
        message_name: route.message_name,
    })?;

    let fact = match route.fact {
        FactKind::OrderedItem => PreconditionFact::OrderedItem {
            item_id: order.item.id,
            variant_id: order.item.variant_id,
            quantity: order.item.quantity,
        },
        FactKind::OrderReference => PreconditionFact::OrderReference { order_id },
        FactKind::ReturnDecision => PreconditionFact::ReturnDecision {
            order_id,
            approved: variables
                .return_request()
                .is_some_and(|r| r.is_approved()),
        },
    };
    fact.log(route);

    let variables = match route.forwarding {
        VariablesForwarding::None => None,
        VariablesForwarding::FullPayload => Some(encode(variables)),
    };

    Ok(Correlation {
        message_name: route.message_name,
        correlation_key: order_id.to_string(),
        variables,
        fact,
    })
}
