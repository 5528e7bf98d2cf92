use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use ecomflow_core::{HasOrder, VariablesKind, decode, encode};

use crate::engine::Job;
use crate::jobs::order_ids::OrderIdGenerator;

use super::{Completion, HandlerError, JobHandler};

/// Assigns a fresh identifier to a newly placed order.
///
/// Completes with the updated payload so every later step of the process sees
/// the id. An order that already has an id keeps it: the job completes with
/// the payload unchanged and a warning is logged.
#[derive(Clone)]
pub struct GenerateOrderHandler {
    ids: Arc<dyn OrderIdGenerator>,
}

impl GenerateOrderHandler {
    pub fn new(ids: Arc<dyn OrderIdGenerator>) -> Self {
        Self { ids }
    }
}

#[async_trait]
impl JobHandler for GenerateOrderHandler {
    async fn handle(&self, job: &Job) -> Result<Completion, HandlerError> {
        let mut variables = decode(&job.variables, VariablesKind::Customer)?;
        let order = variables.order_mut();

        let id = self.ids.next_id();
        match order.assign_id(id) {
            Ok(()) => info!(
                order_id = %id,
                item_id = order.item.id,
                variant_id = order.item.variant_id,
                quantity = order.item.quantity,
                "generated order id"
            ),
            Err(err) => warn!(
                job_key = %job.key,
                error = %err,
                "order already has an identifier; keeping it"
            ),
        }

        Ok(Completion::with_variables(encode(&variables)))
    }
}

#[cfg(test)]
mod tests {
    use ecomflow_core::OrderId;

    use super::*;
    use crate::jobs::order_ids::SequentialOrderIds;

    fn handler(first: i32) -> GenerateOrderHandler {
        GenerateOrderHandler::new(Arc::new(SequentialOrderIds::starting_at(
            OrderId::new(first).unwrap(),
        )))
    }

    fn order_id(completion: &Completion) -> serde_json::Value {
        let vars: serde_json::Value =
            serde_json::from_str(completion.variables.as_deref().unwrap()).unwrap();
        vars["order"]["id"].clone()
    }

    #[tokio::test]
    async fn assigns_id_to_new_order() {
        let job = Job::for_test(
            "GenerateOrder",
            r#"{"order":{"id":null,"item":{"id":7,"variantId":2,"quantity":3}}}"#,
            3,
        );

        let completion = handler(500).handle(&job).await.unwrap();

        assert_eq!(order_id(&completion), serde_json::json!(500));
    }

    #[tokio::test]
    async fn random_ids_are_non_negative() {
        let handler = GenerateOrderHandler::new(Arc::new(
            crate::jobs::order_ids::RandomOrderIds::seeded(1),
        ));
        let job = Job::for_test(
            "GenerateOrder",
            r#"{"order":{"item":{"id":7,"variantId":2,"quantity":3}}}"#,
            3,
        );

        let completion = handler.handle(&job).await.unwrap();

        assert!(order_id(&completion).as_i64().unwrap() >= 0);
    }

    #[tokio::test]
    async fn keeps_existing_id() {
        let job = Job::for_test(
            "GenerateOrder",
            r#"{"order":{"id":42,"item":{"id":7,"variantId":2,"quantity":3}},"isDefect":"no"}"#,
            3,
        );

        let completion = handler(500).handle(&job).await.unwrap();

        assert_eq!(order_id(&completion), serde_json::json!(42));
        let vars: serde_json::Value =
            serde_json::from_str(completion.variables.as_deref().unwrap()).unwrap();
        assert_eq!(vars["isDefect"], serde_json::json!("no"));
    }

    #[tokio::test]
    async fn regenerating_own_output_keeps_first_id() {
        let handler = handler(500);
        let first = handler
            .handle(&Job::for_test(
                "GenerateOrder",
                r#"{"order":{"item":{"id":7,"variantId":2,"quantity":3}}}"#,
                3,
            ))
            .await
            .unwrap();

        let again = handler
            .handle(&Job::for_test(
                "GenerateOrder",
                first.variables.as_deref().unwrap(),
                3,
            ))
            .await
            .unwrap();

        assert_eq!(order_id(&first), serde_json::json!(500));
        assert_eq!(order_id(&again), serde_json::json!(500));
    }

    #[tokio::test]
    async fn malformed_payload_is_a_decode_error() {
        let job = Job::for_test("GenerateOrder", r#"{"order":"nope"}"#, 3);

        let err = handler(1).handle(&job).await.unwrap_err();
        assert_eq!(err.stage(), "decode");
    }
}
