//! Job types and the message each one throws.

use core::str::FromStr;

use ecomflow_core::VariablesKind;

/// Every job type the workers subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobType {
    GenerateOrder,
    PlaceOrder,
    PayOrder,
    OrderCompletion,
    ReturnRequest,
    ShipReturn,
    ShipOrder,
    ReturnApproval,
}

impl JobType {
    /// All job types, in registration order.
    pub const ALL: [JobType; 8] = [
        JobType::GenerateOrder,
        JobType::PlaceOrder,
        JobType::PayOrder,
        JobType::OrderCompletion,
        JobType::ReturnRequest,
        JobType::ShipReturn,
        JobType::ShipOrder,
        JobType::ReturnApproval,
    ];

    /// Type tag as used by the engine.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::GenerateOrder => "GenerateOrder",
            JobType::PlaceOrder => "PlaceOrder",
            JobType::PayOrder => "PayOrder",
            JobType::OrderCompletion => "OrderCompletion",
            JobType::ReturnRequest => "ReturnRequest",
            JobType::ShipReturn => "ShipReturn",
            JobType::ShipOrder => "ShipOrder",
            JobType::ReturnApproval => "ReturnApproval",
        }
    }

    /// Default worker name for this job type.
    pub fn worker_name(&self) -> String {
        format!("{}Worker", self.as_str())
    }

    /// Message thrown by jobs of this type, if any.
    pub fn route(&self) -> Option<&'static MessageRoute> {
        let routes: &'static [MessageRoute] = &MessageRoute::ALL;
        routes.iter().find(|r| r.job_type == *self)
    }
}

impl core::fmt::Display for JobType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown job type: {0}")]
pub struct UnknownJobType(pub String);

impl FromStr for JobType {
    type Err = UnknownJobType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownJobType(s.to_string()))
    }
}

/// Whether a thrown message carries the job's payload along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariablesForwarding {
    /// Message carries no variables.
    None,
    /// Message carries the full decoded payload, re-encoded.
    FullPayload,
}

/// What a message-throw job logs before publishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactKind {
    /// Item id, variant id and quantity of the order.
    OrderedItem,
    /// The order id.
    OrderReference,
    /// The order id plus approved/rejected.
    ReturnDecision,
}

/// Routing entry: job type → correlated message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRoute {
    pub job_type: JobType,
    pub message_name: &'static str,
    pub variables_kind: VariablesKind,
    pub forwarding: VariablesForwarding,
    pub fact: FactKind,
    /// Human-readable label of the business event, used in logs.
    pub summary: &'static str,
}

impl MessageRoute {
    pub const ALL: [MessageRoute; 7] = [
        MessageRoute {
            job_type: JobType::PlaceOrder,
            message_name: "msgCustomerPlaceOrder",
            variables_kind: VariablesKind::Customer,
            forwarding: VariablesForwarding::FullPayload,
            fact: FactKind::OrderedItem,
            summary: "order placed",
        },
        MessageRoute {
            job_type: JobType::PayOrder,
            message_name: "msgCustomerPayOrder",
            variables_kind: VariablesKind::Customer,
            forwarding: VariablesForwarding::None,
            fact: FactKind::OrderReference,
            summary: "payment received",
        },
        MessageRoute {
            job_type: JobType::OrderCompletion,
            message_name: "msgCustomerConfirmComplete",
            variables_kind: VariablesKind::Customer,
            forwarding: VariablesForwarding::None,
            fact: FactKind::OrderReference,
            summary: "order completion confirmed",
        },
        MessageRoute {
            job_type: JobType::ReturnRequest,
            message_name: "msgCustomerRequestReturn",
            variables_kind: VariablesKind::Customer,
            forwarding: VariablesForwarding::None,
            fact: FactKind::OrderReference,
            summary: "return requested",
        },
        MessageRoute {
            job_type: JobType::ShipReturn,
            message_name: "msgCustomerShipReturn",
            variables_kind: VariablesKind::Customer,
            forwarding: VariablesForwarding::None,
            fact: FactKind::OrderReference,
            summary: "returned item sent back",
        },
        MessageRoute {
            job_type: JobType::ShipOrder,
            message_name: "msgSellerShipOrder",
            variables_kind: VariablesKind::Seller,
            forwarding: VariablesForwarding::None,
            fact: FactKind::OrderReference,
            summary: "shipment sent",
        },
        MessageRoute {
            job_type: JobType::ReturnApproval,
            message_name: "msgSellerReturnApproval",
            variables_kind: VariablesKind::Seller,
            forwarding: VariablesForwarding::FullPayload,
            fact: FactKind::ReturnDecision,
            summary: "return request decided",
        },
    ];

    pub fn forwards_payload(&self) -> bool {
        self.forwarding == VariablesForwarding::FullPayload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_type_parses_engine_tags() {
        for job_type in JobType::ALL {
            assert_eq!(job_type.as_str().parse::<JobType>().unwrap(), job_type);
        }
        assert!("ShipOrderr".parse::<JobType>().is_err());
    }

    #[test]
    fn every_job_type_but_generation_has_a_route() {
        assert!(JobType::GenerateOrder.route().is_none());
        for job_type in JobType::ALL.into_iter().skip(1) {
            let route = job_type.route().unwrap();
            assert_eq!(route.job_type, job_type);
        }
    }

    #[test]
    fn only_place_order_and_return_approval_forward_payload() {
        let forwarding: Vec<_> = MessageRoute::ALL
            .iter()
            .filter(|r| r.forwards_payload())
            .map(|r| r.job_type)
            .collect();
        assert_eq!(forwarding, vec![JobType::PlaceOrder, JobType::ReturnApproval]);
    }

    #[test]
    fn seller_routes_decode_seller_variables() {
        assert_eq!(
            JobType::ShipOrder.route().unwrap().variables_kind,
            VariablesKind::Seller
        );
        assert_eq!(
            JobType::ReturnApproval.route().unwrap().variables_kind,
            VariablesKind::Seller
        );
        assert_eq!(
            JobType::ShipReturn.route().unwrap().variables_kind,
            VariablesKind::Customer
        );
    }

    #[test]
    fn worker_names_follow_job_type() {
        assert_eq!(JobType::PayOrder.worker_name(), "PayOrderWorker");
    }
}
