use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::OrderId;

/// Catalogue reference of the ordered item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: i32,
    pub variant_id: i32,
    pub quantity: i32,
}

/// An order as seen by the workers.
///
/// Created upstream without an identifier; the identifier is assigned exactly
/// once by the order-generation step and is immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// `null` on the wire until assigned.
    pub id: Option<OrderId>,
    pub item: OrderItem,
}

impl Order {
    pub fn new(item: OrderItem) -> Self {
        Self { id: None, item }
    }

    pub fn with_id(mut self, id: OrderId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn id(&self) -> Option<OrderId> {
        self.id
    }

    /// Assign the order identifier.
    ///
    /// Fails if an identifier is already present; identifiers never change.
    pub fn assign_id(&mut self, id: OrderId) -> DomainResult<()> {
        if let Some(existing) = self.id {
            return Err(DomainError::invariant(format!(
                "order already identified as {existing}"
            )));
        }
        self.id = Some(id);
        Ok(())
    }
}

/// Seller decision on a customer's return request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
}

impl ReturnRequest {
    pub fn approved() -> Self {
        Self {
            approved: Some(true),
        }
    }

    pub fn rejected() -> Self {
        Self {
            approved: Some(false),
        }
    }

    /// An absent decision counts as a rejection.
    pub fn is_approved(&self) -> bool {
        self.approved.unwrap_or(false)
    }
}
