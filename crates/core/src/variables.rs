//! Process variables carried by jobs.
//!
//! The engine attaches one JSON object to every job. Which shape that object
//! has depends on the process the job belongs to (customer-side or
//! seller-side), so the set of shapes is closed and selected explicitly by the
//! caller through [`VariablesKind`] rather than guessed from the content.

use serde::{Deserialize, Serialize};

use crate::order::{Order, ReturnRequest};

/// Anything that carries an order.
pub trait HasOrder {
    fn order(&self) -> &Order;

    fn order_mut(&mut self) -> &mut Order;
}

/// Variables of the customer-side process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerVariables {
    pub order: Order,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_defect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_request: Option<ReturnRequest>,
}

/// Variables of the seller-side process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerVariables {
    pub order: Order,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_request: Option<ReturnRequest>,
}

impl CustomerVariables {
    pub fn new(order: Order) -> Self {
        Self {
            order,
            is_defect: None,
            return_request: None,
        }
    }
}

impl SellerVariables {
    pub fn new(order: Order) -> Self {
        Self {
            order,
            return_request: None,
        }
    }

    pub fn with_return_request(mut self, request: ReturnRequest) -> Self {
        self.return_request = Some(request);
        self
    }
}

impl HasOrder for CustomerVariables {
    fn order(&self) -> &Order {
        &self.order
    }

    fn order_mut(&mut self) -> &mut Order {
        &mut self.order
    }
}

impl HasOrder for SellerVariables {
    fn order(&self) -> &Order {
        &self.order
    }

    fn order_mut(&mut self) -> &mut Order {
        &mut self.order
    }
}

/// Selector for the payload shape a job type expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariablesKind {
    Customer,
    Seller,
}

impl VariablesKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariablesKind::Customer => "customer",
            VariablesKind::Seller => "seller",
        }
    }
}

impl core::fmt::Display for VariablesKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded payload of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessVariables {
    Customer(CustomerVariables),
    Seller(SellerVariables),
}

impl ProcessVariables {
    pub fn kind(&self) -> VariablesKind {
        match self {
            ProcessVariables::Customer(_) => VariablesKind::Customer,
            ProcessVariables::Seller(_) => VariablesKind::Seller,
        }
    }

    /// Return request, if the process has one.
    pub fn return_request(&self) -> Option<&ReturnRequest> {
        match self {
            ProcessVariables::Customer(v) => v.return_request.as_ref(),
            ProcessVariables::Seller(v) => v.return_request.as_ref(),
        }
    }
}

impl HasOrder for ProcessVariables {
    fn order(&self) -> &Order {
        match self {
            ProcessVariables::Customer(v) => v.order(),
            ProcessVariables::Seller(v) => v.order(),
        }
    }

    fn order_mut(&mut self) -> &mut Order {
        match self {
            ProcessVariables::Customer(v) => v.order_mut(),
            ProcessVariables::Seller(v) => v.order_mut(),
        }
    }
}

impl From<CustomerVariables> for ProcessVariables {
    fn from(value: CustomerVariables) -> Self {
        ProcessVariables::Customer(value)
    }
}

impl From<SellerVariables> for ProcessVariables {
    fn from(value: SellerVariables) -> Self {
        ProcessVariables::Seller(value)
    }
}
