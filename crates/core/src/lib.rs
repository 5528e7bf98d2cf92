//! `ecomflow-core` — process variable model shared by every job worker.
//!
//! This crate contains **pure data** (no engine or IO concerns): identifiers,
//! the order/return payload carried by jobs, and the JSON codec for it.

pub mod codec;
pub mod error;
pub mod id;
pub mod order;
pub mod variables;

pub use codec::{DecodeError, decode, encode};
pub use error::{DomainError, DomainResult};
pub use id::{JobKey, OrderId};
pub use order::{Order, OrderItem, ReturnRequest};
pub use variables::{CustomerVariables, HasOrder, ProcessVariables, SellerVariables, VariablesKind};
