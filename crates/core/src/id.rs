//! Strongly-typed identifiers used across the workers.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of an order.
///
/// Assigned once by the order-generation step; the decimal string form is the
/// correlation key for every message that advances the order's processes.
///
/// Generated ids are never negative, so a negative `order.id` in a payload is
/// rejected on deserialize rather than carried into a correlation key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct OrderId(i32);

/// Engine-assigned key of a job.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobKey(i64);

macro_rules! impl_int_newtype {
    ($t:ty, $inner:ty, $name:literal) => {
        impl $t {
            pub fn get(&self) -> $inner {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<$t> for $inner {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl $t {
            fn parse_raw(s: &str) -> Result<$inner, DomainError> {
                <$inner>::from_str(s)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))
            }
        }
    };
}

impl OrderId {
    /// Order ids are drawn from the non-negative half of `i32`.
    pub fn new(raw: i32) -> Result<Self, DomainError> {
        if raw < 0 {
            return Err(DomainError::invalid_id(format!(
                "OrderId: {raw} is negative"
            )));
        }
        Ok(Self(raw))
    }
}

impl TryFrom<i32> for OrderId {
    type Error = DomainError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl JobKey {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }
}

impl From<i64> for JobKey {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl_int_newtype!(OrderId, i32, "OrderId");
impl_int_newtype!(JobKey, i64, "JobKey");

impl FromStr for OrderId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(Self::parse_raw(s)?)
    }
}

impl FromStr for JobKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Self::parse_raw(s)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_rejects_negative_values() {
        assert!(OrderId::new(-1).is_err());
        assert_eq!(OrderId::new(0).unwrap().get(), 0);
        assert_eq!(OrderId::new(i32::MAX).unwrap().get(), i32::MAX);
    }

    #[test]
    fn order_id_display_is_decimal() {
        let id = OrderId::new(42).unwrap();
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn order_id_parses_from_string() {
        let id: OrderId = "1337".parse().unwrap();
        assert_eq!(id.get(), 1337);

        let err = "abc".parse::<OrderId>().unwrap_err();
        assert!(matches!(err, DomainError::InvalidId(_)));

        assert!("-5".parse::<OrderId>().is_err());
    }

    #[test]
    fn order_id_deserialization_rejects_negative_values() {
        let id: OrderId = serde_json::from_str("7").unwrap();
        assert_eq!(id.get(), 7);
        assert!(serde_json::from_str::<OrderId>("-7").is_err());
        assert_eq!(serde_json::to_string(&id).unwrap(), "7");
    }

    #[test]
    fn job_key_round_trips_through_string() {
        let key = JobKey::new(2251799813685249);
        let parsed: JobKey = key.to_string().parse().unwrap();
        assert_eq!(parsed, key);
    }
}
