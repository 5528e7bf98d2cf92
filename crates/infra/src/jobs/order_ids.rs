//! Order identifier sources.

use std::sync::Mutex;
use std::sync::atomic::{AtomicI32, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ecomflow_core::OrderId;

/// Source of fresh order identifiers.
///
/// Shared by every concurrently running generation job, hence `Send + Sync`.
pub trait OrderIdGenerator: Send + Sync {
    fn next_id(&self) -> OrderId;
}

/// Uniformly random ids in `[0, i32::MAX)`.
#[derive(Debug)]
pub struct RandomOrderIds {
    rng: Mutex<StdRng>,
}

impl RandomOrderIds {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible sequence, for tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomOrderIds {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderIdGenerator for RandomOrderIds {
    fn next_id(&self) -> OrderId {
        let raw = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            rng.gen_range(0..i32::MAX)
        };
        OrderId::new(raw).unwrap_or_else(|_| unreachable!("range is non-negative"))
    }
}

/// Monotonic ids starting at a given value; deterministic, for tests/dev.
#[derive(Debug)]
pub struct SequentialOrderIds {
    next: AtomicI32,
}

impl SequentialOrderIds {
    pub fn starting_at(first: OrderId) -> Self {
        Self {
            next: AtomicI32::new(first.get()),
        }
    }
}

impl OrderIdGenerator for SequentialOrderIds {
    fn next_id(&self) -> OrderId {
        let raw = self
            .next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                Some(if n == i32::MAX { 0 } else { n + 1 })
            })
            .unwrap_or_else(|n| n);
        OrderId::new(raw).unwrap_or_else(|_| unreachable!("sequence never goes negative"))
    }
}
