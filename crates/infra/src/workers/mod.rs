//! Long-running job workers.
//!
//! One poll loop per job type binding, owned by a [`WorkerRegistry`] that is
//! filled at startup and closed as a whole at shutdown.

pub mod bootstrap;
pub mod registry;
pub mod worker;

pub use bootstrap::{register_all, register_all_with, run_until};
pub use registry::{CloseReport, RegistryError, WorkerRegistry};
pub use worker::{CloseError, WorkerHandle, WorkerStats};
