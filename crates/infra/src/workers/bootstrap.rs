//! Startup and shutdown wiring for the full set of job workers.

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use ecomflow_events::{JobType, MessageRoute};

use crate::engine::SharedEngine;
use crate::jobs::{
    GenerateOrderHandler, MessagePublisher, MessageThrowHandler, OrderIdGenerator, WorkerConfig,
};

use super::registry::{CloseReport, RegistryError, WorkerRegistry};

/// Open one worker per job type: order generation first, then every
/// message-throw route.
pub fn register_all(
    registry: &mut WorkerRegistry,
    engine: &SharedEngine,
    ids: Arc<dyn OrderIdGenerator>,
) -> Result<(), RegistryError> {
    register_all_with(registry, engine, ids, WorkerConfig::for_job_type)
}

/// Like [`register_all`], with the per-worker config supplied by `config_for`.
pub fn register_all_with(
    registry: &mut WorkerRegistry,
    engine: &SharedEngine,
    ids: Arc<dyn OrderIdGenerator>,
    config_for: impl Fn(JobType) -> WorkerConfig,
) -> Result<(), RegistryError> {
    registry.open(
        JobType::GenerateOrder,
        Arc::new(GenerateOrderHandler::new(ids)),
        config_for(JobType::GenerateOrder),
    )?;

    let publisher = MessagePublisher::new(engine.clone());
    let routes: &'static [MessageRoute] = &MessageRoute::ALL;
    for route in routes {
        registry.open(
            route.job_type,
            Arc::new(MessageThrowHandler::new(route, publisher.clone())),
            config_for(route.job_type),
        )?;
    }
    Ok(())
}

/// Run every worker until `shutdown` resolves, then close them all.
pub async fn run_until<F>(
    engine: SharedEngine,
    ids: Arc<dyn OrderIdGenerator>,
    shutdown: F,
) -> anyhow::Result<CloseReport>
where
    F: Future<Output = ()>,
{
    let mut registry = WorkerRegistry::new(engine.clone());
    register_all(&mut registry, &engine, ids).context("failed to open job workers")?;
    info!(workers = registry.len(), "job workers running");

    shutdown.await;

    info!("shutdown requested; closing job workers");
    Ok(registry.close_all().await)
}
