use std::sync::Arc;

use ecomflow_infra::engine::{InMemoryEngine, SharedEngine};
use ecomflow_infra::jobs::RandomOrderIds;
use ecomflow_infra::workers::run_until;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ecomflow_observability::init();

    // Only the in-process engine ships with this crate; a networked client
    // plugs in through `EngineClient`.
    tracing::warn!("no engine endpoint configured; running against the in-memory engine");
    let engine: SharedEngine = Arc::new(InMemoryEngine::new());

    let report = run_until(engine, Arc::new(RandomOrderIds::new()), async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c; shutting down");
        }
    })
    .await?;

    if !report.is_clean() {
        anyhow::bail!("{} job worker(s) did not close cleanly", report.failures.len());
    }
    Ok(())
}
