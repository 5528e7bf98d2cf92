//! Tracing/logging initialization.
//!
//! JSON lines with timestamps. The filter comes from `RUST_LOG`; when unset or
//! unparsable, `default_directive` applies (e.g. `info` or
//! `ecomflow_infra=debug,info`).

use tracing_subscriber::EnvFilter;

/// Build the filter used by [`init`].
pub fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(default_directive: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_directive))
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
