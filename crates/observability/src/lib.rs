//! Tracing and logging setup shared by the worker binaries.

/// Initialize process-wide logging with `info` as the default level.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init("info");
}

/// Tracing configuration (filters, layers).
pub mod tracing;
