//! Infrastructure layer: engine client seam, job workers, dispatch.

pub mod engine;
pub mod jobs;
pub mod workers;
