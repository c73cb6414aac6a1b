//! Pipeline orchestration
//!
//! Wires the reader, tile writer and stats store together for each stage:
//! per-worker patch extraction, per-image and dataset aggregation,
//! augmentation planning and replica generation, and the verification passes.

mod runner;
mod summary;

#[cfg(test)]
mod tests;

pub use runner::PatchPipeline;
pub use summary::{ConsistencyReport, ImageCensus, MissingTexture, VerificationReport};
