//! Pixel statistics module
//!
//! Per-patch oil/sea pixel counts and the two-level fold into per-image and
//! dataset-wide totals, plus the store the records are persisted in between
//! worker runs.

mod store;
mod csv_store;
pub mod types;

pub use store::StatsStore;
pub use csv_store::CsvStatsStore;
pub use types::{
    GlobalAggregate, ImageAggregate, PatchStatsRecord, PixelCounts, fold_global, fold_image,
    patch_stats,
};
