//! Raster reading module
//!
//! Single-band rasters (SAR intensity, texture descriptors) and binary masks,
//! plus the reader trait used to load them from disk.

mod reader;
mod standard_raster_reader;
pub mod types;

pub use reader::RasterReader;
pub use standard_raster_reader::StandardRasterReader;
pub use types::{Mask, Raster, SarImage};
