//! Tile writing module
//!
//! Feature tiles are float32 TIFFs; previews, labels and figures are 8-bit PNGs.

mod writer;
mod standard_tile_writer;

pub use writer::TileWriter;
pub use standard_tile_writer::StandardTileWriter;
