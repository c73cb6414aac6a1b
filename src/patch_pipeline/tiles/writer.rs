use std::path::Path;

use crate::patch_pipeline::common::error::Result;
use crate::patch_pipeline::raster::types::{Mask, SarImage};

pub trait TileWriter {
    fn write_feature_tile(&self, tile: &SarImage, path: &Path) -> Result<()>;
    fn write_preview_tile(&self, tile: &SarImage, path: &Path) -> Result<()>;
    fn write_label_tile(&self, mask: &Mask, path: &Path) -> Result<()>;
    fn write_figure(&self, tile: &SarImage, mask: &Mask, path: &Path) -> Result<()>;
}
