use std::path::Path;

use crate::patch_pipeline::common::error::Result;
use crate::patch_pipeline::raster::types::{Mask, SarImage};

pub trait RasterReader {
    fn read_image(&self, path: &Path) -> Result<SarImage>;

    /// Reads a single-band 8-bit raster without touching its values.
    fn read_gray(&self, path: &Path) -> Result<Mask>;

    fn dimensions(&self, path: &Path) -> Result<(usize, usize)>;

    fn read_mask(&self, path: &Path) -> Result<Mask> {
        Ok(self.read_gray(path)?.binarized())
    }
}
