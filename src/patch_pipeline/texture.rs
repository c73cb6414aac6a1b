//! Texture channel alignment
//!
//! Texture descriptors are cut with the primary image's grid cells, never with
//! a grid derived from their own size, so a texture patch and an image patch
//! with the same linear index always cover the same pixels.

use tracing::warn;

use crate::patch_pipeline::common::error::{PatchError, Result};
use crate::patch_pipeline::grid::GridCell;
use crate::patch_pipeline::raster::types::SarImage;

#[derive(Debug, Clone)]
pub struct TexturePatch {
    pub channel: String,
    pub cell: GridCell,
    /// Min-max scaled texture samples
    pub data: SarImage,
}

pub struct TextureChannelAligner {
    grid_width: usize,
    grid_height: usize,
    strict_dimensions: bool,
}

impl TextureChannelAligner {
    pub fn new(grid_width: usize, grid_height: usize) -> Self {
        Self {
            grid_width,
            grid_height,
            strict_dimensions: false,
        }
    }

    /// Reject textures whose size differs from the primary raster instead of
    /// warning about them.
    pub fn strict_dimensions(mut self, strict: bool) -> Self {
        self.strict_dimensions = strict;
        self
    }

    fn check_dimensions(&self, channel: &str, texture: &SarImage) -> Result<()> {
        if texture.dimensions() == (self.grid_width, self.grid_height) {
            return Ok(());
        }
        let mismatch = PatchError::TextureDimensionMismatch {
            channel: channel.to_string(),
            width: texture.width,
            height: texture.height,
            grid_width: self.grid_width,
            grid_height: self.grid_height,
        };
        if self.strict_dimensions {
            return Err(mismatch);
        }
        warn!("{}", mismatch);
        Ok(())
    }

    pub fn align(&self, channel: &str, texture: &SarImage, cells: &[GridCell]) -> Result<Vec<TexturePatch>> {
        self.check_dimensions(channel, texture)?;
        let scaled = texture.normalized();

        let mut patches = Vec::with_capacity(cells.len());
        for cell in cells {
            match cell.crop(&scaled) {
                Ok(data) => patches.push(TexturePatch {
                    channel: channel.to_string(),
                    cell: *cell,
                    data,
                }),
                Err(e) if !self.strict_dimensions => {
                    warn!(channel, linear_index = cell.linear_index, "Skipping texture patch: {}", e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(patches)
    }
}
