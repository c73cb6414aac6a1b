use std::io::Cursor;
use std::path::Path;

use image::{GrayImage, ImageFormat};
use tiff::encoder::{TiffEncoder, colortype};
use tracing::debug;

use crate::patch_pipeline::common::error::{PatchError, Result};
use crate::patch_pipeline::raster::types::{Mask, Raster, SarImage};
use crate::patch_pipeline::tiles::writer::TileWriter;

/// Gap between the image and the mask panel of a figure.
const FIGURE_GUTTER: usize = 4;

pub struct StandardTileWriter;

fn save_png(raster: &Raster<u8>, path: &Path) -> Result<()> {
    let image = GrayImage::from_raw(raster.width as u32, raster.height as u32, raster.data.clone())
        .ok_or_else(|| PatchError::EncodeError(format!("{}: buffer size", path.display())))?;
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| PatchError::OutputWriteError(format!("{}: {}", path.display(), e)))
}

impl TileWriter for StandardTileWriter {
    fn write_feature_tile(&self, tile: &SarImage, path: &Path) -> Result<()> {
        debug!("Encoding feature tile {}: {}x{}", path.display(), tile.width, tile.height);

        let mut buffer = Vec::new();
        {
            let mut encoder = TiffEncoder::new(Cursor::new(&mut buffer))
                .map_err(|e| PatchError::EncodeError(e.to_string()))?;
            encoder
                .write_image::<colortype::Gray32Float>(tile.width as u32, tile.height as u32, &tile.data)
                .map_err(|e| PatchError::EncodeError(e.to_string()))?;
        }

        std::fs::write(path, &buffer).map_err(|e| {
            PatchError::OutputWriteError(format!("{}: {}", path.display(), e))
        })
    }

    fn write_preview_tile(&self, tile: &SarImage, path: &Path) -> Result<()> {
        save_png(&tile.to_preview(), path)
    }

    fn write_label_tile(&self, mask: &Mask, path: &Path) -> Result<()> {
        save_png(mask, path)
    }

    /// Image preview and mask side by side, the mask stretched to 0/255.
    fn write_figure(&self, tile: &SarImage, mask: &Mask, path: &Path) -> Result<()> {
        let preview = tile.to_preview();
        let width = preview.width + FIGURE_GUTTER + mask.width;
        let height = preview.height.max(mask.height);
        let figure = Raster::from_fn(width, height, |x, y| {
            if x < preview.width {
                if y < preview.height { preview.get(x, y) } else { 0 }
            } else if x < preview.width + FIGURE_GUTTER {
                128
            } else {
                let mx = x - preview.width - FIGURE_GUTTER;
                if y < mask.height && mask.get(mx, y) > 0 { 255 } else { 0 }
            }
        });
        save_png(&figure, path)
    }
}
