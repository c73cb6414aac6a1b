//! Raster reader backed by the `tiff` crate for GeoTIFF-style rasters and the
//! `image` crate for PNG masks and previews.
//!
//! Multi-band TIFFs are reduced to their first band, which is what the SAR
//! products and texture descriptors carry their intensity in.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult};
use tracing::debug;

use crate::patch_pipeline::common::error::{PatchError, Result};
use crate::patch_pipeline::raster::reader::RasterReader;
use crate::patch_pipeline::raster::types::{Mask, Raster, SarImage};

pub struct StandardRasterReader;

fn is_tiff(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("tif") || ext.eq_ignore_ascii_case("tiff"))
        .unwrap_or(false)
}

fn open_tiff(path: &Path) -> Result<Decoder<BufReader<File>>> {
    let file = File::open(path).map_err(|e| {
        PatchError::InputReadError(format!("{}: {}", path.display(), e))
    })?;
    Decoder::new(BufReader::new(file)).map_err(|e| PatchError::DecodeError(e.to_string()))
}

/// Decodes the first band of a TIFF into `f32` samples.
fn read_tiff_band(path: &Path) -> Result<SarImage> {
    let mut decoder = open_tiff(path)?;
    let (width, height) = decoder
        .dimensions()
        .map_err(|e| PatchError::DecodeError(e.to_string()))?;
    let (width, height) = (width as usize, height as usize);

    let samples: Vec<f32> = match decoder
        .read_image()
        .map_err(|e| PatchError::DecodeError(e.to_string()))?
    {
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|s| s as f32).collect(),
        #[allow(unreachable_patterns)]
        _ => {
            return Err(PatchError::UnsupportedFormat(format!(
                "{}: sample type",
                path.display()
            )))
        }
    };

    let pixels = width * height;
    if pixels == 0 || samples.len() % pixels != 0 {
        return Err(PatchError::DecodeError(format!(
            "{}: {} samples for {}x{} pixels",
            path.display(),
            samples.len(),
            width,
            height
        )));
    }
    let bands = samples.len() / pixels;
    debug!("Decoded TIFF {}: {}x{}, {} band(s)", path.display(), width, height, bands);

    let data = if bands == 1 {
        samples
    } else {
        samples.into_iter().step_by(bands).collect()
    };
    Raster::new(width, height, data)
}

impl RasterReader for StandardRasterReader {
    fn read_image(&self, path: &Path) -> Result<SarImage> {
        if is_tiff(path) {
            return read_tiff_band(path);
        }
        let decoded = image::open(path)
            .map_err(|e| PatchError::DecodeError(format!("{}: {}", path.display(), e)))?
            .to_luma32f();
        let (width, height) = decoded.dimensions();
        Raster::new(width as usize, height as usize, decoded.into_raw())
    }

    fn read_gray(&self, path: &Path) -> Result<Mask> {
        if is_tiff(path) {
            let band = read_tiff_band(path)?;
            return Ok(band.map(|v| v.clamp(0.0, 255.0) as u8));
        }
        let decoded = image::open(path)
            .map_err(|e| PatchError::DecodeError(format!("{}: {}", path.display(), e)))?
            .to_luma8();
        let (width, height) = decoded.dimensions();
        Raster::new(width as usize, height as usize, decoded.into_raw())
    }

    fn dimensions(&self, path: &Path) -> Result<(usize, usize)> {
        if is_tiff(path) {
            let mut decoder = open_tiff(path)?;
            let (width, height) = decoder
                .dimensions()
                .map_err(|e| PatchError::DecodeError(e.to_string()))?;
            return Ok((width as usize, height as usize));
        }
        let (width, height) = image::image_dimensions(path)
            .map_err(|e| PatchError::DecodeError(format!("{}: {}", path.display(), e)))?;
        Ok((width as usize, height as usize))
    }
}
