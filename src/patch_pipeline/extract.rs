//! Patch extraction and classification.

use tracing::trace;

use crate::patch_pipeline::common::error::{PatchError, Result};
use crate::patch_pipeline::grid::GridCell;
use crate::patch_pipeline::naming::patch_name;
use crate::patch_pipeline::raster::types::{Mask, SarImage};

/// Exactly one class holds for every patch; checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchClass {
    /// SAR samples are all zero (no-data region outside the swath)
    Invalid,
    /// Every mask pixel is oil
    FullOil,
    /// Every mask pixel is sea
    FullSea,
    /// Mixed oil and sea
    PartialOil,
}

impl PatchClass {
    pub fn classify(image: &SarImage, mask: &Mask) -> Self {
        if matches!(image.min_max(), Some((min, max)) if min == 0.0 && max == 0.0) {
            return PatchClass::Invalid;
        }
        match mask.min_max() {
            Some((1, 1)) => PatchClass::FullOil,
            Some((0, 0)) => PatchClass::FullSea,
            _ => PatchClass::PartialOil,
        }
    }

    pub fn has_oil(&self) -> bool {
        matches!(self, PatchClass::FullOil | PatchClass::PartialOil)
    }
}

/// Aligned image and mask windows for one grid cell.
#[derive(Debug, Clone)]
pub struct Patch {
    pub name: String,
    pub cell: GridCell,
    pub image: SarImage,
    pub mask: Mask,
    pub class: PatchClass,
}

pub fn ensure_same_dimensions(image: &SarImage, mask: &Mask) -> Result<()> {
    if image.dimensions() != mask.dimensions() {
        return Err(PatchError::DimensionMismatch {
            image_width: image.width,
            image_height: image.height,
            mask_width: mask.width,
            mask_height: mask.height,
        });
    }
    Ok(())
}

pub struct PatchExtractor<'a> {
    image_name: &'a str,
    image: &'a SarImage,
    mask: &'a Mask,
    train_suffix: bool,
}

impl<'a> PatchExtractor<'a> {
    /// Fails when the raster and its mask differ in size; no patch of such a
    /// pair is usable.
    pub fn new(image_name: &'a str, image: &'a SarImage, mask: &'a Mask) -> Result<Self> {
        ensure_same_dimensions(image, mask)?;
        Ok(Self {
            image_name,
            image,
            mask,
            train_suffix: false,
        })
    }

    pub fn with_train_suffix(mut self, enabled: bool) -> Self {
        self.train_suffix = enabled;
        self
    }

    pub fn name_for(&self, cell: &GridCell) -> String {
        patch_name(self.image_name, cell.linear_index, self.train_suffix)
    }

    pub fn extract(&self, cell: &GridCell) -> Result<Patch> {
        let image = cell.crop(self.image)?;
        let mask = cell.crop(self.mask)?;
        let class = PatchClass::classify(&image, &mask);
        trace!(
            linear_index = cell.linear_index,
            x = cell.x_offset,
            y = cell.y_offset,
            ?class,
            "Extracted patch"
        );

        Ok(Patch {
            name: self.name_for(cell),
            cell: *cell,
            image,
            mask,
            class,
        })
    }
}
