use crate::patch_pipeline::extract::PatchClass;
use crate::patch_pipeline::grid::GridSpec;
use crate::patch_pipeline::stats::types::{ImageAggregate, PatchStatsRecord, PixelCounts};

/// What one worker saw and wrote for one image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageCensus {
    pub image_name: String,
    pub width: usize,
    pub height: usize,
    /// Cells in the whole grid, across all workers
    pub grid_patches: usize,
    /// Cells handled by this worker
    pub processed_patches: usize,
    /// Processed cells that passed the filter and got tiles
    pub written_patches: usize,
    pub invalid_patches: usize,
    pub full_oil_patches: usize,
    pub full_sea_patches: usize,
    pub partial_oil_patches: usize,
    pub texture_tiles: usize,
    /// Pixel counts over the written patches only
    pub written_pixels: PixelCounts,
}

impl ImageCensus {
    pub fn new(image_name: &str, spec: &GridSpec) -> Self {
        Self {
            image_name: image_name.to_string(),
            width: spec.width,
            height: spec.height,
            grid_patches: spec.len(),
            ..Default::default()
        }
    }

    pub fn observe(&mut self, record: &PatchStatsRecord, written: bool) {
        self.processed_patches += 1;
        match record.class() {
            PatchClass::Invalid => self.invalid_patches += 1,
            PatchClass::FullOil => self.full_oil_patches += 1,
            PatchClass::FullSea => self.full_sea_patches += 1,
            PatchClass::PartialOil => self.partial_oil_patches += 1,
        }
        if written {
            self.written_patches += 1;
            self.written_pixels += record.counts();
        }
    }

    /// Oil share of the written patches, `None` when nothing was written.
    pub fn written_oil_share(&self) -> Option<f64> {
        self.written_pixels.oil_fraction()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingTexture {
    pub channel: String,
    pub patch_name: String,
}

/// Feature tiles of an image lacking their label or texture counterparts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    pub image_name: String,
    pub checked_tiles: usize,
    pub missing_labels: Vec<String>,
    pub missing_textures: Vec<MissingTexture>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.missing_labels.is_empty() && self.missing_textures.is_empty()
    }
}

/// Persisted per-patch records against a fresh recount of the source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub persisted: ImageAggregate,
    pub recomputed: ImageAggregate,
}

impl VerificationReport {
    pub fn matches(&self) -> bool {
        self.persisted.counts() == self.recomputed.counts()
    }
}
