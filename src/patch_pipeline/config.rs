//! Pipeline configuration types

use crate::patch_pipeline::augment::{DEFAULT_MIN_OIL_FRACTION, TransformConfig};
use crate::patch_pipeline::extract::PatchClass;
use crate::patch_pipeline::grid::DEFAULT_EDGE_MARGIN;
use crate::patch_pipeline::partition::ShardLayout;

/// Which patches get tiles written. Statistics are recorded for every patch
/// regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchFilter {
    /// Every grid cell produces tiles
    All,
    /// Skip no-data and sea-only patches
    OilOnly,
}

impl PatchFilter {
    pub fn keeps(&self, class: PatchClass) -> bool {
        match self {
            PatchFilter::All => true,
            PatchFilter::OilOnly => class.has_oil(),
        }
    }
}

/// Configuration for patch extraction and balancing
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Side length of the square patches in pixels
    pub patch_size: usize,
    /// Extra inward shift of the clamped last row/column
    pub edge_margin: usize,
    /// Which patches are written out
    pub filter: PatchFilter,
    /// Append `_train` to patch names
    pub train_suffix: bool,
    /// Also write a side-by-side image/mask figure per patch
    pub write_figures: bool,
    /// Fail (instead of warn) when a texture raster differs in size from the image
    pub strict_texture_dimensions: bool,
    /// How uneven patch counts are split across workers
    pub shard_layout: ShardLayout,
    /// Minimum oil share for a patch to be oversampled
    pub min_oil_fraction: f64,
    /// Replica transform parameters
    pub transform: TransformConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            patch_size: 224,
            edge_margin: DEFAULT_EDGE_MARGIN,
            filter: PatchFilter::All,
            train_suffix: true,
            write_figures: false,
            strict_texture_dimensions: false,
            shard_layout: ShardLayout::TrailingRemainder,
            min_oil_fraction: DEFAULT_MIN_OIL_FRACTION,
            transform: TransformConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }
}

/// Builder for PipelineConfig
#[derive(Default)]
pub struct PipelineConfigBuilder {
    patch_size: Option<usize>,
    edge_margin: Option<usize>,
    filter: Option<PatchFilter>,
    train_suffix: Option<bool>,
    write_figures: Option<bool>,
    strict_texture_dimensions: Option<bool>,
    shard_layout: Option<ShardLayout>,
    min_oil_fraction: Option<f64>,
    transform: Option<TransformConfig>,
}

impl PipelineConfigBuilder {
    pub fn patch_size(mut self, patch_size: usize) -> Self {
        self.patch_size = Some(patch_size);
        self
    }

    pub fn edge_margin(mut self, margin: usize) -> Self {
        self.edge_margin = Some(margin);
        self
    }

    pub fn filter(mut self, filter: PatchFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn train_suffix(mut self, enable: bool) -> Self {
        self.train_suffix = Some(enable);
        self
    }

    pub fn write_figures(mut self, enable: bool) -> Self {
        self.write_figures = Some(enable);
        self
    }

    pub fn strict_texture_dimensions(mut self, strict: bool) -> Self {
        self.strict_texture_dimensions = Some(strict);
        self
    }

    pub fn shard_layout(mut self, layout: ShardLayout) -> Self {
        self.shard_layout = Some(layout);
        self
    }

    pub fn min_oil_fraction(mut self, fraction: f64) -> Self {
        self.min_oil_fraction = Some(fraction);
        self
    }

    pub fn transform(mut self, transform: TransformConfig) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn build(self) -> PipelineConfig {
        let default = PipelineConfig::default();
        PipelineConfig {
            patch_size: self.patch_size.unwrap_or(default.patch_size),
            edge_margin: self.edge_margin.unwrap_or(default.edge_margin),
            filter: self.filter.unwrap_or(default.filter),
            train_suffix: self.train_suffix.unwrap_or(default.train_suffix),
            write_figures: self.write_figures.unwrap_or(default.write_figures),
            strict_texture_dimensions: self
                .strict_texture_dimensions
                .unwrap_or(default.strict_texture_dimensions),
            shard_layout: self.shard_layout.unwrap_or(default.shard_layout),
            min_oil_fraction: self.min_oil_fraction.unwrap_or(default.min_oil_fraction),
            transform: self.transform.unwrap_or(default.transform),
        }
    }
}
