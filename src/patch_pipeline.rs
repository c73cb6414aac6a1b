//! SAR oil-spill patch pipeline
//!
//! Cuts co-registered SAR rasters and oil masks into fixed-size patches,
//! records per-patch oil/sea pixel statistics, folds them into per-image and
//! dataset totals, and plans augmentation replicas that move the dataset
//! towards oil/sea parity. Work on one image can be split across independent
//! worker processes by patch index.

pub mod common;
pub mod raster;
pub mod tiles;
pub mod grid;
pub mod partition;
pub mod naming;
pub mod extract;
pub mod stats;
pub mod augment;
pub mod texture;
pub mod layout;
pub mod config;
pub mod pipeline;

pub use common::{PatchError, Result};

pub use raster::{Mask, Raster, RasterReader, SarImage, StandardRasterReader};

pub use tiles::{StandardTileWriter, TileWriter};

pub use grid::{DEFAULT_EDGE_MARGIN, GridCell, GridSpec, compute_grid};

pub use partition::{ShardLayout, WorkerAssignment, partition};

pub use extract::{Patch, PatchClass, PatchExtractor};

pub use stats::{
    CsvStatsStore, GlobalAggregate, ImageAggregate, PatchStatsRecord, PixelCounts, StatsStore,
};

pub use augment::{AugmentationDecision, AugmentationPlan, AugmentationPlanner, Augmenter, TransformConfig};

pub use texture::{TextureChannelAligner, TexturePatch};

pub use layout::DatasetLayout;

pub use config::{PatchFilter, PipelineConfig, PipelineConfigBuilder};

pub use pipeline::{ConsistencyReport, ImageCensus, MissingTexture, PatchPipeline, VerificationReport};
