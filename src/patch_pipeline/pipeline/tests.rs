use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use crate::patch_pipeline::augment::{AugmentationDecision, AugmentationPlan};
use crate::patch_pipeline::common::error::{PatchError, Result};
use crate::patch_pipeline::config::{PatchFilter, PipelineConfig};
use crate::patch_pipeline::layout::DatasetLayout;
use crate::patch_pipeline::partition::{ShardLayout, WorkerAssignment};
use crate::patch_pipeline::pipeline::PatchPipeline;
use crate::patch_pipeline::raster::{Mask, Raster, RasterReader, SarImage};
use crate::patch_pipeline::stats::{CsvStatsStore, StatsStore};
use crate::patch_pipeline::tiles::{StandardTileWriter, TileWriter};

struct MockReader {
    should_fail: bool,
    image: SarImage,
    mask: Mask,
}

impl MockReader {
    /// 10x10 scene with oil in columns 6..10.
    fn scene() -> Self {
        Self {
            should_fail: false,
            image: Raster::from_fn(10, 10, |x, y| (x + y + 1) as f32),
            mask: Raster::from_fn(10, 10, |x, _| if x >= 6 { 255 } else { 0 }),
        }
    }
}

impl RasterReader for MockReader {
    fn read_image(&self, _path: &Path) -> Result<SarImage> {
        if self.should_fail {
            return Err(PatchError::DecodeError("Mock decode error".to_string()));
        }
        Ok(self.image.clone())
    }

    fn read_gray(&self, _path: &Path) -> Result<Mask> {
        if self.should_fail {
            return Err(PatchError::DecodeError("Mock decode error".to_string()));
        }
        Ok(self.mask.clone())
    }

    fn dimensions(&self, _path: &Path) -> Result<(usize, usize)> {
        Ok(self.image.dimensions())
    }
}

struct MockWriter {
    should_fail: bool,
    written: Arc<Mutex<Vec<PathBuf>>>,
}

impl MockWriter {
    fn record(&self, path: &Path) -> Result<()> {
        if self.should_fail {
            return Err(PatchError::EncodeError("Mock encode error".to_string()));
        }
        self.written.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

impl TileWriter for MockWriter {
    fn write_feature_tile(&self, _tile: &SarImage, path: &Path) -> Result<()> {
        self.record(path)
    }

    fn write_preview_tile(&self, _tile: &SarImage, path: &Path) -> Result<()> {
        self.record(path)
    }

    fn write_label_tile(&self, _mask: &Mask, path: &Path) -> Result<()> {
        self.record(path)
    }

    fn write_figure(&self, _tile: &SarImage, _mask: &Mask, path: &Path) -> Result<()> {
        self.record(path)
    }
}

fn small_config() -> PipelineConfig {
    PipelineConfig::builder().patch_size(4).build()
}

fn layout_in(dir: &TempDir) -> DatasetLayout {
    DatasetLayout::new(dir.path().join("src"), dir.path().join("dst"))
}

fn mock_pipeline(
    dir: &TempDir,
    reader: MockReader,
    config: PipelineConfig,
) -> (PatchPipeline<MockReader, MockWriter, CsvStatsStore>, Arc<Mutex<Vec<PathBuf>>>) {
    let written = Arc::new(Mutex::new(Vec::new()));
    let writer = MockWriter { should_fail: false, written: written.clone() };
    let layout = layout_in(dir);
    let store = CsvStatsStore::new(layout.counts_dir());
    (PatchPipeline::with_custom(reader, writer, store, layout, config), written)
}

#[test]
fn test_config_builder() {
    let config = PipelineConfig::builder()
        .patch_size(128)
        .edge_margin(0)
        .filter(PatchFilter::OilOnly)
        .train_suffix(false)
        .min_oil_fraction(0.25)
        .build();

    assert_eq!(config.patch_size, 128);
    assert_eq!(config.edge_margin, 0);
    assert_eq!(config.filter, PatchFilter::OilOnly);
    assert!(!config.train_suffix);
    assert!(!config.write_figures);
    assert_eq!(config.min_oil_fraction, 0.25);
}

#[test]
fn test_default_config() {
    let config = PipelineConfig::default();
    assert_eq!(config.patch_size, 224);
    assert_eq!(config.edge_margin, 1);
    assert_eq!(config.filter, PatchFilter::All);
    assert!(config.train_suffix);
    assert!(!config.strict_texture_dimensions);
    assert_eq!(config.shard_layout, ShardLayout::TrailingRemainder);
}

#[test]
fn test_single_worker_writes_every_patch() {
    let dir = TempDir::new().unwrap();
    let (pipeline, written) = mock_pipeline(&dir, MockReader::scene(), small_config());

    let census = pipeline.patchify_image("s1", WorkerAssignment::single()).unwrap();

    assert_eq!(census.grid_patches, 9);
    assert_eq!(census.processed_patches, 9);
    assert_eq!(census.written_patches, 9);
    assert_eq!(census.full_sea_patches, 3);
    assert_eq!(census.partial_oil_patches, 6);
    assert_eq!(census.invalid_patches, 0);
    // feature, preview and label per patch
    assert_eq!(written.lock().unwrap().len(), 27);
    assert!(
        written
            .lock()
            .unwrap()
            .contains(&pipeline.layout().feature_tile_path("s1_0008_train"))
    );
}

#[test]
fn test_oil_only_filter_skips_sea_patches() {
    let dir = TempDir::new().unwrap();
    let config = PipelineConfig::builder()
        .patch_size(4)
        .filter(PatchFilter::OilOnly)
        .train_suffix(false)
        .build();
    let (pipeline, written) = mock_pipeline(&dir, MockReader::scene(), config);

    let census = pipeline.patchify_image("s1", WorkerAssignment::single()).unwrap();

    assert_eq!(census.processed_patches, 9);
    assert_eq!(census.written_patches, 6);
    assert_eq!(written.lock().unwrap().len(), 18);
    // Skipped patches still have their stats recorded.
    let sea = CsvStatsStore::new(pipeline.layout().counts_dir())
        .read_patch_record("s1_0000")
        .unwrap();
    assert!(sea.full_sea_patch);
    // Oil share over the written cells: 3 * (8 + 12) oil pixels out of 6 * 16.
    assert_eq!(census.written_pixels.oil, 60);
    assert_eq!(census.written_oil_share(), Some(60.0 / 96.0));
}

#[test]
fn test_figures_are_optional() {
    let dir = TempDir::new().unwrap();
    let config = PipelineConfig::builder().patch_size(4).write_figures(true).build();
    let (pipeline, written) = mock_pipeline(&dir, MockReader::scene(), config);

    pipeline.patchify_image("s1", WorkerAssignment::single()).unwrap();

    assert_eq!(written.lock().unwrap().len(), 36);
}

#[test]
fn test_no_data_patches_are_invalid() {
    let dir = TempDir::new().unwrap();
    let mut reader = MockReader::scene();
    reader.image = Raster::from_fn(10, 10, |x, y| if y < 4 { 0.0 } else { (x + 1) as f32 });
    let (pipeline, _) = mock_pipeline(&dir, reader, small_config());

    let census = pipeline.patchify_image("s1", WorkerAssignment::single()).unwrap();

    assert_eq!(census.invalid_patches, 3);
}

#[test]
fn test_workers_together_cover_the_grid() {
    let dir = TempDir::new().unwrap();
    let (pipeline, _) = mock_pipeline(&dir, MockReader::scene(), small_config());

    let mut processed = 0;
    for worker_id in 0..4 {
        let assignment = WorkerAssignment::new(4, worker_id).unwrap();
        processed += pipeline.patchify_image("s1", assignment).unwrap().processed_patches;
    }
    assert_eq!(processed, 9);

    let aggregate = pipeline.aggregate_image("s1").unwrap();
    assert_eq!(aggregate.total_pixels, 9 * 16);
    assert_eq!(aggregate, pipeline.recount_image("s1").unwrap());
    assert!(pipeline.verify_image("s1").unwrap().matches());
}

#[test]
fn test_aggregate_requires_every_worker() {
    let dir = TempDir::new().unwrap();
    let (pipeline, _) = mock_pipeline(&dir, MockReader::scene(), small_config());

    pipeline
        .patchify_image("s1", WorkerAssignment::new(2, 0).unwrap())
        .unwrap();

    let result = pipeline.aggregate_image("s1");
    assert!(matches!(result, Err(PatchError::MissingRecord(_))));
}

#[test]
fn test_dimension_mismatch_rejects_image() {
    let dir = TempDir::new().unwrap();
    let mut reader = MockReader::scene();
    reader.mask = Raster::filled(8, 10, 0);
    let (pipeline, written) = mock_pipeline(&dir, reader, small_config());

    let result = pipeline.patchify_image("s1", WorkerAssignment::single());

    let err = result.unwrap_err();
    assert!(matches!(err, PatchError::DimensionMismatch { mask_width: 8, .. }));
    assert!(err.is_precondition_violation());
    assert!(written.lock().unwrap().is_empty());
}

#[test]
fn test_image_too_small() {
    let dir = TempDir::new().unwrap();
    let mut reader = MockReader::scene();
    reader.image = Raster::filled(4, 4, 1.0);
    reader.mask = Raster::filled(4, 4, 0);
    let (pipeline, _) = mock_pipeline(&dir, reader, small_config());

    let result = pipeline.patchify_image("s1", WorkerAssignment::single());
    assert!(matches!(result, Err(PatchError::ImageTooSmall { .. })));
}

#[test]
fn test_reader_failure() {
    let dir = TempDir::new().unwrap();
    let mut reader = MockReader::scene();
    reader.should_fail = true;
    let (pipeline, _) = mock_pipeline(&dir, reader, small_config());

    let result = pipeline.patchify_image("s1", WorkerAssignment::single());
    assert!(matches!(result, Err(PatchError::DecodeError(_))));
}

#[test]
fn test_writer_failure() {
    let dir = TempDir::new().unwrap();
    let layout = layout_in(&dir);
    let writer = MockWriter { should_fail: true, written: Arc::new(Mutex::new(Vec::new())) };
    let store = CsvStatsStore::new(layout.counts_dir());
    let pipeline = PatchPipeline::with_custom(MockReader::scene(), writer, store, layout, small_config());

    let result = pipeline.patchify_image("s1", WorkerAssignment::single());
    assert!(matches!(result, Err(PatchError::EncodeError(_))));
}

#[test]
fn test_dataset_totals_drive_the_plan() {
    let dir = TempDir::new().unwrap();
    let (pipeline, _) = mock_pipeline(&dir, MockReader::scene(), small_config());

    pipeline.patchify_image("s1", WorkerAssignment::single()).unwrap();
    pipeline.aggregate_image("s1").unwrap();
    let global = pipeline.aggregate_dataset(&["s1".to_string()]).unwrap();
    assert_eq!(global.total_oil_pixels, 60);
    assert_eq!(global.total_sea_pixels, 84);

    let plan = pipeline.plan_augmentation().unwrap();
    assert_eq!(plan.initial, global);
    assert_eq!(plan.decisions.len(), 6);
    // 12/16 oil in the clamped column, 8/16 in the middle one
    assert_eq!(plan.decisions[0].replica_count, 75);
    assert_eq!(plan.decisions[5].replica_count, 50);
    assert_eq!(plan.total_replicas(), 3 * 75 + 3 * 50);
    assert_eq!(plan.replicas_for("s1_0000_train"), 0);
}

#[test]
fn test_generate_augmentations_writes_replicas() {
    let dir = TempDir::new().unwrap();
    let (pipeline, written) = mock_pipeline(&dir, MockReader::scene(), small_config());
    let plan = AugmentationPlan {
        decisions: vec![AugmentationDecision {
            patch_name: "s1_0001_train".to_string(),
            replica_count: 3,
        }],
        initial: Default::default(),
        added: Default::default(),
    };

    let generated = pipeline.generate_augmentations(&plan).unwrap();

    assert_eq!(generated, 3);
    let written = written.lock().unwrap();
    assert_eq!(written.len(), 9);
    assert!(written.contains(&pipeline.layout().label_tile_path("s1_0001_train_aug002")));

    let record = CsvStatsStore::new(pipeline.layout().counts_dir())
        .read_patch_record("s1_0001_train_aug000")
        .unwrap();
    assert_eq!(record.total_pixels, 16);
}

#[test]
fn test_consistency_check_finds_missing_labels() {
    let dir = TempDir::new().unwrap();
    let layout = layout_in(&dir);
    let texture_raster = layout.texture_path("entropy", "s1");
    std::fs::create_dir_all(texture_raster.parent().unwrap()).unwrap();
    std::fs::write(&texture_raster, b"").unwrap();

    let store = CsvStatsStore::new(layout.counts_dir());
    let pipeline = PatchPipeline::with_custom(
        MockReader::scene(),
        StandardTileWriter,
        store,
        layout,
        small_config(),
    );

    let census = pipeline.patchify_image("s1", WorkerAssignment::single()).unwrap();
    assert_eq!(census.texture_tiles, 9);

    let report = pipeline.check_consistency("s1").unwrap();
    assert_eq!(report.checked_tiles, 9);
    assert!(report.is_consistent());

    std::fs::remove_file(pipeline.layout().label_tile_path("s1_0004_train")).unwrap();
    std::fs::remove_file(pipeline.layout().texture_tile_path("entropy", "s1_0002_train")).unwrap();
    let report = pipeline.check_consistency("s1").unwrap();
    assert_eq!(report.missing_labels, vec!["s1_0004_train".to_string()]);
    assert_eq!(report.missing_textures.len(), 1);
    assert_eq!(report.missing_textures[0].channel, "entropy");
}

#[test]
fn test_binarize_mask() {
    let dir = TempDir::new().unwrap();
    let (pipeline, written) = mock_pipeline(&dir, MockReader::scene(), small_config());
    let output = dir.path().join("mask_bin").join("s1.png");

    let oil = pipeline.binarize_mask(Path::new("s1.png"), &output).unwrap();

    assert_eq!(oil, 40);
    assert_eq!(written.lock().unwrap().as_slice(), &[output]);
}
