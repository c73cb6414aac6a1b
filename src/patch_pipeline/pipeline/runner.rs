use std::path::Path;

use tracing::{debug, debug_span, info, info_span, instrument, warn};

use crate::patch_pipeline::{
    augment::{AugmentationPlan, AugmentationPlanner, AugmentedPair, Augmenter},
    common::error::{PatchError, Result},
    config::PipelineConfig,
    extract::{PatchClass, PatchExtractor, ensure_same_dimensions},
    grid::{GridCell, GridSpec},
    layout::DatasetLayout,
    naming::{belongs_to_image, is_replica, patch_name, replica_name},
    partition::WorkerAssignment,
    raster::{Mask, RasterReader, SarImage, StandardRasterReader},
    stats::{
        CsvStatsStore, GlobalAggregate, ImageAggregate, PatchStatsRecord, PixelCounts, StatsStore,
        fold_global, fold_image, patch_stats,
    },
    texture::TextureChannelAligner,
    tiles::{StandardTileWriter, TileWriter},
};

use super::summary::{ConsistencyReport, ImageCensus, MissingTexture, VerificationReport};

pub struct PatchPipeline<R: RasterReader, W: TileWriter, S: StatsStore> {
    reader: R,
    writer: W,
    store: S,
    layout: DatasetLayout,
    config: PipelineConfig,
}

impl PatchPipeline<StandardRasterReader, StandardTileWriter, CsvStatsStore> {
    pub fn new(layout: DatasetLayout, config: PipelineConfig) -> Self {
        let store = CsvStatsStore::new(layout.counts_dir());
        Self {
            reader: StandardRasterReader,
            writer: StandardTileWriter,
            store,
            layout,
            config,
        }
    }
}

/// Stats record of an augmented replica, counted from its own mask.
fn replica_record(name: &str, pair: &AugmentedPair) -> PatchStatsRecord {
    let counts = PixelCounts::new(pair.mask.count_value(1), pair.mask.count_value(0));
    let class = PatchClass::classify(&pair.image, &pair.mask);
    PatchStatsRecord {
        patch_name: name.to_string(),
        total_pixels: counts.total,
        oil_pixels: counts.oil,
        sea_pixels: counts.sea,
        invalid_patch: class == PatchClass::Invalid,
        full_oil_patch: class == PatchClass::FullOil,
        full_sea_patch: class == PatchClass::FullSea,
    }
}

impl<R: RasterReader, W: TileWriter, S: StatsStore> PatchPipeline<R, W, S> {
    pub fn with_custom(reader: R, writer: W, store: S, layout: DatasetLayout, config: PipelineConfig) -> Self {
        Self {
            reader,
            writer,
            store,
            layout,
            config,
        }
    }

    fn grid_for(&self, width: usize, height: usize) -> Result<GridSpec> {
        GridSpec::new(width, height, self.config.patch_size, self.config.edge_margin)
    }

    fn cell_at(spec: &GridSpec, linear_index: usize) -> Result<GridCell> {
        spec.cell(linear_index).ok_or(PatchError::CellOutOfBounds {
            linear_index,
            width: spec.width,
            height: spec.height,
        })
    }

    fn load_pair(&self, image_name: &str) -> Result<(SarImage, Mask)> {
        let image_path = self.layout.image_path(image_name);
        let mask_path = self.layout.mask_path(image_name);

        let image = {
            let _span = info_span!("read_image", path = %image_path.display()).entered();
            self.reader.read_image(&image_path)?
        };
        let mask = {
            let _span = info_span!("read_mask", path = %mask_path.display()).entered();
            self.reader.read_mask(&mask_path)?
        };

        ensure_same_dimensions(&image, &mask)?;
        Ok((image, mask))
    }

    fn write_tiles(&self, name: &str, tile: &SarImage, mask: &Mask) -> Result<()> {
        self.writer.write_feature_tile(tile, &self.layout.feature_tile_path(name))?;
        self.writer.write_preview_tile(tile, &self.layout.preview_tile_path(name))?;
        self.writer.write_label_tile(mask, &self.layout.label_tile_path(name))?;
        if self.config.write_figures {
            self.writer.write_figure(tile, mask, &self.layout.figure_path(name))?;
        }
        Ok(())
    }

    /// Extracts this worker's share of the image's grid. Every processed cell
    /// gets a stats record; tiles (and texture tiles) are written only for
    /// cells the configured filter keeps.
    #[instrument(
        skip(self, assignment),
        fields(worker_id = assignment.worker_id(), worker_count = assignment.worker_count())
    )]
    pub fn patchify_image(&self, image_name: &str, assignment: WorkerAssignment) -> Result<ImageCensus> {
        info!("Starting patch extraction");

        let (image, mask) = self.load_pair(image_name)?;
        let extractor = PatchExtractor::new(image_name, &image, &mask)?
            .with_train_suffix(self.config.train_suffix);

        let spec = {
            let _span = info_span!("compute_grid", width = image.width, height = image.height).entered();
            self.grid_for(image.width, image.height)?
        };
        let indices = assignment.with_layout(self.config.shard_layout).shard(spec.len());
        debug!(grid_patches = spec.len(), shard_len = indices.len(), "Shard selected");

        // Classification runs on the raw samples; tiles carry the scaled ones.
        let scaled = image.normalized();
        self.layout.create_output_dirs()?;

        let mut census = ImageCensus::new(image_name, &spec);
        let mut kept_cells = Vec::new();
        {
            let _span = info_span!("extract_patches", count = indices.len()).entered();
            for linear_index in indices {
                let cell = Self::cell_at(&spec, linear_index)?;
                let patch = extractor.extract(&cell)?;
                let record = patch_stats(&patch)?;
                self.store.write_patch_record(&record)?;

                let keep = self.config.filter.keeps(patch.class);
                if keep {
                    let tile = cell.crop(&scaled)?;
                    self.write_tiles(&patch.name, &tile, &patch.mask)?;
                    kept_cells.push(cell);
                }
                census.observe(&record, keep);
            }
        }

        census.texture_tiles = self.write_texture_tiles(image_name, &spec, &kept_cells, &extractor)?;

        info!(
            processed = census.processed_patches,
            written = census.written_patches,
            invalid = census.invalid_patches,
            texture_tiles = census.texture_tiles,
            oil_share = ?census.written_oil_share(),
            "Patch extraction complete"
        );
        Ok(census)
    }

    fn write_texture_tiles(
        &self,
        image_name: &str,
        spec: &GridSpec,
        cells: &[GridCell],
        extractor: &PatchExtractor<'_>,
    ) -> Result<usize> {
        if cells.is_empty() {
            return Ok(0);
        }
        let aligner = TextureChannelAligner::new(spec.width, spec.height)
            .strict_dimensions(self.config.strict_texture_dimensions);

        let mut written = 0;
        for channel in self.layout.texture_channels()? {
            let _span = info_span!("texture_channel", channel = %channel).entered();
            let path = self.layout.texture_path(&channel, image_name);
            if !path.exists() {
                warn!(path = %path.display(), "Texture raster missing, skipping channel");
                continue;
            }

            let texture = self.reader.read_image(&path)?;
            std::fs::create_dir_all(self.layout.texture_output_dir(&channel))?;
            for patch in aligner.align(&channel, &texture, cells)? {
                let name = extractor.name_for(&patch.cell);
                self.writer
                    .write_feature_tile(&patch.data, &self.layout.texture_tile_path(&channel, &name))?;
                written += 1;
            }
        }
        Ok(written)
    }

    /// Collects the per-patch records of every grid cell (written by all
    /// workers) into the image table and folds them.
    #[instrument(skip(self))]
    pub fn aggregate_image(&self, image_name: &str) -> Result<ImageAggregate> {
        let (width, height) = self.reader.dimensions(&self.layout.image_path(image_name))?;
        let spec = self.grid_for(width, height)?;

        let records = spec
            .cells()
            .map(|cell| {
                let name = patch_name(image_name, cell.linear_index, self.config.train_suffix);
                self.store.read_patch_record(&name)
            })
            .collect::<Result<Vec<_>>>()?;

        self.store.write_image_records(image_name, &records)?;
        let aggregate = fold_image(image_name, &records);
        info!(
            patches = records.len(),
            oil_pixels = aggregate.oil_pixels,
            sea_pixels = aggregate.sea_pixels,
            "Image aggregate written"
        );
        Ok(aggregate)
    }

    #[instrument(skip(self, image_names), fields(images = image_names.len()))]
    pub fn aggregate_dataset(&self, image_names: &[String]) -> Result<GlobalAggregate> {
        let aggregates = image_names
            .iter()
            .map(|name| Ok(fold_image(name, &self.store.read_image_records(name)?)))
            .collect::<Result<Vec<_>>>()?;

        self.store.write_image_aggregates(&aggregates)?;
        let global = fold_global(&aggregates);
        self.store.write_global(&global)?;

        info!(
            oil_pixels = global.total_oil_pixels,
            sea_pixels = global.total_sea_pixels,
            oil_share = ?global.oil_share(),
            "Dataset totals written"
        );
        Ok(global)
    }

    /// Recomputes an image's aggregate straight from its raster and mask,
    /// without touching the store.
    #[instrument(skip(self))]
    pub fn recount_image(&self, image_name: &str) -> Result<ImageAggregate> {
        let (image, mask) = self.load_pair(image_name)?;
        let extractor = PatchExtractor::new(image_name, &image, &mask)?
            .with_train_suffix(self.config.train_suffix);
        let spec = self.grid_for(image.width, image.height)?;

        let mut counts = PixelCounts::default();
        for cell in spec.cells() {
            counts += patch_stats(&extractor.extract(&cell)?)?.counts();
        }
        Ok(ImageAggregate::from_counts(image_name, counts))
    }

    #[instrument(skip(self))]
    pub fn verify_image(&self, image_name: &str) -> Result<VerificationReport> {
        let persisted = fold_image(image_name, &self.store.read_image_records(image_name)?);
        let recomputed = self.recount_image(image_name)?;
        let report = VerificationReport { persisted, recomputed };
        if report.matches() {
            info!("Persisted records match the source image");
        } else {
            warn!(
                persisted_oil = report.persisted.oil_pixels,
                recomputed_oil = report.recomputed.oil_pixels,
                persisted_sea = report.persisted.sea_pixels,
                recomputed_sea = report.recomputed.sea_pixels,
                "Persisted records differ from the source image"
            );
        }
        Ok(report)
    }

    /// Plans replicas over every image listed in the image table, starting
    /// from the persisted dataset totals.
    #[instrument(skip(self))]
    pub fn plan_augmentation(&self) -> Result<AugmentationPlan> {
        let global = self.store.read_global()?;
        let mut records = Vec::new();
        for aggregate in self.store.read_image_aggregates()? {
            records.extend(self.store.read_image_records(&aggregate.image_name)?);
        }
        debug!(patches = records.len(), "Loaded patch records");

        Ok(AugmentationPlanner::new(self.config.min_oil_fraction).plan(&records, &global))
    }

    /// Writes the planned replicas next to the original tiles. Replicas are
    /// built from the stored feature and label tiles; returns how many were
    /// written.
    #[instrument(skip(self, plan), fields(candidates = plan.decisions.len()))]
    pub fn generate_augmentations(&self, plan: &AugmentationPlan) -> Result<usize> {
        self.layout.create_output_dirs()?;
        let mut augmenter = Augmenter::new(self.config.transform.clone(), self.config.patch_size);

        let mut generated = 0;
        for decision in &plan.decisions {
            let _span = debug_span!(
                "augment_patch",
                patch = %decision.patch_name,
                replicas = decision.replica_count
            )
            .entered();

            let image = self.reader.read_image(&self.layout.feature_tile_path(&decision.patch_name))?;
            let mask = self.reader.read_mask(&self.layout.label_tile_path(&decision.patch_name))?;
            ensure_same_dimensions(&image, &mask)?;

            for replica in 0..decision.replica_count as usize {
                let pair = augmenter.augment(&image, &mask);
                let name = replica_name(&decision.patch_name, replica);
                self.write_tiles(&name, &pair.image, &pair.mask)?;
                self.store.write_patch_record(&replica_record(&name, &pair))?;
                generated += 1;
            }
        }

        info!(generated, "Augmentation complete");
        Ok(generated)
    }

    /// Every feature tile of the image needs a label tile; original (non
    /// replica) tiles also need one tile per texture channel the image has.
    #[instrument(skip(self))]
    pub fn check_consistency(&self, image_name: &str) -> Result<ConsistencyReport> {
        let channels: Vec<String> = self
            .layout
            .texture_channels()?
            .into_iter()
            .filter(|channel| self.layout.texture_path(channel, image_name).exists())
            .collect();

        let mut report = ConsistencyReport {
            image_name: image_name.to_string(),
            ..Default::default()
        };
        for tile in self.layout.feature_tiles()? {
            if !belongs_to_image(&tile, image_name) {
                continue;
            }
            report.checked_tiles += 1;
            if !self.layout.label_tile_path(&tile).exists() {
                report.missing_labels.push(tile.clone());
            }
            if is_replica(&tile) {
                continue;
            }
            for channel in &channels {
                if !self.layout.texture_tile_path(channel, &tile).exists() {
                    report.missing_textures.push(MissingTexture {
                        channel: channel.clone(),
                        patch_name: tile.clone(),
                    });
                }
            }
        }

        if report.is_consistent() {
            info!(checked = report.checked_tiles, "Tiles are consistent");
        } else {
            warn!(
                checked = report.checked_tiles,
                missing_labels = report.missing_labels.len(),
                missing_textures = report.missing_textures.len(),
                "Tiles are missing counterparts"
            );
        }
        Ok(report)
    }

    /// Rewrites a 0/255 (or any nonzero-is-oil) mask as a 0/1 label image.
    #[instrument(skip(self, input, output))]
    pub fn binarize_mask(&self, input: &Path, output: &Path) -> Result<u64> {
        info!(input = %input.display(), output = %output.display(), "Binarizing mask");
        let mask = self.reader.read_mask(input)?;
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.writer.write_label_tile(&mask, output)?;
        Ok(mask.count_value(1))
    }

    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: PipelineConfig) {
        self.config = config;
    }
}
