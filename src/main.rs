use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use spillpatch::logger;
use spillpatch::patch_pipeline::{
    AugmentationPlan, DatasetLayout, PatchFilter, PatchPipeline, PipelineConfig, ShardLayout,
    TransformConfig, WorkerAssignment,
};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "spillpatch", version, about = "SAR oil-spill patch dataset builder")]
struct Cli {
    #[command(flatten)]
    dataset: DatasetArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct DatasetArgs {
    /// Root holding the image, mask and texture directories
    #[arg(long, global = true, default_value = ".")]
    source: PathBuf,

    /// Root all tiles and statistics are written under
    #[arg(long, global = true, default_value = "./patches")]
    destination: PathBuf,

    /// Image directory name under the source root
    #[arg(long, global = true, default_value = "image_norm")]
    image_dir: String,

    /// Mask directory name under the source root
    #[arg(long, global = true, default_value = "mask_bin")]
    mask_dir: String,

    /// Texture directory name under the source root
    #[arg(long, global = true, default_value = "textures")]
    texture_dir: String,

    /// Side length of the square patches
    #[arg(long, global = true, default_value = "224")]
    patch_size: usize,

    /// Inward shift of the clamped last row/column (0 = flush with the edge)
    #[arg(long, global = true, default_value = "1")]
    edge_margin: usize,

    /// Which patches get tiles written
    #[arg(long, global = true, value_enum, default_value_t = FilterArg::All)]
    filter: FilterArg,

    /// Leave `_train` off patch names
    #[arg(long, global = true)]
    no_train_suffix: bool,

    /// Also write side-by-side image/mask figures
    #[arg(long, global = true)]
    figures: bool,

    /// Fail on texture rasters whose size differs from the image
    #[arg(long, global = true)]
    strict_textures: bool,

    /// How leftover patch indices are spread over workers
    #[arg(long, global = true, value_enum, default_value_t = LayoutArg::TrailingRemainder)]
    shard_layout: LayoutArg,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum FilterArg {
    All,
    OilOnly,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LayoutArg {
    TrailingRemainder,
    Contiguous,
}

#[derive(Args, Debug)]
struct ImageSelection {
    /// Image name (file stem); takes precedence over the indices. All images when none is given
    #[arg(long)]
    image: Option<String>,

    /// 0-based position of the image in the sorted image listing
    #[arg(long)]
    image_index: Option<usize>,

    /// 1-based array task id, selecting image `id - 1` of the sorted listing
    #[arg(long, env = "SLURM_ARRAY_TASK_ID")]
    array_task_id: Option<usize>,
}

impl ImageSelection {
    /// 0-based listing position, if the selection names one.
    fn position(&self) -> Result<Option<usize>> {
        if let Some(index) = self.image_index {
            return Ok(Some(index));
        }
        match self.array_task_id {
            Some(task_id) => match task_id.checked_sub(1) {
                Some(index) => Ok(Some(index)),
                None => bail!("Array task ids start at 1, got 0"),
            },
            None => Ok(None),
        }
    }

    fn pick(&self, images: Vec<String>) -> Result<Vec<String>> {
        if let Some(name) = &self.image {
            return Ok(vec![name.clone()]);
        }
        match self.position()? {
            Some(index) => match images.get(index) {
                Some(name) => Ok(vec![name.clone()]),
                None => bail!("Image index {} out of range ({} images)", index, images.len()),
            },
            None => Ok(images),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Cut images into patches and record per-patch statistics
    Patchify {
        #[command(flatten)]
        selection: ImageSelection,

        /// Number of cooperating workers
        #[arg(long, env = "SLURM_NTASKS", default_value = "1")]
        worker_count: usize,

        /// This worker's id, in `0..worker_count`
        #[arg(long, env = "SLURM_PROCID", default_value = "0")]
        worker_id: usize,
    },
    /// Collect per-patch records into per-image tables
    Count {
        #[command(flatten)]
        selection: ImageSelection,
    },
    /// Fold per-image tables into the image table and dataset totals
    Totals,
    /// Plan and write oversampling replicas of oil patches
    Augment {
        /// Seed of the replica transforms
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Minimum oil share for a patch to be oversampled
        #[arg(long, default_value = "0.1")]
        min_oil_fraction: f64,

        /// Only report the class balance the plan would reach
        #[arg(long)]
        dry_run: bool,
    },
    /// Compare persisted records with a recount of the source images
    Verify {
        #[command(flatten)]
        selection: ImageSelection,
    },
    /// Report feature tiles missing their label or texture tiles
    Check {
        #[command(flatten)]
        selection: ImageSelection,
    },
    /// Convert a 0/255 mask into a 0/1 mask
    Binarize {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,
    },
}

impl DatasetArgs {
    fn layout(&self) -> DatasetLayout {
        DatasetLayout::new(&self.source, &self.destination)
            .with_image_dir(&self.image_dir)
            .with_mask_dir(&self.mask_dir)
            .with_texture_dir(&self.texture_dir)
    }

    fn config(&self) -> PipelineConfig {
        let filter = match self.filter {
            FilterArg::All => PatchFilter::All,
            FilterArg::OilOnly => PatchFilter::OilOnly,
        };
        let shard_layout = match self.shard_layout {
            LayoutArg::Contiguous => ShardLayout::Contiguous,
            LayoutArg::TrailingRemainder => ShardLayout::TrailingRemainder,
        };
        PipelineConfig::builder()
            .patch_size(self.patch_size)
            .edge_margin(self.edge_margin)
            .filter(filter)
            .train_suffix(!self.no_train_suffix)
            .write_figures(self.figures)
            .strict_texture_dimensions(self.strict_textures)
            .shard_layout(shard_layout)
            .build()
    }
}

fn select_images(layout: &DatasetLayout, selection: &ImageSelection) -> Result<Vec<String>> {
    if let Some(name) = &selection.image {
        return Ok(vec![name.clone()]);
    }
    let images = layout
        .list_images()
        .with_context(|| format!("Failed to list images in {}", layout.source_root.display()))?;
    selection.pick(images)
}

/// Runs `step` for every image, logging failures and failing at the end if any image failed.
fn for_each_image<F>(images: &[String], mut step: F) -> Result<()>
where
    F: FnMut(&str) -> Result<()>,
{
    let mut failed = 0;
    for name in images {
        if let Err(e) = step(name) {
            error!(image = %name, "{:#}", e);
            failed += 1;
        }
    }
    if failed > 0 {
        bail!("{} of {} image(s) failed", failed, images.len());
    }
    Ok(())
}

fn format_share(share: Option<f64>) -> String {
    share
        .map(|s| format!("{:.2}%", s * 100.0))
        .unwrap_or_else(|| "undefined".to_string())
}

fn report_plan(plan: &AugmentationPlan) {
    let before = plan.initial;
    let after = plan.augmented();
    info!(
        candidates = plan.decisions.len(),
        replicas = plan.total_replicas(),
        "Augmentation plan"
    );
    info!(
        "Before: oil {} / sea {}",
        format_share(before.oil_share()),
        format_share(before.sea_share())
    );
    info!(
        "After:  oil {} / sea {}",
        format_share(after.oil_share()),
        format_share(after.sea_share())
    );
}

fn main() -> Result<()> {
    logger::init();
    let cli = Cli::parse();

    let layout = cli.dataset.layout();
    let mut config = cli.dataset.config();
    info!(
        source = %layout.source_root.display(),
        destination = %layout.destination_root.display(),
        patch_size = config.patch_size,
        edge_margin = config.edge_margin,
        "Starting spillpatch"
    );

    match cli.command {
        Command::Patchify {
            selection,
            worker_count,
            worker_id,
        } => {
            let assignment = WorkerAssignment::new(worker_count, worker_id)?;
            let images = select_images(&layout, &selection)?;
            let pipeline = PatchPipeline::new(layout, config);
            for_each_image(&images, |name| {
                let census = pipeline.patchify_image(name, assignment)?;
                info!(
                    image = %census.image_name,
                    width = census.width,
                    height = census.height,
                    patches = census.grid_patches,
                    zero_patches = census.invalid_patches,
                    "Image patched"
                );
                Ok(())
            })
        }
        Command::Count { selection } => {
            let images = select_images(&layout, &selection)?;
            let pipeline = PatchPipeline::new(layout, config);
            for_each_image(&images, |name| {
                pipeline.aggregate_image(name)?;
                Ok(())
            })
        }
        Command::Totals => {
            let images = layout.list_images().context("Failed to list images")?;
            let pipeline = PatchPipeline::new(layout, config);
            let global = pipeline.aggregate_dataset(&images)?;
            info!(
                "Dataset: oil {} / sea {}",
                format_share(global.oil_share()),
                format_share(global.sea_share())
            );
            Ok(())
        }
        Command::Augment {
            seed,
            min_oil_fraction,
            dry_run,
        } => {
            config.min_oil_fraction = min_oil_fraction;
            config.transform = TransformConfig {
                seed,
                ..TransformConfig::default()
            };
            let pipeline = PatchPipeline::new(layout, config);
            let plan = pipeline.plan_augmentation()?;
            report_plan(&plan);
            if dry_run {
                return Ok(());
            }
            let generated = pipeline.generate_augmentations(&plan)?;
            info!(generated, "Replicas written");
            Ok(())
        }
        Command::Verify { selection } => {
            let images = select_images(&layout, &selection)?;
            let pipeline = PatchPipeline::new(layout, config);
            for_each_image(&images, |name| {
                let report = pipeline.verify_image(name)?;
                if !report.matches() {
                    bail!("Persisted statistics of {} do not match the source image", name);
                }
                Ok(())
            })
        }
        Command::Check { selection } => {
            let images = select_images(&layout, &selection)?;
            let pipeline = PatchPipeline::new(layout, config);
            for_each_image(&images, |name| {
                let report = pipeline.check_consistency(name)?;
                for missing in &report.missing_labels {
                    warn!(patch = %missing, "Missing label tile");
                }
                for missing in &report.missing_textures {
                    warn!(patch = %missing.patch_name, channel = %missing.channel, "Missing texture tile");
                }
                if !report.is_consistent() {
                    bail!("{} has incomplete tiles", name);
                }
                Ok(())
            })
        }
        Command::Binarize { input, output } => {
            let pipeline = PatchPipeline::new(layout, config);
            let oil_pixels = pipeline
                .binarize_mask(&input, &output)
                .with_context(|| format!("Failed to binarize {}", input.display()))?;
            info!(oil_pixels, "Mask written to {}", output.display());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> Vec<String> {
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    }

    fn selection(image: Option<&str>, image_index: Option<usize>, array_task_id: Option<usize>) -> ImageSelection {
        ImageSelection {
            image: image.map(str::to_string),
            image_index,
            array_task_id,
        }
    }

    #[test]
    fn test_array_task_ids_select_every_image_once() {
        let picked: Vec<String> = (1..=3)
            .flat_map(|task_id| selection(None, None, Some(task_id)).pick(listing()).unwrap())
            .collect();
        assert_eq!(picked, listing());
    }

    #[test]
    fn test_array_task_id_zero_and_past_end_are_rejected() {
        assert!(selection(None, None, Some(0)).pick(listing()).is_err());
        assert!(selection(None, None, Some(4)).pick(listing()).is_err());
    }

    #[test]
    fn test_explicit_selection_wins() {
        assert_eq!(selection(None, Some(0), Some(3)).pick(listing()).unwrap(), vec!["a"]);
        assert_eq!(selection(Some("z"), Some(1), Some(2)).pick(listing()).unwrap(), vec!["z"]);
        assert_eq!(selection(None, None, None).pick(listing()).unwrap(), listing());
    }

    #[test]
    fn test_cli_defaults_follow_pipeline_defaults() {
        let cli = Cli::try_parse_from(["spillpatch", "totals"]).unwrap();
        let config = cli.dataset.config();
        assert_eq!(config.shard_layout, ShardLayout::TrailingRemainder);
        assert_eq!(config.patch_size, 224);
        assert_eq!(config.edge_margin, 1);
    }
}
