//! CSV-backed statistics store.
//!
//! Layout under the counts directory:
//! - `patches/<patch>.csv`: one row per patch, written by the worker owning it
//! - `images/<image>.csv`: every patch row of one image
//! - `images.csv`: one aggregate row per image
//! - `totals/total_count.csv`: the dataset-wide oil/sea totals

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::patch_pipeline::common::error::{PatchError, Result};
use crate::patch_pipeline::stats::store::StatsStore;
use crate::patch_pipeline::stats::types::{GlobalAggregate, ImageAggregate, PatchStatsRecord};

#[derive(Debug, Serialize, Deserialize)]
struct TotalsRow {
    oil_pixels: u64,
    sea_pixels: u64,
    total_pixels: u64,
}

pub struct CsvStatsStore {
    counts_dir: PathBuf,
}

impl CsvStatsStore {
    pub fn new(counts_dir: impl Into<PathBuf>) -> Self {
        Self {
            counts_dir: counts_dir.into(),
        }
    }

    pub fn patches_dir(&self) -> PathBuf {
        self.counts_dir.join("patches")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.counts_dir.join("images")
    }

    pub fn totals_dir(&self) -> PathBuf {
        self.counts_dir.join("totals")
    }

    pub fn image_table_path(&self) -> PathBuf {
        self.counts_dir.join("images.csv")
    }

    fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        debug!("Wrote {} row(s) to {}", rows.len(), path.display());
        Ok(())
    }

    fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
        if !path.exists() {
            return Err(PatchError::MissingRecord(path.display().to_string()));
        }
        let mut reader = csv::Reader::from_path(path)?;
        let mut rows = Vec::new();
        for row in reader.deserialize() {
            rows.push(row?);
        }
        Ok(rows)
    }
}

impl StatsStore for CsvStatsStore {
    fn write_patch_record(&self, record: &PatchStatsRecord) -> Result<()> {
        let path = self.patches_dir().join(format!("{}.csv", record.patch_name));
        Self::write_rows(&path, std::slice::from_ref(record))
    }

    fn read_patch_record(&self, patch_name: &str) -> Result<PatchStatsRecord> {
        let path = self.patches_dir().join(format!("{patch_name}.csv"));
        Self::read_rows(&path)?
            .into_iter()
            .next()
            .ok_or_else(|| PatchError::MissingRecord(path.display().to_string()))
    }

    fn write_image_records(&self, image_name: &str, records: &[PatchStatsRecord]) -> Result<()> {
        Self::write_rows(&self.images_dir().join(format!("{image_name}.csv")), records)
    }

    fn read_image_records(&self, image_name: &str) -> Result<Vec<PatchStatsRecord>> {
        Self::read_rows(&self.images_dir().join(format!("{image_name}.csv")))
    }

    fn write_image_aggregates(&self, aggregates: &[ImageAggregate]) -> Result<()> {
        Self::write_rows(&self.image_table_path(), aggregates)
    }

    fn read_image_aggregates(&self) -> Result<Vec<ImageAggregate>> {
        Self::read_rows(&self.image_table_path())
    }

    fn write_global(&self, global: &GlobalAggregate) -> Result<()> {
        let row = TotalsRow {
            oil_pixels: global.total_oil_pixels,
            sea_pixels: global.total_sea_pixels,
            total_pixels: global.total_pixels(),
        };
        Self::write_rows(&self.totals_dir().join("total_count.csv"), &[row])
    }

    fn read_global(&self) -> Result<GlobalAggregate> {
        let path = self.totals_dir().join("total_count.csv");
        let row: TotalsRow = Self::read_rows(&path)?
            .into_iter()
            .next()
            .ok_or_else(|| PatchError::MissingRecord(path.display().to_string()))?;
        Ok(GlobalAggregate {
            total_oil_pixels: row.oil_pixels,
            total_sea_pixels: row.sea_pixels,
        })
    }
}
