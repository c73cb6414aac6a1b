use crate::patch_pipeline::common::error::Result;
use crate::patch_pipeline::stats::types::{GlobalAggregate, ImageAggregate, PatchStatsRecord};

/// Persistence for the three statistics levels. Workers write disjoint patch
/// records; the aggregation passes read them back.
pub trait StatsStore {
    fn write_patch_record(&self, record: &PatchStatsRecord) -> Result<()>;
    fn read_patch_record(&self, patch_name: &str) -> Result<PatchStatsRecord>;

    fn write_image_records(&self, image_name: &str, records: &[PatchStatsRecord]) -> Result<()>;
    fn read_image_records(&self, image_name: &str) -> Result<Vec<PatchStatsRecord>>;

    fn write_image_aggregates(&self, aggregates: &[ImageAggregate]) -> Result<()>;
    fn read_image_aggregates(&self) -> Result<Vec<ImageAggregate>>;

    fn write_global(&self, global: &GlobalAggregate) -> Result<()>;
    fn read_global(&self) -> Result<GlobalAggregate>;
}
