//! Statistics records and folds
//!
//! All counts are exact `u64`; fractions are only formed at the edges and are
//! `None` whenever their denominator is zero.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

use crate::patch_pipeline::common::error::{PatchError, Result};
use crate::patch_pipeline::extract::{Patch, PatchClass};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PixelCounts {
    pub total: u64,
    pub oil: u64,
    pub sea: u64,
}

fn fraction(part: u64, whole: u64) -> Option<f64> {
    if whole == 0 {
        None
    } else {
        Some(part as f64 / whole as f64)
    }
}

impl PixelCounts {
    pub fn new(oil: u64, sea: u64) -> Self {
        Self {
            total: oil + sea,
            oil,
            sea,
        }
    }

    pub fn oil_fraction(&self) -> Option<f64> {
        fraction(self.oil, self.total)
    }

    /// Counts of `factor` identical copies.
    pub fn scaled(&self, factor: u64) -> Self {
        Self {
            total: self.total * factor,
            oil: self.oil * factor,
            sea: self.sea * factor,
        }
    }
}

impl Add for PixelCounts {
    type Output = PixelCounts;

    fn add(self, other: PixelCounts) -> PixelCounts {
        PixelCounts {
            total: self.total + other.total,
            oil: self.oil + other.oil,
            sea: self.sea + other.sea,
        }
    }
}

impl AddAssign for PixelCounts {
    fn add_assign(&mut self, other: PixelCounts) {
        *self = *self + other;
    }
}

impl Sum for PixelCounts {
    fn sum<I: Iterator<Item = PixelCounts>>(iter: I) -> Self {
        iter.fold(PixelCounts::default(), Add::add)
    }
}

/// Flags persisted as `0`/`1` columns; `true`/`false` are accepted on read.
mod flag {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.trim() {
            "1" | "true" | "True" => Ok(true),
            "0" | "false" | "False" => Ok(false),
            other => Err(D::Error::custom(format!("invalid flag value: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchStatsRecord {
    pub patch_name: String,
    pub total_pixels: u64,
    pub oil_pixels: u64,
    pub sea_pixels: u64,
    #[serde(with = "flag")]
    pub invalid_patch: bool,
    #[serde(with = "flag")]
    pub full_oil_patch: bool,
    #[serde(with = "flag")]
    pub full_sea_patch: bool,
}

impl PatchStatsRecord {
    pub fn counts(&self) -> PixelCounts {
        PixelCounts {
            total: self.total_pixels,
            oil: self.oil_pixels,
            sea: self.sea_pixels,
        }
    }

    pub fn class(&self) -> PatchClass {
        if self.invalid_patch {
            PatchClass::Invalid
        } else if self.full_oil_patch {
            PatchClass::FullOil
        } else if self.full_sea_patch {
            PatchClass::FullSea
        } else {
            PatchClass::PartialOil
        }
    }
}

/// Counts oil (`1`) and sea (`0`) pixels of a patch mask. Any other label
/// means the mask skipped binarization and the counts would not add up.
pub fn patch_stats(patch: &Patch) -> Result<PatchStatsRecord> {
    let oil_pixels = patch.mask.count_value(1);
    let sea_pixels = patch.mask.count_value(0);
    let expected = (patch.cell.patch_size * patch.cell.patch_size) as u64;
    if oil_pixels + sea_pixels != expected {
        return Err(PatchError::MaskNotBinary {
            patch_name: patch.name.clone(),
            binary: oil_pixels + sea_pixels,
            expected,
        });
    }

    Ok(PatchStatsRecord {
        patch_name: patch.name.clone(),
        total_pixels: oil_pixels + sea_pixels,
        oil_pixels,
        sea_pixels,
        invalid_patch: patch.class == PatchClass::Invalid,
        full_oil_patch: patch.class == PatchClass::FullOil,
        full_sea_patch: patch.class == PatchClass::FullSea,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAggregate {
    pub image_name: String,
    pub total_pixels: u64,
    pub oil_pixels: u64,
    pub sea_pixels: u64,
}

impl ImageAggregate {
    pub fn from_counts(image_name: impl Into<String>, counts: PixelCounts) -> Self {
        Self {
            image_name: image_name.into(),
            total_pixels: counts.total,
            oil_pixels: counts.oil,
            sea_pixels: counts.sea,
        }
    }

    pub fn counts(&self) -> PixelCounts {
        PixelCounts {
            total: self.total_pixels,
            oil: self.oil_pixels,
            sea: self.sea_pixels,
        }
    }
}

pub fn fold_image(image_name: &str, records: &[PatchStatsRecord]) -> ImageAggregate {
    ImageAggregate::from_counts(image_name, records.iter().map(PatchStatsRecord::counts).sum())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlobalAggregate {
    pub total_oil_pixels: u64,
    pub total_sea_pixels: u64,
}

impl GlobalAggregate {
    pub fn total_pixels(&self) -> u64 {
        self.total_oil_pixels + self.total_sea_pixels
    }

    pub fn counts(&self) -> PixelCounts {
        PixelCounts::new(self.total_oil_pixels, self.total_sea_pixels)
    }

    pub fn oil_share(&self) -> Option<f64> {
        fraction(self.total_oil_pixels, self.total_pixels())
    }

    pub fn sea_share(&self) -> Option<f64> {
        fraction(self.total_sea_pixels, self.total_pixels())
    }

    pub fn with_added(&self, counts: PixelCounts) -> Self {
        Self {
            total_oil_pixels: self.total_oil_pixels + counts.oil,
            total_sea_pixels: self.total_sea_pixels + counts.sea,
        }
    }
}

impl From<&ImageAggregate> for GlobalAggregate {
    fn from(aggregate: &ImageAggregate) -> Self {
        Self {
            total_oil_pixels: aggregate.oil_pixels,
            total_sea_pixels: aggregate.sea_pixels,
        }
    }
}

pub fn fold_global(aggregates: &[ImageAggregate]) -> GlobalAggregate {
    aggregates
        .iter()
        .fold(GlobalAggregate::default(), |acc, aggregate| acc.with_added(aggregate.counts()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch_pipeline::grid::GridSpec;
    use crate::patch_pipeline::raster::types::Raster;

    fn record(name: &str, oil: u64, sea: u64) -> PatchStatsRecord {
        PatchStatsRecord {
            patch_name: name.to_string(),
            total_pixels: oil + sea,
            oil_pixels: oil,
            sea_pixels: sea,
            invalid_patch: false,
            full_oil_patch: sea == 0,
            full_sea_patch: oil == 0,
        }
    }

    fn patch_with_mask(mask: Vec<u8>) -> Patch {
        let cell = GridSpec::new(3, 3, 2, 1).unwrap().cell(0).unwrap();
        Patch {
            name: "scene_0000".to_string(),
            cell,
            image: Raster::filled(2, 2, 0.4),
            mask: Raster::new(2, 2, mask).unwrap(),
            class: PatchClass::PartialOil,
        }
    }

    #[test]
    fn test_patch_stats_counts() {
        let stats = patch_stats(&patch_with_mask(vec![1, 0, 0, 1])).unwrap();
        assert_eq!((stats.total_pixels, stats.oil_pixels, stats.sea_pixels), (4, 2, 2));
        assert!(!stats.invalid_patch && !stats.full_oil_patch && !stats.full_sea_patch);
    }

    #[test]
    fn test_patch_stats_rejects_unbinarized_mask() {
        let result = patch_stats(&patch_with_mask(vec![255, 0, 0, 1]));
        assert!(matches!(
            result,
            Err(PatchError::MaskNotBinary { binary: 3, expected: 4, .. })
        ));
    }

    #[test]
    fn test_fold_is_order_independent() {
        let records = vec![record("a", 10, 90), record("b", 0, 100), record("c", 100, 0)];
        let mut reversed = records.clone();
        reversed.reverse();
        assert_eq!(fold_image("img", &records), fold_image("img", &reversed));
        assert_eq!(fold_image("img", &records).oil_pixels, 110);
        assert_eq!(fold_image("img", &records).total_pixels, 300);
    }

    #[test]
    fn test_fold_global_matches_direct_fold() {
        let a = vec![record("a0", 3, 97), record("a1", 50, 50)];
        let b = vec![record("b0", 0, 100)];
        let staged = fold_global(&[fold_image("A", &a), fold_image("B", &b)]);

        let all: Vec<PatchStatsRecord> = a.iter().chain(b.iter()).cloned().collect();
        let direct = GlobalAggregate::from(&fold_image("AB", &all));
        assert_eq!(staged, direct);
        assert_eq!(staged.total_pixels(), 300);
    }

    #[test]
    fn test_empty_fold_has_undefined_share() {
        let global = fold_global(&[]);
        assert_eq!(global.total_pixels(), 0);
        assert_eq!(global.oil_share(), None);
        assert_eq!(PixelCounts::default().oil_fraction(), None);
    }

    #[test]
    fn test_record_class_round_trip() {
        assert_eq!(record("x", 0, 4).class(), PatchClass::FullSea);
        assert_eq!(record("x", 4, 0).class(), PatchClass::FullOil);
        assert_eq!(record("x", 1, 3).class(), PatchClass::PartialOil);
    }
}
