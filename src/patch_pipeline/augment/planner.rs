//! Replica planning
//!
//! Decides, per patch, how many augmented copies push the dataset towards
//! oil/sea parity, and tracks the totals those copies would add.

use std::cmp::Ordering;

use tracing::{debug, info};

use crate::patch_pipeline::stats::types::{GlobalAggregate, PatchStatsRecord, PixelCounts};

/// Patches with at least this share of oil pixels are oversampled.
pub const DEFAULT_MIN_OIL_FRACTION: f64 = 0.10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AugmentationDecision {
    pub patch_name: String,
    pub replica_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AugmentationPlan {
    /// Candidates only, in descending oil-pixel order
    pub decisions: Vec<AugmentationDecision>,
    /// Dataset totals before augmentation
    pub initial: GlobalAggregate,
    /// Pixels contributed by all replicas
    pub added: PixelCounts,
}

impl AugmentationPlan {
    pub fn augmented(&self) -> GlobalAggregate {
        self.initial.with_added(self.added)
    }

    pub fn total_replicas(&self) -> u64 {
        self.decisions.iter().map(|d| u64::from(d.replica_count)).sum()
    }

    /// Zero for patches that are not candidates.
    pub fn replicas_for(&self, patch_name: &str) -> u32 {
        self.decisions
            .iter()
            .find(|d| d.patch_name == patch_name)
            .map(|d| d.replica_count)
            .unwrap_or(0)
    }
}

/// Oil percentage of a patch rounded half-up, computed in integers.
pub fn replica_count(oil_pixels: u64, total_pixels: u64) -> u32 {
    if total_pixels == 0 {
        return 0;
    }
    ((200 * oil_pixels + total_pixels) / (2 * total_pixels)) as u32
}

pub struct AugmentationPlanner {
    min_oil_fraction: f64,
}

impl Default for AugmentationPlanner {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_OIL_FRACTION)
    }
}

impl AugmentationPlanner {
    pub fn new(min_oil_fraction: f64) -> Self {
        Self { min_oil_fraction }
    }

    fn is_candidate(&self, record: &PatchStatsRecord) -> bool {
        if record.invalid_patch {
            return false;
        }
        record
            .counts()
            .oil_fraction()
            .map(|fraction| fraction >= self.min_oil_fraction)
            .unwrap_or(false)
    }

    /// Single pass over the patches sorted by oil pixels (descending, ties by
    /// name); each candidate gets `round(100 * oil_fraction)` replicas and
    /// every replica adds its source's pixel composition to the totals.
    pub fn plan(&self, records: &[PatchStatsRecord], global: &GlobalAggregate) -> AugmentationPlan {
        let mut ordered: Vec<&PatchStatsRecord> = records.iter().collect();
        ordered.sort_by(|a, b| match b.oil_pixels.cmp(&a.oil_pixels) {
            Ordering::Equal => a.patch_name.cmp(&b.patch_name),
            other => other,
        });

        let mut decisions = Vec::new();
        let mut added = PixelCounts::default();
        for record in ordered {
            if !self.is_candidate(record) {
                continue;
            }
            let replicas = replica_count(record.oil_pixels, record.total_pixels);
            added += record.counts().scaled(u64::from(replicas));
            debug!(patch = %record.patch_name, replicas, "Planned augmentation");
            decisions.push(AugmentationDecision {
                patch_name: record.patch_name.clone(),
                replica_count: replicas,
            });
        }

        let plan = AugmentationPlan {
            decisions,
            initial: *global,
            added,
        };
        info!(
            candidates = plan.decisions.len(),
            replicas = plan.total_replicas(),
            oil_share_before = ?plan.initial.oil_share(),
            oil_share_after = ?plan.augmented().oil_share(),
            "Augmentation plan ready"
        );
        plan
    }
}
