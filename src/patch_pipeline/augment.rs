//! Class-balancing augmentation
//!
//! The planner decides how many replicas each oil-bearing patch gets; the
//! augmenter produces those replicas from the stored image/label tiles.

mod planner;
mod transform;

pub use planner::{
    AugmentationDecision, AugmentationPlan, AugmentationPlanner, DEFAULT_MIN_OIL_FRACTION,
    replica_count,
};
pub use transform::{AugmentedPair, Augmenter, TransformConfig};
