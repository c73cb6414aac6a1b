//! Replica generation
//!
//! Geometric operations (crop, flip) are applied to the image and the label
//! alike; brightness/contrast jitter only touches the image.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::patch_pipeline::raster::types::{Mask, SarImage};

/// Parameters of the replica transform
#[derive(Debug, Clone)]
pub struct TransformConfig {
    /// Probability of mirroring the patch left-right
    pub horizontal_flip_prob: f64,
    /// Probability of applying brightness/contrast jitter to the image
    pub jitter_prob: f64,
    /// Brightness shift range (±brightness_limit, in units of the `[0, 1]` range)
    pub brightness_limit: f32,
    /// Contrast factor range (1.0 ± contrast_limit)
    pub contrast_limit: f32,
    /// Seed of the replica random stream
    pub seed: u64,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            horizontal_flip_prob: 0.5,
            jitter_prob: 0.2,
            brightness_limit: 0.2,
            contrast_limit: 0.2,
            seed: 42,
        }
    }
}

/// Out-of-range probabilities saturate; NaN never fires.
fn probability(p: f64) -> f64 {
    if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) }
}

#[derive(Debug, Clone)]
pub struct AugmentedPair {
    pub image: SarImage,
    pub mask: Mask,
}

pub struct Augmenter {
    config: TransformConfig,
    patch_size: usize,
    rng: ChaCha8Rng,
}

impl Augmenter {
    pub fn new(config: TransformConfig, patch_size: usize) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            config,
            patch_size,
            rng,
        }
    }

    /// Produces the next replica of `(image, mask)`. Inputs must share their
    /// dimensions; the output is `patch_size` square when the input is at
    /// least that large.
    pub fn augment(&mut self, image: &SarImage, mask: &Mask) -> AugmentedPair {
        let (mut image, mut mask) = self.random_crop(image, mask);

        if self.rng.random_bool(probability(self.config.horizontal_flip_prob)) {
            image = image.flip_horizontal();
            mask = mask.flip_horizontal();
        }

        if self.rng.random_bool(probability(self.config.jitter_prob)) {
            image = self.jitter(&image);
        }

        AugmentedPair { image, mask }
    }

    fn random_crop(&mut self, image: &SarImage, mask: &Mask) -> (SarImage, Mask) {
        let size = self.patch_size;
        if image.width < size || image.height < size {
            return (image.clone(), mask.clone());
        }
        let x = self.rng.random_range(0..=image.width - size);
        let y = self.rng.random_range(0..=image.height - size);
        match (image.crop(x, y, size, size), mask.crop(x, y, size, size)) {
            (Some(image), Some(mask)) => (image, mask),
            _ => (image.clone(), mask.clone()),
        }
    }

    fn jitter(&mut self, image: &SarImage) -> SarImage {
        let brightness = self.config.brightness_limit.abs();
        let contrast = self.config.contrast_limit.abs();
        let beta = self.rng.random_range(-brightness..=brightness);
        let alpha = 1.0 + self.rng.random_range(-contrast..=contrast);
        image.map(|v| (v * alpha + beta).clamp(0.0, 1.0))
    }
}
