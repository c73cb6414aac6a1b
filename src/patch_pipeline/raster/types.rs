//! Raster data types

use crate::patch_pipeline::common::error::{PatchError, Result};

/// A single-channel 2D grid stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster<T> {
    /// Width of the raster in pixels
    pub width: usize,
    /// Height of the raster in pixels
    pub height: usize,
    /// Row-major samples, `width * height` long
    pub data: Vec<T>,
}

/// SAR intensity (or texture descriptor) samples.
pub type SarImage = Raster<f32>;

/// Oil-spill label: 0 = sea, 1 = oil once binarized.
pub type Mask = Raster<u8>;

impl<T: Copy> Raster<T> {
    pub fn new(width: usize, height: usize, data: Vec<T>) -> Result<Self> {
        let expected = width * height;
        if data.len() != expected {
            return Err(PatchError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { width, height, data })
    }

    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self { width, height, data }
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn get(&self, x: usize, y: usize) -> T {
        self.data[y * self.width + x]
    }

    pub fn row(&self, y: usize) -> &[T] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    /// Copies the `width x height` window whose top-left corner is `(x, y)`.
    /// Returns `None` when the window leaves the raster.
    pub fn crop(&self, x: usize, y: usize, width: usize, height: usize) -> Option<Raster<T>> {
        if x + width > self.width || y + height > self.height {
            return None;
        }
        let mut data = Vec::with_capacity(width * height);
        for row in y..y + height {
            data.extend_from_slice(&self.row(row)[x..x + width]);
        }
        Some(Raster { width, height, data })
    }

    pub fn flip_horizontal(&self) -> Raster<T> {
        let mut data = Vec::with_capacity(self.data.len());
        for y in 0..self.height {
            data.extend(self.row(y).iter().rev().copied());
        }
        Raster {
            width: self.width,
            height: self.height,
            data,
        }
    }

    pub fn map<U>(&self, f: impl Fn(T) -> U) -> Raster<U> {
        Raster {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }
}

impl<T: Copy + PartialOrd> Raster<T> {
    /// Minimum and maximum sample; `None` for an empty raster.
    /// Incomparable samples (NaN) are skipped.
    pub fn min_max(&self) -> Option<(T, T)> {
        let mut values = self.data.iter().copied().filter(|v| v.partial_cmp(v).is_some());
        let first = values.next()?;
        Some(values.fold((first, first), |(min, max), v| {
            (
                if v < min { v } else { min },
                if v > max { v } else { max },
            )
        }))
    }
}

impl Raster<f32> {
    /// Min-max scales samples into `[0, 1]`. A constant raster has no range
    /// to scale against and maps to all zeros.
    pub fn normalized(&self) -> Raster<f32> {
        match self.min_max() {
            Some((min, max)) if max > min => {
                let range = max - min;
                self.map(|v| (v - min) / range)
            }
            _ => Raster::filled(self.width, self.height, 0.0),
        }
    }

    /// 8-bit rendition of a `[0, 1]` raster, used for PNG previews.
    pub fn to_preview(&self) -> Raster<u8> {
        self.map(|v| (v.clamp(0.0, 1.0) * 255.0) as u8)
    }
}

impl Raster<u8> {
    /// Marks every nonzero label as oil (1).
    pub fn binarized(mut self) -> Self {
        for v in self.data.iter_mut() {
            if *v > 0 {
                *v = 1;
            }
        }
        self
    }

    pub fn count_value(&self, value: u8) -> u64 {
        self.data.iter().filter(|&&v| v == value).count() as u64
    }
}
