//! Patch grid indexing
//!
//! Maps `(width, height, patch_size)` onto a row-major grid of square cells.
//! The grid has `floor(extent / patch_size) + 1` cells per axis; cells that
//! would run past the right or bottom edge are pulled back inside the image
//! (overlapping their neighbour) instead of being padded.

use crate::patch_pipeline::common::error::{PatchError, Result};
use crate::patch_pipeline::raster::types::Raster;

/// Inward shift applied on top of `extent - patch_size` when clamping the last
/// row/column. `1` reproduces the historical datasets, `0` is flush with the edge.
pub const DEFAULT_EDGE_MARGIN: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCell {
    pub row_index: usize,
    pub col_index: usize,
    /// `row_index * cols_count + col_index`; used in file names and sharding
    pub linear_index: usize,
    pub y_offset: usize,
    pub x_offset: usize,
    pub patch_size: usize,
}

impl GridCell {
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.x_offset
            && x < self.x_offset + self.patch_size
            && y >= self.y_offset
            && y < self.y_offset + self.patch_size
    }

    /// Copies this cell's window out of `raster`.
    pub fn crop<T: Copy>(&self, raster: &Raster<T>) -> Result<Raster<T>> {
        raster
            .crop(self.x_offset, self.y_offset, self.patch_size, self.patch_size)
            .ok_or(PatchError::CellOutOfBounds {
                linear_index: self.linear_index,
                width: raster.width,
                height: raster.height,
            })
    }
}

/// Validated grid geometry for one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSpec {
    pub width: usize,
    pub height: usize,
    pub patch_size: usize,
    pub edge_margin: usize,
    pub rows_count: usize,
    pub cols_count: usize,
}

impl GridSpec {
    pub fn new(width: usize, height: usize, patch_size: usize, edge_margin: usize) -> Result<Self> {
        if patch_size == 0 {
            return Err(PatchError::InvalidPatchSize(patch_size));
        }
        if width < patch_size + edge_margin || height < patch_size + edge_margin {
            return Err(PatchError::ImageTooSmall {
                width,
                height,
                patch_size,
                edge_margin,
            });
        }

        Ok(Self {
            width,
            height,
            patch_size,
            edge_margin,
            rows_count: height / patch_size + 1,
            cols_count: width / patch_size + 1,
        })
    }

    pub fn len(&self) -> usize {
        self.rows_count * self.cols_count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clamp(&self, raw: usize, extent: usize) -> usize {
        if raw + self.patch_size > extent {
            extent - self.patch_size - self.edge_margin
        } else {
            raw
        }
    }

    pub fn cell(&self, linear_index: usize) -> Option<GridCell> {
        if linear_index >= self.len() {
            return None;
        }
        let row_index = linear_index / self.cols_count;
        let col_index = linear_index % self.cols_count;

        Some(GridCell {
            row_index,
            col_index,
            linear_index,
            y_offset: self.clamp(row_index * self.patch_size, self.height),
            x_offset: self.clamp(col_index * self.patch_size, self.width),
            patch_size: self.patch_size,
        })
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        (0..self.len()).filter_map(move |index| self.cell(index))
    }
}

/// Ordered grid cells for an image, using the default edge margin.
pub fn compute_grid(width: usize, height: usize, patch_size: usize) -> Result<Vec<GridCell>> {
    let spec = GridSpec::new(width, height, patch_size, DEFAULT_EDGE_MARGIN)?;
    Ok(spec.cells().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn covered(spec: &GridSpec) -> Vec<bool> {
        let mut hit = vec![false; spec.width * spec.height];
        for cell in spec.cells() {
            for y in 0..spec.height {
                for x in 0..spec.width {
                    if cell.contains(x, y) {
                        hit[y * spec.width + x] = true;
                    }
                }
            }
        }
        hit
    }

    #[test]
    fn test_last_column_clamps_inward() {
        let cells = compute_grid(500, 500, 224).unwrap();
        assert_eq!(cells.len(), 9);

        let offsets: Vec<usize> = cells.iter().take(3).map(|c| c.x_offset).collect();
        assert_eq!(offsets, vec![0, 224, 275]);
        assert_eq!(cells[8].y_offset, 275);
        assert_eq!(cells[8].x_offset, 275);
    }

    #[test]
    fn test_linear_index_is_row_major() {
        let spec = GridSpec::new(700, 500, 224, 1).unwrap();
        assert_eq!((spec.rows_count, spec.cols_count), (3, 4));
        for (position, cell) in spec.cells().enumerate() {
            assert_eq!(cell.linear_index, position);
            assert_eq!(cell.linear_index, cell.row_index * spec.cols_count + cell.col_index);
        }
    }

    #[test]
    fn test_grid_is_deterministic() {
        let first = compute_grid(1031, 877, 64).unwrap();
        let second = compute_grid(1031, 877, 64).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_cells_fit_inside_image() {
        for &(width, height, patch) in &[(225, 225, 224), (448, 449, 224), (1000, 301, 100), (9, 33, 8)] {
            let spec = GridSpec::new(width, height, patch, 1).unwrap();
            for cell in spec.cells() {
                assert!(cell.x_offset + patch <= width);
                assert!(cell.y_offset + patch <= height);
            }
        }
    }

    #[test]
    fn test_flush_margin_covers_every_pixel() {
        for &(width, height, patch) in &[(500, 500, 224), (448, 448, 224), (17, 40, 8), (8, 8, 8), (31, 9, 5)] {
            let spec = GridSpec::new(width, height, patch, 0).unwrap();
            assert!(covered(&spec).into_iter().all(|hit| hit), "{width}x{height}/{patch}");
        }
    }

    #[test]
    fn test_default_margin_leaves_only_trailing_edge() {
        let spec = GridSpec::new(500, 300, 224, DEFAULT_EDGE_MARGIN).unwrap();
        let hit = covered(&spec);
        for y in 0..spec.height {
            for x in 0..spec.width {
                let on_trailing_edge = x == spec.width - 1 || y == spec.height - 1;
                assert_eq!(hit[y * spec.width + x], !on_trailing_edge, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_divisible_extent_is_fully_covered_with_default_margin() {
        let spec = GridSpec::new(448, 448, 224, DEFAULT_EDGE_MARGIN).unwrap();
        assert!(covered(&spec).into_iter().all(|hit| hit));
    }

    #[test]
    fn test_image_too_small() {
        let result = compute_grid(224, 500, 224);
        assert!(matches!(result, Err(PatchError::ImageTooSmall { width: 224, .. })));
        assert!(compute_grid(225, 225, 224).is_ok());
        assert!(GridSpec::new(224, 224, 224, 0).is_ok());
    }

    #[test]
    fn test_zero_patch_size() {
        assert!(matches!(compute_grid(10, 10, 0), Err(PatchError::InvalidPatchSize(0))));
    }

    #[test]
    fn test_cell_lookup_out_of_range() {
        let spec = GridSpec::new(500, 500, 224, 1).unwrap();
        assert!(spec.cell(8).is_some());
        assert!(spec.cell(9).is_none());
    }

    #[test]
    fn test_crop_uses_cell_offsets() {
        let raster = Raster::from_fn(10, 10, |x, y| (y * 10 + x) as u16);
        let spec = GridSpec::new(10, 10, 4, 1).unwrap();
        let last = spec.cell(spec.len() - 1).unwrap();
        assert_eq!((last.x_offset, last.y_offset), (5, 5));
        let window = last.crop(&raster).unwrap();
        assert_eq!(window.get(0, 0), 55);
        assert_eq!(window.get(3, 3), 88);
    }
}
