//! Pixel sampling inside ROI polygons
//!
//! Masks are rasterized once per polygon on a buffer cropped to the
//! polygon's bounding rectangle. Because the polygon is translated by whole
//! pixels before filling, the cropped mask matches a full-image mask exactly.

use crate::geometry::polygon::{BoundingRect, Polygon};
use ndarray::{Array2, ArrayView2};
use num_traits::ToPrimitive;

/// Polygon mask cropped to the part of its bounding rectangle inside the image
#[derive(Clone, Debug)]
pub struct RegionMask {
    rect: BoundingRect,
    mask: Array2<bool>,
}

impl RegionMask {
    /// Rasterize `polygon` for an image of `shape` (rows, cols)
    ///
    /// Returns `None` when the polygon's bounding rectangle misses the image.
    pub fn new(shape: (usize, usize), polygon: &Polygon) -> Option<Self> {
        let rect = polygon.bounding_rect()?.clip(shape.0, shape.1)?;
        let local = polygon.translated(-rect.x, -rect.y);
        let mut mask = Array2::from_elem((rect.height as usize, rect.width as usize), false);

        for local_row in 0..rect.height {
            for (left, right) in local.row_spans(local_row) {
                let left = left.max(0);
                let right = right.min(rect.width - 1);
                for col in left..=right {
                    if let Some(cell) = mask.get_mut([local_row as usize, col as usize]) {
                        *cell = true;
                    }
                }
            }
        }

        Some(Self { rect, mask })
    }

    /// Bounding rectangle clipped to the image
    pub const fn rect(&self) -> BoundingRect {
        self.rect
    }

    /// Test whether the bounding rectangle covers image row `y`
    pub fn covers_row(&self, y: usize) -> bool {
        i32::try_from(y).is_ok_and(|y| self.rect.contains_row(y))
    }

    /// Image rows covered by the bounding rectangle
    pub fn rows(&self) -> std::ops::Range<usize> {
        let top = self.rect.y as usize;
        top..top + self.rect.height as usize
    }

    /// Number of pixels inside the polygon
    pub fn pixel_count(&self) -> usize {
        self.mask.iter().filter(|&&inside| inside).count()
    }

    /// Pixel values of image row `y` that fall inside the polygon
    pub fn row_values<T>(&self, image: ArrayView2<'_, T>, y: usize) -> Vec<f64>
    where
        T: ToPrimitive + Copy,
    {
        if !self.covers_row(y) {
            return Vec::new();
        }
        let local_row = y - self.rect.y as usize;
        let left = self.rect.x as usize;

        self.mask
            .row(local_row)
            .iter()
            .enumerate()
            .filter(|&(_, &inside)| inside)
            .filter_map(|(col, _)| image.get([y, left + col]).and_then(ToPrimitive::to_f64))
            .collect()
    }

    /// All pixel values inside the polygon, row-major
    pub fn values<T>(&self, image: ArrayView2<'_, T>) -> Vec<f64>
    where
        T: ToPrimitive + Copy,
    {
        let top = self.rect.y as usize;
        let left = self.rect.x as usize;

        self.mask
            .indexed_iter()
            .filter(|&(_, &inside)| inside)
            .filter_map(|((row, col), _)| {
                image
                    .get([top + row, left + col])
                    .and_then(ToPrimitive::to_f64)
            })
            .collect()
    }

    /// Expand into a mask the size of the whole image
    pub fn to_full(&self, shape: (usize, usize)) -> Array2<bool> {
        let mut full = Array2::from_elem(shape, false);
        let top = self.rect.y as usize;
        let left = self.rect.x as usize;
        for ((row, col), &inside) in self.mask.indexed_iter() {
            if let Some(cell) = full.get_mut([top + row, left + col]) {
                *cell = inside;
            }
        }
        full
    }
}

/// Boolean mask the size of `shape` with the polygon interior set
///
/// Filled directly on the full grid without cropping.
pub fn mask(shape: (usize, usize), polygon: &Polygon) -> Array2<bool> {
    let mut full = Array2::from_elem(shape, false);
    let Some(rect) = polygon
        .bounding_rect()
        .and_then(|rect| rect.clip(shape.0, shape.1))
    else {
        return full;
    };

    for row in rect.y..rect.bottom() {
        for (left, right) in polygon.row_spans(row) {
            for col in left.max(0)..=right.min(rect.right() - 1) {
                if let Some(cell) = full.get_mut([row as usize, col as usize]) {
                    *cell = true;
                }
            }
        }
    }
    full
}

/// Pixel values strictly inside the polygon
pub fn values<T>(image: ArrayView2<'_, T>, polygon: &Polygon) -> Vec<f64>
where
    T: ToPrimitive + Copy,
{
    RegionMask::new(image.dim(), polygon)
        .map(|region| region.values(image))
        .unwrap_or_default()
}

/// Arithmetic mean, `None` for an empty sample
pub fn mean(samples: &[f64]) -> Option<f64> {
    (!samples.is_empty()).then(|| samples.iter().sum::<f64>() / samples.len() as f64)
}
