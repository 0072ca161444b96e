//! Per-row LED on/off classification
//!
//! Every sensor row crossing the LED array is read left to right through the
//! ROI polygons. A single global threshold decides the digit LEDs, while the
//! four millisecond LEDs are also judged against their own mean brightness
//! to feed sub-row timing.

use crate::geometry::sampler::{RegionMask, mean};
use crate::io::configuration::{DecodeConfig, LED_COUNT};
use crate::io::error::{Result, TimingError, invalid_registration};
use crate::io::registration::RoiSet;
use crate::io::worker::CancelToken;
use bitvec::prelude::*;
use ndarray::ArrayView2;
use num_traits::ToPrimitive;
use tracing::debug;

/// LED states of one candidate row
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowVector {
    /// Sensor row index
    pub row: usize,
    /// On/off state per LED, board order, as many as intersect the row
    pub leds: BitVec,
    /// Number of ROIs found to intersect the row
    pub intersecting: usize,
}

/// Row-by-row brightness of one millisecond LED
#[derive(Clone, Debug, PartialEq)]
pub struct MillisecondTrace {
    /// Board index of the LED
    pub led_index: usize,
    /// Mean brightness over the LED's whole ROI
    pub roi_mean: f64,
    /// Sensor rows the ROI intersects, ascending
    pub rows: Vec<usize>,
    /// Mean brightness of the ROI within each row
    pub means: Vec<f64>,
    /// Row mean above the ROI mean, one per entry in `rows`
    pub states: BitVec,
}

/// Everything read from the LED array of one image
#[derive(Clone, Debug)]
pub struct Classification {
    /// Global on/off split point
    pub on_threshold: f64,
    /// Scanned rows, end exclusive
    pub row_range: (usize, usize),
    /// Rows intersecting enough ROIs to be decoded, ascending
    pub rows: Vec<RowVector>,
    /// Local traces of the millisecond LEDs, board order
    pub millisecond_traces: Vec<MillisecondTrace>,
}

/// Rasterized LED regions for one image size
#[derive(Clone, Debug)]
pub struct LedClassifier {
    masks: Vec<RegionMask>,
    shape: (usize, usize),
}

impl LedClassifier {
    /// Rasterize every ROI for an image of `shape` (rows, cols)
    ///
    /// # Errors
    ///
    /// Returns an error if any ROI lies completely outside the image
    pub fn new(shape: (usize, usize), rois: &RoiSet) -> Result<Self> {
        let masks = rois
            .polygons()
            .iter()
            .enumerate()
            .map(|(index, polygon)| {
                RegionMask::new(shape, polygon)
                    .filter(|mask| mask.pixel_count() > 0)
                    .ok_or_else(|| {
                        invalid_registration(&format!(
                            "polygon {index} lies outside the {}x{} image",
                            shape.1, shape.0
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { masks, shape })
    }

    /// Region masks in board order
    pub fn masks(&self) -> &[RegionMask] {
        &self.masks
    }

    /// Mean of every pixel inside any ROI
    pub fn on_threshold<T>(&self, image: ArrayView2<'_, T>) -> Option<f64>
    where
        T: ToPrimitive + Copy,
    {
        let samples: Vec<f64> = self
            .masks
            .iter()
            .flat_map(|mask| mask.values(image))
            .collect();
        mean(&samples)
    }

    /// First and one-past-last row covered by any ROI
    pub fn row_range(&self) -> (usize, usize) {
        let start = self.masks.iter().map(|m| m.rows().start).min().unwrap_or(0);
        let end = self.masks.iter().map(|m| m.rows().end).max().unwrap_or(0);
        (start, end)
    }

    /// Classify every LED row of `image`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The image size differs from the one the masks were built for
    /// - The ROIs contain no pixels to derive a threshold from
    /// - `cancel` is triggered while rows are being scanned
    pub fn classify<T>(
        &self,
        image: ArrayView2<'_, T>,
        config: &DecodeConfig,
        cancel: Option<&CancelToken>,
    ) -> Result<Classification>
    where
        T: ToPrimitive + Copy,
    {
        if image.dim() != self.shape {
            return Err(invalid_registration(&format!(
                "masks were built for {:?} but the image is {:?}",
                self.shape,
                image.dim()
            )));
        }

        let on_threshold = self.on_threshold(image).ok_or_else(|| {
            invalid_registration(&"the ROIs contain no pixels to threshold")
        })?;
        let row_range = self.row_range();
        debug!(on_threshold, start = row_range.0, end = row_range.1, "scanning LED rows");

        let mut rows = Vec::new();
        for y in row_range.0..row_range.1 {
            if cancel.is_some_and(CancelToken::is_cancelled) {
                return Err(TimingError::Cancelled { row: y });
            }
            if let Some(row) = self.classify_row(image, y, on_threshold) {
                if row.intersecting >= config.min_intersecting_rois {
                    rows.push(row);
                }
            }
        }

        let millisecond_traces = RoiSet::millisecond_leds()
            .filter_map(|led| self.millisecond_trace(image, led))
            .collect();

        debug!(
            candidates = rows.len(),
            scanned = row_range.1 - row_range.0,
            "classified LED rows"
        );

        Ok(Classification {
            on_threshold,
            row_range,
            rows,
            millisecond_traces,
        })
    }

    /// Global on/off states of the LEDs crossing row `y`
    ///
    /// LEDs are read in board order and reading stops at the first ROI that
    /// misses the row. The last LED is never part of the scan.
    pub fn classify_row<T>(
        &self,
        image: ArrayView2<'_, T>,
        y: usize,
        on_threshold: f64,
    ) -> Option<RowVector>
    where
        T: ToPrimitive + Copy,
    {
        let mut leds = BitVec::with_capacity(LED_COUNT);
        for mask in self.masks.iter().take(LED_COUNT - 1) {
            if !mask.covers_row(y) {
                break;
            }
            let Some(row_mean) = mean(&mask.row_values(image, y)) else {
                break;
            };
            leds.push(row_mean > on_threshold);
        }

        let intersecting = leds.len();
        (intersecting > 0).then_some(RowVector {
            row: y,
            leds,
            intersecting,
        })
    }

    /// Local on/off trace of LED `led` against its own mean brightness
    pub fn millisecond_trace<T>(&self, image: ArrayView2<'_, T>, led: usize) -> Option<MillisecondTrace>
    where
        T: ToPrimitive + Copy,
    {
        let mask = self.masks.get(led)?;
        let roi_mean = mean(&mask.values(image))?;

        let mut rows = Vec::new();
        let mut means = Vec::new();
        let mut states = BitVec::new();
        for y in mask.rows() {
            if let Some(row_mean) = mean(&mask.row_values(image, y)) {
                rows.push(y);
                means.push(row_mean);
                states.push(row_mean > roi_mean);
            }
        }

        Some(MillisecondTrace {
            led_index: led,
            roi_mean,
            rows,
            means,
            states,
        })
    }
}
