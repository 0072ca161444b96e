//! Single-image decode pipeline
//!
//! Classification, digit decoding, outlier rejection, millisecond pattern
//! matching and aggregation run in sequence on one image. Each call owns
//! its tables; nothing is shared between calls.

use crate::decode::classifier::{LedClassifier, RowVector};
use crate::decode::digits::{BoardStatus, RowDecode, TimedRowTable, decode_row};
use crate::decode::millisecond::estimate_row_time;
use crate::decode::outliers::filter_outliers;
use crate::decode::statistics::{AggregateInput, Diagnostics, TimingReport, aggregate};
use crate::io::configuration::{DecodeConfig, LED_COUNT};
use crate::io::error::{Result, TimingError, computation_error, invalid_parameter};
use crate::io::header::ExposureHeader;
use crate::io::registration::RoiSet;
use crate::io::worker::CancelToken;
use ndarray::ArrayView2;
use num_traits::ToPrimitive;
use tracing::{debug, info, warn};

/// Decoded candidate rows before any filtering
#[derive(Clone, Debug, Default)]
pub struct RowTally {
    /// Rows that decoded to a time value
    pub table: TimedRowTable,
    /// Rows showing a board status pattern
    pub status_rows: usize,
    /// Rows whose leading digit was invalid
    pub undecodable_rows: usize,
    /// Status of the last status row, in row order
    pub last_status: Option<BoardStatus>,
}

/// Decode every candidate row into the timed row table
pub fn decode_rows(rows: &[RowVector], exposure_time: f64) -> RowTally {
    let mut tally = RowTally::default();
    for row in rows {
        match decode_row(&row.leds, exposure_time) {
            RowDecode::Time(value) => {
                tally.table.insert(row.row, value);
            }
            RowDecode::Status(status) => {
                debug!(row = row.row, %status, "board status row");
                tally.status_rows += 1;
                tally.last_status = Some(status);
            }
            RowDecode::Undecodable { bits } => {
                debug!(row = row.row, bits = %bits, "undecodable row");
                tally.undecodable_rows += 1;
            }
        }
    }
    tally
}

/// Reject parameter combinations the pipeline cannot honour
///
/// # Errors
///
/// Returns an error if:
/// - `min_intersecting_rois` is zero or exceeds the scanned LED count
/// - `mean_tolerance` is not a positive finite number
pub fn validate_config(config: &DecodeConfig) -> Result<()> {
    if config.min_intersecting_rois == 0 || config.min_intersecting_rois >= LED_COUNT {
        return Err(invalid_parameter(
            "min_intersecting_rois",
            &config.min_intersecting_rois,
            &format!("must be between 1 and {}", LED_COUNT - 1),
        ));
    }
    if !config.mean_tolerance.is_finite() || config.mean_tolerance <= 0.0 {
        return Err(invalid_parameter(
            "mean_tolerance",
            &config.mean_tolerance,
            &"must be a positive number of seconds",
        ));
    }
    Ok(())
}

/// Decode the LED board in `image` into a timing report
///
/// # Errors
///
/// Returns an error if:
/// - The configuration is invalid
/// - An ROI lies outside the image
/// - No row decodes to a time value that survives filtering
pub fn decode_exposure<T>(
    image: ArrayView2<'_, T>,
    rois: &RoiSet,
    header: &ExposureHeader,
    config: &DecodeConfig,
) -> Result<TimingReport>
where
    T: ToPrimitive + Copy,
{
    run_pipeline(image, rois, header, config, None)
}

/// Like [`decode_exposure`], checking `cancel` between rows
///
/// # Errors
///
/// Returns [`TimingError::Cancelled`] once `cancel` is triggered, otherwise
/// the same errors as [`decode_exposure`]
pub fn decode_exposure_cancellable<T>(
    image: ArrayView2<'_, T>,
    rois: &RoiSet,
    header: &ExposureHeader,
    config: &DecodeConfig,
    cancel: &CancelToken,
) -> Result<TimingReport>
where
    T: ToPrimitive + Copy,
{
    run_pipeline(image, rois, header, config, Some(cancel))
}

fn run_pipeline<T>(
    image: ArrayView2<'_, T>,
    rois: &RoiSet,
    header: &ExposureHeader,
    config: &DecodeConfig,
    cancel: Option<&CancelToken>,
) -> Result<TimingReport>
where
    T: ToPrimitive + Copy,
{
    validate_config(config)?;

    let classifier = LedClassifier::new(image.dim(), rois)?;
    let classification = classifier.classify(image, config, cancel)?;
    let candidate_rows = classification.rows.len();

    let tally = decode_rows(&classification.rows, header.exposure_time());
    if tally.table.is_empty() {
        warn!(
            candidate_rows,
            status_rows = tally.status_rows,
            undecodable_rows = tally.undecodable_rows,
            "no row decoded to a time value"
        );
        return Err(TimingError::NoTimedRows {
            candidate_rows,
            undecoded_rows: tally.status_rows + tally.undecodable_rows,
        });
    }

    let filtered = filter_outliers(&tally.table, config.mean_tolerance);
    if filtered.table.is_empty() {
        warn!(decoded = tally.table.len(), "every decoded row was rejected as an outlier");
        return Err(TimingError::NoTimedRows {
            candidate_rows,
            undecoded_rows: tally.status_rows + tally.undecodable_rows,
        });
    }
    let millisecond = estimate_row_time(&classification.millisecond_traces, filtered.direction);

    let statistics = aggregate(&AggregateInput {
        table: &filtered.table,
        direction: filtered.direction,
        row_time: millisecond.row_time,
        total_rows: image.nrows(),
        header_time: header.clock_seconds(),
        reference_resolution: config.reference_resolution,
    })
    .ok_or_else(|| computation_error("aggregate", &"filtered table is empty"))?;

    info!(
        shutter = ?statistics.shutter_type,
        first_pixel = statistics.calc_first_pixel,
        delta = statistics.fits_delta,
        rows = filtered.table.len(),
        "decoded exposure timing"
    );

    Ok(TimingReport {
        timed_rows: filtered.table,
        statistics,
        scan_direction: filtered.direction,
        board_status: tally.last_status,
        diagnostics: Diagnostics {
            row_range: classification.row_range,
            on_threshold: classification.on_threshold,
            candidate_rows,
            status_rows: tally.status_rows,
            undecodable_rows: tally.undecodable_rows,
            removed_by_mean: filtered.removed_by_mean,
            removed_by_monotonic: filtered.removed_by_monotonic,
            millisecond_leds: millisecond.leds,
        },
    })
}
