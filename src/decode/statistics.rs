//! Exposure timing statistics and the final report

use crate::decode::digits::{BoardStatus, DecodedValue, TimedRowTable};
use crate::decode::millisecond::LedEstimate;
use crate::decode::outliers::ScanDirection;
use crate::io::configuration::{CLOCK_PERIOD_SECONDS, HEADER_WRAP_SECONDS, VALUE_WRAP_SECONDS};
use serde::Serialize;

/// Sensor readout mode inferred from the millisecond LEDs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ShutterType {
    /// Rows are read one after another
    Rolling,
    /// All rows share one exposure instant
    Global,
}

/// Timing figures derived from the filtered rows
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimingStatistics {
    /// Inferred readout mode
    pub shutter_type: ShutterType,
    /// Seconds between consecutive rows as a magnitude, rolling shutter only
    pub rolling_shutter_row_time: Option<f64>,
    /// Clock time of the first sensor row
    pub calc_first_pixel: f64,
    /// Header timestamp seconds modulo 10
    pub fits_time: f64,
    /// Correction to apply to the header timestamp
    pub fits_delta: f64,
    /// Clock time of the last sensor row
    pub calc_last_pixel: f64,
    /// Time from first to last row, negative for a decreasing scan
    pub full_readout_time: f64,
    /// Row time implied by the first and last reference rows
    pub first_last_per_row_time: Option<f64>,
}

/// Counters gathered along the pipeline
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    /// Rows scanned, end exclusive
    pub row_range: (usize, usize),
    /// Global on/off threshold
    pub on_threshold: f64,
    /// Rows crossing enough ROIs to decode
    pub candidate_rows: usize,
    /// Rows showing a board status pattern
    pub status_rows: usize,
    /// Rows whose leading digit could not be read
    pub undecodable_rows: usize,
    /// Rows removed for straying from the mean
    pub removed_by_mean: usize,
    /// Rows removed for stepping against the scan direction
    pub removed_by_monotonic: usize,
    /// Per-LED millisecond pattern results
    pub millisecond_leds: Vec<LedEstimate>,
}

/// Complete timing report for one exposure
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimingReport {
    /// Rows that survived filtering, keyed by sensor row
    pub timed_rows: TimedRowTable,
    /// Derived timing figures
    #[serde(flatten)]
    pub statistics: TimingStatistics,
    /// How decoded values progress down the sensor
    pub scan_direction: ScanDirection,
    /// Last board status pattern seen, if any row showed one
    pub board_status: Option<BoardStatus>,
    /// Pipeline counters
    pub diagnostics: Diagnostics,
}

/// Inputs of the aggregation step
#[derive(Clone, Copy, Debug)]
pub struct AggregateInput<'a> {
    /// Filtered rows
    pub table: &'a TimedRowTable,
    /// Detected scan direction
    pub direction: ScanDirection,
    /// Rolling-shutter row time from the millisecond LEDs
    pub row_time: Option<f64>,
    /// Image height in rows
    pub total_rows: usize,
    /// Header timestamp seconds modulo 10
    pub header_time: f64,
    /// Maximum resolution of a reference row
    pub reference_resolution: i32,
}

/// Move a pixel time past the clock wrap when the header sits on the far side
pub fn unwrap_pixel_time(value: f64, header_time: f64) -> f64 {
    if value < 0.0 || (header_time >= HEADER_WRAP_SECONDS && value <= VALUE_WRAP_SECONDS) {
        value + CLOCK_PERIOD_SECONDS
    } else {
        value
    }
}

/// Rows resolved finely enough to anchor the timing, ascending
pub fn reference_rows(table: &TimedRowTable, reference_resolution: i32) -> Vec<(usize, &DecodedValue)> {
    table
        .iter()
        .filter(|(_, value)| value.resolution <= reference_resolution)
        .map(|(&row, value)| (row, value))
        .collect()
}

/// Row time implied by the decoded values of the outermost reference rows
pub fn first_last_row_time(
    references: &[(usize, &DecodedValue)],
    direction: ScanDirection,
) -> Option<f64> {
    let (first_row, first) = references.first()?;
    let (last_row, last) = references.last()?;
    if last_row <= first_row {
        return None;
    }

    // Filtered rows are monotonic, so a reversal means the clock wrapped
    let start = first.seconds();
    let mut end = last.seconds();
    match direction {
        ScanDirection::Increasing if end < start => end += CLOCK_PERIOD_SECONDS,
        ScanDirection::Decreasing if end > start => end -= CLOCK_PERIOD_SECONDS,
        _ => {}
    }

    Some((end - start) / (last_row - first_row) as f64)
}

/// Combine filtered rows and the row time into timing statistics
///
/// Returns `None` when the table is empty.
pub fn aggregate(input: &AggregateInput<'_>) -> Option<TimingStatistics> {
    let references = reference_rows(input.table, input.reference_resolution);
    let first_last_per_row_time = first_last_row_time(&references, input.direction);

    let (shutter_type, first_pixel, last_pixel) = if let Some(row_time) = input.row_time {
        let anchors: Vec<(usize, &DecodedValue)> = if references.is_empty() {
            input.table.iter().map(|(&row, value)| (row, value)).collect()
        } else {
            references
        };
        let &(row, value) = anchors.get(anchors.len() / 2)?;
        // Clock time per row follows the scan direction
        let step = if input.direction.is_increasing() { row_time } else { -row_time };
        let first = (row as f64).mul_add(-step, value.seconds());
        let last = ((input.total_rows - row.min(input.total_rows)) as f64)
            .mul_add(step, value.seconds());
        (ShutterType::Rolling, first, last)
    } else {
        let value = input.table.values().nth(input.table.len() / 2)?;
        (ShutterType::Global, value.seconds(), value.seconds())
    };

    let calc_first_pixel = unwrap_pixel_time(first_pixel, input.header_time);
    let calc_last_pixel = unwrap_pixel_time(last_pixel, input.header_time);

    Some(TimingStatistics {
        shutter_type,
        rolling_shutter_row_time: input.row_time,
        calc_first_pixel,
        fits_time: input.header_time,
        fits_delta: calc_first_pixel - input.header_time,
        calc_last_pixel,
        full_readout_time: calc_last_pixel - calc_first_pixel,
        first_last_per_row_time,
    })
}
