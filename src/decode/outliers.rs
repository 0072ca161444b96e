//! Rejection of rows inconsistent with a monotonic, wrapping clock
//!
//! Rows near the top and bottom of the LED array often decode to valid but
//! wrong values when a polygon only grazes its LED. The board clock wraps
//! every 10 s, so every comparison first unwraps values across the boundary.
//! Each stage is a pure function returning a new table.

use crate::decode::digits::TimedRowTable;
use crate::io::configuration::{
    CLOCK_PERIOD_SECONDS, WRAP_CONTINUE_HIGH, WRAP_CONTINUE_LOW, WRAP_HIGH, WRAP_LOW,
};
use serde::Serialize;
use tracing::debug;

/// How decoded values progress with increasing sensor row
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanDirection {
    /// Later rows show later times
    Increasing,
    /// Later rows show earlier times
    Decreasing,
}

impl ScanDirection {
    /// Test for the increasing direction
    pub const fn is_increasing(self) -> bool {
        matches!(self, Self::Increasing)
    }
}

/// Filtered table together with what was removed
#[derive(Clone, Debug)]
pub struct FilterOutcome {
    /// Rows that survived both stages
    pub table: TimedRowTable,
    /// Detected scan direction
    pub direction: ScanDirection,
    /// Rows dropped for straying from the mean
    pub removed_by_mean: usize,
    /// Rows dropped for running against the scan direction
    pub removed_by_monotonic: usize,
}

/// Majority vote over the signs of consecutive differences
///
/// Ties, including tables with fewer than two rows, count as increasing.
pub fn detect_direction(table: &TimedRowTable) -> ScanDirection {
    let values: Vec<f64> = table.values().map(|value| value.seconds()).collect();
    let (rising, falling) = values
        .windows(2)
        .filter_map(|pair| match pair {
            [previous, current] => Some(current - previous),
            _ => None,
        })
        .fold((0_usize, 0_usize), |(rising, falling), delta| {
            if delta > 0.0 {
                (rising + 1, falling)
            } else if delta < 0.0 {
                (rising, falling + 1)
            } else {
                (rising, falling)
            }
        });

    if falling > rising {
        ScanDirection::Decreasing
    } else {
        ScanDirection::Increasing
    }
}

/// Tracks clock wraparound while walking rows in order
///
/// Once a wrap is seen, following rows stay shifted while they remain close
/// to the boundary.
#[derive(Clone, Copy, Debug)]
pub struct WrapTracker {
    direction: ScanDirection,
    previous: Option<f64>,
    wrapped: bool,
}

impl WrapTracker {
    /// Start tracking in `direction` with no previous row
    pub const fn new(direction: ScanDirection) -> Self {
        Self {
            direction,
            previous: None,
            wrapped: false,
        }
    }

    /// Unwrap `value` relative to the rows seen so far
    pub fn adjust(&mut self, value: f64) -> f64 {
        let mut adjusted = value;
        if let Some(previous) = self.previous {
            match self.direction {
                ScanDirection::Increasing => {
                    if self.wrapped && value < WRAP_CONTINUE_LOW {
                        adjusted += CLOCK_PERIOD_SECONDS;
                    } else if previous > WRAP_HIGH && value < WRAP_LOW {
                        adjusted += CLOCK_PERIOD_SECONDS;
                        self.wrapped = true;
                    } else {
                        self.wrapped = false;
                    }
                }
                ScanDirection::Decreasing => {
                    if self.wrapped && value > WRAP_CONTINUE_HIGH {
                        adjusted -= CLOCK_PERIOD_SECONDS;
                    } else if previous < WRAP_LOW && value > WRAP_HIGH {
                        adjusted -= CLOCK_PERIOD_SECONDS;
                        self.wrapped = true;
                    } else {
                        self.wrapped = false;
                    }
                }
            }
        }
        self.previous = Some(value);
        adjusted
    }
}

/// Unwrap `value` against its immediate predecessor only
pub fn unwrap_step(direction: ScanDirection, previous: f64, value: f64) -> f64 {
    match direction {
        ScanDirection::Increasing if previous > WRAP_HIGH && value < WRAP_LOW => {
            value + CLOCK_PERIOD_SECONDS
        }
        ScanDirection::Decreasing if previous < WRAP_LOW && value > WRAP_HIGH => {
            value - CLOCK_PERIOD_SECONDS
        }
        _ => value,
    }
}

/// Wrap-adjusted values of the table in row order
pub fn unwrapped_values(table: &TimedRowTable, direction: ScanDirection) -> Vec<f64> {
    let mut tracker = WrapTracker::new(direction);
    table
        .values()
        .map(|value| tracker.adjust(value.seconds()))
        .collect()
}

/// Drop rows further than `tolerance` seconds from the wrap-adjusted mean
///
/// The first pass establishes the mean, the second rejects rows against it.
pub fn filter_by_mean(
    table: &TimedRowTable,
    direction: ScanDirection,
    tolerance: f64,
) -> TimedRowTable {
    if table.len() < 2 {
        return table.clone();
    }

    let adjusted = unwrapped_values(table, direction);
    let mean = adjusted.iter().sum::<f64>() / adjusted.len() as f64;

    let mut tracker = WrapTracker::new(direction);
    table
        .iter()
        .filter(|(_, value)| (tracker.adjust(value.seconds()) - mean).abs() <= tolerance)
        .map(|(&row, value)| (row, value.clone()))
        .collect()
}

/// Drop rows that step against the scan direction
///
/// Each row is compared with the last row kept, so a single bad row cannot
/// take its well-behaved successor down with it.
pub fn filter_non_monotonic(table: &TimedRowTable, direction: ScanDirection) -> TimedRowTable {
    let mut kept = TimedRowTable::new();
    let mut previous: Option<f64> = None;

    for (&row, value) in table {
        let current = value.seconds();
        let in_order = previous.is_none_or(|previous| {
            let delta = unwrap_step(direction, previous, current) - previous;
            match direction {
                ScanDirection::Increasing => delta >= 0.0,
                ScanDirection::Decreasing => delta <= 0.0,
            }
        });

        if in_order {
            kept.insert(row, value.clone());
            previous = Some(current);
        }
    }
    kept
}

/// Detect the scan direction and run both rejection stages
pub fn filter_outliers(table: &TimedRowTable, tolerance: f64) -> FilterOutcome {
    let direction = detect_direction(table);
    if table.len() < 2 {
        return FilterOutcome {
            table: table.clone(),
            direction,
            removed_by_mean: 0,
            removed_by_monotonic: 0,
        };
    }

    let by_mean = filter_by_mean(table, direction, tolerance);
    let monotonic = filter_non_monotonic(&by_mean, direction);

    let removed_by_mean = table.len() - by_mean.len();
    let removed_by_monotonic = by_mean.len() - monotonic.len();
    debug!(
        ?direction,
        removed_by_mean, removed_by_monotonic, "filtered timed rows"
    );

    FilterOutcome {
        table: monotonic,
        direction,
        removed_by_mean,
        removed_by_monotonic,
    }
}
