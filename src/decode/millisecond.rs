//! Sub-row timing from the blink patterns of the millisecond LEDs
//!
//! Over one 10 ms cycle each millisecond LED switches with a known sequence
//! of run lengths. On a rolling-shutter sensor those runs appear stretched
//! over sensor rows, and the stretch factor gives the row readout time.

use crate::decode::classifier::MillisecondTrace;
use crate::decode::outliers::ScanDirection;
use crate::io::configuration::{MILLISECOND_LED_FIRST, MILLISECOND_PATTERNS, MILLISECOND_UNIT_SECONDS};
use crate::math::sequence::{contains_cyclic, normalize_runs, run_lengths};
use serde::Serialize;
use tracing::debug;

/// Result of matching one LED's trace against its blink pattern
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LedEstimate {
    /// Board index of the LED
    pub led_index: usize,
    /// Run lengths of the trace in rows
    #[serde(skip)]
    pub runs: Vec<usize>,
    /// Runs rounded to pattern units
    #[serde(skip)]
    pub units: Vec<usize>,
    /// Rows per 1 ms pattern unit
    pub rows_per_unit: Option<f64>,
    /// Seconds per sensor row, when the pattern was found
    pub row_time: Option<f64>,
}

/// Combined sub-row estimate over all millisecond LEDs
#[derive(Clone, Debug, PartialEq)]
pub struct MillisecondEstimate {
    /// Per-LED results in board order
    pub leds: Vec<LedEstimate>,
    /// Mean row time over the LEDs that matched
    pub row_time: Option<f64>,
}

/// Expected run lengths of LED `led_index` in scan order
pub fn expected_pattern(led_index: usize, direction: ScanDirection) -> Option<Vec<usize>> {
    let pattern = MILLISECOND_PATTERNS.get(led_index.checked_sub(MILLISECOND_LED_FIRST)?)?;
    let mut steps = pattern.to_vec();
    if !direction.is_increasing() {
        steps.reverse();
    }
    Some(steps)
}

/// Seconds per row implied by `runs`, if they contain a full blink cycle
pub fn estimate_from_runs(runs: &[usize], pattern: &[usize]) -> Option<f64> {
    let longest_unit = pattern.iter().copied().max()?;
    let (units, rows_per_unit) = normalize_runs(runs, longest_unit)?;
    contains_cyclic(&units, pattern).then(|| MILLISECOND_UNIT_SECONDS / rows_per_unit)
}

/// Match one LED trace against its expected pattern
pub fn estimate_led(trace: &MillisecondTrace, pattern: &[usize]) -> LedEstimate {
    let runs = run_lengths(&trace.states);
    let normalized = pattern
        .iter()
        .copied()
        .max()
        .and_then(|longest_unit| normalize_runs(&runs, longest_unit));

    let (units, rows_per_unit) = normalized.map_or((Vec::new(), None), |(units, per_unit)| {
        (units, Some(per_unit))
    });
    let row_time = rows_per_unit
        .filter(|_| contains_cyclic(&units, pattern))
        .map(|per_unit| MILLISECOND_UNIT_SECONDS / per_unit);

    LedEstimate {
        led_index: trace.led_index,
        runs,
        units,
        rows_per_unit,
        row_time,
    }
}

/// Estimate the rolling-shutter row time from all millisecond LED traces
///
/// LEDs whose trace shows no complete cycle are ignored; if none match the
/// sensor is treated as global shutter.
pub fn estimate_row_time(traces: &[MillisecondTrace], direction: ScanDirection) -> MillisecondEstimate {
    let leds: Vec<LedEstimate> = traces
        .iter()
        .filter_map(|trace| {
            let pattern = expected_pattern(trace.led_index, direction)?;
            Some(estimate_led(trace, &pattern))
        })
        .collect();

    let matched: Vec<f64> = leds.iter().filter_map(|led| led.row_time).collect();
    let row_time =
        (!matched.is_empty()).then(|| matched.iter().sum::<f64>() / matched.len() as f64);

    for led in &leds {
        debug!(led = led.led_index, row_time = ?led.row_time, units = ?led.units, "millisecond pattern");
    }

    MillisecondEstimate { leds, row_time }
}
