//! Exposure timing from an LED timecode board captured in camera images
//!
//! A GNSS-disciplined board shows the time as a row of blinking LEDs. Each
//! sensor row of an exposure sees the LEDs as they were when that row was
//! read, so decoding the board row by row recovers when the exposure really
//! started and, on rolling-shutter sensors, how long each row takes to read.

#![forbid(unsafe_code)]

/// Row classification, digit decoding, filtering and timing aggregation
pub mod decode;
/// LED region polygons and per-row pixel sampling
pub mod geometry;
/// Input/output operations, configuration and error handling
pub mod io;
/// Run-length and cyclic pattern utilities
pub mod math;

pub use decode::engine::decode_exposure;
pub use io::error::{Result, TimingError};
