//! Decoding of LED rows into exposure timing

/// LED on/off classification per sensor row
pub mod classifier;
/// Digit patterns and board status codes
pub mod digits;
/// Single-image pipeline
pub mod engine;
/// Rolling-shutter row time from the millisecond LEDs
pub mod millisecond;
/// Direction-aware rejection of misread rows
pub mod outliers;
/// Timing statistics and the report
pub mod statistics;
