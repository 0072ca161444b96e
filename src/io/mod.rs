//! Input/output, configuration and error handling

/// Command-line interface and batch processing
pub mod cli;
/// Board constants and engine defaults
pub mod configuration;
/// Error types
pub mod error;
/// Header timestamps and exposure time
pub mod header;
/// Image loading
pub mod image;
/// Progress display
pub mod progress;
/// ROI registration files
pub mod registration;
/// Report export
pub mod report;
/// Background decode worker
pub mod worker;
