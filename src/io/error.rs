//! Error types and context management for exposure timing operations

use std::fmt;
use std::path::PathBuf;

/// Main error type for all decode operations
#[derive(Debug)]
pub enum TimingError {
    /// Failed to load source image from filesystem
    ImageLoad {
        /// Path to the image file
        path: PathBuf,
        /// Underlying image loading error
        source: image::ImageError,
    },

    /// Failed to save an image to disk
    ImageExport {
        /// Path where export was attempted
        path: PathBuf,
        /// Underlying image export error
        source: image::ImageError,
    },

    /// ROI registration input is malformed
    ///
    /// Reported before any sampling begins:
    /// - Wrong number of polygons
    /// - Polygon with fewer than three vertices or zero area
    /// - Polygon lying completely outside the image
    InvalidRegistration {
        /// Description of what's wrong with the registration
        reason: String,
    },

    /// Registration or header JSON could not be parsed
    Parse {
        /// What was being parsed
        what: &'static str,
        /// Underlying JSON error
        source: serde_json::Error,
    },

    /// Image header value could not be interpreted
    InvalidHeader {
        /// Header keyword
        keyword: &'static str,
        /// Raw header value
        value: String,
        /// Explanation of why the value is unusable
        reason: String,
    },

    /// Decode parameter validation failed
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: &'static str,
        /// Provided value that failed validation
        value: String,
        /// Explanation of why the value is invalid
        reason: String,
    },

    /// No timed rows survived classification, decoding and filtering
    ///
    /// The one fatal outcome for a single image: without any decoded row
    /// there is nothing to anchor the exposure start to.
    NoTimedRows {
        /// Rows that intersected enough ROIs to be considered
        candidate_rows: usize,
        /// Rows dropped because they decoded to a board status or nothing
        undecoded_rows: usize,
    },

    /// Decode was cancelled between row iterations
    Cancelled {
        /// Row being scanned when cancellation was observed
        row: usize,
    },

    /// One or more images of a batch failed to decode
    BatchFailed {
        /// Images that failed
        failed: usize,
        /// Images attempted
        total: usize,
    },

    /// Failed to write the timing report
    ReportExport {
        /// Path where export was attempted
        path: PathBuf,
        /// Underlying serialization error
        source: serde_json::Error,
    },

    /// General file system operation failure
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Numerical computation produced invalid result
    Computation {
        /// Name of the computation that failed
        operation: &'static str,
        /// Description of the failure
        reason: String,
    },
}

impl fmt::Display for TimingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImageLoad { path, source } => {
                write!(f, "Failed to load image '{}': {source}", path.display())
            }
            Self::ImageExport { path, source } => {
                write!(
                    f,
                    "Failed to export image to '{}': {source}",
                    path.display()
                )
            }
            Self::InvalidRegistration { reason } => {
                write!(f, "Invalid ROI registration: {reason}")
            }
            Self::Parse { what, source } => {
                write!(f, "Failed to parse {what}: {source}")
            }
            Self::InvalidHeader {
                keyword,
                value,
                reason,
            } => {
                write!(f, "Invalid header {keyword} = '{value}': {reason}")
            }
            Self::InvalidParameter {
                parameter,
                value,
                reason,
            } => {
                write!(f, "Invalid parameter '{parameter}' = '{value}': {reason}")
            }
            Self::NoTimedRows {
                candidate_rows,
                undecoded_rows,
            } => {
                write!(
                    f,
                    "No timed rows left to build a report ({candidate_rows} candidate rows, {undecoded_rows} undecoded)"
                )
            }
            Self::Cancelled { row } => {
                write!(f, "Decode cancelled at row {row}")
            }
            Self::BatchFailed { failed, total } => {
                write!(f, "{failed} of {total} images failed to decode")
            }
            Self::ReportExport { path, source } => {
                write!(
                    f,
                    "Failed to export report to '{}': {source}",
                    path.display()
                )
            }
            Self::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "File system error during {operation} on '{}': {source}",
                    path.display()
                )
            }
            Self::Computation { operation, reason } => {
                write!(f, "Computation error in {operation}: {reason}")
            }
        }
    }
}

impl std::error::Error for TimingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ImageLoad { source, .. } | Self::ImageExport { source, .. } => Some(source),
            Self::Parse { source, .. } | Self::ReportExport { source, .. } => Some(source),
            Self::FileSystem { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience type alias for decode results
pub type Result<T> = std::result::Result<T, TimingError>;

impl From<image::ImageError> for TimingError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageLoad {
            path: PathBuf::from("<unknown>"),
            source: err,
        }
    }
}

impl From<std::io::Error> for TimingError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("<unknown>"),
            operation: "unknown",
            source: err,
        }
    }
}

impl From<serde_json::Error> for TimingError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse {
            what: "JSON",
            source: err,
        }
    }
}

/// Create an invalid parameter error
pub fn invalid_parameter(
    parameter: &'static str,
    value: &impl ToString,
    reason: &impl ToString,
) -> TimingError {
    TimingError::InvalidParameter {
        parameter,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Create an invalid registration error
pub fn invalid_registration(reason: &impl ToString) -> TimingError {
    TimingError::InvalidRegistration {
        reason: reason.to_string(),
    }
}

/// Create a computation error
pub fn computation_error(operation: &'static str, reason: &impl ToString) -> TimingError {
    TimingError::Computation {
        operation,
        reason: reason.to_string(),
    }
}
