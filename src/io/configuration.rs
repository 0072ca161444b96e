//! Board layout constants and runtime configuration defaults

// Physical board layout
/// Number of LEDs (and ROI polygons) on the timecode board
pub const LED_COUNT: usize = 20;
/// LEDs per decimal digit
pub const LEDS_PER_DIGIT: usize = 4;
/// Index of the first millisecond-resolution LED
pub const MILLISECOND_LED_FIRST: usize = 12;
/// Number of millisecond-resolution LEDs
pub const MILLISECOND_LED_COUNT: usize = 4;

/// Expected run lengths for one 10 ms blink cycle of each millisecond LED
///
/// Ordered as LEDs 12, 13, 14 and 15. Each pattern sums to 10 units of 1 ms.
pub const MILLISECOND_PATTERNS: [&[usize]; MILLISECOND_LED_COUNT] = [
    &[1, 4, 1, 2, 1, 1],
    &[1, 2, 4, 3],
    &[1, 2, 2, 1, 2, 2],
    &[1, 3, 1, 2, 2, 1],
];
/// Duration of one pattern unit in seconds
pub const MILLISECOND_UNIT_SECONDS: f64 = 0.001;

// Row classification
/// Minimum ROIs a row must intersect to be decoded
pub const MIN_INTERSECTING_ROIS: usize = 12;

// Clock wraparound handling
/// Period of the board clock in seconds
pub const CLOCK_PERIOD_SECONDS: f64 = 10.0;
/// Values above this may be followed by a wrapped value
pub const WRAP_HIGH: f64 = 9.8;
/// Values below this may follow a wrapped value
pub const WRAP_LOW: f64 = 0.2;
/// Rows stay wrapped while increasing values remain below this
pub const WRAP_CONTINUE_LOW: f64 = 1.0;
/// Rows stay wrapped while decreasing values remain above this
pub const WRAP_CONTINUE_HIGH: f64 = 9.0;
/// Maximum deviation from the wrap-adjusted mean before a row is rejected
pub const MEAN_TOLERANCE_SECONDS: f64 = 1.0;

// Statistics
/// Rows at or below this resolution anchor the rolling shutter fit
pub const REFERENCE_RESOLUTION: i32 = -4;
/// Header seconds at or above this indicate the header is near the wrap
pub const HEADER_WRAP_SECONDS: f64 = 8.0;
/// Decoded values at or below this are considered wrapped past the header
pub const VALUE_WRAP_SECONDS: f64 = 2.0;

// Output settings
/// Extension used for timing report files
pub const REPORT_EXTENSION: &str = "ettime";
/// Suffix of sidecar header files next to images
pub const HEADER_SIDECAR_SUFFIX: &str = ".header.json";
/// Image extensions picked up when scanning a directory
pub const IMAGE_EXTENSIONS: [&str; 4] = ["png", "tif", "tiff", "pgm"];

/// Tunable parameters of the decode engine
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecodeConfig {
    /// Minimum ROIs a row must intersect to be decoded
    pub min_intersecting_rois: usize,
    /// Maximum deviation from the wrap-adjusted mean
    pub mean_tolerance: f64,
    /// Resolution a row needs to become a reference row
    pub reference_resolution: i32,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            min_intersecting_rois: MIN_INTERSECTING_ROIS,
            mean_tolerance: MEAN_TOLERANCE_SECONDS,
            reference_resolution: REFERENCE_RESOLUTION,
        }
    }
}
