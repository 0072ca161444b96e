//! Image header timestamps and exposure duration

use crate::io::configuration::{CLOCK_PERIOD_SECONDS, HEADER_SIDECAR_SUFFIX};
use crate::io::error::{Result, TimingError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Header values needed to compare the decoded clock against the camera
#[derive(Clone, Debug, PartialEq)]
pub struct ExposureHeader {
    date_obs: String,
    clock_seconds: f64,
    exposure_time: f64,
}

// Sidecar layout; EXPTIME may be written as a number or as text
#[derive(Deserialize)]
struct SidecarHeader {
    #[serde(rename = "DATE-OBS")]
    date_obs: String,
    #[serde(rename = "EXPTIME")]
    exposure_time: serde_json::Value,
}

impl ExposureHeader {
    /// Build from the observation timestamp and exposure duration in seconds
    ///
    /// # Errors
    ///
    /// Returns an error if the timestamp has no parsable seconds field or
    /// the exposure time is not a positive finite number
    pub fn new(date_obs: &str, exposure_time: f64) -> Result<Self> {
        let clock_seconds = parse_clock_seconds(date_obs)?;
        if !exposure_time.is_finite() || exposure_time <= 0.0 {
            return Err(TimingError::InvalidHeader {
                keyword: "EXPTIME",
                value: exposure_time.to_string(),
                reason: "exposure time must be a positive number of seconds".to_string(),
            });
        }

        Ok(Self {
            date_obs: date_obs.to_string(),
            clock_seconds,
            exposure_time,
        })
    }

    /// Build from header text values as found in image metadata
    ///
    /// # Errors
    ///
    /// Returns an error if either value cannot be interpreted
    pub fn from_strings(date_obs: &str, exposure_time: &str) -> Result<Self> {
        let exposure = exposure_time
            .trim()
            .parse::<f64>()
            .map_err(|e| TimingError::InvalidHeader {
                keyword: "EXPTIME",
                value: exposure_time.to_string(),
                reason: e.to_string(),
            })?;
        Self::new(date_obs, exposure)
    }

    /// Load a `{ "DATE-OBS": .., "EXPTIME": .. }` sidecar file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_sidecar(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| TimingError::FileSystem {
            path: path.to_path_buf(),
            operation: "read header sidecar",
            source,
        })?;
        let sidecar: SidecarHeader =
            serde_json::from_str(&json).map_err(|source| TimingError::Parse {
                what: "header sidecar",
                source,
            })?;

        match sidecar.exposure_time {
            serde_json::Value::Number(number) => Self::new(
                &sidecar.date_obs,
                number.as_f64().unwrap_or(f64::NAN),
            ),
            serde_json::Value::String(text) => Self::from_strings(&sidecar.date_obs, &text),
            other => Err(TimingError::InvalidHeader {
                keyword: "EXPTIME",
                value: other.to_string(),
                reason: "expected a number".to_string(),
            }),
        }
    }

    /// Raw observation timestamp
    pub fn date_obs(&self) -> &str {
        &self.date_obs
    }

    /// Timestamp seconds folded onto the board's 10 s clock
    pub const fn clock_seconds(&self) -> f64 {
        self.clock_seconds
    }

    /// Exposure duration in seconds
    pub const fn exposure_time(&self) -> f64 {
        self.exposure_time
    }
}

/// Sidecar header location for an image, `<stem>.header.json` alongside it
pub fn sidecar_path(image_path: &Path) -> PathBuf {
    let stem = image_path.file_stem().unwrap_or_default().to_string_lossy();
    image_path.with_file_name(format!("{stem}{HEADER_SIDECAR_SUFFIX}"))
}

/// Seconds field of an ISO-like timestamp, modulo the board clock period
///
/// The text after the last `:` is parsed as seconds; a value without any
/// `:` is parsed whole.
///
/// # Errors
///
/// Returns an error if the seconds field is not a finite number
pub fn parse_clock_seconds(date_obs: &str) -> Result<f64> {
    let seconds_field = date_obs
        .rfind(':')
        .and_then(|colon| date_obs.get(colon + 1..))
        .unwrap_or(date_obs);

    let seconds = seconds_field
        .trim()
        .parse::<f64>()
        .map_err(|e| TimingError::InvalidHeader {
            keyword: "DATE-OBS",
            value: date_obs.to_string(),
            reason: e.to_string(),
        })?;

    if !seconds.is_finite() {
        return Err(TimingError::InvalidHeader {
            keyword: "DATE-OBS",
            value: date_obs.to_string(),
            reason: "seconds field is not finite".to_string(),
        });
    }

    Ok(seconds.rem_euclid(CLOCK_PERIOD_SECONDS))
}
