//! ROI registration files: the ordered LED polygons located on the board

use crate::geometry::polygon::Polygon;
use crate::io::configuration::{LED_COUNT, MILLISECOND_LED_COUNT, MILLISECOND_LED_FIRST};
use crate::io::error::{Result, TimingError, invalid_registration};
use std::path::Path;

/// Ordered set of LED polygons, seconds LED first
///
/// Index 0 is the ones-of-seconds LED and index 19 the 10^-4 s LED. The
/// order mirrors the physical board and is never changed downstream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoiSet {
    polygons: Vec<Polygon>,
}

impl RoiSet {
    /// Validate and wrap an ordered polygon list
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The list does not hold exactly one polygon per LED
    /// - Any polygon has fewer than three vertices or encloses no area
    pub fn new(polygons: Vec<Polygon>) -> Result<Self> {
        if polygons.len() != LED_COUNT {
            return Err(invalid_registration(&format!(
                "expected {LED_COUNT} polygons, found {}",
                polygons.len()
            )));
        }

        if let Some((index, _)) = polygons
            .iter()
            .enumerate()
            .find(|(_, polygon)| polygon.is_degenerate())
        {
            return Err(invalid_registration(&format!(
                "polygon {index} is degenerate (needs at least 3 vertices and a non-zero area)"
            )));
        }

        Ok(Self { polygons })
    }

    /// Parse registration JSON: an array of polygons of `[x, y]` pairs
    ///
    /// Fractional coordinates are rounded to the nearest pixel.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or fails validation
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: Vec<Vec<[f64; 2]>> =
            serde_json::from_str(json).map_err(|source| TimingError::Parse {
                what: "ROI registration",
                source,
            })?;

        let polygons = raw
            .into_iter()
            .map(|points| {
                Polygon::new(
                    points
                        .into_iter()
                        .map(|[x, y]| [x.round() as i32, y.round() as i32])
                        .collect(),
                )
            })
            .collect();

        Self::new(polygons)
    }

    /// Load a registration file from disk
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its content is invalid
    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| TimingError::FileSystem {
            path: path.to_path_buf(),
            operation: "read registration",
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Serialize back into registration JSON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_json_string(&self) -> Result<String> {
        let raw: Vec<&[[i32; 2]]> = self.polygons.iter().map(Polygon::vertices).collect();
        Ok(serde_json::to_string(&raw)?)
    }

    /// Polygons in board order
    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    /// Polygon of LED `index`
    pub fn get(&self, index: usize) -> Option<&Polygon> {
        self.polygons.get(index)
    }

    /// Indices of the four millisecond LEDs
    pub const fn millisecond_leds() -> std::ops::Range<usize> {
        MILLISECOND_LED_FIRST..MILLISECOND_LED_FIRST + MILLISECOND_LED_COUNT
    }
}
