//! Single-channel image loading into sample arrays

use crate::io::error::{Result, TimingError, computation_error};
use image::{DynamicImage, ImageBuffer, Luma};
use ndarray::Array2;
use std::path::Path;

/// Load an image file as a single luminance channel
///
/// Colour images are converted to luma; 16-bit data keeps its full range.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or decoded
pub fn load_luma(path: &Path) -> Result<Array2<f64>> {
    let img = image::open(path).map_err(|source| TimingError::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;
    luma_array(&img)
}

/// Convert a decoded image into a `(rows, cols)` sample array
///
/// # Errors
///
/// Returns an error if the pixel buffer does not match the image dimensions
pub fn luma_array(img: &DynamicImage) -> Result<Array2<f64>> {
    let luma = img.to_luma16();
    buffer_to_array(&luma)
}

fn buffer_to_array(buffer: &ImageBuffer<Luma<u16>, Vec<u16>>) -> Result<Array2<f64>> {
    let (width, height) = buffer.dimensions();
    let samples = buffer.as_raw().iter().copied().map(f64::from).collect();
    Array2::from_shape_vec((height as usize, width as usize), samples)
        .map_err(|e| computation_error("image conversion", &e))
}

/// Save a sample array as a 16-bit grayscale PNG, clamping to the u16 range
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or the file
/// cannot be written
pub fn save_luma16(samples: &Array2<f64>, path: &Path) -> Result<()> {
    let (rows, cols) = samples.dim();
    let mut img = ImageBuffer::<Luma<u16>, Vec<u16>>::new(cols as u32, rows as u32);
    for ((row, col), &value) in samples.indexed_iter() {
        let clamped = value.round().clamp(0.0, f64::from(u16::MAX)) as u16;
        img.put_pixel(col as u32, row as u32, Luma([clamped]));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| TimingError::FileSystem {
            path: parent.to_path_buf(),
            operation: "create directory",
            source: e,
        })?;
    }

    img.save(path).map_err(|e| TimingError::ImageExport {
        path: path.into(),
        source: e,
    })
}
