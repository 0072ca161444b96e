//! ROI polygons and region sampling

/// Integer polygons and scanline fill
pub mod polygon;
/// Pixel masks and per-row sampling
pub mod sampler;
