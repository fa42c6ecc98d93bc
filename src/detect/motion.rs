//! Frame-differencing motion primitive.
//!
//! Shared by the camera-motion analyzer (global shake) and the generic
//! motion detector (per-object movement): absolute pixel-wise difference,
//! binary threshold, changed-pixel ratio.

use anyhow::{anyhow, Result};
use image::GrayImage;

/// Binary threshold applied to per-pixel absolute differences.
/// Empirically chosen; differences below this are sensor noise.
pub const DIFF_SENSITIVITY: u8 = 25;

/// Percentage of pixels whose absolute difference exceeds `sensitivity`.
///
/// Frames must have equal dimensions; the caller guarantees that by only
/// comparing a session's consecutive accepted frames.
pub fn changed_percent(current: &GrayImage, previous: &GrayImage, sensitivity: u8) -> Result<f64> {
    if current.dimensions() != previous.dimensions() {
        return Err(anyhow!(
            "frame size mismatch: {}x{} vs {}x{}",
            current.width(),
            current.height(),
            previous.width(),
            previous.height()
        ));
    }
    let total = current.as_raw().len();
    if total == 0 {
        return Err(anyhow!("cannot diff empty frames"));
    }

    let changed = current
        .as_raw()
        .iter()
        .zip(previous.as_raw().iter())
        .filter(|(a, b)| a.abs_diff(**b) > sensitivity)
        .count();

    Ok(changed as f64 / total as f64 * 100.0)
}
