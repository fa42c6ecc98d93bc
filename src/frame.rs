//! Pixel-buffer boundary.
//!
//! The core treats frames as in-memory pixel buffers; encoding and decoding
//! happen only at this boundary. Callers hand in raster bytes (JPEG/PNG),
//! the pipeline works on `RgbImage`/`GrayImage`, and the annotated frame is
//! re-encoded on the way out.
//!
//! Ownership rule: decoded buffers are exclusively owned by one session
//! between frames. Replacing the previous pair drops the evicted buffers
//! exactly once; nothing else holds them across calls.

use anyhow::{anyhow, Context, Result};
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use std::io::Cursor;

/// Decode raster bytes into an RGB pixel buffer.
///
/// Malformed payloads are input errors: the caller gets a failed result,
/// never a panic.
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage> {
    if bytes.is_empty() {
        return Err(anyhow!("empty frame payload"));
    }
    let decoded = image::load_from_memory(bytes).context("failed to decode frame payload")?;
    let rgb = decoded.to_rgb8();
    if rgb.width() == 0 || rgb.height() == 0 {
        return Err(anyhow!("decoded frame has zero dimensions"));
    }
    Ok(rgb)
}

/// Encode an annotated frame as PNG for the response payload.
pub fn encode_png(frame: &RgbImage) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(frame.clone())
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .context("failed to encode annotated frame")?;
    Ok(out)
}

/// Convert a decoded frame to grayscale for the detector chain.
///
/// An empty conversion result would leave the frame in an undefined state,
/// so it is treated as pipeline-fatal by the orchestrator.
pub fn to_grayscale(frame: &RgbImage) -> Result<GrayImage> {
    let gray = image::imageops::grayscale(frame);
    if gray.as_raw().is_empty() {
        return Err(anyhow!("grayscale conversion produced an empty buffer"));
    }
    Ok(gray)
}

/// Crop a grayscale region of interest, clamped to the frame bounds.
///
/// Used for nested detection (eyes within a face region). Returns `None`
/// when the region lies entirely outside the frame.
pub fn crop_gray(frame: &GrayImage, x: u32, y: u32, w: u32, h: u32) -> Option<GrayImage> {
    if x >= frame.width() || y >= frame.height() || w == 0 || h == 0 {
        return None;
    }
    let w = w.min(frame.width() - x);
    let h = h.min(frame.height() - y);
    Some(image::imageops::crop_imm(frame, x, y, w, h).to_image())
}

/// Approximate memory footprint of a session's retained buffers.
pub fn buffer_bytes(rgb: Option<&RgbImage>, gray: Option<&GrayImage>) -> usize {
    rgb.map(|f| f.as_raw().len()).unwrap_or(0) + gray.map(|f| f.as_raw().len()).unwrap_or(0)
}
