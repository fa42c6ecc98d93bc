use anyhow::Result;
use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Detection categories served by cascade-style region detectors.
///
/// The set is closed by design: detector dispatch is enum-indexed internally,
/// string option names exist only at the API boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CascadeKind {
    Face,
    Eye,
    Hand,
}

impl CascadeKind {
    pub const ALL: [CascadeKind; 3] = [CascadeKind::Face, CascadeKind::Eye, CascadeKind::Hand];

    /// Classifier model file name under the configured model directory.
    pub fn model_file(self) -> &'static str {
        match self {
            CascadeKind::Face => "face.onnx",
            CascadeKind::Eye => "eye.onnx",
            CascadeKind::Hand => "hand.onnx",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CascadeKind::Face => "face",
            CascadeKind::Eye => "eye",
            CascadeKind::Hand => "hand",
        }
    }
}

/// Axis-aligned detection rectangle in frame coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub confidence: f32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32, confidence: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence,
        }
    }

    /// Shift the region by an offset, for mapping ROI-local detections back
    /// into full-frame coordinates.
    pub fn offset(mut self, dx: u32, dy: u32) -> Self {
        self.x += dx;
        self.y += dy;
        self
    }
}

/// Search parameters for a cascade-style detector run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CascadeParams {
    /// Sliding-window scale step between pyramid levels.
    pub scale_factor: f64,
    /// Minimum neighboring hits to keep a candidate window.
    pub min_neighbors: u32,
    /// Minimum detection window edge, in pixels.
    pub min_size: u32,
}

impl Default for CascadeParams {
    fn default() -> Self {
        Self {
            scale_factor: 1.1,
            min_neighbors: 3,
            min_size: 24,
        }
    }
}

/// Region detector backend.
///
/// Implementations are pure per-call computations: they hold no reference to
/// session state beyond the call and may run on any thread. `&mut self`
/// permits internal scratch buffers, never cross-call frame state.
pub trait RegionDetector: Send {
    /// Backend identifier for logs.
    fn name(&self) -> &'static str;

    /// Run detection over a grayscale frame or sub-region.
    ///
    /// Implementations must treat the frame as read-only and ephemeral.
    fn detect(&mut self, frame: &GrayImage, params: &CascadeParams) -> Result<Vec<Region>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_offset_maps_roi_to_frame() {
        let roi_hit = Region::new(3, 4, 10, 8, 0.9);
        let mapped = roi_hit.offset(100, 50);
        assert_eq!((mapped.x, mapped.y), (103, 54));
        assert_eq!((mapped.width, mapped.height), (10, 8));
    }

    #[test]
    fn every_kind_names_a_model_file() {
        for kind in CascadeKind::ALL {
            assert!(kind.model_file().ends_with(".onnx"));
        }
    }
}
