use serde::{Deserialize, Serialize};

use crate::detect::CascadeParams;
use crate::session::monitoring::EnabledSet;

pub const MIN_TARGET_FPS: f64 = 1.0;
pub const MAX_TARGET_FPS: f64 = 60.0;

pub const DEFAULT_TARGET_FPS: f64 = 30.0;
pub const DEFAULT_MOVEMENT_THRESHOLD: f64 = 5.0;
pub const DEFAULT_STABILITY_THRESHOLD: f64 = 50.0;
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;

/// Per-session processing settings.
///
/// Replaced wholesale on update: `#[serde(default)]` refills any field the
/// caller leaves unset, so there is never a partial merge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Target frame rate, clamped to [1,60] on every write path.
    pub target_fps: f64,
    /// When false the governor never skips.
    pub rate_control_enabled: bool,
    /// Reserved adaptive-processing mode flag.
    pub adaptive_processing: bool,
    /// Generic motion flags when changed-pixel percent exceeds this.
    pub movement_threshold: f64,
    /// Camera stability below this (while moving) raises a warning.
    pub stability_threshold: f64,
    /// Detections below this confidence are discarded.
    pub min_confidence: f32,
    /// Cascade search parameters shared by the region detectors.
    pub cascade: CascadeParams,
    /// Per-detector enable set.
    pub detectors: EnabledSet,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target_fps: DEFAULT_TARGET_FPS,
            rate_control_enabled: true,
            adaptive_processing: false,
            movement_threshold: DEFAULT_MOVEMENT_THRESHOLD,
            stability_threshold: DEFAULT_STABILITY_THRESHOLD,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            cascade: CascadeParams::default(),
            detectors: EnabledSet::default(),
        }
    }
}

impl Settings {
    /// Clamp fields that have a hard legal range.
    pub fn normalize(&mut self) {
        self.target_fps = clamp_fps(self.target_fps);
        self.movement_threshold = self.movement_threshold.clamp(0.0, 100.0);
        self.stability_threshold = self.stability_threshold.clamp(0.0, 100.0);
        self.min_confidence = self.min_confidence.clamp(0.0, 1.0);
    }
}

pub fn clamp_fps(fps: f64) -> f64 {
    if fps.is_nan() {
        return DEFAULT_TARGET_FPS;
    }
    fps.clamp(MIN_TARGET_FPS, MAX_TARGET_FPS)
}
