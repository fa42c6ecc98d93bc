//! Camera-motion analysis.
//!
//! Classifies global frame-to-frame change into a movement level, a
//! stability score and a movement-type label. Distinct consumer from the
//! generic motion detector: this measures camera shake, not object motion.

use anyhow::Result;
use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::detect::motion::{changed_percent, DIFF_SENSITIVITY};

/// Below this movement level, low stability is not worth a warning.
pub const MIN_MOVEMENT_FLOOR: f64 = 2.0;

/// Step classification of global movement, tie-broken by the first matching
/// band. The bands are a tunable policy table, not a learned model.
const MOVEMENT_BANDS: [(f64, CameraMovement); 5] = [
    (1.0, CameraMovement::Stable),
    (5.0, CameraMovement::SlowPan),
    (10.0, CameraMovement::SlowTilt),
    (20.0, CameraMovement::FastPan),
    (30.0, CameraMovement::FastTilt),
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraMovement {
    #[default]
    Stable,
    SlowPan,
    SlowTilt,
    FastPan,
    FastTilt,
    Shaking,
}

impl CameraMovement {
    pub fn label(self) -> &'static str {
        match self {
            CameraMovement::Stable => "stable",
            CameraMovement::SlowPan => "slow pan",
            CameraMovement::SlowTilt => "slow tilt",
            CameraMovement::FastPan => "fast pan",
            CameraMovement::FastTilt => "fast tilt",
            CameraMovement::Shaking => "shaking",
        }
    }
}

/// Synthesized movement sample kept in the session's recent history.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MovementVector {
    pub magnitude: f64,
    pub stability: f64,
}

/// Outcome of analyzing one frame pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraMotionReport {
    /// Changed-pixel percentage, [0,100].
    pub movement_level: f64,
    /// Inverse measure of global change, [0,100].
    pub stability: f64,
    pub movement: CameraMovement,
}

impl Default for CameraMotionReport {
    fn default() -> Self {
        // Failure fallback: treat the camera as steady rather than abort.
        Self {
            movement_level: 0.0,
            stability: 100.0,
            movement: CameraMovement::Stable,
        }
    }
}

impl CameraMotionReport {
    pub fn vector(&self) -> MovementVector {
        MovementVector {
            magnitude: self.movement_level,
            stability: self.stability,
        }
    }
}

/// Analyze a consecutive grayscale frame pair.
///
/// Pure computation; the pipeline applies side effects (statistics,
/// notifications). Equal dimensions are the caller's contract.
pub fn analyze(current: &GrayImage, previous: &GrayImage) -> Result<CameraMotionReport> {
    let movement_level = changed_percent(current, previous, DIFF_SENSITIVITY)?;
    Ok(CameraMotionReport {
        movement_level,
        stability: stability_score(movement_level),
        movement: classify(movement_level),
    })
}

pub fn stability_score(movement_level: f64) -> f64 {
    (100.0 - movement_level * 1.5).max(0.0)
}

pub fn classify(movement_level: f64) -> CameraMovement {
    for (upper, movement) in MOVEMENT_BANDS {
        if movement_level < upper {
            return movement;
        }
    }
    CameraMovement::Shaking
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn identical_frames_are_fully_stable() -> Result<()> {
        let frame = GrayImage::from_pixel(16, 16, Luma([77]));
        let report = analyze(&frame, &frame.clone())?;
        assert_eq!(report.movement_level, 0.0);
        assert_eq!(report.stability, 100.0);
        assert_eq!(report.movement, CameraMovement::Stable);
        Ok(())
    }

    #[test]
    fn forty_percent_change_reads_as_shaking() -> Result<()> {
        let prev = GrayImage::from_pixel(10, 10, Luma([0]));
        let mut cur = prev.clone();
        for i in 0..40u32 {
            cur.put_pixel(i % 10, i / 10, Luma([255]));
        }
        let report = analyze(&cur, &prev)?;
        assert!((report.movement_level - 40.0).abs() < 1e-9);
        assert!((report.stability - 40.0).abs() < 1e-9);
        assert_eq!(report.movement, CameraMovement::Shaking);
        Ok(())
    }

    #[test]
    fn band_edges_classify_upward() {
        assert_eq!(classify(0.9), CameraMovement::Stable);
        assert_eq!(classify(1.0), CameraMovement::SlowPan);
        assert_eq!(classify(5.0), CameraMovement::SlowTilt);
        assert_eq!(classify(10.0), CameraMovement::FastPan);
        assert_eq!(classify(20.0), CameraMovement::FastTilt);
        assert_eq!(classify(30.0), CameraMovement::Shaking);
        assert_eq!(classify(95.0), CameraMovement::Shaking);
    }

    #[test]
    fn stability_floors_at_zero() {
        assert_eq!(stability_score(0.0), 100.0);
        assert_eq!(stability_score(40.0), 40.0);
        assert_eq!(stability_score(80.0), 0.0);
    }
}
