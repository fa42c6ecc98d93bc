use serde::{Deserialize, Serialize};

use crate::detect::Region;
use crate::session::stats::Statistics;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    /// New-information events: detections appearing or disappearing.
    Detection,
    /// Operational advisories (low stability, throttling).
    Warning,
    /// Routine informational events.
    Info,
}

/// A new-information event surfaced to the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn detection(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Detection,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Warning,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Info,
            message: message.into(),
        }
    }
}

/// One structured detection with its per-frame track index.
///
/// The track index is an ordinal within this frame's result set, not a
/// persistent identity; consumers wanting continuity correlate externally.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionBox {
    pub region: Region,
    pub track_index: usize,
}

/// A recognized text region.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextRegion {
    pub content: String,
    pub confidence: f32,
    pub language: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameDetections {
    pub faces: Vec<DetectionBox>,
    pub eyes: Vec<DetectionBox>,
    pub hands: Vec<DetectionBox>,
    pub text_regions: Vec<TextRegion>,
}

/// Per-call output of the detection pipeline. Produced fresh per frame and
/// never persisted beyond the response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FrameResult {
    /// Encoded annotated frame; `None` when the frame was skipped or failed.
    pub image: Option<Vec<u8>>,
    pub statistics: Statistics,
    pub notifications: Vec<Notification>,
    /// Diagnostic trace, including recoverable per-stage failures.
    pub logs: Vec<String>,
    pub detections: FrameDetections,
    /// Most recent non-empty OCR capture for this session.
    pub captured_text: Option<String>,
    pub success: bool,
    pub error: Option<String>,
}

impl FrameResult {
    /// Well-formed response for a throttled frame: statistics snapshot plus
    /// an informational notification, no image work performed.
    pub fn skipped(statistics: Statistics, reason: &str) -> Self {
        Self {
            image: None,
            statistics,
            notifications: vec![Notification::info(reason)],
            logs: vec![reason.to_string()],
            detections: FrameDetections::default(),
            captured_text: None,
            success: true,
            error: None,
        }
    }

    /// Structured failure carrying the prior statistics snapshot.
    pub fn failed(statistics: Statistics, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            image: None,
            statistics,
            notifications: Vec::new(),
            logs: vec![format!("frame failed: {message}")],
            detections: FrameDetections::default(),
            captured_text: None,
            success: false,
            error: Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_result_is_well_formed() {
        let result = FrameResult::skipped(Statistics::default(), "frame skipped: rate control");
        assert!(result.success);
        assert!(result.image.is_none());
        assert_eq!(result.notifications.len(), 1);
        assert_eq!(result.notifications[0].kind, NotificationKind::Info);
    }

    #[test]
    fn failed_result_keeps_statistics() {
        let mut stats = Statistics::default();
        stats.total_frames_processed = 7;
        let result = FrameResult::failed(stats, "bad payload");
        assert!(!result.success);
        assert_eq!(result.statistics.total_frames_processed, 7);
        assert_eq!(result.error.as_deref(), Some("bad payload"));
    }
}
