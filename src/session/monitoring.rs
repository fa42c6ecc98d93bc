//! Monitoring configuration.
//!
//! The external surface is string-named monitoring options; internally the
//! enabled set is a fixed boolean array indexed by the closed
//! `MonitorOptionKind` enum. Name parsing happens only at this boundary, so
//! the pipeline never does stringly-typed dispatch. Enabling an unknown name
//! is a no-op by policy.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::session::settings::{clamp_fps, Settings};

/// Closed set of monitorable capabilities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorOptionKind {
    FaceDetection,
    EyeDetection,
    HandDetection,
    MotionDetection,
    TextDetection,
    CameraMovement,
}

impl MonitorOptionKind {
    pub const ALL: [MonitorOptionKind; 6] = [
        MonitorOptionKind::FaceDetection,
        MonitorOptionKind::EyeDetection,
        MonitorOptionKind::HandDetection,
        MonitorOptionKind::MotionDetection,
        MonitorOptionKind::TextDetection,
        MonitorOptionKind::CameraMovement,
    ];

    pub fn index(self) -> usize {
        match self {
            MonitorOptionKind::FaceDetection => 0,
            MonitorOptionKind::EyeDetection => 1,
            MonitorOptionKind::HandDetection => 2,
            MonitorOptionKind::MotionDetection => 3,
            MonitorOptionKind::TextDetection => 4,
            MonitorOptionKind::CameraMovement => 5,
        }
    }

    /// Wire name used by the external configuration surface.
    pub fn name(self) -> &'static str {
        match self {
            MonitorOptionKind::FaceDetection => "face_detection",
            MonitorOptionKind::EyeDetection => "eye_detection",
            MonitorOptionKind::HandDetection => "hand_detection",
            MonitorOptionKind::MotionDetection => "motion_detection",
            MonitorOptionKind::TextDetection => "text_detection",
            MonitorOptionKind::CameraMovement => "camera_movement",
        }
    }

    pub fn display_label(self) -> &'static str {
        match self {
            MonitorOptionKind::FaceDetection => "Face Detection",
            MonitorOptionKind::EyeDetection => "Eye Detection",
            MonitorOptionKind::HandDetection => "Hand Detection",
            MonitorOptionKind::MotionDetection => "Motion Detection",
            MonitorOptionKind::TextDetection => "Text Recognition",
            MonitorOptionKind::CameraMovement => "Camera Movement Analysis",
        }
    }

    pub fn category(self) -> &'static str {
        match self {
            MonitorOptionKind::FaceDetection
            | MonitorOptionKind::EyeDetection
            | MonitorOptionKind::HandDetection => "detection",
            MonitorOptionKind::MotionDetection => "motion",
            MonitorOptionKind::TextDetection => "text",
            MonitorOptionKind::CameraMovement => "analysis",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

/// Fixed-size enabled set indexed by `MonitorOptionKind`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnabledSet([bool; MonitorOptionKind::ALL.len()]);

impl EnabledSet {
    pub fn get(&self, kind: MonitorOptionKind) -> bool {
        self.0[kind.index()]
    }

    pub fn set(&mut self, kind: MonitorOptionKind, enabled: bool) {
        self.0[kind.index()] = enabled;
    }
}

impl Default for EnabledSet {
    fn default() -> Self {
        Self([true; MonitorOptionKind::ALL.len()])
    }
}

// Serialized as named flags so callers PATCHing settings see stable field
// names rather than a positional array.
#[derive(Serialize, Deserialize)]
#[serde(default)]
struct EnabledSetRepr {
    face_detection: bool,
    eye_detection: bool,
    hand_detection: bool,
    motion_detection: bool,
    text_detection: bool,
    camera_movement: bool,
}

impl Default for EnabledSetRepr {
    fn default() -> Self {
        Self {
            face_detection: true,
            eye_detection: true,
            hand_detection: true,
            motion_detection: true,
            text_detection: true,
            camera_movement: true,
        }
    }
}

impl Serialize for EnabledSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        EnabledSetRepr {
            face_detection: self.get(MonitorOptionKind::FaceDetection),
            eye_detection: self.get(MonitorOptionKind::EyeDetection),
            hand_detection: self.get(MonitorOptionKind::HandDetection),
            motion_detection: self.get(MonitorOptionKind::MotionDetection),
            text_detection: self.get(MonitorOptionKind::TextDetection),
            camera_movement: self.get(MonitorOptionKind::CameraMovement),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EnabledSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = EnabledSetRepr::deserialize(deserializer)?;
        let mut set = EnabledSet::default();
        set.set(MonitorOptionKind::FaceDetection, repr.face_detection);
        set.set(MonitorOptionKind::EyeDetection, repr.eye_detection);
        set.set(MonitorOptionKind::HandDetection, repr.hand_detection);
        set.set(MonitorOptionKind::MotionDetection, repr.motion_detection);
        set.set(MonitorOptionKind::TextDetection, repr.text_detection);
        set.set(MonitorOptionKind::CameraMovement, repr.camera_movement);
        Ok(set)
    }
}

/// One externally visible monitoring option.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonitoringOption {
    pub name: String,
    pub label: String,
    pub enabled: bool,
    pub category: String,
    /// Free-form per-option parameters; the core does not interpret them.
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// Frame-rate control parameters nested in the monitoring configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameRateControl {
    pub target_fps: f64,
    pub min_fps: f64,
    pub max_fps: f64,
    pub adaptive: bool,
    /// Frames to drop unconditionally before resuming normal gating.
    pub frame_skip_count: u32,
}

impl Default for FrameRateControl {
    fn default() -> Self {
        Self {
            target_fps: crate::session::settings::DEFAULT_TARGET_FPS,
            min_fps: crate::session::settings::MIN_TARGET_FPS,
            max_fps: crate::session::settings::MAX_TARGET_FPS,
            adaptive: false,
            frame_skip_count: 0,
        }
    }
}

/// Camera-movement analysis parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraMovementControl {
    pub stability_threshold: f64,
    /// Analyze every Nth accepted frame; 1 = every frame.
    pub analysis_interval: u32,
}

impl Default for CameraMovementControl {
    fn default() -> Self {
        Self {
            stability_threshold: crate::session::settings::DEFAULT_STABILITY_THRESHOLD,
            analysis_interval: 1,
        }
    }
}

/// Complete per-session monitoring configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfiguration {
    pub options: Vec<MonitoringOption>,
    pub frame_rate: FrameRateControl,
    pub camera_movement: CameraMovementControl,
}

impl Default for MonitoringConfiguration {
    fn default() -> Self {
        Self {
            options: default_catalog(),
            frame_rate: FrameRateControl::default(),
            camera_movement: CameraMovementControl::default(),
        }
    }
}

impl MonitoringConfiguration {
    /// Cascade this configuration into the session settings: option enable
    /// flags by name match, frame-rate target (clamped) and thresholds.
    /// Unknown option names are skipped.
    ///
    /// Returns the pending frame-skip count the governor should honor.
    pub fn apply_to(&self, settings: &mut Settings) -> u32 {
        for option in &self.options {
            match MonitorOptionKind::from_name(&option.name) {
                Some(kind) => settings.detectors.set(kind, option.enabled),
                None => log::debug!("ignoring unknown monitoring option '{}'", option.name),
            }
        }
        settings.target_fps = clamp_fps(self.frame_rate.target_fps);
        settings.adaptive_processing = self.frame_rate.adaptive;
        settings.stability_threshold = self.camera_movement.stability_threshold.clamp(0.0, 100.0);
        self.frame_rate.frame_skip_count
    }

    /// Reflect current settings back into the option list, for reads.
    pub fn sync_from(&mut self, settings: &Settings) {
        for option in &mut self.options {
            if let Some(kind) = MonitorOptionKind::from_name(&option.name) {
                option.enabled = settings.detectors.get(kind);
            }
        }
        self.frame_rate.target_fps = settings.target_fps;
        self.frame_rate.adaptive = settings.adaptive_processing;
        self.camera_movement.stability_threshold = settings.stability_threshold;
    }
}

/// The full catalog of known options, all enabled.
pub fn default_catalog() -> Vec<MonitoringOption> {
    MonitorOptionKind::ALL
        .into_iter()
        .map(|kind| MonitoringOption {
            name: kind.name().to_string(),
            label: kind.display_label().to_string(),
            enabled: true,
            category: kind.category().to_string(),
            parameters: Map::new(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_names_round_trip_through_kind() {
        for option in default_catalog() {
            let kind = MonitorOptionKind::from_name(&option.name).expect("known name");
            assert_eq!(kind.name(), option.name);
        }
        assert!(MonitorOptionKind::from_name("gesture_detection").is_none());
    }

    #[test]
    fn apply_cascades_flags_and_fps() {
        let mut config = MonitoringConfiguration::default();
        config.options[0].enabled = false; // face_detection
        config.frame_rate.target_fps = 500.0;
        config.frame_rate.frame_skip_count = 3;
        config.camera_movement.stability_threshold = 72.0;

        let mut settings = Settings::default();
        let skips = config.apply_to(&mut settings);

        assert!(!settings.detectors.get(MonitorOptionKind::FaceDetection));
        assert_eq!(settings.target_fps, 60.0);
        assert_eq!(settings.stability_threshold, 72.0);
        assert_eq!(skips, 3);
    }

    #[test]
    fn unknown_option_is_a_no_op() {
        let mut config = MonitoringConfiguration::default();
        config.options.push(MonitoringOption {
            name: "quantum_detection".to_string(),
            label: "Quantum".to_string(),
            enabled: false,
            category: "detection".to_string(),
            parameters: Map::new(),
        });
        let mut settings = Settings::default();
        config.apply_to(&mut settings);
        // All known detectors untouched by the unknown entry.
        for kind in MonitorOptionKind::ALL {
            assert!(settings.detectors.get(kind));
        }
    }

    #[test]
    fn enabled_set_serde_uses_named_flags() {
        let mut set = EnabledSet::default();
        set.set(MonitorOptionKind::TextDetection, false);
        let json = serde_json::to_value(set).unwrap();
        assert_eq!(json["text_detection"], serde_json::Value::Bool(false));
        let back: EnabledSet = serde_json::from_value(json).unwrap();
        assert!(!back.get(MonitorOptionKind::TextDetection));
        assert!(back.get(MonitorOptionKind::FaceDetection));
    }
}
