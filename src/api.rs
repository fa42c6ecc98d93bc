//! Session/Configuration API.
//!
//! Typed facade over the session store and the detection pipeline: session
//! lifecycle, settings and monitoring configuration, frame-rate and
//! camera-movement analytics, and the frame-processing entry point. All
//! reads return defensive copies; all writes go through the store's
//! per-session lock. `process_frame` never returns an error: every failure
//! becomes a structured failure result.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::{anyhow, Result};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::analysis::CameraMovement;
use crate::config::EngineConfig;
use crate::detect::{text, DetectorRegistry};
use crate::frame;
use crate::pipeline::result::FrameResult;
use crate::pipeline::DetectionPipeline;
use crate::session::monitoring::{
    default_catalog, MonitorOptionKind, MonitoringConfiguration, MonitoringOption,
};
use crate::session::settings::{clamp_fps, Settings};
use crate::session::stats::Statistics;
use crate::session::{Session, SessionStore};

/// Frame-rate analytics for one session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FrameRateInfo {
    pub target_fps: f64,
    pub actual_fps: f64,
    pub recommendation: String,
    /// Expected-vs-actual frame count over the session lifetime, [0,1].
    pub estimated_drop_rate: f64,
}

/// Camera-movement analytics for one session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CameraMovementAnalysis {
    pub movement: CameraMovement,
    pub stability: f64,
    pub average_recent_magnitude: f64,
    pub status: String,
    pub recommendation: String,
}

/// The core-facing boundary consumed by the transport layer.
pub struct MonitorApi {
    store: SessionStore,
    pipeline: DetectionPipeline,
}

impl MonitorApi {
    /// Build from configuration: discover classifier models and the text
    /// engine once at startup. Missing resources degrade, never fail.
    pub fn new(config: &EngineConfig) -> Self {
        let registry = DetectorRegistry::discover(&config.model_dir);
        let recognizer = text::discover(config.text_model.as_deref(), &config.text_language);
        log::info!(
            "monitor api ready: {} detector(s), text {}, default target {} fps",
            registry.registered().len(),
            if recognizer.is_some() { "enabled" } else { "inert" },
            config.default_target_fps
        );
        Self {
            store: SessionStore::with_target_fps(config.default_target_fps),
            pipeline: DetectionPipeline::new(registry, recognizer),
        }
    }

    /// Build around a prepared pipeline (tests, demo daemon).
    pub fn with_pipeline(pipeline: DetectionPipeline) -> Self {
        Self {
            store: SessionStore::new(),
            pipeline,
        }
    }

    /// Opaque random identifier for callers that do not supply their own.
    pub fn generate_session_id() -> String {
        let mut bytes = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut bytes);
        format!("session-{}", hex::encode(bytes))
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Idempotent: creates default state if absent, no-op if present.
    pub fn initialize_session(&self, id: &str) -> Result<()> {
        require_id(id)?;
        if self.store.initialize(id)? {
            log::info!("session {id} initialized");
        }
        Ok(())
    }

    /// Removes the session and releases its frame buffers.
    pub fn cleanup_session(&self, id: &str) -> Result<()> {
        require_id(id)?;
        if self.store.remove(id)? {
            log::info!("session {id} cleaned up");
        }
        Ok(())
    }

    pub fn active_sessions(&self) -> Vec<String> {
        self.store.active_ids().unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Settings and monitoring configuration
    // ------------------------------------------------------------------

    /// Statistics snapshot. An unknown identifier reads as fresh defaults.
    pub fn get_stats(&self, id: &str) -> Result<Statistics> {
        require_id(id)?;
        match self.store.get(id)? {
            Some(session) => {
                let guard = lock(&session)?;
                Ok(guard.stats.clone())
            }
            None => Ok(Statistics::default()),
        }
    }

    /// Settings snapshot. Like `get_stats`, an unknown identifier reads as
    /// defaults without creating the session.
    pub fn get_settings(&self, id: &str) -> Result<Settings> {
        require_id(id)?;
        match self.store.get(id)? {
            Some(session) => {
                let guard = lock(&session)?;
                Ok(guard.settings.clone())
            }
            None => Ok(self.default_settings()),
        }
    }

    /// Wholesale replacement; the caller supplies a complete object and
    /// serde defaults refill anything unset upstream.
    pub fn update_settings(&self, id: &str, mut settings: Settings) -> Result<()> {
        settings.normalize();
        let session = self.store.get_or_create(require_id(id)?)?;
        let mut guard = lock(&session)?;
        guard.settings = settings;
        let applied = guard.settings.clone();
        guard.monitoring.sync_from(&applied);
        Ok(())
    }

    /// The closed catalog of known monitoring options.
    pub fn monitoring_options() -> Vec<MonitoringOption> {
        default_catalog()
    }

    pub fn get_monitoring_configuration(&self, id: &str) -> Result<MonitoringConfiguration> {
        require_id(id)?;
        match self.store.get(id)? {
            Some(session) => {
                let mut guard = lock(&session)?;
                let settings = guard.settings.clone();
                guard.monitoring.sync_from(&settings);
                Ok(guard.monitoring.clone())
            }
            None => {
                let mut config = MonitoringConfiguration::default();
                config.sync_from(&self.default_settings());
                Ok(config)
            }
        }
    }

    /// Replace the monitoring configuration and cascade it into settings
    /// flags and frame-rate-control fields by name-matched option.
    pub fn update_monitoring_configuration(
        &self,
        id: &str,
        config: MonitoringConfiguration,
    ) -> Result<()> {
        let session = self.store.get_or_create(require_id(id)?)?;
        let mut guard = lock(&session)?;
        let pending_skips = config.apply_to(&mut guard.settings);
        guard.timing.pending_skips = pending_skips;
        guard.monitoring = config;
        Ok(())
    }

    /// Enable or disable a named option. Unknown names are a no-op.
    pub fn set_option_enabled(&self, id: &str, option_name: &str, enabled: bool) -> Result<()> {
        let Some(kind) = MonitorOptionKind::from_name(option_name) else {
            log::debug!("ignoring unknown monitoring option '{option_name}'");
            return Ok(());
        };
        let session = self.store.get_or_create(require_id(id)?)?;
        let mut guard = lock(&session)?;
        guard.settings.detectors.set(kind, enabled);
        for option in &mut guard.monitoring.options {
            if option.name == option_name {
                option.enabled = enabled;
            }
        }
        Ok(())
    }

    /// Set the target frame rate, clamped to [1,60]. Returns the stored value.
    pub fn set_target_fps(&self, id: &str, fps: f64) -> Result<f64> {
        let clamped = clamp_fps(fps);
        let session = self.store.get_or_create(require_id(id)?)?;
        let mut guard = lock(&session)?;
        guard.settings.target_fps = clamped;
        guard.monitoring.frame_rate.target_fps = clamped;
        Ok(clamped)
    }

    // ------------------------------------------------------------------
    // Analytics
    // ------------------------------------------------------------------

    pub fn frame_rate_info(&self, id: &str) -> Result<FrameRateInfo> {
        require_id(id)?;
        match self.store.get(id)? {
            Some(session) => {
                let guard = lock(&session)?;
                Ok(frame_rate_info_for(&guard))
            }
            None => {
                let mut fresh = Session::new(id);
                fresh.settings.target_fps = self.store.default_target_fps();
                Ok(frame_rate_info_for(&fresh))
            }
        }
    }

    pub fn camera_movement_analysis(&self, id: &str) -> Result<CameraMovementAnalysis> {
        require_id(id)?;
        let stats = match self.store.get(id)? {
            Some(session) => {
                let guard = lock(&session)?;
                guard.stats.clone()
            }
            None => Statistics::default(),
        };
        Ok(camera_analysis_for(&stats))
    }

    // ------------------------------------------------------------------
    // Frame processing
    // ------------------------------------------------------------------

    /// Process one raw frame for a session.
    ///
    /// Never returns an error: input problems, stage failures and internal
    /// faults all surface as a structured result with `success == false` or
    /// per-stage log entries. An unknown non-empty identifier auto-creates
    /// its session.
    pub fn process_frame(
        &self,
        id: &str,
        raw_image: &[u8],
        frame_number: u64,
        timestamp_ms: u64,
    ) -> FrameResult {
        if id.trim().is_empty() {
            return FrameResult::failed(Statistics::default(), "missing session identifier");
        }

        let session = match self.store.get_or_create(id) {
            Ok(session) => session,
            Err(err) => return FrameResult::failed(Statistics::default(), format!("{err:#}")),
        };
        let mut guard = match session.lock() {
            Ok(guard) => guard,
            Err(_) => {
                return FrameResult::failed(Statistics::default(), "session lock poisoned");
            }
        };

        let decoded = match frame::decode_rgb(raw_image) {
            Ok(decoded) => decoded,
            Err(err) => {
                log::warn!("session {id}: {err:#}");
                return FrameResult::failed(guard.stats.clone(), format!("{err:#}"));
            }
        };

        self.pipeline
            .process(&mut guard, decoded, frame_number, timestamp_ms, Instant::now())
    }

    /// Default settings as this instance's store would stamp them.
    fn default_settings(&self) -> Settings {
        Settings {
            target_fps: self.store.default_target_fps(),
            ..Settings::default()
        }
    }

    /// Direct pipeline access for callers driving synthetic timelines.
    pub fn pipeline(&self) -> &DetectionPipeline {
        &self.pipeline
    }

    /// Store access for host wrappers that manage sessions directly.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }
}

fn frame_rate_info_for(session: &Session) -> FrameRateInfo {
    let target = session.settings.target_fps;
    let actual = session.stats.current_fps;
    let ratio = if target > 0.0 { actual / target } else { 0.0 };
    let recommendation = if ratio >= 0.9 {
        "frame rate optimal".to_string()
    } else if ratio >= 0.7 {
        "acceptable; minor frame drops".to_string()
    } else if ratio >= 0.5 {
        "degraded; consider lowering target FPS or resolution".to_string()
    } else {
        "severely degraded; lower target FPS".to_string()
    };

    let elapsed = session.created_instant.elapsed().as_secs_f64();
    let expected = elapsed * target;
    let estimated_drop_rate = if expected >= 1.0 {
        (1.0 - session.stats.total_frames_processed as f64 / expected).clamp(0.0, 1.0)
    } else {
        0.0
    };

    FrameRateInfo {
        target_fps: target,
        actual_fps: actual,
        recommendation,
        estimated_drop_rate,
    }
}

fn camera_analysis_for(stats: &Statistics) -> CameraMovementAnalysis {
    let stability = stats.camera_stability;
    CameraMovementAnalysis {
        movement: stats.camera_movement,
        stability,
        average_recent_magnitude: stats.average_movement_magnitude(),
        status: format!(
            "camera {} at {:.0}% stability",
            stats.camera_movement.label(),
            stability
        ),
        recommendation: if stability >= 80.0 {
            "mounting steady; no action needed".to_string()
        } else if stability >= 50.0 {
            "minor shake; consider stabilizing the mount".to_string()
        } else {
            "unstable mounting; secure the camera".to_string()
        },
    }
}

fn require_id(id: &str) -> Result<&str> {
    if id.trim().is_empty() {
        return Err(anyhow!("missing session identifier"));
    }
    Ok(id)
}

fn lock<'a>(session: &'a Arc<Mutex<Session>>) -> Result<std::sync::MutexGuard<'a, Session>> {
    session
        .lock()
        .map_err(|_| anyhow!("session lock poisoned"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::DetectorRegistry;

    fn bare_api() -> MonitorApi {
        MonitorApi::with_pipeline(DetectionPipeline::new(DetectorRegistry::new(), None))
    }

    #[test]
    fn set_target_fps_clamps() -> Result<()> {
        let api = bare_api();
        api.initialize_session("cam-1")?;
        assert_eq!(api.set_target_fps("cam-1", 1000.0)?, 60.0);
        assert_eq!(api.get_settings("cam-1")?.target_fps, 60.0);
        assert_eq!(api.set_target_fps("cam-1", -5.0)?, 1.0);
        assert_eq!(api.get_settings("cam-1")?.target_fps, 1.0);
        Ok(())
    }

    #[test]
    fn unknown_option_name_is_a_no_op() -> Result<()> {
        let api = bare_api();
        api.initialize_session("cam-1")?;
        api.set_option_enabled("cam-1", "levitation_detection", false)?;
        let settings = api.get_settings("cam-1")?;
        for kind in MonitorOptionKind::ALL {
            assert!(settings.detectors.get(kind));
        }
        Ok(())
    }

    #[test]
    fn empty_session_id_is_an_input_error() {
        let api = bare_api();
        let result = api.process_frame("", &[1, 2, 3], 0, 0);
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("missing session identifier"));
    }

    #[test]
    fn undecodable_payload_fails_without_mutating_stats() -> Result<()> {
        let api = bare_api();
        api.initialize_session("cam-1")?;
        let result = api.process_frame("cam-1", &[0u8; 16], 1, 0);
        assert!(!result.success);
        assert_eq!(api.get_stats("cam-1")?.total_frames_processed, 0);
        Ok(())
    }

    #[test]
    fn generated_ids_are_unique_enough() {
        let a = MonitorApi::generate_session_id();
        let b = MonitorApi::generate_session_id();
        assert_ne!(a, b);
        assert!(a.starts_with("session-"));
    }
}
