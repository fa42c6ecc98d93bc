//! Detection pipeline orchestrator.
//!
//! For one decoded frame and one session, runs the enabled stages in a fixed
//! order, mutates the output image with overlays, updates statistics and
//! emits notifications and diagnostic logs. Stage order:
//!
//! `RateCheck -> CameraMotion -> Face(+Eye) -> Hand -> GenericMotion ->
//!  Text(interval) -> Bookkeeping`
//!
//! Every stage is isolated: a stage failure is logged with the stage name and
//! the remaining stages still execute. Only shared-setup failures (grayscale
//! conversion) short-circuit to a structured failure result. Nothing escapes
//! this boundary as a panic or propagated error.

pub mod governor;
pub mod overlay;
pub mod result;

use std::sync::Mutex;
use std::time::Instant;

use anyhow::{anyhow, Result};
use image::{GrayImage, RgbImage};

use crate::analysis::{self, CameraMotionReport};
use crate::detect::motion::{changed_percent, DIFF_SENSITIVITY};
use crate::detect::text::{is_positive, sanitize, TEXT_FRAME_INTERVAL};
use crate::detect::{CascadeKind, DetectorRegistry, Region, TextRecognizer};
use crate::frame;
use crate::session::monitoring::MonitorOptionKind;
use crate::session::stats::OPTIMAL_FPS_RATIO;
use crate::session::Session;

use governor::{decide, GateDecision};
use result::{DetectionBox, FrameDetections, FrameResult, Notification, TextRegion};

/// Notification messages truncate recognized text past this length.
const NOTIFICATION_TEXT_LIMIT: usize = 40;

/// Working state accumulated while processing one frame.
struct FrameContext {
    annotated: RgbImage,
    notifications: Vec<Notification>,
    logs: Vec<String>,
    detections: FrameDetections,
}

impl FrameContext {
    fn new(annotated: RgbImage) -> Self {
        Self {
            annotated,
            notifications: Vec::new(),
            logs: Vec::new(),
            detections: FrameDetections::default(),
        }
    }

    fn log(&mut self, line: impl Into<String>) {
        self.logs.push(line.into());
    }
}

/// The per-session frame-processing pipeline.
///
/// Shared across sessions and threads; detector backends carry their own
/// locks and the text engine is serialized here.
pub struct DetectionPipeline {
    registry: DetectorRegistry,
    text: Option<Mutex<Box<dyn TextRecognizer>>>,
}

impl DetectionPipeline {
    pub fn new(registry: DetectorRegistry, text: Option<Box<dyn TextRecognizer>>) -> Self {
        Self {
            registry,
            text: text.map(Mutex::new),
        }
    }

    pub fn registry(&self) -> &DetectorRegistry {
        &self.registry
    }

    pub fn text_available(&self) -> bool {
        self.text.is_some()
    }

    /// Process one decoded frame for one session.
    ///
    /// `now` drives rate gating and FPS smoothing; the caller passes
    /// `Instant::now()` in production and synthetic instants in tests.
    pub fn process(
        &self,
        session: &mut Session,
        decoded: RgbImage,
        frame_number: u64,
        timestamp_ms: u64,
        now: Instant,
    ) -> FrameResult {
        let started = Instant::now();
        session.last_activity = std::time::SystemTime::now();

        match decide(&mut session.timing, &session.settings, now) {
            GateDecision::Process => {}
            GateDecision::Skip(reason) => {
                return FrameResult::skipped(session.stats.clone(), reason.message());
            }
        }

        // Shared setup; failure here leaves the frame undefined and is fatal
        // for this call only.
        let gray = match frame::to_grayscale(&decoded) {
            Ok(gray) => gray,
            Err(err) => {
                log::error!("session {}: grayscale conversion failed: {err:#}", session.id);
                return FrameResult::failed(session.stats.clone(), format!("{err:#}"));
            }
        };

        let mut ctx = FrameContext::new(decoded.clone());
        ctx.log(format!(
            "frame {frame_number} accepted (client timestamp {timestamp_ms} ms)"
        ));

        session.stats.begin_frame();
        session.stats.total_frames_processed += 1;

        self.run_stage("camera-motion", &mut ctx, |pipeline, ctx| {
            pipeline.stage_camera_motion(session, &gray, ctx)
        });
        self.run_stage("face-detection", &mut ctx, |pipeline, ctx| {
            pipeline.stage_faces(session, &gray, ctx)
        });
        self.run_stage("hand-detection", &mut ctx, |pipeline, ctx| {
            pipeline.stage_hands(session, &gray, ctx)
        });
        self.run_stage("motion-detection", &mut ctx, |pipeline, ctx| {
            pipeline.stage_motion(session, &gray, ctx)
        });
        self.run_stage("text-recognition", &mut ctx, |pipeline, ctx| {
            pipeline.stage_text(session, &gray, ctx)
        });

        self.bookkeeping(session, &mut ctx, now, started.elapsed());

        // New pair replaces the old one; the evicted buffers drop here.
        session.swap_previous(decoded, gray);

        let image = match frame::encode_png(&ctx.annotated) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                log::error!("session {}: {err:#}", session.id);
                ctx.log(format!("annotated frame encode failed: {err:#}"));
                None
            }
        };

        FrameResult {
            image,
            statistics: session.stats.clone(),
            notifications: ctx.notifications,
            logs: ctx.logs,
            detections: ctx.detections,
            captured_text: session.last_text.clone(),
            success: true,
            error: None,
        }
    }

    /// Per-stage isolation: one detector's failure never blocks another.
    fn run_stage<F>(&self, name: &str, ctx: &mut FrameContext, stage: F)
    where
        F: FnOnce(&Self, &mut FrameContext) -> Result<()>,
    {
        if let Err(err) = stage(self, ctx) {
            log::error!("stage {name} failed: {err:#}");
            ctx.log(format!("stage {name} failed: {err:#}"));
        }
    }

    // ------------------------------------------------------------------
    // Stages
    // ------------------------------------------------------------------

    fn stage_camera_motion(
        &self,
        session: &mut Session,
        gray: &GrayImage,
        ctx: &mut FrameContext,
    ) -> Result<()> {
        if !session.settings.detectors.get(MonitorOptionKind::CameraMovement) {
            return Ok(());
        }
        let interval = session.monitoring.camera_movement.analysis_interval.max(1) as u64;
        if session.stats.total_frames_processed % interval != 0 {
            return Ok(());
        }
        let Some(prev) = session.prev_gray.as_ref() else {
            // First accepted frame: nothing to compare, no side effects.
            return Ok(());
        };

        let report = match analysis::analyze(gray, prev) {
            Ok(report) => report,
            Err(err) => {
                // Analysis must never abort the pipeline: fall back to
                // steady-state statistics and surface the error to the log.
                self.apply_camera_report(session, CameraMotionReport::default());
                return Err(err);
            }
        };

        self.apply_camera_report(session, report);
        ctx.log(format!(
            "camera motion: level {:.1}% stability {:.1} ({})",
            report.movement_level,
            report.stability,
            report.movement.label()
        ));

        if report.stability < session.settings.stability_threshold
            && report.movement_level > analysis::MIN_MOVEMENT_FLOOR
        {
            ctx.notifications.push(Notification::warning(format!(
                "camera stability low: {:.0}% ({})",
                report.stability,
                report.movement.label()
            )));
        }
        Ok(())
    }

    fn apply_camera_report(&self, session: &mut Session, report: CameraMotionReport) {
        session.stats.camera_movement = report.movement;
        session.stats.camera_stability = report.stability;
        session.stats.push_movement(report.vector());
    }

    fn stage_faces(
        &self,
        session: &mut Session,
        gray: &GrayImage,
        ctx: &mut FrameContext,
    ) -> Result<()> {
        if !session.settings.detectors.get(MonitorOptionKind::FaceDetection) {
            return Ok(());
        }
        if !self.registry.available(CascadeKind::Face) {
            ctx.log("face detector unavailable (no classifier model)".to_string());
            log::warn!("session {}: face detector unavailable", session.id);
            self.face_edge_trigger(session, ctx, 0);
            return Ok(());
        }

        let params = session.settings.cascade;
        let min_confidence = session.settings.min_confidence;
        let faces: Vec<Region> = self
            .registry
            .detect(CascadeKind::Face, gray, &params)?
            .into_iter()
            .filter(|r| r.confidence >= min_confidence)
            .collect();

        session.stats.faces_detected = faces.len() as u32;
        ctx.log(format!("face detection: {} region(s)", faces.len()));

        let run_eyes = session.settings.detectors.get(MonitorOptionKind::EyeDetection)
            && self.registry.available(CascadeKind::Eye);

        for (track_index, face) in faces.iter().enumerate() {
            overlay::draw_region(
                &mut ctx.annotated,
                face,
                overlay::FACE_COLOR,
                overlay::FACE_THICKNESS,
            );
            ctx.detections.faces.push(DetectionBox {
                region: *face,
                track_index,
            });

            if run_eyes {
                self.detect_eyes_in_face(session, gray, face, ctx)?;
            }
        }

        self.face_edge_trigger(session, ctx, faces.len());
        Ok(())
    }

    fn detect_eyes_in_face(
        &self,
        session: &mut Session,
        gray: &GrayImage,
        face: &Region,
        ctx: &mut FrameContext,
    ) -> Result<()> {
        let Some(roi) = frame::crop_gray(gray, face.x, face.y, face.width, face.height) else {
            return Ok(());
        };
        let mut params = session.settings.cascade;
        params.min_size = (params.min_size / 2).max(8);
        let eyes = self.registry.detect(CascadeKind::Eye, &roi, &params)?;
        for eye in eyes {
            let mapped = eye.offset(face.x, face.y);
            if mapped.confidence < session.settings.min_confidence {
                continue;
            }
            overlay::draw_region(
                &mut ctx.annotated,
                &mapped,
                overlay::EYE_COLOR,
                overlay::EYE_THICKNESS,
            );
            let track_index = ctx.detections.eyes.len();
            ctx.detections.eyes.push(DetectionBox {
                region: mapped,
                track_index,
            });
            session.stats.eyes_detected += 1;
        }
        Ok(())
    }

    /// Edge-triggered face notifications: fire on presence transitions only,
    /// symmetric for appearance and disappearance.
    fn face_edge_trigger(&self, session: &mut Session, ctx: &mut FrameContext, count: usize) {
        if count > 0 && !session.face_present {
            ctx.notifications
                .push(Notification::detection(format!("{count} face(s) detected")));
        } else if count == 0 && session.face_present {
            ctx.notifications
                .push(Notification::detection("face(s) no longer detected"));
        }
        session.face_present = count > 0;
    }

    fn stage_hands(
        &self,
        session: &mut Session,
        gray: &GrayImage,
        ctx: &mut FrameContext,
    ) -> Result<()> {
        if !session.settings.detectors.get(MonitorOptionKind::HandDetection) {
            return Ok(());
        }
        if !self.registry.available(CascadeKind::Hand) {
            ctx.log("hand detector unavailable (no classifier model)".to_string());
            log::warn!("session {}: hand detector unavailable", session.id);
            return Ok(());
        }

        let params = session.settings.cascade;
        let min_confidence = session.settings.min_confidence;
        let hands: Vec<Region> = self
            .registry
            .detect(CascadeKind::Hand, gray, &params)?
            .into_iter()
            .filter(|r| r.confidence >= min_confidence)
            .collect();

        session.stats.hands_detected = hands.len() as u32;
        ctx.log(format!("hand detection: {} region(s)", hands.len()));

        for (track_index, hand) in hands.iter().enumerate() {
            overlay::draw_region(
                &mut ctx.annotated,
                hand,
                overlay::HAND_COLOR,
                overlay::HAND_THICKNESS,
            );
            ctx.detections.hands.push(DetectionBox {
                region: *hand,
                track_index,
            });
        }
        Ok(())
    }

    fn stage_motion(
        &self,
        session: &mut Session,
        gray: &GrayImage,
        ctx: &mut FrameContext,
    ) -> Result<()> {
        if !session.settings.detectors.get(MonitorOptionKind::MotionDetection) {
            return Ok(());
        }
        let Some(prev) = session.prev_gray.as_ref() else {
            return Ok(());
        };

        let percent = changed_percent(gray, prev, DIFF_SENSITIVITY)?;
        let detected = percent > session.settings.movement_threshold;

        session.stats.movement_level = percent;
        session.stats.movement_detected = detected;
        ctx.log(format!("motion: {percent:.1}% changed"));

        // Symmetric edge trigger: notify on both transitions.
        if detected && !session.motion_present {
            ctx.notifications
                .push(Notification::detection(format!("movement detected: {percent:.0}%")));
        } else if !detected && session.motion_present {
            ctx.notifications
                .push(Notification::detection("movement stopped"));
        }
        session.motion_present = detected;

        overlay::draw_motion_meter(&mut ctx.annotated, percent);
        Ok(())
    }

    fn stage_text(
        &self,
        session: &mut Session,
        gray: &GrayImage,
        ctx: &mut FrameContext,
    ) -> Result<()> {
        if !session.settings.detectors.get(MonitorOptionKind::TextDetection) {
            return Ok(());
        }
        if session.stats.total_frames_processed % TEXT_FRAME_INTERVAL != 0 {
            return Ok(());
        }
        let Some(engine) = self.text.as_ref() else {
            ctx.log("text recognition unavailable (no engine)".to_string());
            log::warn!("session {}: text recognition unavailable", session.id);
            return Ok(());
        };

        let capture = {
            let mut guard = engine
                .lock()
                .map_err(|_| anyhow!("text engine lock poisoned"))?;
            guard.recognize(gray)?
        };

        let Some(capture) = capture else {
            session.stats.text_detected = false;
            session.last_text = None;
            return Ok(());
        };

        let content = sanitize(&capture.content);
        if !is_positive(&content) {
            session.stats.text_detected = false;
            session.last_text = None;
            ctx.log("text recognition: below minimum length".to_string());
            return Ok(());
        }

        session.stats.text_detected = true;
        session.last_text = Some(content.clone());

        let shown: String = if content.chars().count() > NOTIFICATION_TEXT_LIMIT {
            let truncated: String = content.chars().take(NOTIFICATION_TEXT_LIMIT).collect();
            format!("{truncated}…")
        } else {
            content.clone()
        };
        ctx.notifications
            .push(Notification::detection(format!("text detected: \"{shown}\"")));
        ctx.detections.text_regions.push(TextRegion {
            content,
            confidence: capture.mean_confidence.clamp(0.0, 1.0),
            language: capture.language,
        });
        overlay::draw_text_badge(&mut ctx.annotated);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Bookkeeping
    // ------------------------------------------------------------------

    fn bookkeeping(
        &self,
        session: &mut Session,
        ctx: &mut FrameContext,
        now: Instant,
        elapsed: std::time::Duration,
    ) {
        session.history.push(elapsed);
        session.stats.average_processing_ms = session.history.average_ms();
        session.stats.actual_processing_fps = if session.stats.average_processing_ms > 0.0 {
            1000.0 / session.stats.average_processing_ms
        } else {
            0.0
        };
        session.stats.target_processing_fps = session.settings.target_fps;

        // Smoothed FPS: count accepted frames inside a ~1 s window and latch
        // the rate on every boundary crossing.
        match session.timing.fps_window_start {
            None => {
                session.timing.fps_window_start = Some(now);
                session.timing.frames_in_window = 1;
            }
            Some(start) => {
                let window = now.duration_since(start);
                if window.as_secs_f64() >= 1.0 {
                    session.stats.current_fps =
                        session.timing.frames_in_window as f64 / window.as_secs_f64();
                    session.timing.fps_window_start = Some(now);
                    session.timing.frames_in_window = 1;
                } else {
                    session.timing.frames_in_window += 1;
                }
            }
        }

        session.stats.memory_usage_bytes =
            frame::buffer_bytes(Some(&ctx.annotated), session.prev_gray.as_ref()) as u64 * 2;
        session.stats.is_optimal =
            session.stats.current_fps >= OPTIMAL_FPS_RATIO * session.settings.target_fps;

        overlay::draw_camera_status(
            &mut ctx.annotated,
            session.stats.camera_movement,
            session.stats.camera_stability,
        );
        overlay::draw_stats_panel(
            &mut ctx.annotated,
            session.stats.current_fps,
            session.settings.target_fps,
            session.stats.is_optimal,
        );
    }
}
