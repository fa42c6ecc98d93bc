//! framewatch
//!
//! Per-session real-time video frame analysis. Each client session feeds a
//! stream of frames through a fixed detector chain and receives, per frame,
//! an annotated image plus structured detections (faces, eyes, hands,
//! motion, on-screen text) and rolling performance/stability statistics.
//!
//! # Architecture
//!
//! - `frame`: pixel-buffer boundary (decode/encode, grayscale, ROI crops)
//! - `detect`: cascade-style region detectors behind a kind-indexed
//!   registry, the frame-differencing primitive, and the throttled
//!   text-recognition engine
//! - `analysis`: camera-motion analyzer (movement level, stability, class)
//! - `session`: session state and the concurrent session store, which owns
//!   all per-client mutable state
//! - `pipeline`: the ordered, stage-isolated detection pipeline and the
//!   frame-rate governor
//! - `api`: typed session/configuration facade consumed by the transport
//!   layer
//!
//! Missing classifier models and a missing text engine are expected
//! deployment conditions: the affected stages go inert with a warning,
//! the pipeline keeps running, and nothing escapes `process_frame` as an
//! unhandled fault.

pub mod analysis;
pub mod api;
pub mod config;
pub mod detect;
pub mod frame;
pub mod pipeline;
pub mod session;

pub use analysis::{CameraMotionReport, CameraMovement, MovementVector};
pub use api::{CameraMovementAnalysis, FrameRateInfo, MonitorApi};
pub use config::EngineConfig;
pub use detect::{
    CascadeKind, CascadeParams, DetectorRegistry, Region, RegionDetector, ScriptedBackend,
    ScriptedRecognizer, TextCapture, TextRecognizer,
};
pub use pipeline::result::{
    DetectionBox, FrameDetections, FrameResult, Notification, NotificationKind, TextRegion,
};
pub use pipeline::DetectionPipeline;
pub use session::monitoring::{
    MonitorOptionKind, MonitoringConfiguration, MonitoringOption,
};
pub use session::settings::Settings;
pub use session::stats::Statistics;
pub use session::{Session, SessionStore};
