//! Session state and the concurrent session registry.
//!
//! The store is the sole owner of all per-client mutable state. Lookup takes
//! a brief map-level read lock and hands back an `Arc<Mutex<Session>>`;
//! mutation happens under the per-session lock for the duration of one call,
//! so distinct sessions never contend with each other.

pub mod monitoring;
pub mod settings;
pub mod stats;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Instant, SystemTime};

use anyhow::{anyhow, Result};
use image::{GrayImage, RgbImage};

use monitoring::MonitoringConfiguration;
use settings::{clamp_fps, Settings};
use stats::{ProcessingHistory, Statistics};

/// Frame-rate governor state, kept per session.
#[derive(Clone, Debug, Default)]
pub struct SessionTiming {
    /// Instant of the last frame the governor accepted.
    pub last_accepted: Option<Instant>,
    /// Frames to drop unconditionally (set via frame-skip configuration).
    pub pending_skips: u32,
    /// Start of the current ~1 s FPS smoothing window.
    pub fps_window_start: Option<Instant>,
    /// Accepted frames inside the current window.
    pub frames_in_window: u32,
}

/// One logical client video stream and its accumulated state.
pub struct Session {
    pub id: String,
    pub created_at: SystemTime,
    /// Monotonic twin of `created_at`, for lifetime-rate math.
    pub created_instant: Instant,
    pub last_activity: SystemTime,
    pub settings: Settings,
    pub monitoring: MonitoringConfiguration,
    pub stats: Statistics,
    /// Previous accepted frame pair, exclusively owned by this session.
    /// Replaced every processed frame; the evicted pair drops here.
    pub prev_frame: Option<RgbImage>,
    pub prev_gray: Option<GrayImage>,
    pub history: ProcessingHistory,
    /// Most recent non-empty OCR capture.
    pub last_text: Option<String>,
    /// Edge-trigger flags: presence observed on the previous frame.
    pub face_present: bool,
    pub motion_present: bool,
    pub timing: SessionTiming,
}

impl Session {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            created_at: SystemTime::now(),
            created_instant: Instant::now(),
            last_activity: SystemTime::now(),
            settings: Settings::default(),
            monitoring: MonitoringConfiguration::default(),
            stats: Statistics::default(),
            prev_frame: None,
            prev_gray: None,
            history: ProcessingHistory::default(),
            last_text: None,
            face_present: false,
            motion_present: false,
            timing: SessionTiming::default(),
        }
    }

    /// Swap in a newly accepted frame pair. The old pair drops exactly once.
    pub fn swap_previous(&mut self, frame: RgbImage, gray: GrayImage) {
        self.prev_frame = Some(frame);
        self.prev_gray = Some(gray);
    }

    /// Drop retained frame buffers, e.g. on cleanup.
    pub fn release_buffers(&mut self) {
        self.prev_frame = None;
        self.prev_gray = None;
    }
}

type SharedSession = Arc<Mutex<Session>>;

/// Concurrent registry mapping session identifier to session state.
pub struct SessionStore {
    inner: RwLock<HashMap<String, SharedSession>>,
    /// Target FPS stamped onto every session this store creates.
    default_target_fps: f64,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_target_fps(settings::DEFAULT_TARGET_FPS)
    }

    /// Store whose created sessions start at the given target FPS.
    pub fn with_target_fps(fps: f64) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            default_target_fps: clamp_fps(fps),
        }
    }

    pub fn default_target_fps(&self) -> f64 {
        self.default_target_fps
    }

    fn new_session(&self, id: &str) -> SharedSession {
        let mut session = Session::new(id);
        session.settings.target_fps = self.default_target_fps;
        session.monitoring.frame_rate.target_fps = self.default_target_fps;
        Arc::new(Mutex::new(session))
    }

    /// Idempotent initialize: creates default state if absent.
    /// Returns true when a new session was created.
    pub fn initialize(&self, id: &str) -> Result<bool> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| anyhow!("session store lock poisoned"))?;
        if map.contains_key(id) {
            return Ok(false);
        }
        map.insert(id.to_string(), self.new_session(id));
        Ok(true)
    }

    pub fn get(&self, id: &str) -> Result<Option<SharedSession>> {
        let map = self
            .inner
            .read()
            .map_err(|_| anyhow!("session store lock poisoned"))?;
        Ok(map.get(id).cloned())
    }

    pub fn get_or_create(&self, id: &str) -> Result<SharedSession> {
        if let Some(session) = self.get(id)? {
            return Ok(session);
        }
        let mut map = self
            .inner
            .write()
            .map_err(|_| anyhow!("session store lock poisoned"))?;
        Ok(map
            .entry(id.to_string())
            .or_insert_with(|| self.new_session(id))
            .clone())
    }

    /// Remove a session and release its frame buffers.
    /// Returns true when the identifier was present.
    pub fn remove(&self, id: &str) -> Result<bool> {
        let removed = {
            let mut map = self
                .inner
                .write()
                .map_err(|_| anyhow!("session store lock poisoned"))?;
            map.remove(id)
        };
        match removed {
            Some(session) => {
                if let Ok(mut guard) = session.lock() {
                    guard.release_buffers();
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn active_ids(&self) -> Result<Vec<String>> {
        let map = self
            .inner
            .read()
            .map_err(|_| anyhow!("session store lock poisoned"))?;
        let mut ids: Vec<String> = map.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
