use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::analysis::{CameraMovement, MovementVector};

/// Rolling processing-duration history capacity.
pub const HISTORY_CAPACITY: usize = 100;

/// Recent movement vectors retained on the statistics.
pub const RECENT_MOVEMENTS: usize = 10;

/// Actual FPS at or above this fraction of target counts as optimal.
pub const OPTIMAL_FPS_RATIO: f64 = 0.7;

/// Per-session counters and gauges.
///
/// Mutated only by the pipeline while it holds the session for one frame;
/// every external read gets a clone so concurrent readers never observe a
/// half-updated value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Statistics {
    /// Detections in the most recent processed frame.
    pub faces_detected: u32,
    pub eyes_detected: u32,
    pub hands_detected: u32,
    /// Accepted frames only; governor skips do not count.
    pub total_frames_processed: u64,
    /// Generic motion level, percent of changed pixels [0,100].
    pub movement_level: f64,
    pub movement_detected: bool,
    pub text_detected: bool,
    /// Smoothed FPS: frames counted in the last ~1 s wall-clock window.
    pub current_fps: f64,
    pub target_processing_fps: f64,
    /// Derived from average processing time.
    pub actual_processing_fps: f64,
    pub average_processing_ms: f64,
    pub camera_movement: CameraMovement,
    /// Inverse of global frame change, [0,100].
    pub camera_stability: f64,
    pub recent_movements: Vec<MovementVector>,
    /// Approximate bytes retained in the session's frame buffers.
    pub memory_usage_bytes: u64,
    /// True when current FPS is at least 70% of target.
    pub is_optimal: bool,
}

impl Default for Statistics {
    fn default() -> Self {
        Self {
            faces_detected: 0,
            eyes_detected: 0,
            hands_detected: 0,
            total_frames_processed: 0,
            movement_level: 0.0,
            movement_detected: false,
            text_detected: false,
            current_fps: 0.0,
            target_processing_fps: crate::session::settings::DEFAULT_TARGET_FPS,
            actual_processing_fps: 0.0,
            average_processing_ms: 0.0,
            camera_movement: CameraMovement::Stable,
            camera_stability: 100.0,
            recent_movements: Vec::new(),
            memory_usage_bytes: 0,
            is_optimal: false,
        }
    }
}

impl Statistics {
    /// Reset the per-frame detection counts at the start of a frame.
    pub fn begin_frame(&mut self) {
        self.faces_detected = 0;
        self.eyes_detected = 0;
        self.hands_detected = 0;
    }

    /// Append a movement vector, evicting the oldest past capacity.
    pub fn push_movement(&mut self, vector: MovementVector) {
        self.recent_movements.push(vector);
        if self.recent_movements.len() > RECENT_MOVEMENTS {
            self.recent_movements.remove(0);
        }
    }

    pub fn average_movement_magnitude(&self) -> f64 {
        if self.recent_movements.is_empty() {
            return 0.0;
        }
        self.recent_movements
            .iter()
            .map(|v| v.magnitude)
            .sum::<f64>()
            / self.recent_movements.len() as f64
    }
}

/// Bounded rolling history of processing durations.
#[derive(Clone, Debug, Default)]
pub struct ProcessingHistory {
    durations: VecDeque<Duration>,
}

impl ProcessingHistory {
    pub fn push(&mut self, duration: Duration) {
        while self.durations.len() >= HISTORY_CAPACITY {
            self.durations.pop_front();
        }
        self.durations.push_back(duration);
    }

    pub fn len(&self) -> usize {
        self.durations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.durations.is_empty()
    }

    pub fn average_ms(&self) -> f64 {
        if self.durations.is_empty() {
            return 0.0;
        }
        let total: Duration = self.durations.iter().sum();
        total.as_secs_f64() * 1000.0 / self.durations.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_statistics_read_as_stable() {
        let stats = Statistics::default();
        assert_eq!(stats.total_frames_processed, 0);
        assert_eq!(stats.camera_stability, 100.0);
        assert_eq!(stats.camera_movement, CameraMovement::Stable);
    }

    #[test]
    fn movement_history_is_bounded() {
        let mut stats = Statistics::default();
        for i in 0..(RECENT_MOVEMENTS + 5) {
            stats.push_movement(MovementVector {
                magnitude: i as f64,
                stability: 100.0 - i as f64,
            });
        }
        assert_eq!(stats.recent_movements.len(), RECENT_MOVEMENTS);
        // Oldest entries evicted first.
        assert_eq!(stats.recent_movements[0].magnitude, 5.0);
    }

    #[test]
    fn history_caps_and_averages() {
        let mut history = ProcessingHistory::default();
        for _ in 0..(HISTORY_CAPACITY + 20) {
            history.push(Duration::from_millis(10));
        }
        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert!((history.average_ms() - 10.0).abs() < 1e-9);
    }
}
