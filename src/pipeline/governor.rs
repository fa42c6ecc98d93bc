//! Frame-rate governance.
//!
//! Decides, per incoming frame, whether to process or skip based on the
//! session's target rate and wall-clock spacing. The decision takes `now` as
//! a parameter so tests can drive exact timelines.

use std::time::{Duration, Instant};

use crate::session::settings::Settings;
use crate::session::SessionTiming;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateDecision {
    Process,
    Skip(SkipReason),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Configured frame-skip count still pending.
    PendingSkip,
    /// Elapsed time since the last accepted frame is under 1/targetFPS.
    TooSoon,
}

impl SkipReason {
    pub fn message(self) -> &'static str {
        match self {
            SkipReason::PendingSkip => "frame skipped: configured frame-skip pending",
            SkipReason::TooSoon => "frame skipped: rate control",
        }
    }
}

/// Gate one frame. Accepting records `now` as the last accepted instant;
/// skipping leaves all frame state untouched apart from the pending counter.
pub fn decide(timing: &mut SessionTiming, settings: &Settings, now: Instant) -> GateDecision {
    if !settings.rate_control_enabled {
        timing.last_accepted = Some(now);
        return GateDecision::Process;
    }

    if timing.pending_skips > 0 {
        timing.pending_skips -= 1;
        return GateDecision::Skip(SkipReason::PendingSkip);
    }

    if let Some(last) = timing.last_accepted {
        let min_spacing = Duration::from_secs_f64(1.0 / settings.target_fps.max(1.0));
        if now.duration_since(last) < min_spacing {
            return GateDecision::Skip(SkipReason::TooSoon);
        }
    }

    timing.last_accepted = Some(now);
    GateDecision::Process
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with_fps(fps: f64) -> Settings {
        Settings {
            target_fps: fps,
            ..Settings::default()
        }
    }

    #[test]
    fn first_frame_is_always_accepted() {
        let mut timing = SessionTiming::default();
        let decision = decide(&mut timing, &settings_with_fps(10.0), Instant::now());
        assert_eq!(decision, GateDecision::Process);
        assert!(timing.last_accepted.is_some());
    }

    #[test]
    fn fifty_ms_spacing_at_ten_fps_skips_every_other_call() {
        let mut timing = SessionTiming::default();
        let settings = settings_with_fps(10.0);
        let base = Instant::now();

        let mut accepted = 0;
        for i in 0..10u64 {
            let now = base + Duration::from_millis(50 * i);
            if decide(&mut timing, &settings, now) == GateDecision::Process {
                accepted += 1;
            }
        }
        // 100 ms budget per frame: calls at 0, 100, 200, ... pass.
        assert_eq!(accepted, 5);
    }

    #[test]
    fn disabled_rate_control_never_skips() {
        let mut timing = SessionTiming::default();
        let settings = Settings {
            rate_control_enabled: false,
            ..settings_with_fps(1.0)
        };
        let base = Instant::now();
        for i in 0..5u64 {
            let now = base + Duration::from_millis(i);
            assert_eq!(decide(&mut timing, &settings, now), GateDecision::Process);
        }
    }

    #[test]
    fn pending_skips_drain_first() {
        let mut timing = SessionTiming {
            pending_skips: 2,
            ..SessionTiming::default()
        };
        let settings = settings_with_fps(30.0);
        let base = Instant::now();
        assert_eq!(
            decide(&mut timing, &settings, base),
            GateDecision::Skip(SkipReason::PendingSkip)
        );
        assert_eq!(
            decide(&mut timing, &settings, base + Duration::from_secs(1)),
            GateDecision::Skip(SkipReason::PendingSkip)
        );
        assert_eq!(
            decide(&mut timing, &settings, base + Duration::from_secs(2)),
            GateDecision::Process
        );
        assert_eq!(timing.pending_skips, 0);
    }

    #[test]
    fn skip_does_not_touch_last_accepted() {
        let mut timing = SessionTiming::default();
        let settings = settings_with_fps(10.0);
        let base = Instant::now();
        assert_eq!(decide(&mut timing, &settings, base), GateDecision::Process);
        let accepted_at = timing.last_accepted;
        let _ = decide(&mut timing, &settings, base + Duration::from_millis(10));
        assert_eq!(timing.last_accepted, accepted_at);
    }
}
