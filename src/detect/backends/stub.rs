use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use image::GrayImage;

use crate::detect::backend::{CascadeParams, Region, RegionDetector};

/// Scripted backend for tests and the demo daemon.
///
/// Plays back a queue of per-call detection lists; once the script is
/// exhausted the final entry repeats. Shares an invocation counter so tests
/// can assert how often a stage actually ran.
pub struct ScriptedBackend {
    script: VecDeque<Vec<Region>>,
    last: Vec<Region>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Vec<Region>>) -> Self {
        Self {
            script: script.into(),
            last: Vec::new(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Backend that returns the same detections on every call.
    pub fn fixed(regions: Vec<Region>) -> Self {
        Self {
            script: VecDeque::new(),
            last: regions,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Backend that never detects anything.
    pub fn empty() -> Self {
        Self::fixed(Vec::new())
    }

    /// Handle to the shared invocation counter.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl RegionDetector for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self, _frame: &GrayImage, _params: &CascadeParams) -> Result<Vec<Region>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        Ok(self.last.clone())
    }
}
