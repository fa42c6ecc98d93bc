use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use image::GrayImage;

use super::backend::{CascadeKind, CascadeParams, Region, RegionDetector};

/// Thread-safe registry of region-detector backends, keyed by category.
///
/// Backends are wrapped in `Mutex` because `RegionDetector::detect` takes
/// `&mut self`. A category with no registered backend is *inert*: lookups
/// report unavailability and the pipeline logs a warning instead of failing,
/// since a missing classifier model is an expected deployment condition.
pub struct DetectorRegistry {
    backends: HashMap<CascadeKind, Arc<Mutex<dyn RegionDetector>>>,
}

impl DetectorRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }

    /// Discover classifier models under `model_dir` and register a backend
    /// for each category whose model file is present.
    ///
    /// Without the `backend-tract` feature every category stays inert; the
    /// registry still reports which model files were found.
    pub fn discover(model_dir: &Path) -> Self {
        let mut registry = Self::new();
        for kind in CascadeKind::ALL {
            let model_path = model_dir.join(kind.model_file());
            if !model_path.exists() {
                log::warn!(
                    "{} detector inert: model file {} not found",
                    kind.label(),
                    model_path.display()
                );
                continue;
            }
            registry.load_model_backend(kind, &model_path);
        }
        registry
    }

    #[cfg(feature = "backend-tract")]
    fn load_model_backend(&mut self, kind: CascadeKind, model_path: &Path) {
        match super::backends::TractRegionBackend::load(model_path) {
            Ok(backend) => {
                log::info!("{} detector loaded from {}", kind.label(), model_path.display());
                self.register(kind, backend);
            }
            Err(err) => {
                log::warn!(
                    "{} detector inert: failed to load {}: {err:#}",
                    kind.label(),
                    model_path.display()
                );
            }
        }
    }

    #[cfg(not(feature = "backend-tract"))]
    fn load_model_backend(&mut self, kind: CascadeKind, model_path: &Path) {
        log::warn!(
            "{} detector inert: model {} present but crate built without backend-tract",
            kind.label(),
            model_path.display()
        );
    }

    /// Register a backend for a category, replacing any existing one.
    pub fn register<B: RegionDetector + 'static>(&mut self, kind: CascadeKind, backend: B) {
        self.backends.insert(kind, Arc::new(Mutex::new(backend)));
    }

    /// Availability check, consulted once per stage invocation.
    pub fn available(&self, kind: CascadeKind) -> bool {
        self.backends.contains_key(&kind)
    }

    /// Registered categories, for startup logging.
    pub fn registered(&self) -> Vec<CascadeKind> {
        self.backends.keys().copied().collect()
    }

    /// Run detection for a category.
    ///
    /// An unavailable category yields an empty result rather than an error:
    /// callers that need to distinguish use `available` first.
    pub fn detect(
        &self,
        kind: CascadeKind,
        frame: &GrayImage,
        params: &CascadeParams,
    ) -> Result<Vec<Region>> {
        let Some(backend) = self.backends.get(&kind) else {
            return Ok(Vec::new());
        };
        let mut guard = backend
            .lock()
            .map_err(|_| anyhow!("{} backend lock poisoned", kind.label()))?;
        guard.detect(frame, params)
    }
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::backends::ScriptedBackend;

    #[test]
    fn unregistered_kind_is_inert() -> Result<()> {
        let registry = DetectorRegistry::new();
        assert!(!registry.available(CascadeKind::Face));
        let frame = GrayImage::new(4, 4);
        let hits = registry.detect(CascadeKind::Face, &frame, &CascadeParams::default())?;
        assert!(hits.is_empty());
        Ok(())
    }

    #[test]
    fn discover_with_empty_dir_registers_nothing() {
        let dir = tempfile::tempdir().expect("temp model dir");
        let registry = DetectorRegistry::discover(dir.path());
        assert!(registry.registered().is_empty());
    }

    #[test]
    fn registered_backend_serves_detections() -> Result<()> {
        let mut registry = DetectorRegistry::new();
        registry.register(
            CascadeKind::Hand,
            ScriptedBackend::fixed(vec![Region::new(1, 2, 3, 4, 0.5)]),
        );
        assert!(registry.available(CascadeKind::Hand));
        let frame = GrayImage::new(8, 8);
        let hits = registry.detect(CascadeKind::Hand, &frame, &CascadeParams::default())?;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].x, 1);
        Ok(())
    }
}
