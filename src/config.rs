use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::session::settings::{MAX_TARGET_FPS, MIN_TARGET_FPS};

const DEFAULT_MODEL_DIR: &str = "models";
const DEFAULT_TEXT_LANGUAGE: &str = "eng";
const DEFAULT_TARGET_FPS: f64 = 30.0;

#[derive(Debug, Deserialize, Default)]
struct EngineConfigFile {
    model_dir: Option<PathBuf>,
    text: Option<TextConfigFile>,
    default_target_fps: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct TextConfigFile {
    model_path: Option<PathBuf>,
    language: Option<String>,
}

/// Engine-level configuration: where classifier models live and how the
/// text engine is set up. Discovered once at startup; absence of any model
/// is tolerated (degraded, not fatal).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory of classifier model files keyed by detection category.
    pub model_dir: PathBuf,
    /// Text recognition model; `None` leaves the text stage inert.
    pub text_model: Option<PathBuf>,
    pub text_language: String,
    /// Target FPS applied to newly initialized sessions.
    pub default_target_fps: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            text_model: None,
            text_language: DEFAULT_TEXT_LANGUAGE.to_string(),
            default_target_fps: DEFAULT_TARGET_FPS,
        }
    }
}

impl EngineConfig {
    /// Load from the optional JSON file named by `FRAMEWATCH_CONFIG`, then
    /// apply `FRAMEWATCH_*` environment overrides, then validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("FRAMEWATCH_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: EngineConfigFile) -> Self {
        let defaults = Self::default();
        Self {
            model_dir: file.model_dir.unwrap_or(defaults.model_dir),
            text_model: file.text.as_ref().and_then(|t| t.model_path.clone()),
            text_language: file
                .text
                .and_then(|t| t.language)
                .unwrap_or(defaults.text_language),
            default_target_fps: file.default_target_fps.unwrap_or(defaults.default_target_fps),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(dir) = std::env::var("FRAMEWATCH_MODEL_DIR") {
            if !dir.trim().is_empty() {
                self.model_dir = PathBuf::from(dir);
            }
        }
        if let Ok(path) = std::env::var("FRAMEWATCH_TEXT_MODEL") {
            if !path.trim().is_empty() {
                self.text_model = Some(PathBuf::from(path));
            }
        }
        if let Ok(lang) = std::env::var("FRAMEWATCH_TEXT_LANG") {
            if !lang.trim().is_empty() {
                self.text_language = lang;
            }
        }
        if let Ok(fps) = std::env::var("FRAMEWATCH_TARGET_FPS") {
            let fps: f64 = fps
                .parse()
                .map_err(|_| anyhow!("FRAMEWATCH_TARGET_FPS must be a number"))?;
            self.default_target_fps = fps;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if !(MIN_TARGET_FPS..=MAX_TARGET_FPS).contains(&self.default_target_fps) {
            return Err(anyhow!(
                "default_target_fps must be within [{MIN_TARGET_FPS}, {MAX_TARGET_FPS}]"
            ));
        }
        if self.text_language.trim().is_empty() {
            return Err(anyhow!("text language must not be empty"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<EngineConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
