//! Throttled text recognition.
//!
//! Text recognition is the most expensive stage, so the pipeline invokes it
//! only every Nth processed frame. This module defines the engine trait, the
//! character whitelist applied to raw engine output, and startup discovery:
//! a missing recognition model is an expected deployment condition and leaves
//! the stage inert, never fatal.

use std::path::Path;

use anyhow::Result;
use image::GrayImage;

/// Recognition runs on frames where `total_frames_processed % INTERVAL == 0`.
pub const TEXT_FRAME_INTERVAL: u64 = 15;

/// Trimmed recognitions at or below this length are treated as noise.
pub const MIN_TEXT_LEN: usize = 3;

/// Characters retained from raw engine output.
const WHITELIST_PUNCT: &str = " .,:;!?-'\"()/@#%&+=";

/// A positive text recognition.
#[derive(Clone, Debug, Default)]
pub struct TextCapture {
    /// Full recognized content, whitelist-filtered and trimmed.
    pub content: String,
    /// Engine mean confidence, normalized to [0,1].
    pub mean_confidence: f32,
    /// BCP-47-ish language tag the engine was configured with.
    pub language: String,
}

/// Text recognition engine.
///
/// `recognize` returns `Ok(None)` when the frame carries no usable text;
/// engine failures surface as errors that the pipeline logs and absorbs.
pub trait TextRecognizer: Send {
    fn name(&self) -> &'static str;

    fn recognize(&mut self, frame: &GrayImage) -> Result<Option<TextCapture>>;
}

/// Keep alphanumerics and common punctuation, collapse the rest.
///
/// Applied to raw engine output before the minimum-length check so that
/// control characters or stray symbols never count toward a detection.
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || WHITELIST_PUNCT.contains(*c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// A sanitized recognition counts only past the minimum length.
pub fn is_positive(content: &str) -> bool {
    content.trim().len() > MIN_TEXT_LEN
}

/// Discover a recognition engine from the configured model path.
///
/// Absent model (or a build without `backend-tract`) leaves the stage inert.
pub fn discover(model_path: Option<&Path>, language: &str) -> Option<Box<dyn TextRecognizer>> {
    let path = match model_path {
        Some(path) => path,
        None => {
            log::warn!("text recognition inert: no model path configured");
            return None;
        }
    };
    if !path.exists() {
        log::warn!(
            "text recognition inert: model file {} not found",
            path.display()
        );
        return None;
    }
    load_model_engine(path, language)
}

#[cfg(feature = "backend-tract")]
fn load_model_engine(path: &Path, language: &str) -> Option<Box<dyn TextRecognizer>> {
    match tract_engine::TractTextRecognizer::load(path, language) {
        Ok(engine) => {
            log::info!("text recognition loaded from {}", path.display());
            Some(Box::new(engine))
        }
        Err(err) => {
            log::warn!(
                "text recognition inert: failed to load {}: {err:#}",
                path.display()
            );
            None
        }
    }
}

#[cfg(not(feature = "backend-tract"))]
fn load_model_engine(path: &Path, _language: &str) -> Option<Box<dyn TextRecognizer>> {
    log::warn!(
        "text recognition inert: model {} present but crate built without backend-tract",
        path.display()
    );
    None
}

/// Scripted recognizer for tests and the demo daemon.
pub struct ScriptedRecognizer {
    captures: Vec<Option<TextCapture>>,
    cursor: usize,
    calls: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

impl ScriptedRecognizer {
    pub fn new(captures: Vec<Option<TextCapture>>) -> Self {
        Self {
            captures,
            cursor: 0,
            calls: std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0)),
        }
    }

    /// Recognizer that always reports the same content.
    pub fn fixed(content: &str, mean_confidence: f32) -> Self {
        Self::new(vec![Some(TextCapture {
            content: content.to_string(),
            mean_confidence,
            language: "eng".to_string(),
        })])
    }

    pub fn call_counter(&self) -> std::sync::Arc<std::sync::atomic::AtomicUsize> {
        self.calls.clone()
    }
}

impl TextRecognizer for ScriptedRecognizer {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn recognize(&mut self, _frame: &GrayImage) -> Result<Option<TextCapture>> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let capture = if self.captures.is_empty() {
            None
        } else {
            let idx = self.cursor.min(self.captures.len() - 1);
            self.cursor += 1;
            self.captures[idx].clone()
        };
        Ok(capture)
    }
}

#[cfg(feature = "backend-tract")]
mod tract_engine {
    use std::path::Path;

    use anyhow::{Context, Result};
    use image::GrayImage;
    use tract_onnx::prelude::*;

    use super::{sanitize, TextCapture, TextRecognizer};

    const INPUT_W: u32 = 320;
    const INPUT_H: u32 = 48;
    const CHARSET: &str =
        " 0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ.,:;!?-'\"()/@#%&+=";

    /// CTC-style ONNX recognizer: input `1x1xHxW` grayscale in [0,1],
    /// output `TxC` per-step logits over `CHARSET` plus a leading blank.
    pub struct TractTextRecognizer {
        model: SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>,
        language: String,
    }

    impl TractTextRecognizer {
        pub fn load(model_path: &Path, language: &str) -> Result<Self> {
            let model = tract_onnx::onnx()
                .model_for_path(model_path)
                .with_context(|| {
                    format!("failed to load text model from {}", model_path.display())
                })?
                .with_input_fact(
                    0,
                    InferenceFact::dt_shape(
                        f32::datum_type(),
                        tvec!(1, 1, INPUT_H as usize, INPUT_W as usize),
                    ),
                )
                .context("failed to set input fact")?
                .into_optimized()
                .context("failed to optimize text model")?
                .into_runnable()
                .context("failed to build runnable text model")?;
            Ok(Self {
                model,
                language: language.to_string(),
            })
        }

        fn decode_ctc(logits: &[f32], steps: usize, classes: usize) -> (String, f32) {
            let chars: Vec<char> = CHARSET.chars().collect();
            let mut out = String::new();
            let mut confidences = Vec::new();
            let mut prev_class = 0usize;
            for t in 0..steps {
                let row = &logits[t * classes..(t + 1) * classes];
                let (best, score) = row
                    .iter()
                    .enumerate()
                    .fold((0usize, f32::NEG_INFINITY), |acc, (i, &v)| {
                        if v > acc.1 {
                            (i, v)
                        } else {
                            acc
                        }
                    });
                // Class 0 is the CTC blank; collapse repeats.
                if best != 0 && best != prev_class {
                    if let Some(&c) = chars.get(best - 1) {
                        out.push(c);
                        confidences.push(score);
                    }
                }
                prev_class = best;
            }
            let mean = if confidences.is_empty() {
                0.0
            } else {
                let raw = confidences.iter().sum::<f32>() / confidences.len() as f32;
                // Logit to a rough [0,1] score.
                1.0 / (1.0 + (-raw).exp())
            };
            (out, mean)
        }
    }

    impl TextRecognizer for TractTextRecognizer {
        fn name(&self) -> &'static str {
            "tract-text"
        }

        fn recognize(&mut self, frame: &GrayImage) -> Result<Option<TextCapture>> {
            let resized = image::imageops::resize(
                frame,
                INPUT_W,
                INPUT_H,
                image::imageops::FilterType::Triangle,
            );
            let input = tract_ndarray::Array4::from_shape_fn(
                (1, 1, INPUT_H as usize, INPUT_W as usize),
                |(_, _, y, x)| resized.get_pixel(x as u32, y as u32)[0] as f32 / 255.0,
            );
            let outputs = self
                .model
                .run(tvec!(input.into_tensor().into()))
                .context("text inference failed")?;
            let output = outputs
                .first()
                .context("text model produced no outputs")?
                .to_array_view::<f32>()
                .context("text model output was not f32")?;
            let shape = output.shape().to_vec();
            let (steps, classes) = match shape.as_slice() {
                [t, c] => (*t, *c),
                [1, t, c] => (*t, *c),
                other => anyhow::bail!("unexpected text model output shape {:?}", other),
            };
            let flat: Vec<f32> = output.iter().copied().collect();
            let (raw, mean) = Self::decode_ctc(&flat, steps, classes);
            let content = sanitize(&raw);
            if content.is_empty() {
                return Ok(None);
            }
            Ok(Some(TextCapture {
                content,
                mean_confidence: mean.clamp(0.0, 1.0),
                language: self.language.clone(),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_whitelisted_characters() {
        assert_eq!(sanitize("  Hello, world! <3 \u{7}"), "Hello, world! 3");
    }

    #[test]
    fn short_content_is_not_positive() {
        assert!(!is_positive("ab"));
        assert!(!is_positive("  ab  "));
        assert!(is_positive("abcd"));
    }

    #[test]
    fn discover_without_model_is_inert() {
        assert!(discover(None, "eng").is_none());
        assert!(discover(Some(Path::new("/nonexistent/text.onnx")), "eng").is_none());
    }

    #[test]
    fn scripted_recognizer_counts_calls() -> Result<()> {
        let mut engine = ScriptedRecognizer::fixed("STOP SIGN", 0.8);
        let counter = engine.call_counter();
        let frame = GrayImage::new(4, 4);
        let capture = engine.recognize(&frame)?.expect("capture");
        assert_eq!(capture.content, "STOP SIGN");
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 1);
        Ok(())
    }
}
