#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::GrayImage;
use tract_onnx::prelude::*;

use crate::detect::backend::{CascadeParams, Region, RegionDetector};

/// Model input edge. Frames are letterbox-free resized to this square.
const INPUT_SIZE: u32 = 256;

/// ONNX region-detector backend.
///
/// Loads a local single-shot detection model and maps its output rows to
/// frame-coordinate regions. Expected model contract: input `1x1xSxS` f32
/// grayscale in [0,1]; output `Nx5` rows of normalized `[x, y, w, h, score]`.
/// `CascadeParams::min_size` filters tiny boxes after scaling;
/// `min_neighbors` is irrelevant to single-shot models and ignored here.
pub struct TractRegionBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>,
    confidence_threshold: f32,
}

impl TractRegionBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 1, INPUT_SIZE as usize, INPUT_SIZE as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            confidence_threshold: 0.5,
        })
    }

    /// Override the default confidence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    fn build_input(&self, frame: &GrayImage) -> Tensor {
        let resized = image::imageops::resize(
            frame,
            INPUT_SIZE,
            INPUT_SIZE,
            image::imageops::FilterType::Triangle,
        );
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 1, INPUT_SIZE as usize, INPUT_SIZE as usize),
            |(_, _, y, x)| resized.get_pixel(x as u32, y as u32)[0] as f32 / 255.0,
        );
        input.into_tensor()
    }

    fn extract_regions(
        &self,
        outputs: TVec<TValue>,
        frame_w: u32,
        frame_h: u32,
        params: &CascadeParams,
    ) -> Result<Vec<Region>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let rows = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let flat: Vec<f32> = rows.iter().copied().collect();

        let mut regions = Vec::new();
        for chunk in flat.chunks_exact(5) {
            let score = chunk[4];
            if score < self.confidence_threshold {
                continue;
            }
            let x = (chunk[0].clamp(0.0, 1.0) * frame_w as f32) as u32;
            let y = (chunk[1].clamp(0.0, 1.0) * frame_h as f32) as u32;
            let w = (chunk[2].clamp(0.0, 1.0) * frame_w as f32) as u32;
            let h = (chunk[3].clamp(0.0, 1.0) * frame_h as f32) as u32;
            if w < params.min_size || h < params.min_size {
                continue;
            }
            regions.push(Region::new(x, y, w, h, score));
        }
        Ok(regions)
    }
}

impl RegionDetector for TractRegionBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, frame: &GrayImage, params: &CascadeParams) -> Result<Vec<Region>> {
        let input = self.build_input(frame);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.extract_regions(outputs, frame.width(), frame.height(), params)
    }
}
