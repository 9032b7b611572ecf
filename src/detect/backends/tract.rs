#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{parse_darknet_rows, RawDetection};
use crate::frame::Frame;

/// Tract-based backend for an ONNX export of the detector.
///
/// The model takes a `1x3xHxW` RGB tensor scaled to `0..1` and emits one or
/// more outputs whose last axis is a Darknet-style candidate row.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    width: u32,
    height: u32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, height as usize, width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            width,
            height,
        })
    }

    fn build_input(&self, frame: &Frame) -> Tensor {
        let resized = imageops::resize(frame.image(), self.width, self.height, FilterType::Triangle);
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, self.height as usize, self.width as usize),
            |(_, channel, y, x)| resized.get_pixel(x as u32, y as u32).0[channel] as f32 / 255.0,
        );
        input.into_tensor()
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>> {
        let input = self.build_input(frame);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        if outputs.is_empty() {
            return Err(anyhow!("model produced no outputs"));
        }

        let mut candidates = Vec::new();
        for output in outputs.iter() {
            let view = output
                .to_array_view::<f32>()
                .context("model output tensor was not f32")?;
            let row_len = *view
                .shape()
                .last()
                .ok_or_else(|| anyhow!("model output is a scalar"))?;
            let values: Vec<f32> = view.iter().copied().collect();
            candidates.extend(parse_darknet_rows(&values, row_len)?);
        }
        Ok(candidates)
    }

    fn warm_up(&mut self) -> Result<()> {
        let blank = Frame::from_image(image::RgbImage::new(self.width, self.height), 0);
        self.detect(&blank).map(|_| ())
    }
}
