#![cfg(feature = "backend-opencv")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use opencv::{
    core::{self, Mat, Scalar, Size, Vector},
    dnn,
    prelude::*,
};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{parse_darknet_rows, RawDetection};
use crate::frame::Frame;

/// OpenCV DNN backend for Darknet `.cfg` + `.weights` models, run on the CPU.
pub struct DarknetBackend {
    net: dnn::Net,
    output_names: Vector<String>,
    input_size: Size,
}

impl DarknetBackend {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        config_path: P,
        weights_path: Q,
        input_width: u32,
        input_height: u32,
    ) -> Result<Self> {
        let config_path = config_path.as_ref();
        let weights_path = weights_path.as_ref();
        let mut net = dnn::read_net_from_darknet(
            &config_path.to_string_lossy(),
            &weights_path.to_string_lossy(),
        )
        .with_context(|| {
            format!(
                "failed to read Darknet model {} / {}",
                config_path.display(),
                weights_path.display()
            )
        })?;
        net.set_preferable_backend(dnn::DNN_BACKEND_OPENCV)?;
        net.set_preferable_target(dnn::DNN_TARGET_CPU)?;
        if net.empty()? {
            return Err(anyhow!("detector model loaded empty from {}", weights_path.display()));
        }
        let output_names = net
            .get_unconnected_out_layers_names()
            .context("failed to list detector output layers")?;

        Ok(Self {
            net,
            output_names,
            input_size: Size::new(input_width as i32, input_height as i32),
        })
    }
}

/// Packed RGB frame as a 3-channel `Mat`.
pub(crate) fn frame_to_mat(frame: &Frame) -> Result<Mat> {
    let flat = Mat::from_slice(frame.image().as_raw())?;
    let rgb = flat.reshape(3, frame.height() as i32)?;
    Ok(rgb.try_clone()?)
}

impl DetectorBackend for DarknetBackend {
    fn name(&self) -> &'static str {
        "darknet"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>> {
        let mat = frame_to_mat(frame)?;
        // Frame is already RGB, so no channel swap.
        let blob = dnn::blob_from_image(
            &mat,
            1.0 / 255.0,
            self.input_size,
            Scalar::default(),
            false,
            false,
            core::CV_32F,
        )
        .context("failed to build detector input blob")?;
        self.net.set_input(&blob, "", 1.0, Scalar::default())?;

        let mut outputs = Vector::<Mat>::new();
        self.net
            .forward(&mut outputs, &self.output_names)
            .context("detector forward pass failed")?;

        let mut candidates = Vec::new();
        for output in outputs.iter() {
            let rows = output.rows();
            let cols = output.cols();
            if rows <= 0 || cols <= 0 {
                continue;
            }
            let mut values = Vec::with_capacity((rows * cols) as usize);
            for r in 0..rows {
                values.extend_from_slice(output.at_row::<f32>(r)?);
            }
            candidates.extend(parse_darknet_rows(&values, cols as usize)?);
        }
        Ok(candidates)
    }
}
