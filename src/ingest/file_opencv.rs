//! Local file frame source using OpenCV `VideoCapture`.

use anyhow::{anyhow, Context, Result};
use opencv::{
    core::{self, Mat},
    imgproc,
    prelude::*,
    videoio,
};

use super::file::{FileConfig, FileStats};
use crate::frame::Frame;

pub(crate) struct OpencvFileSource {
    config: FileConfig,
    capture: videoio::VideoCapture,
    frame_count: u64,
    bgr: Mat,
    rgb: Mat,
}

impl OpencvFileSource {
    pub(crate) fn new(config: FileConfig) -> Result<Self> {
        let capture = videoio::VideoCapture::from_file(&config.path, videoio::CAP_ANY)
            .with_context(|| format!("failed to open video '{}' with opencv", config.path))?;
        if !capture.is_opened()? {
            return Err(anyhow!("could not open video: {}", config.path));
        }
        log::info!("FileSource: opened {} (opencv)", config.path);
        Ok(Self {
            config,
            capture,
            frame_count: 0,
            bgr: Mat::default(),
            rgb: Mat::default(),
        })
    }

    pub(crate) fn next_frame(&mut self) -> Result<Option<Frame>> {
        let read = self.capture.read(&mut self.bgr);
        let empty = self.bgr.empty();
        if !frame_was_read(&self.config.path, self.frame_count, read, empty) {
            return Ok(None);
        }
        imgproc::cvt_color(
            &self.bgr,
            &mut self.rgb,
            imgproc::COLOR_BGR2RGB,
            0,
            core::AlgorithmHint::ALGO_HINT_DEFAULT,
        )
        .context("convert frame to RGB")?;
        let width = self.rgb.cols() as u32;
        let height = self.rgb.rows() as u32;
        let pixels = self.rgb.data_bytes()?.to_vec();
        self.frame_count += 1;
        Ok(Some(Frame::from_rgb(pixels, width, height, self.frame_count)?))
    }

    pub(crate) fn stats(&self) -> FileStats {
        FileStats {
            frames_captured: self.frame_count,
            path: self.config.path.clone(),
        }
    }
}

/// A failed read ends the stream like exhaustion does.
fn frame_was_read(path: &str, frames: u64, read: opencv::Result<bool>, empty: bool) -> bool {
    match read {
        Ok(true) => !empty,
        Ok(false) => false,
        Err(e) => {
            log::warn!(
                "FileSource: read failed on {} after {} frames, treating as end of video: {}",
                path,
                frames,
                e
            );
            false
        }
    }
}

impl Drop for OpencvFileSource {
    fn drop(&mut self) {
        if let Err(e) = self.capture.release() {
            log::warn!("failed to release video {}: {}", self.config.path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_error_is_end_of_stream() {
        let err = opencv::Error::new(core::StsError, "decode failed");
        assert!(!frame_was_read("gato.mp4", 12, Err(err), true));
        assert!(!frame_was_read("gato.mp4", 12, Ok(false), true));
        assert!(!frame_was_read("gato.mp4", 12, Ok(true), true));
        assert!(frame_was_read("gato.mp4", 12, Ok(true), false));
    }
}
