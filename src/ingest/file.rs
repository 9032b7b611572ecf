//! Local file frame source.
//!
//! `FileSource` reads frames from a local video file (no network access) and
//! decodes them in memory. `stub://` paths produce a short synthetic clip
//! instead, so the whole pipeline runs without codecs or assets.

use std::path::Path;

use anyhow::{anyhow, Result};
use image::{Rgb, RgbImage};

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
#[cfg(feature = "ingest-file-opencv")]
use super::file_opencv::OpencvFileSource;
use super::VideoSource;
use crate::frame::Frame;

/// Configuration for a local file source.
#[derive(Clone, Debug)]
pub struct FileConfig {
    /// Local file path (e.g., "gato.mp4"), or `stub://<name>`.
    pub path: String,
    /// Number of frames a `stub://` source yields before ending.
    pub synthetic_frames: u64,
    pub synthetic_width: u32,
    pub synthetic_height: u32,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            synthetic_frames: 90,
            synthetic_width: 640,
            synthetic_height: 480,
        }
    }
}

impl FileConfig {
    pub fn for_path(path: &str) -> Self {
        Self {
            path: path.to_string(),
            ..Self::default()
        }
    }
}

/// Local file frame source.
pub struct FileSource {
    backend: FileBackend,
}

enum FileBackend {
    Synthetic(SyntheticFileSource),
    #[cfg(feature = "ingest-file-opencv")]
    Opencv(OpencvFileSource),
    #[cfg(all(feature = "ingest-file-ffmpeg", not(feature = "ingest-file-opencv")))]
    Ffmpeg(FfmpegFileSource),
}

impl FileSource {
    /// Open the source. Fails when the file is absent or cannot be decoded.
    pub fn open(config: FileConfig) -> Result<Self> {
        if !is_local_file_path(&config.path) {
            return Err(anyhow!(
                "file ingestion only supports local paths (no URL schemes)"
            ));
        }
        if config.path.starts_with("stub://") {
            let source = SyntheticFileSource::new(config);
            log::info!("FileSource: opened {} (synthetic)", source.config.path);
            return Ok(Self {
                backend: FileBackend::Synthetic(source),
            });
        }
        if !Path::new(&config.path).exists() {
            return Err(anyhow!("video file not found: {}", config.path));
        }
        Self::open_decoder(config)
    }

    #[cfg(feature = "ingest-file-opencv")]
    fn open_decoder(config: FileConfig) -> Result<Self> {
        Ok(Self {
            backend: FileBackend::Opencv(OpencvFileSource::new(config)?),
        })
    }

    #[cfg(all(feature = "ingest-file-ffmpeg", not(feature = "ingest-file-opencv")))]
    fn open_decoder(config: FileConfig) -> Result<Self> {
        Ok(Self {
            backend: FileBackend::Ffmpeg(FfmpegFileSource::new(config)?),
        })
    }

    #[cfg(not(any(feature = "ingest-file-opencv", feature = "ingest-file-ffmpeg")))]
    fn open_decoder(config: FileConfig) -> Result<Self> {
        Err(anyhow!(
            "cannot decode {}: build with ingest-file-opencv or ingest-file-ffmpeg",
            config.path
        ))
    }
}

impl VideoSource for FileSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "ingest-file-opencv")]
            FileBackend::Opencv(source) => source.next_frame(),
            #[cfg(all(feature = "ingest-file-ffmpeg", not(feature = "ingest-file-opencv")))]
            FileBackend::Ffmpeg(source) => source.next_frame(),
        }
    }

    fn stats(&self) -> FileStats {
        match &self.backend {
            FileBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "ingest-file-opencv")]
            FileBackend::Opencv(source) => source.stats(),
            #[cfg(all(feature = "ingest-file-ffmpeg", not(feature = "ingest-file-opencv")))]
            FileBackend::Ffmpeg(source) => source.stats(),
        }
    }
}

/// Statistics for a file source.
#[derive(Clone, Debug)]
pub struct FileStats {
    pub frames_captured: u64,
    pub path: String,
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests
// ----------------------------------------------------------------------------

/// Light background with a dark square sliding left to right.
struct SyntheticFileSource {
    config: FileConfig,
    frame_count: u64,
}

const SYNTHETIC_OBJECT_SIZE: u32 = 60;
const SYNTHETIC_STEP: u32 = 8;

impl SyntheticFileSource {
    fn new(config: FileConfig) -> Self {
        Self {
            config,
            frame_count: 0,
        }
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.frame_count >= self.config.synthetic_frames {
            return Ok(None);
        }
        self.frame_count += 1;
        let image = self.render(self.frame_count);
        Ok(Some(Frame::from_image(image, self.frame_count)))
    }

    fn render(&self, index: u64) -> RgbImage {
        let width = self.config.synthetic_width;
        let height = self.config.synthetic_height;
        let mut image = RgbImage::from_pixel(width, height, Rgb([225, 220, 210]));
        let span = width.saturating_sub(SYNTHETIC_OBJECT_SIZE).max(1) as u64;
        let left = ((index * SYNTHETIC_STEP as u64) % span) as u32;
        let top = (height / 2).saturating_sub(SYNTHETIC_OBJECT_SIZE / 2);
        for y in top..(top + SYNTHETIC_OBJECT_SIZE).min(height) {
            for x in left..(left + SYNTHETIC_OBJECT_SIZE).min(width) {
                image.put_pixel(x, y, Rgb([30, 30, 35]));
            }
        }
        image
    }

    fn stats(&self) -> FileStats {
        FileStats {
            frames_captured: self.frame_count,
            path: self.config.path.clone(),
        }
    }
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with("stub://") {
        return true;
    }
    !path.contains("://")
}
