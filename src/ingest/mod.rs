//! Video frame sources.
//!
//! - `stub://` synthetic frames (tests and dry runs)
//! - Local video files through OpenCV `VideoCapture` (feature: ingest-file-opencv)
//! - Local video files through FFmpeg (feature: ingest-file-ffmpeg)
//!
//! Sources hand out one decoded RGB `Frame` per call. End of stream is
//! `Ok(None)`, not an error. Decoder handles are released when the source is
//! dropped, on every exit path.

pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;
#[cfg(feature = "ingest-file-opencv")]
pub(crate) mod file_opencv;

use anyhow::Result;

use crate::frame::Frame;

pub use file::{FileConfig, FileSource, FileStats};

/// Anything that yields frames until exhausted.
pub trait VideoSource {
    /// Next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    fn stats(&self) -> FileStats;
}
