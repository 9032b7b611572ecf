//! Display sinks for processed frames.
//!
//! The monitor hands every processed frame to a sink together with its
//! overlay. Sinks are observational; the only thing flowing back is whether
//! the user asked to stop.

#[cfg(feature = "display-highgui")]
mod highgui;

use anyhow::Result;
use image::{GrayImage, RgbImage};

use crate::overlay::Overlay;

#[cfg(feature = "display-highgui")]
pub use highgui::HighguiDisplay;

pub const ANNOTATED_WINDOW: &str = "Detections";
pub const GRAY_WINDOW: &str = "Grayscale";
pub const THRESHOLD_WINDOW: &str = "Threshold";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayControl {
    Continue,
    Quit,
}

/// Everything a sink may show for one frame.
pub struct FrameView<'a> {
    /// Frame with box outlines already drawn.
    pub annotated: &'a RgbImage,
    pub gray: &'a GrayImage,
    pub mask: &'a GrayImage,
    /// Source of the outlines, and the text labels still to draw.
    pub overlay: &'a Overlay,
}

pub trait DisplaySink {
    fn show(&mut self, view: &FrameView<'_>) -> Result<DisplayControl>;
}

impl<D: DisplaySink + ?Sized> DisplaySink for Box<D> {
    fn show(&mut self, view: &FrameView<'_>) -> Result<DisplayControl> {
        (**self).show(view)
    }
}

/// Sink for runs without a screen.
#[derive(Default)]
pub struct HeadlessDisplay {
    frames_shown: u64,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }
}

impl DisplaySink for HeadlessDisplay {
    fn show(&mut self, view: &FrameView<'_>) -> Result<DisplayControl> {
        self.frames_shown += 1;
        for label in view.overlay.banners.iter() {
            log::trace!("frame {} banner: {}", self.frames_shown, label.text);
        }
        Ok(DisplayControl::Continue)
    }
}

/// Pick the on-screen sink when it is compiled in and requested.
pub fn open_display(enabled: bool, wait_ms: i32, quit_key: char) -> Result<Box<dyn DisplaySink>> {
    if !enabled {
        return Ok(Box::new(HeadlessDisplay::new()));
    }
    #[cfg(feature = "display-highgui")]
    {
        match HighguiDisplay::new(wait_ms, quit_key) {
            Ok(display) => return Ok(Box::new(display)),
            Err(e) => log::warn!("failed to open display windows: {}. Running headless.", e),
        }
    }
    #[cfg(not(feature = "display-highgui"))]
    {
        let _ = (wait_ms, quit_key);
        log::warn!("built without display-highgui; running headless");
    }
    Ok(Box::new(HeadlessDisplay::new()))
}
