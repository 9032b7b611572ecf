use anyhow::Result;

use crate::detect::result::RawDetection;
use crate::frame::Frame;

/// Detector backend trait.
///
/// A backend owns a loaded model and turns one frame into the model's raw
/// per-candidate output. Box geometry stays normalized to the frame size;
/// confidence filtering and suppression belong to the post-processor.
pub trait DetectorBackend {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run the model on a frame.
    ///
    /// The frame is borrowed for the duration of the call only.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>>;

    /// Optional warm-up hook, called once before the first frame.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<B: DetectorBackend + ?Sized> DetectorBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>> {
        (**self).detect(frame)
    }

    fn warm_up(&mut self) -> Result<()> {
        (**self).warm_up()
    }
}
