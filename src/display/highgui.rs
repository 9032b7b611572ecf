use anyhow::{Context, Result};
use opencv::{
    core::{self, Mat, Point, Scalar},
    highgui, imgproc,
    prelude::*,
};

use super::{DisplayControl, DisplaySink, FrameView, ANNOTATED_WINDOW, GRAY_WINDOW, THRESHOLD_WINDOW};
use crate::overlay::Label;

/// Three OpenCV windows: annotated frame, grayscale and threshold mask.
pub struct HighguiDisplay {
    wait_ms: i32,
    quit_key: char,
}

impl HighguiDisplay {
    pub fn new(wait_ms: i32, quit_key: char) -> Result<Self> {
        for name in [ANNOTATED_WINDOW, GRAY_WINDOW, THRESHOLD_WINDOW] {
            highgui::named_window(name, highgui::WINDOW_AUTOSIZE)
                .with_context(|| format!("failed to open window '{}'", name))?;
        }
        Ok(Self { wait_ms, quit_key })
    }
}

fn bytes_to_mat(bytes: &[u8], channels: i32, rows: u32) -> Result<Mat> {
    let flat = Mat::from_slice(bytes)?;
    Ok(flat.reshape(channels, rows as i32)?.try_clone()?)
}

/// Labels use RGB colors; `Scalar` here is BGR.
fn bgr(color: [u8; 3]) -> Scalar {
    Scalar::new(color[2] as f64, color[1] as f64, color[0] as f64, 0.0)
}

fn put_label(frame: &mut Mat, label: &Label) -> Result<()> {
    imgproc::put_text(
        frame,
        &label.text,
        Point::new(label.origin.0, label.origin.1),
        imgproc::FONT_HERSHEY_SIMPLEX,
        label.scale,
        bgr(label.color),
        2,
        imgproc::LINE_8,
        false,
    )?;
    Ok(())
}

impl DisplaySink for HighguiDisplay {
    fn show(&mut self, view: &FrameView<'_>) -> Result<DisplayControl> {
        let rgb = bytes_to_mat(view.annotated.as_raw(), 3, view.annotated.height())?;
        let mut frame = Mat::default();
        imgproc::cvt_color(
            &rgb,
            &mut frame,
            imgproc::COLOR_RGB2BGR,
            0,
            core::AlgorithmHint::ALGO_HINT_DEFAULT,
        )?;
        for label in view.overlay.labels() {
            put_label(&mut frame, label)?;
        }

        let gray = bytes_to_mat(view.gray.as_raw(), 1, view.gray.height())?;
        let mask = bytes_to_mat(view.mask.as_raw(), 1, view.mask.height())?;
        highgui::imshow(ANNOTATED_WINDOW, &frame)?;
        highgui::imshow(GRAY_WINDOW, &gray)?;
        highgui::imshow(THRESHOLD_WINDOW, &mask)?;

        let key = highgui::wait_key(self.wait_ms)?;
        if key >= 0 && (key & 0xFF) as u8 as char == self.quit_key {
            return Ok(DisplayControl::Quit);
        }
        Ok(DisplayControl::Continue)
    }
}

impl Drop for HighguiDisplay {
    fn drop(&mut self) {
        if let Err(e) = highgui::destroy_all_windows() {
            log::warn!("failed to close display windows: {}", e);
        }
    }
}
