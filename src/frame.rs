//! Frame container.
//!
//! - `Frame`: one decoded RGB image plus its position in the stream.
//! - `GrayImage`: single-channel images produced by the occupancy path.
//!
//! A `Frame` is owned by the monitor loop for exactly one iteration. Analysis
//! components borrow it immutably; only the overlay step mutates pixels.

use anyhow::{anyhow, Result};
use image::RgbImage;

pub use image::GrayImage;

pub struct Frame {
    image: RgbImage,
    /// 1-based position in the source stream.
    pub index: u64,
}

impl Frame {
    /// Wrap packed RGB24 bytes. Fails when the byte count does not match the size.
    pub fn from_rgb(pixels: Vec<u8>, width: u32, height: u32, index: u64) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                pixels.len()
            ));
        }
        let image = RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| anyhow!("RGB buffer rejected for {}x{}", width, height))?;
        Ok(Self { image, index })
    }

    pub fn from_image(image: RgbImage, index: u64) -> Self {
        Self { image, index }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Mutable pixels for overlay rendering.
    pub fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never dump pixel data.
        f.debug_struct("Frame")
            .field("index", &self.index)
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_length() {
        assert!(Frame::from_rgb(vec![0u8; 10], 2, 2, 1).is_err());
    }

    #[test]
    fn wraps_rgb_bytes() -> Result<()> {
        let frame = Frame::from_rgb(vec![7u8; 4 * 3 * 3], 4, 3, 5)?;
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.height(), 3);
        assert_eq!(frame.index, 5);
        assert_eq!(frame.image().get_pixel(3, 2).0, [7, 7, 7]);
        Ok(())
    }

    #[test]
    fn debug_omits_pixels() -> Result<()> {
        let frame = Frame::from_rgb(vec![0u8; 12], 2, 2, 1)?;
        let text = format!("{:?}", frame);
        assert!(text.contains("width: 2"));
        assert!(!text.contains("image"));
        Ok(())
    }
}
