//! On-frame annotations.
//!
//! Classification code produces an [`Overlay`] describing what to draw;
//! rendering happens separately so the analysis paths stay testable without a
//! drawing backend. [`draw_boxes`] paints rectangles into an `RgbImage`; text
//! labels are left to display sinks that have a font.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;

use crate::geometry::Rect;

pub const RED: [u8; 3] = [255, 0, 0];
pub const GREEN: [u8; 3] = [0, 255, 0];
pub const BLUE: [u8; 3] = [0, 0, 255];

pub const BOX_THICKNESS: u32 = 2;

#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    pub text: String,
    /// Baseline origin in pixels; may be negative near the top edge.
    pub origin: (i32, i32),
    pub scale: f64,
    pub color: [u8; 3],
}

#[derive(Clone, Debug, PartialEq)]
pub struct BoxAnnotation {
    pub rect: Rect,
    pub color: [u8; 3],
    pub label: Option<Label>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Overlay {
    pub boxes: Vec<BoxAnnotation>,
    pub banners: Vec<Label>,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, other: Overlay) {
        self.boxes.extend(other.boxes);
        self.banners.extend(other.banners);
    }

    /// Every text item, box labels first.
    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.boxes
            .iter()
            .filter_map(|b| b.label.as_ref())
            .chain(self.banners.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty() && self.banners.is_empty()
    }
}

/// Draw every box outline into `image`, `BOX_THICKNESS` pixels wide.
pub fn draw_boxes(image: &mut RgbImage, overlay: &Overlay) {
    for annotation in &overlay.boxes {
        let rect = annotation.rect;
        for inset in 0..BOX_THICKNESS as i32 {
            let w = rect.width - 2 * inset;
            let h = rect.height - 2 * inset;
            if w <= 0 || h <= 0 {
                break;
            }
            let r = imageproc::rect::Rect::at(rect.x + inset, rect.y + inset)
                .of_size(w as u32, h as u32);
            draw_hollow_rect_mut(image, r, Rgb(annotation.color));
        }
    }
}
