//! Surface occupancy from foreground pixel density.
//!
//! The frame is reduced to luma, binarized with an inverted Gaussian adaptive
//! threshold (darker-than-surroundings pixels become foreground) and cleaned
//! with a 5x5 median filter. Occupancy is then a plain count of foreground
//! pixels inside the monitored region compared against a fixed limit.

use image::{GrayImage, Luma};
use imageproc::filter::median_filter;

use crate::frame::Frame;
use crate::geometry::Rect;
use crate::overlay::{BoxAnnotation, Label, Overlay, GREEN, RED};

pub const DEFAULT_OCCUPANCY_THRESHOLD: u32 = 1500;

/// Side of the square neighborhood used for the local mean.
pub const ADAPTIVE_BLOCK_SIZE: usize = 25;
/// Offset subtracted from the local mean.
pub const ADAPTIVE_OFFSET: i32 = 16;
/// Median filter radius (5x5 window).
pub const MEDIAN_RADIUS: u32 = 2;

const FOREGROUND: u8 = 255;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OccupancyState {
    Occupied,
    Empty,
}

impl OccupancyState {
    pub fn label(&self) -> &'static str {
        match self {
            OccupancyState::Occupied => "Surface occupied",
            OccupancyState::Empty => "Surface empty",
        }
    }
}

/// Result of classifying one mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OccupancyReport {
    pub state: OccupancyState,
    pub foreground_pixels: u64,
}

pub struct OccupancyEstimator {
    region: Rect,
    threshold: u32,
    kernel: Vec<f32>,
}

impl OccupancyEstimator {
    pub fn new(region: Rect, threshold: u32) -> Self {
        Self {
            region,
            threshold,
            kernel: gaussian_kernel(ADAPTIVE_BLOCK_SIZE),
        }
    }

    pub fn region(&self) -> Rect {
        self.region
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Grayscale and cleaned binary mask for a frame. Both are kept for display.
    pub fn compute_mask(&self, frame: &Frame) -> (GrayImage, GrayImage) {
        let gray = to_luma(frame);
        let raw = adaptive_threshold_inv(&gray, &self.kernel, ADAPTIVE_OFFSET);
        let mask = median_filter(&raw, MEDIAN_RADIUS, MEDIAN_RADIUS);
        (gray, mask)
    }

    pub fn classify(&self, mask: &GrayImage) -> OccupancyReport {
        let foreground_pixels = self.foreground_in_region(mask);
        let state = if foreground_pixels > self.threshold as u64 {
            OccupancyState::Occupied
        } else {
            OccupancyState::Empty
        };
        OccupancyReport {
            state,
            foreground_pixels,
        }
    }

    /// Region outline, red when occupied and green when empty.
    pub fn overlay(&self, report: &OccupancyReport) -> Overlay {
        let color = match report.state {
            OccupancyState::Occupied => RED,
            OccupancyState::Empty => GREEN,
        };
        let mut overlay = Overlay::new();
        overlay.boxes.push(BoxAnnotation {
            rect: self.region,
            color,
            label: Some(Label {
                text: report.state.label().to_string(),
                origin: (self.region.x, self.region.y - 10),
                scale: 0.5,
                color,
            }),
        });
        overlay
    }

    /// Nonzero pixels inside the region, after clipping it to the mask.
    pub fn foreground_in_region(&self, mask: &GrayImage) -> u64 {
        let Some(crop) = self.region.clamp_to(mask.width(), mask.height()) else {
            return 0;
        };
        let mut count = 0u64;
        for y in crop.y..crop.bottom() {
            for x in crop.x..crop.right() {
                if mask.get_pixel(x as u32, y as u32).0[0] != 0 {
                    count += 1;
                }
            }
        }
        count
    }
}

/// BT.601 luma in 14-bit fixed point with rounding.
pub fn to_luma(frame: &Frame) -> GrayImage {
    const R: u32 = 4899;
    const G: u32 = 9617;
    const B: u32 = 1868;
    const SHIFT: u32 = 14;
    let rgb = frame.image();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let v = (r as u32 * R + g as u32 * G + b as u32 * B + (1 << (SHIFT - 1))) >> SHIFT;
        Luma([v as u8])
    })
}

/// Normalized 1-D Gaussian taps with sigma derived from the window size.
pub(crate) fn gaussian_kernel(size: usize) -> Vec<f32> {
    let sigma = 0.3 * ((size as f64 - 1.0) * 0.5 - 1.0) + 0.8;
    let center = (size as f64 - 1.0) / 2.0;
    let scale = -0.5 / (sigma * sigma);
    let raw: Vec<f64> = (0..size)
        .map(|i| {
            let d = i as f64 - center;
            (scale * d * d).exp()
        })
        .collect();
    let sum: f64 = raw.iter().sum();
    raw.into_iter().map(|v| (v / sum) as f32).collect()
}

/// Local Gaussian mean with replicated borders, rounded to 8 bits.
fn gaussian_mean(gray: &GrayImage, kernel: &[f32]) -> Vec<u8> {
    let w = gray.width() as usize;
    let h = gray.height() as usize;
    let radius = (kernel.len() / 2) as isize;
    let src = gray.as_raw();

    let mut horizontal = vec![0f32; w * h];
    for y in 0..h {
        let row = &src[y * w..(y + 1) * w];
        for x in 0..w {
            let mut acc = 0f32;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = (x as isize + k as isize - radius).clamp(0, w as isize - 1) as usize;
                acc += row[sx] as f32 * weight;
            }
            horizontal[y * w + x] = acc;
        }
    }

    let mut mean = vec![0u8; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0f32;
            for (k, weight) in kernel.iter().enumerate() {
                let sy = (y as isize + k as isize - radius).clamp(0, h as isize - 1) as usize;
                acc += horizontal[sy * w + x] * weight;
            }
            mean[y * w + x] = acc.round().clamp(0.0, 255.0) as u8;
        }
    }
    mean
}

/// Foreground where `src <= local_mean - offset`.
fn adaptive_threshold_inv(gray: &GrayImage, kernel: &[f32], offset: i32) -> GrayImage {
    if gray.width() == 0 || gray.height() == 0 {
        return GrayImage::new(gray.width(), gray.height());
    }
    let mean = gaussian_mean(gray, kernel);
    let pixels: Vec<u8> = gray
        .as_raw()
        .iter()
        .zip(mean.iter())
        .map(|(&src, &m)| {
            if src as i32 - m as i32 <= -offset {
                FOREGROUND
            } else {
                0
            }
        })
        .collect();
    GrayImage::from_raw(gray.width(), gray.height(), pixels)
        .unwrap_or_else(|| GrayImage::new(gray.width(), gray.height()))
}
