//! Pixel-space rectangles and normalized detector boxes.

use anyhow::{anyhow, Result};

/// Axis-aligned rectangle in integer pixel coordinates, top-left origin.
///
/// Used both for the monitored region and for detected boxes. Construct through
/// [`Rect::new`] when the input is untrusted; the checked constructor rejects
/// empty rectangles and edges past `i32::MAX`. Detector boxes are built
/// directly, so edge arithmetic saturates instead of overflowing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Result<Self> {
        if width <= 0 || height <= 0 {
            return Err(anyhow!(
                "rectangle must have positive size (got {}x{})",
                width,
                height
            ));
        }
        if x.checked_add(width).is_none() || y.checked_add(height).is_none() {
            return Err(anyhow!(
                "rectangle at ({}, {}) with size {}x{} extends past the coordinate range",
                x,
                y,
                width,
                height
            ));
        }
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// Parse `x,y,w,h` (whitespace around entries is ignored).
    pub fn parse(value: &str) -> Result<Self> {
        let parts: Vec<i32> = value
            .split(',')
            .map(|part| part.trim().parse::<i32>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| anyhow!("region must be four integers 'x,y,w,h', got '{}'", value))?;
        match parts.as_slice() {
            [x, y, w, h] => Self::new(*x, *y, *w, *h),
            _ => Err(anyhow!(
                "region must be four integers 'x,y,w,h', got '{}'",
                value
            )),
        }
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    /// Box center using integer division, as the overlay logic has always done.
    pub fn centroid(&self) -> (i32, i32) {
        (
            self.x.saturating_add(self.width / 2),
            self.y.saturating_add(self.height / 2),
        )
    }

    /// True when the point lies strictly inside all four bounds.
    ///
    /// A point on the border is outside.
    pub fn contains_strict(&self, (px, py): (i32, i32)) -> bool {
        self.x < px && px < self.right() && self.y < py && py < self.bottom()
    }

    pub fn intersection_area(&self, other: &Rect) -> i64 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());
        if x2 <= x1 || y2 <= y1 {
            return 0;
        }
        (x2 as i64 - x1 as i64) * (y2 as i64 - y1 as i64)
    }

    /// Intersection over union. Zero when either box is empty.
    pub fn iou(&self, other: &Rect) -> f32 {
        let inter = self.intersection_area(other);
        if inter == 0 {
            return 0.0;
        }
        let union = self.area() + other.area() - inter;
        if union <= 0 {
            return 0.0;
        }
        inter as f32 / union as f32
    }

    /// Clip to a `width` x `height` image. Returns `None` when nothing is left.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Rect> {
        let max_x = i32::try_from(width).unwrap_or(i32::MAX);
        let max_y = i32::try_from(height).unwrap_or(i32::MAX);
        let x1 = self.x.clamp(0, max_x);
        let y1 = self.y.clamp(0, max_y);
        let x2 = self.right().clamp(0, max_x);
        let y2 = self.bottom().clamp(0, max_y);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Rect {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        })
    }
}

/// Detector box in fractions of the frame size, center + size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizedBox {
    pub cx: f32,
    pub cy: f32,
    pub w: f32,
    pub h: f32,
}

impl NormalizedBox {
    /// Scale to pixels and convert to a top-left rectangle.
    ///
    /// Every step truncates toward zero: center and size are truncated after
    /// scaling, then the corner is truncated after subtracting half the size.
    /// The result may have zero size; callers that need a valid region must
    /// go through [`Rect::new`].
    pub fn denormalize(&self, frame_width: u32, frame_height: u32) -> Rect {
        let fw = frame_width as f32;
        let fh = frame_height as f32;
        let cx = (self.cx * fw) as i32;
        let cy = (self.cy * fh) as i32;
        let w = (self.w * fw) as i32;
        let h = (self.h * fh) as i32;
        Rect {
            x: (cx as f32 - w as f32 / 2.0) as i32,
            y: (cy as f32 - h as f32 / 2.0) as i32,
            width: w,
            height: h,
        }
    }

    pub fn from_rect(rect: &Rect, frame_width: u32, frame_height: u32) -> Self {
        let fw = frame_width as f32;
        let fh = frame_height as f32;
        Self {
            cx: (rect.x as f32 + rect.width as f32 / 2.0) / fw,
            cy: (rect.y as f32 + rect.height as f32 / 2.0) / fh,
            w: rect.width as f32 / fw,
            h: rect.height as f32 / fh,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_rect() {
        assert!(Rect::new(0, 0, 0, 10).is_err());
        assert!(Rect::new(0, 0, 10, -1).is_err());
        assert!(Rect::new(-5, -5, 1, 1).is_ok());
    }

    #[test]
    fn rejects_rect_past_coordinate_range() {
        assert!(Rect::new(i32::MAX - 50, 0, 100, 100).is_err());
        assert!(Rect::new(0, i32::MAX, 10, 1).is_err());
        assert!(Rect::parse("2147483600,0,100,100").is_err());
        assert!(Rect::new(i32::MAX - 100, 0, 100, 100).is_ok());
    }

    #[test]
    fn huge_unchecked_boxes_do_not_overflow() {
        let huge = Rect {
            x: i32::MAX - 10,
            y: i32::MIN,
            width: i32::MAX,
            height: i32::MAX,
        };
        assert_eq!(huge.right(), i32::MAX);
        assert_eq!(huge.centroid().0, i32::MAX);
        assert!(!huge.contains_strict((0, 0)));
        assert_eq!(huge.clamp_to(640, 480), None);

        let everything = Rect {
            x: i32::MIN,
            y: i32::MIN,
            width: i32::MAX,
            height: i32::MAX,
        };
        let wide = Rect {
            x: -10,
            y: -10,
            width: i32::MAX,
            height: i32::MAX,
        };
        assert!(everything.intersection_area(&wide) > 0);
        let iou = everything.iou(&wide);
        assert!((0.0..=1.0).contains(&iou));
    }

    #[test]
    fn parses_region_string() -> Result<()> {
        assert_eq!(Rect::parse(" 90, 180,250 ,180")?, Rect::new(90, 180, 250, 180)?);
        assert!(Rect::parse("1,2,3").is_err());
        assert!(Rect::parse("a,b,c,d").is_err());
        assert!(Rect::parse("1,2,0,4").is_err());
        Ok(())
    }

    #[test]
    fn containment_is_strict_on_all_bounds() -> Result<()> {
        let region = Rect::new(90, 180, 250, 180)?;
        assert!(region.contains_strict((150, 200)));
        assert!(!region.contains_strict((90, 200)));
        assert!(!region.contains_strict((340, 200)));
        assert!(!region.contains_strict((150, 180)));
        assert!(!region.contains_strict((150, 360)));
        assert!(region.contains_strict((339, 359)));
        Ok(())
    }

    #[test]
    fn centroid_uses_integer_division() -> Result<()> {
        assert_eq!(Rect::new(10, 20, 5, 7)?.centroid(), (12, 23));
        Ok(())
    }

    #[test]
    fn iou_matches_hand_computed_overlap() -> Result<()> {
        let a = Rect::new(100, 100, 90, 90)?;
        let b = Rect::new(130, 100, 90, 90)?;
        assert!((a.iou(&b) - 0.5).abs() < 1e-6);
        assert_eq!(a.iou(&Rect::new(500, 500, 10, 10)?), 0.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn clamps_to_image_bounds() -> Result<()> {
        let r = Rect::new(-10, 5, 30, 100)?;
        assert_eq!(r.clamp_to(50, 50), Some(Rect::new(0, 5, 20, 45)?));
        assert_eq!(Rect::new(60, 60, 5, 5)?.clamp_to(50, 50), None);
        assert_eq!(Rect::new(-20, 0, 10, 10)?.clamp_to(50, 50), None);
        Ok(())
    }

    #[test]
    fn denormalize_truncates_like_integer_cast() {
        let b = NormalizedBox {
            cx: 0.5,
            cy: 0.5,
            w: 0.25,
            h: 0.125,
        };
        assert_eq!(
            b.denormalize(512, 512),
            Rect {
                x: 192,
                y: 224,
                width: 128,
                height: 64
            }
        );

        // odd size: 255 / 2 = 127.5, corner 256 - 127.5 = 128.5 -> 128
        let odd = NormalizedBox {
            cx: 0.5,
            cy: 0.5,
            w: 255.0 / 512.0,
            h: 255.0 / 512.0,
        };
        assert_eq!(odd.denormalize(512, 512).x, 128);
    }

    #[test]
    fn normalize_then_denormalize_round_trips_within_a_pixel() -> Result<()> {
        for (w, h) in [(640u32, 480u32), (1920, 1080), (416, 416)] {
            for rect in [
                Rect::new(90, 180, 250, 180)?,
                Rect::new(0, 0, 17, 33)?,
                Rect::new(301, 77, 101, 99)?,
            ] {
                let back = NormalizedBox::from_rect(&rect, w, h).denormalize(w, h);
                assert!((back.x - rect.x).abs() <= 1, "{:?} vs {:?}", back, rect);
                assert!((back.y - rect.y).abs() <= 1, "{:?} vs {:?}", back, rect);
                assert!((back.width - rect.width).abs() <= 1);
                assert!((back.height - rect.height).abs() <= 1);
            }
        }
        Ok(())
    }
}
