//! Coordinate primitives and scaling math.
//!
//! Reference rectangles are authored against a fixed reference resolution and
//! may carry fractional values. They are resolved to integer live pixels by
//! scaling each axis independently and truncating toward zero.

use serde::{Deserialize, Serialize};

/// A rectangle in reference-resolution pixels.
///
/// Points are stored as rectangles with zero width and height.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RefRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl RefRect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub const fn point(x: f32, y: f32) -> Self {
        Self { x, y, w: 0.0, h: 0.0 }
    }

    /// Returns true if the rectangle lies entirely inside a `width`×`height` area.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.x + self.w <= width as f32
            && self.y + self.h <= height as f32
    }
}

/// A rectangle in live (window client) pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Top-left corner. For point entries this is the point itself.
    pub fn origin(&self) -> Point {
        Point { x: self.x, y: self.y }
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.w / 2,
            y: self.y + self.h / 2,
        }
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.w >= 0
            && self.h >= 0
            && (self.x + self.w) as i64 <= width as i64
            && (self.y + self.h) as i64 <= height as i64
    }
}

/// A position in live pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Point {
        Point {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// Scales a single reference value from `reference` to `live` along one axis.
pub fn scale_value(value: f32, live: u32, reference: u32) -> f32 {
    value * live as f32 / reference as f32
}

/// Resolves a reference rectangle to live pixels, truncating toward zero.
pub fn scale_rect(rect: RefRect, live: (u32, u32), reference: (u32, u32)) -> Rect {
    Rect {
        x: scale_value(rect.x, live.0, reference.0) as i32,
        y: scale_value(rect.y, live.1, reference.1) as i32,
        w: scale_value(rect.w, live.0, reference.0) as i32,
        h: scale_value(rect.h, live.1, reference.1) as i32,
    }
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 { a } else { gcd(b, a % b) }
}

/// Reduces a resolution to its lowest-terms aspect ratio, e.g. 1680×1050 → 8:5.
pub fn reduce_ratio(width: u32, height: u32) -> (u32, u32) {
    let divisor = gcd(width, height).max(1);
    (width / divisor, height / divisor)
}

/// Relative difference between two aspect ratios, as a fraction of `known`.
pub fn ratio_deviation(live: (u32, u32), known: (u32, u32)) -> f32 {
    let live_ratio = live.0 as f32 / live.1 as f32;
    let known_ratio = known.0 as f32 / known.1 as f32;
    ((live_ratio - known_ratio) / known_ratio).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduce_ratio() {
        assert_eq!(reduce_ratio(1920, 1080), (16, 9));
        assert_eq!(reduce_ratio(1680, 1050), (8, 5));
        assert_eq!(reduce_ratio(2560, 1080), (64, 27));
    }

    #[test]
    fn test_scale_rect_truncates_toward_zero() {
        let rect = RefRect::new(81.5, 191.5, 151.0, 181.0);
        let scaled = scale_rect(rect, (1280, 720), (1920, 1080));
        // 81.5 * 2/3 = 54.33, 191.5 * 2/3 = 127.67
        assert_eq!(scaled, Rect::new(54, 127, 100, 120));
    }

    #[test]
    fn test_zero_fields_scale_to_zero() {
        let offset = RefRect::new(0.0, 255.0, 0.0, 0.0);
        let scaled = scale_rect(offset, (3840, 2160), (1920, 1080));
        assert_eq!(scaled.x, 0);
        assert_eq!(scaled.y, 510);
        assert_eq!(scaled.w, 0);
        assert_eq!(scaled.h, 0);
    }

    #[test]
    fn test_negative_values_truncate_toward_zero() {
        assert_eq!(scale_value(-31.25, 1280, 1920) as i32, -20);
    }

    #[test]
    fn test_ratio_deviation() {
        assert!(ratio_deviation((16, 9), (16, 9)) < f32::EPSILON);
        // 1366x768 is 683:384, about 0.1% off 16:9
        assert!(ratio_deviation(reduce_ratio(1366, 768), (16, 9)) < 0.03);
        assert!(ratio_deviation((8, 5), (16, 9)) > 0.03);
    }

    #[test]
    fn test_rect_fits_within() {
        assert!(Rect::new(0, 0, 1920, 1080).fits_within(1920, 1080));
        assert!(!Rect::new(1, 0, 1920, 1080).fits_within(1920, 1080));
        assert!(!Rect::new(-1, 0, 10, 10).fits_within(1920, 1080));
    }
}
