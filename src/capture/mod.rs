//! Game window discovery and screen capture.
//!
//! This module provides:
//! - The `WindowService` and `ScreenCapture` seams used by the scan engine
//! - Win32 implementations (`Win32Desktop`, `WindowCapture`) on Windows
//! - Pixel helpers shared by capture and the scanners

#[cfg(windows)]
pub mod screenshot;
#[cfg(windows)]
pub mod window;

#[cfg(windows)]
pub use screenshot::WindowCapture;
#[cfg(windows)]
pub use window::Win32Desktop;

use anyhow::Result;
use image::{Rgba, RgbaImage};

use crate::calibration::Rect;

/// A located game window. The handle is stored as an integer so the value can
/// be moved into worker threads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameWindow {
    pub handle: isize,
    pub pid: u32,
}

/// OS-level window, foreground and privilege queries.
pub trait WindowService: Send + Sync {
    /// Finds a visible window whose process executable matches `process`
    /// (case-insensitive) and whose title matches `title`.
    fn find_window(&self, title: &str, process: &str) -> Result<Option<GameWindow>>;

    fn bring_to_foreground(&self, window: &GameWindow) -> Result<()>;

    /// Client area size in physical pixels.
    fn client_size(&self, window: &GameWindow) -> Result<(u32, u32)>;

    /// Ratio of the window's DPI to 96.
    fn dpi_scale(&self, window: &GameWindow) -> f32;

    fn is_foreground(&self, window: &GameWindow) -> bool;

    /// True while the virtual key `vk` is held down.
    fn is_key_held(&self, vk: u16) -> bool;

    fn is_elevated(&self) -> bool;
}

/// Screenshot primitive. Regions are in client pixels.
pub trait ScreenCapture {
    fn screenshot(&mut self, region: Rect) -> Result<RgbaImage>;
}

/// Crops `rect` out of `image`, clamped to the image bounds.
pub fn crop(image: &RgbaImage, rect: Rect) -> RgbaImage {
    let x = rect.x.max(0) as u32;
    let y = rect.y.max(0) as u32;
    let x = x.min(image.width());
    let y = y.min(image.height());
    let w = (rect.w.max(0) as u32).min(image.width() - x);
    let h = (rect.h.max(0) as u32).min(image.height() - y);
    image::imageops::crop_imm(image, x, y, w, h).to_image()
}

/// Copies a region of a BGRA frame into a new RGBA image.
///
/// `origin` is the region's top-left corner inside the frame. Pixels that fall
/// outside the frame are left transparent black.
pub fn bgra_region_to_rgba(
    src: &[u8],
    row_pitch: usize,
    frame_size: (u32, u32),
    origin: (u32, u32),
    size: (u32, u32),
) -> RgbaImage {
    let mut img = RgbaImage::new(size.0, size.1);
    for y in 0..size.1 {
        let src_y = (origin.1 + y) as usize;
        if src_y >= frame_size.1 as usize {
            break;
        }
        for x in 0..size.0 {
            let src_x = (origin.0 + x) as usize;
            if src_x >= frame_size.0 as usize {
                break;
            }
            let offset = src_y * row_pitch + src_x * 4;
            if offset + 3 >= src.len() {
                break;
            }
            // BGRA -> RGBA
            let b = src[offset];
            let g = src[offset + 1];
            let r = src[offset + 2];
            let a = src[offset + 3];
            img.put_pixel(x, y, Rgba([r, g, b, a]));
        }
    }
    img
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_clamps_to_bounds() {
        let img = RgbaImage::from_pixel(100, 50, Rgba([1, 2, 3, 255]));
        let cropped = crop(&img, Rect::new(90, 40, 30, 30));
        assert_eq!(cropped.dimensions(), (10, 10));

        let outside = crop(&img, Rect::new(200, 200, 10, 10));
        assert_eq!(outside.dimensions(), (0, 0));
    }

    #[test]
    fn test_bgra_region_swaps_channels() {
        // 2x2 frame with row pitch padded to 12 bytes
        let mut src = vec![0u8; 24];
        // pixel (1, 1): B=10 G=20 R=30 A=255
        src[12 + 4..12 + 8].copy_from_slice(&[10, 20, 30, 255]);
        let img = bgra_region_to_rgba(&src, 12, (2, 2), (1, 1), (1, 1));
        assert_eq!(img.get_pixel(0, 0), &Rgba([30, 20, 10, 255]));
    }

    #[test]
    fn test_bgra_region_outside_frame_is_blank() {
        let src = vec![255u8; 16];
        let img = bgra_region_to_rgba(&src, 8, (2, 2), (1, 1), (3, 3));
        assert_eq!(img.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(img.get_pixel(2, 2), &Rgba([0, 0, 0, 0]));
    }
}
