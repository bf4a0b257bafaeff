use image::{GrayImage, RgbaImage};
use imageproc::contrast::{equalize_histogram, otsu_level, threshold, ThresholdType};
use imageproc::filter::gaussian_blur_f32;

/// Sigma of the light blur applied before thresholding.
const BLUR_SIGMA: f32 = 0.6;

/// Converts a screen crop into a binary image with dark text on a light
/// background.
///
/// Steps: grayscale, histogram equalization, light blur, Otsu threshold, then
/// inversion when the background came out dark.
pub fn normalize_for_ocr(img: &RgbaImage) -> GrayImage {
    let gray = image::imageops::grayscale(img);
    if gray.width() == 0 || gray.height() == 0 {
        return gray;
    }
    let equalized = equalize_histogram(&gray);
    let blurred = gaussian_blur_f32(&equalized, BLUR_SIGMA);
    let level = otsu_level(&blurred);
    let mut binary = threshold(&blurred, level, ThresholdType::Binary);
    fix_polarity(&mut binary);
    binary
}

/// Inverts a binary image whose majority (background) is black.
fn fix_polarity(img: &mut GrayImage) {
    let dark = img.pixels().filter(|p| p[0] == 0).count();
    let total = (img.width() * img.height()) as usize;
    if dark * 2 > total {
        image::imageops::invert(img);
    }
}
