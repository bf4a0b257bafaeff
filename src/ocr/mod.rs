pub mod cache;
pub mod engine;
pub mod extract;
pub mod preprocess;
pub mod setup;

pub use cache::{fingerprint, RecognitionCache};
pub use engine::{RecognizeOptions, TesseractEngine, TextRecognizer};
pub use preprocess::normalize_for_ocr;

use anyhow::Result;
use image::RgbaImage;

/// High-level function: screen crop → text.
///
/// Normalizes the crop, then answers from the cache or the recognizer.
pub fn recognize(
    recognizer: &dyn TextRecognizer,
    cache: &mut RecognitionCache,
    crop: &RgbaImage,
    options: &RecognizeOptions,
) -> Result<String> {
    let normalized = normalize_for_ocr(crop);
    cache.recognize(recognizer, &normalized, options)
}
