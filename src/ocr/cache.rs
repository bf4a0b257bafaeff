//! Per-grid memo table from image fingerprint to recognized value.
//!
//! UI panels repeat: the same weapon name or the same "Activated" button is
//! recognized many times in one grid walk. Only the first recognition of a
//! given pixel content calls the engine.

use anyhow::Result;
use image::{GrayImage, RgbaImage};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use super::engine::{RecognizeOptions, TextRecognizer};

/// Hash of a normalized image's raw bytes, its dimensions and the options it
/// is recognized with.
pub fn fingerprint(image: &GrayImage, options: &RecognizeOptions) -> u64 {
    let mut hasher = DefaultHasher::new();
    image.dimensions().hash(&mut hasher);
    image.as_raw().hash(&mut hasher);
    options.hash(&mut hasher);
    hasher.finish()
}

/// Hash of a color crop, tagged so it never collides with a text key.
pub fn fingerprint_color(image: &RgbaImage, tag: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    tag.hash(&mut hasher);
    image.dimensions().hash(&mut hasher);
    image.as_raw().hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Text(String),
    Tier(u8),
}

#[derive(Debug, Default)]
pub struct RecognitionCache {
    entries: HashMap<u64, CachedValue>,
    hits: u64,
    misses: u64,
}

impl RecognitionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached text for `image`, calling `recognizer` on a miss.
    pub fn recognize(
        &mut self,
        recognizer: &dyn TextRecognizer,
        image: &GrayImage,
        options: &RecognizeOptions,
    ) -> Result<String> {
        let key = fingerprint(image, options);
        if let Some(CachedValue::Text(text)) = self.entries.get(&key) {
            self.hits += 1;
            return Ok(text.clone());
        }

        self.misses += 1;
        let text = recognizer.recognize_text(image, options)?;
        self.entries.insert(key, CachedValue::Text(text.clone()));
        Ok(text)
    }

    /// Returns the cached tier for a color crop, computing it on a miss.
    pub fn tier(&mut self, image: &RgbaImage, tag: &str, classify: impl FnOnce(&RgbaImage) -> u8) -> u8 {
        let key = fingerprint_color(image, tag);
        if let Some(CachedValue::Tier(tier)) = self.entries.get(&key) {
            self.hits += 1;
            return *tier;
        }

        self.misses += 1;
        let tier = classify(image);
        self.entries.insert(key, CachedValue::Tier(tier));
        tier
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
