//! Screen profiles: named ROI tables authored at a reference resolution and
//! resolved for the live window size.

use anyhow::{anyhow, bail, Result};
use std::collections::BTreeMap;

use super::builtin;
use super::coords::{
    ratio_deviation, reduce_ratio, scale_rect, scale_value, Axis, Point, Rect, RefRect,
};

/// Maximum relative aspect-ratio difference for a profile to count as a match.
pub const RATIO_TOLERANCE: f32 = 0.03;

/// Ratio used when the live window matches no known profile.
pub const FALLBACK_RATIO: (u32, u32) = (16, 9);

/// An ROI table at its reference resolution, validated at construction.
#[derive(Clone, Debug)]
pub struct ProfileTemplate {
    ratio: (u32, u32),
    reference: (u32, u32),
    rects: BTreeMap<String, RefRect>,
    offsets: BTreeMap<String, RefRect>,
    scalars: BTreeMap<String, f32>,
}

impl ProfileTemplate {
    pub fn ratio(&self) -> (u32, u32) {
        self.ratio
    }

    pub fn reference(&self) -> (u32, u32) {
        self.reference
    }
}

/// Builds a [`ProfileTemplate`] entry by entry.
///
/// `rects` are screen regions and click targets; they must lie inside the
/// reference resolution. `offsets` are pitches (row/column spacing) that scale
/// like rectangles but are not positions. `scalars` are per-profile constants
/// such as wheel deltas, used as-is.
pub struct ProfileBuilder {
    reference: (u32, u32),
    rects: BTreeMap<String, RefRect>,
    offsets: BTreeMap<String, RefRect>,
    scalars: BTreeMap<String, f32>,
}

impl ProfileBuilder {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            reference: (width, height),
            rects: BTreeMap::new(),
            offsets: BTreeMap::new(),
            scalars: BTreeMap::new(),
        }
    }

    pub fn rect(mut self, path: &str, x: f32, y: f32, w: f32, h: f32) -> Self {
        self.rects.insert(path.to_string(), RefRect::new(x, y, w, h));
        self
    }

    pub fn point(mut self, path: &str, x: f32, y: f32) -> Self {
        self.rects.insert(path.to_string(), RefRect::point(x, y));
        self
    }

    /// Adds `base[0]`, `base[1]`, ... for a list of points.
    pub fn points(mut self, base: &str, points: &[(f32, f32)]) -> Self {
        for (i, (x, y)) in points.iter().enumerate() {
            self.rects.insert(indexed(base, i), RefRect::point(*x, *y));
        }
        self
    }

    pub fn offset(mut self, path: &str, x: f32, y: f32) -> Self {
        self.offsets.insert(path.to_string(), RefRect::point(x, y));
        self
    }

    pub fn scalar(mut self, path: &str, value: f32) -> Self {
        self.scalars.insert(path.to_string(), value);
        self
    }

    /// Validates that every required path is present and every rectangle lies
    /// inside the reference resolution.
    pub fn build(self, required: &[&str]) -> Result<ProfileTemplate> {
        let (width, height) = self.reference;
        if width == 0 || height == 0 {
            bail!("Reference resolution must be non-zero, got {}x{}", width, height);
        }

        for path in required {
            let present = self.rects.contains_key(*path)
                || self.offsets.contains_key(*path)
                || self.scalars.contains_key(*path);
            if !present {
                bail!("Profile {}x{} is missing ROI '{}'", width, height, path);
            }
        }

        for (path, rect) in &self.rects {
            if !rect.fits_within(width, height) {
                bail!(
                    "ROI '{}' ({}, {}, {}, {}) lies outside the {}x{} reference",
                    path, rect.x, rect.y, rect.w, rect.h, width, height
                );
            }
        }

        Ok(ProfileTemplate {
            ratio: reduce_ratio(width, height),
            reference: self.reference,
            rects: self.rects,
            offsets: self.offsets,
            scalars: self.scalars,
        })
    }
}

/// Formats an indexed ROI path, e.g. `characters.skillPositions[2]`.
pub fn indexed(base: &str, index: usize) -> String {
    format!("{}[{}]", base, index)
}

/// The active coordinate catalog for one scan session, in live pixels.
#[derive(Clone, Debug)]
pub struct ScreenProfile {
    ratio: (u32, u32),
    reference: (u32, u32),
    live: (u32, u32),
    rects: BTreeMap<String, Rect>,
    offsets: BTreeMap<String, (f32, f32)>,
    scalars: BTreeMap<String, f32>,
}

impl ScreenProfile {
    fn from_template(template: &ProfileTemplate, live: (u32, u32)) -> Self {
        let rects = template
            .rects
            .iter()
            .map(|(path, r)| (path.clone(), scale_rect(*r, live, template.reference)))
            .collect();
        let offsets = template
            .offsets
            .iter()
            .map(|(path, r)| {
                (
                    path.clone(),
                    (
                        scale_value(r.x, live.0, template.reference.0),
                        scale_value(r.y, live.1, template.reference.1),
                    ),
                )
            })
            .collect();

        Self {
            ratio: template.ratio,
            reference: template.reference,
            live,
            rects,
            offsets,
            scalars: template.scalars.clone(),
        }
    }

    /// Live-pixel rectangle for `path`.
    ///
    /// Panics if the path is unknown: ROI names are fixed at compile time and
    /// validated when the profile is built.
    pub fn rect(&self, path: &str) -> Rect {
        match self.rects.get(path) {
            Some(rect) => *rect,
            None => panic!("Unknown ROI path '{}'", path),
        }
    }

    /// Live-pixel position of a point entry.
    pub fn point(&self, path: &str) -> Point {
        self.rect(path).origin()
    }

    /// Scaled pitch `(x, y)` for an offset entry.
    pub fn offset(&self, path: &str) -> (f32, f32) {
        match self.offsets.get(path) {
            Some(offset) => *offset,
            None => panic!("Unknown offset path '{}'", path),
        }
    }

    /// Unscaled per-profile constant, e.g. a wheel delta.
    pub fn scalar(&self, path: &str) -> f32 {
        match self.scalars.get(path) {
            Some(value) => *value,
            None => panic!("Unknown scalar path '{}'", path),
        }
    }

    /// Scales an arbitrary reference value along one axis.
    pub fn scale_scalar(&self, axis: Axis, value: f32) -> f32 {
        match axis {
            Axis::X => scale_value(value, self.live.0, self.reference.0),
            Axis::Y => scale_value(value, self.live.1, self.reference.1),
        }
    }

    pub fn ratio(&self) -> (u32, u32) {
        self.ratio
    }

    pub fn reference(&self) -> (u32, u32) {
        self.reference
    }

    pub fn live_size(&self) -> (u32, u32) {
        self.live
    }

    /// True if the live size differs from the reference and values were rescaled.
    pub fn is_rescaled(&self) -> bool {
        self.live != self.reference
    }

    /// Every rectangle resolves inside the live window.
    pub fn all_within_bounds(&self) -> bool {
        self.rects
            .values()
            .all(|r| r.fits_within(self.live.0, self.live.1))
    }
}

/// Resolves the built-in profile for the live client size.
pub fn resolve_screen_profile(live_w: u32, live_h: u32) -> Result<ScreenProfile> {
    resolve_with(builtin::templates(), live_w, live_h)
}

/// Live rectangle for `name` in `profile`.
pub fn scaled_rect(profile: &ScreenProfile, name: &str) -> Rect {
    profile.rect(name)
}

/// Chooses a template by aspect ratio, then by nearest reference resolution,
/// and resolves it for `live_w`×`live_h`.
pub fn resolve_with(
    templates: &[ProfileTemplate],
    live_w: u32,
    live_h: u32,
) -> Result<ScreenProfile> {
    if live_w == 0 || live_h == 0 {
        bail!("Window client area is empty ({}x{})", live_w, live_h);
    }
    if templates.is_empty() {
        bail!("No screen profiles are defined");
    }

    let live_ratio = reduce_ratio(live_w, live_h);
    let best = templates
        .iter()
        .map(|t| (t.ratio, ratio_deviation(live_ratio, t.ratio)))
        .min_by(|a, b| a.1.total_cmp(&b.1));

    let ratio = match best {
        Some((ratio, deviation)) if deviation <= RATIO_TOLERANCE => ratio,
        _ => {
            crate::log(&format!(
                "No profile within {:.0}% of {}:{}, using {}:{}",
                RATIO_TOLERANCE * 100.0,
                live_ratio.0,
                live_ratio.1,
                FALLBACK_RATIO.0,
                FALLBACK_RATIO.1
            ));
            FALLBACK_RATIO
        }
    };

    let candidates: Vec<&ProfileTemplate> =
        templates.iter().filter(|t| t.ratio == ratio).collect();
    let first = candidates
        .first()
        .copied()
        .or_else(|| templates.first())
        .ok_or_else(|| anyhow!("No screen profile for ratio {}:{}", ratio.0, ratio.1))?;

    let template = candidates
        .iter()
        .copied()
        .find(|t| t.reference == (live_w, live_h))
        .unwrap_or_else(|| {
            candidates
                .iter()
                .copied()
                .min_by_key(|t| {
                    t.reference.0.abs_diff(live_w) as u64 + t.reference.1.abs_diff(live_h) as u64
                })
                .unwrap_or(first)
        });

    let profile = ScreenProfile::from_template(template, (live_w, live_h));
    crate::log(&format!(
        "Screen profile {}:{} @ {}x{} for live {}x{}{}",
        profile.ratio.0,
        profile.ratio.1,
        profile.reference.0,
        profile.reference.1,
        live_w,
        live_h,
        if profile.is_rescaled() { " (rescaled)" } else { "" }
    ));
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::roi;

    fn small_template(width: u32, height: u32) -> ProfileTemplate {
        ProfileBuilder::new(width, height)
            .rect("a", 10.0, 20.0, 30.0, 40.0)
            .point("b", 5.5, 7.5)
            .offset("pitch", 16.0, 24.0)
            .scalar("scroll", -31.25)
            .build(&["a", "b", "pitch", "scroll"])
            .unwrap()
    }

    #[test]
    fn test_builder_rejects_missing_path() {
        let result = ProfileBuilder::new(100, 100)
            .rect("a", 0.0, 0.0, 10.0, 10.0)
            .build(&["a", "b"]);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("'b'"), "{}", err);
    }

    #[test]
    fn test_builder_rejects_out_of_bounds_rect() {
        let result = ProfileBuilder::new(100, 100)
            .rect("wide", 50.0, 0.0, 60.0, 10.0)
            .build(&[]);
        assert!(result.is_err());
    }

    #[test]
    fn test_scaled_rect_is_deterministic() {
        let templates = vec![small_template(1920, 1080)];
        let a = resolve_with(&templates, 1280, 720).unwrap();
        let b = resolve_with(&templates, 1280, 720).unwrap();
        assert_eq!(scaled_rect(&a, "a"), scaled_rect(&b, "a"));
        assert_eq!(scaled_rect(&a, "a"), Rect::new(6, 13, 20, 26));
    }

    #[test]
    fn test_exact_resolution_is_not_rescaled() {
        let profile = resolve_screen_profile(1680, 1050).unwrap();
        assert_eq!(profile.ratio(), (8, 5));
        assert!(!profile.is_rescaled());
        assert_eq!(profile.rect(roi::ITEMS_START), Rect::new(180, 104, 130, 162));
    }

    #[test]
    fn test_close_ratio_picks_16_9_and_rescales() {
        let profile = resolve_screen_profile(2560, 1440).unwrap();
        assert_eq!(profile.ratio(), (16, 9));
        assert!(profile.is_rescaled());
        // 205 * 4/3 = 273.33, 122 * 4/3 = 162.67
        assert_eq!(profile.rect(roi::ITEMS_START), Rect::new(273, 162, 201, 241));
        assert!(profile.all_within_bounds());
    }

    #[test]
    fn test_unknown_ratio_falls_back_to_16_9() {
        let profile = resolve_screen_profile(1280, 1024).unwrap();
        assert_eq!(profile.ratio(), (16, 9));
        assert!(profile.all_within_bounds());
    }

    #[test]
    fn test_offsets_scale_and_scalars_do_not() {
        let templates = vec![small_template(1920, 1080)];
        let profile = resolve_with(&templates, 960, 540).unwrap();
        assert_eq!(profile.offset("pitch"), (8.0, 12.0));
        assert_eq!(profile.scalar("scroll"), -31.25);
        assert_eq!(profile.point("b"), Point::new(2, 3));
    }

    #[test]
    fn test_scale_scalar_per_axis() {
        let templates = vec![small_template(1920, 1080)];
        let profile = resolve_with(&templates, 3840, 1080).unwrap();
        assert_eq!(profile.scale_scalar(Axis::X, 100.0), 200.0);
        assert_eq!(profile.scale_scalar(Axis::Y, 100.0), 100.0);
        assert_eq!(profile.scale_scalar(Axis::X, 0.0), 0.0);
    }

    #[test]
    fn test_zero_size_is_rejected() {
        assert!(resolve_screen_profile(0, 1080).is_err());
    }

    #[test]
    #[should_panic(expected = "nope")]
    fn test_unknown_path_panics() {
        let profile = resolve_screen_profile(1920, 1080).unwrap();
        profile.rect("nope");
    }
}
