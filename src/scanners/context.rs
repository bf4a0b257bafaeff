//! Everything a scanner needs for one scan: the resolved profile, catalog,
//! input controller, capture and recognition.
//!
//! The context lives on the worker thread and is owned by it; nothing in here
//! is shared with the coordinator.

use anyhow::{Context as _, Result};
use image::RgbaImage;
use std::path::PathBuf;
use std::sync::Arc;

use crate::automation::config::ScanConfig;
use crate::automation::controller::Controller;
use crate::automation::error::ScanError;
use crate::automation::input::Key;
use crate::calibration::{roi, Point, Rect, ScreenProfile};
use crate::capture::{crop, ScreenCapture};
use crate::catalog::Catalog;
use crate::ocr::{self, RecognitionCache, RecognizeOptions, TextRecognizer};

use super::pagination::GridSurface;

/// Settle time after a plain click or keypress.
pub const TAP_SETTLE: f32 = 0.1;
/// Settle time after scrolling an inventory grid by one page.
pub const PAGE_SCROLL_SETTLE: f32 = 1.2;
/// Settle time after opening a menu with its keybind.
pub const MENU_OPEN_SETTLE: f32 = 2.0;

pub struct ScanContext {
    pub profile: ScreenProfile,
    pub catalog: Arc<Catalog>,
    pub config: ScanConfig,
    pub controller: Controller,
    capture: Box<dyn ScreenCapture>,
    recognizer: Box<dyn TextRecognizer>,
    /// Where crops of unresolved items are saved.
    pub failed_dir: PathBuf,
    cache: RecognitionCache,
}

impl ScanContext {
    pub fn new(
        profile: ScreenProfile,
        catalog: Arc<Catalog>,
        config: ScanConfig,
        controller: Controller,
        capture: Box<dyn ScreenCapture>,
        recognizer: Box<dyn TextRecognizer>,
        failed_dir: PathBuf,
    ) -> Self {
        Self {
            profile,
            catalog,
            config,
            controller,
            capture,
            recognizer,
            failed_dir,
            cache: RecognitionCache::new(),
        }
    }

    /// Starts a fresh recognition cache. Called before every grid scan.
    pub fn reset_cache(&mut self) {
        crate::log_debug(&format!(
            "Recognition cache: {} entries, {} hits, {} misses",
            self.cache.len(),
            self.cache.hits(),
            self.cache.misses()
        ));
        self.cache = RecognitionCache::new();
    }

    pub fn cache(&mut self) -> &mut RecognitionCache {
        &mut self.cache
    }

    /// Screenshot of the whole client area.
    pub fn screenshot(&mut self) -> Result<RgbaImage> {
        let (width, height) = self.profile.live_size();
        self.capture
            .screenshot(Rect::new(0, 0, width as i32, height as i32))
    }

    /// Recognizes the text inside `roi` of an existing screenshot.
    pub fn read(&mut self, image: &RgbaImage, roi: &str, options: &RecognizeOptions) -> Result<String> {
        let region = crop(image, self.profile.rect(roi));
        ocr::recognize(self.recognizer.as_ref(), &mut self.cache, &region, options)
    }

    /// Like [`read`](Self::read), but a failed recognition yields an empty
    /// string and a debug line. Only cancellation is returned as an error.
    pub fn read_or_default(&mut self, image: &RgbaImage, roi: &str, options: &RecognizeOptions) -> Result<String> {
        let read = self.read(image, roi, options);
        recover(read, roi)
    }

    /// Captures `roi` only and recognizes it.
    pub fn read_live(&mut self, roi: &str, options: &RecognizeOptions) -> Result<String> {
        let region = self.capture.screenshot(self.profile.rect(roi))?;
        ocr::recognize(self.recognizer.as_ref(), &mut self.cache, &region, options)
    }

    /// [`read_live`](Self::read_live) with the fallback of
    /// [`read_or_default`](Self::read_or_default).
    pub fn read_live_or_default(&mut self, roi: &str, options: &RecognizeOptions) -> Result<String> {
        let read = self.read_live(roi, options);
        recover(read, roi)
    }

    /// Saves the `roi` crop of `image` for manual review and returns its path.
    pub fn save_failed_crop(&self, image: &RgbaImage, roi: &str, name: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.failed_dir)
            .with_context(|| format!("Failed to create {}", self.failed_dir.display()))?;
        let safe_name: String = name
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-')
            .collect();
        let stamp = chrono::Local::now().format("%H%M%S%3f");
        let path = self.failed_dir.join(format!("_{}-{}.png", safe_name, stamp));
        crop(image, self.profile.rect(roi))
            .save(&path)
            .with_context(|| format!("Failed to save {}", path.display()))?;
        Ok(path)
    }

    /// Center of inventory grid cell (`row`, `col`) on the visible page.
    pub fn grid_cell_center(&self, row: usize, col: usize) -> Point {
        let start = self.profile.rect(roi::ITEMS_START);
        let (pitch_x, pitch_y) = self.profile.offset(roi::OFFSET_PAGE);
        Point::new(
            start.x + col as i32 * (start.w + pitch_x as i32) + start.w / 2,
            start.y + row as i32 * (start.h + pitch_y as i32) + start.h / 2,
        )
    }

    /// Opens the inventory and selects the tab at `tab`.
    pub fn open_inventory_tab(&mut self, tab: &str) -> Result<()> {
        let key = parse_keybind(&self.config.inventory_keybind)?;
        self.controller.press(key, MENU_OPEN_SETTLE)?;
        let point = self.profile.point(tab);
        self.controller.click(point, TAP_SETTLE)
    }
}

/// Per-cell fallback: recognition failures become empty text.
fn recover(read: Result<String>, roi: &str) -> Result<String> {
    match read {
        Ok(text) => Ok(text),
        Err(e) if ScanError::is_cancelled(&e) => Err(e),
        Err(e) => {
            crate::log_debug(&format!("Recognition of {} failed: {:#}", roi, e));
            Ok(String::new())
        }
    }
}

/// Configured keybind → key.
pub fn parse_keybind(name: &str) -> Result<Key> {
    Key::parse(name).with_context(|| format!("Unknown keybind '{}'", name))
}

/// Inventory grids: a click selects a cell, the wheel pages.
impl GridSurface for ScanContext {
    fn open_cell(&mut self, row: usize, col: usize) -> Result<RgbaImage> {
        let center = self.grid_cell_center(row, col);
        self.controller.click(center, TAP_SETTLE)?;
        self.screenshot()
    }

    fn scroll_page(&mut self) -> Result<()> {
        let amount = self.profile.scalar(roi::SCROLL_PAGE);
        self.controller.scroll(amount, PAGE_SCROLL_SETTLE)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::automation::input::InputDriver;
    use crate::automation::state::ScanFlag;
    use crate::calibration::resolve_screen_profile;
    use image::{GrayImage, Rgba};
    use std::sync::Mutex;

    /// What the fake game has seen so far.
    #[derive(Debug, Default)]
    pub(crate) struct FakeState {
        pub clicks: Vec<Point>,
        pub scrolls: Vec<f32>,
        pub keys: Vec<Key>,
        pub texts: Vec<String>,
        /// Bumped on every input; each frame renders different pixels.
        pub frame: u64,
    }

    impl FakeState {
        pub fn last_click(&self) -> Option<Point> {
            self.clicks.last().copied()
        }
    }

    pub(crate) type Shared = Arc<Mutex<FakeState>>;

    struct FakeDriver(Shared);

    impl FakeDriver {
        fn record(&self, update: impl FnOnce(&mut FakeState)) -> Result<()> {
            let mut state = self.0.lock().unwrap();
            update(&mut state);
            state.frame += 1;
            Ok(())
        }
    }

    impl InputDriver for FakeDriver {
        fn move_to(&mut self, _point: Point) -> Result<()> {
            self.record(|_| {})
        }

        fn click(&mut self, point: Point) -> Result<()> {
            self.record(|s| s.clicks.push(point))
        }

        fn scroll(&mut self, amount: f32) -> Result<()> {
            self.record(|s| s.scrolls.push(amount))
        }

        fn key_press(&mut self, key: Key) -> Result<()> {
            self.record(|s| s.keys.push(key))
        }

        fn hotkey(&mut self, keys: &[Key]) -> Result<()> {
            self.record(|s| s.keys.extend_from_slice(keys))
        }

        fn type_text(&mut self, text: &str) -> Result<()> {
            self.record(|s| s.texts.push(text.to_string()))
        }
    }

    /// Renders 4x4 black/white noise seeded by the frame counter, so crops
    /// of different frames never share a fingerprint.
    struct FakeCapture {
        state: Shared,
        size: (u32, u32),
    }

    impl ScreenCapture for FakeCapture {
        fn screenshot(&mut self, region: Rect) -> Result<RgbaImage> {
            let frame = self.state.lock().unwrap().frame;
            let full = RgbaImage::from_fn(self.size.0, self.size.1, |x, y| {
                let mut h = frame
                    .wrapping_mul(0x9E37_79B9_7F4A_7C15)
                    .wrapping_add(((x / 4) as u64) << 20)
                    .wrapping_add((y / 4) as u64);
                h ^= h >> 29;
                h = h.wrapping_mul(0xBF58_476D_1CE4_E5B9);
                h ^= h >> 32;
                if h & 1 == 0 {
                    Rgba([0, 0, 0, 255])
                } else {
                    Rgba([255, 255, 255, 255])
                }
            });
            Ok(crop(&full, region))
        }
    }

    pub(crate) type Script = Box<dyn Fn(&FakeState, (u32, u32)) -> String>;

    /// Script answer that makes the recognizer fail like a crashed Tesseract.
    pub(crate) const RECOGNIZER_FAILS: &str = "<recognizer fails>";
    /// Script answer that makes the recognizer report a cancelled call.
    pub(crate) const RECOGNIZER_CANCELLED: &str = "<recognizer cancelled>";

    /// Answers from a script keyed by the crop size and the game state.
    struct ScriptedRecognizer {
        state: Shared,
        script: Script,
    }

    impl TextRecognizer for ScriptedRecognizer {
        fn recognize_text(&self, image: &GrayImage, options: &RecognizeOptions) -> Result<String> {
            let state = self.state.lock().unwrap();
            let text = (self.script)(&state, image.dimensions());
            match text.as_str() {
                RECOGNIZER_FAILS => anyhow::bail!("tesseract exited with status 1"),
                RECOGNIZER_CANCELLED => Err(ScanError::Cancelled.into()),
                _ => Ok(crate::ocr::engine::apply_char_filters(&text, options)),
            }
        }
    }

    /// A 1920x1080 context wired to a fake game.
    pub(crate) fn fake_context(catalog: Catalog, config: ScanConfig, script: Script) -> (ScanContext, Shared) {
        fake_context_with_flag(catalog, config, script, Arc::new(ScanFlag::new()))
    }

    /// Like [`fake_context`], with a supervision flag the test controls.
    pub(crate) fn fake_context_with_flag(
        catalog: Catalog,
        config: ScanConfig,
        script: Script,
        flag: Arc<ScanFlag>,
    ) -> (ScanContext, Shared) {
        let state: Shared = Arc::new(Mutex::new(FakeState::default()));
        let controller = Controller::new(Box::new(FakeDriver(state.clone())), flag, 0.0);
        let profile = resolve_screen_profile(1920, 1080).unwrap();
        let failed_dir = std::env::temp_dir()
            .join("wuwa-scanner-tests")
            .join(format!("{:?}", std::thread::current().id()).replace(['(', ')'], ""));
        let ctx = ScanContext::new(
            profile,
            Arc::new(catalog),
            config,
            controller,
            Box::new(FakeCapture {
                state: state.clone(),
                size: (1920, 1080),
            }),
            Box::new(ScriptedRecognizer {
                state: state.clone(),
                script,
            }),
            failed_dir,
        );
        (ctx, state)
    }

    /// Inverse of `grid_cell_center` at 1920x1080: `(row, col)` of a click.
    pub(crate) fn cell_of(point: Point) -> (usize, usize) {
        let col = (point.x - 280) / 167;
        let row = (point.y - 212) / 205;
        (row.max(0) as usize, col.max(0) as usize)
    }

    #[test]
    fn test_grid_cell_center_uses_page_pitch() {
        let (ctx, _) = fake_context(Catalog::default(), ScanConfig::default(), Box::new(|_: &FakeState, _: (u32, u32)| String::new()));
        assert_eq!(ctx.grid_cell_center(0, 0), Point::new(280, 212));
        assert_eq!(ctx.grid_cell_center(1, 2), Point::new(205 + 2 * 167 + 75, 122 + 205 + 90));
        assert_eq!(cell_of(ctx.grid_cell_center(3, 5)), (3, 5));
    }

    #[test]
    fn test_read_crops_the_roi() {
        let (mut ctx, _) = fake_context(
            Catalog::default(),
            ScanConfig::default(),
            Box::new(|_: &FakeState, size: (u32, u32)| format!("{}x{}", size.0, size.1)),
        );
        let image = ctx.screenshot().unwrap();
        let text = ctx
            .read(&image, roi::ITEMS_VALUE, &RecognizeOptions::default())
            .unwrap();
        assert_eq!(text, "190x40");
    }

    #[test]
    fn test_read_or_default_recovers_failures_but_not_cancellation() {
        let (mut ctx, _) = fake_context(
            Catalog::default(),
            ScanConfig::default(),
            Box::new(|_: &FakeState, size: (u32, u32)| match size {
                (190, 40) => RECOGNIZER_FAILS.to_string(),
                _ => RECOGNIZER_CANCELLED.to_string(),
            }),
        );
        let image = ctx.screenshot().unwrap();

        let text = ctx
            .read_or_default(&image, roi::ITEMS_VALUE, &RecognizeOptions::default())
            .unwrap();
        assert_eq!(text, "");

        let err = ctx
            .read_or_default(&image, roi::ITEMS_NAME, &RecognizeOptions::default())
            .unwrap_err();
        assert!(ScanError::is_cancelled(&err));
        let err = ctx
            .read_live_or_default(roi::ITEMS_NAME, &RecognizeOptions::default())
            .unwrap_err();
        assert!(ScanError::is_cancelled(&err));
    }

    #[test]
    fn test_open_inventory_tab_presses_keybind_then_clicks_tab() {
        let (mut ctx, state) = fake_context(Catalog::default(), ScanConfig::default(), Box::new(|_: &FakeState, _: (u32, u32)| String::new()));
        ctx.open_inventory_tab(roi::TAB_WEAPONS).unwrap();
        let state = state.lock().unwrap();
        assert_eq!(state.keys, vec![Key::parse("B").unwrap()]);
        assert_eq!(state.clicks, vec![Point::new(81, 191)]);
    }

    #[test]
    fn test_unknown_keybind_is_an_error() {
        assert!(parse_keybind("hyper").is_err());
    }
}
