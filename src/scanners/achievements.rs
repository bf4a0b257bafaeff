//! Achievements: searched one by one by name instead of paged.

use anyhow::Result;

use super::context::{ScanContext, TAP_SETTLE};
use super::result::ScanResult;
use crate::automation::input::Key;
use crate::calibration::roi;
use crate::ocr::RecognizeOptions;

/// True when a status label means the achievement is done: the claimed
/// label, or a `"x/y"` progress counter.
pub fn is_completed(status: &str, claimed_label: &str) -> bool {
    let status = status.trim().to_lowercase();
    status == claimed_label || status.contains('/')
}

pub fn scan_achievements(ctx: &mut ScanContext, result: &mut ScanResult) -> Result<()> {
    ctx.controller.press(Key::ESCAPE, 1.0)?;
    let button = ctx.profile.point(roi::ACHIEVEMENTS_BUTTON);
    ctx.controller.click(button, 1.2)?;
    let tab = ctx.profile.point(roi::ACHIEVEMENTS_TAB);
    ctx.controller.click(tab, 1.0)?;

    let search_bar = ctx.profile.point(roi::ACHIEVEMENTS_SEARCH_BAR);
    let search_button = ctx.profile.point(roi::ACHIEVEMENTS_SEARCH_BUTTON);
    let catalog = ctx.catalog.clone();
    let claimed = catalog.labels.claimed.clone();

    for (name, entry) in catalog.achievements.display_entries() {
        ctx.controller.click(search_bar, 0.3)?;
        ctx.controller.type_text(name, 0.3)?;
        ctx.controller.click(search_button, 0.6)?;

        let screen = ctx.screenshot()?;
        let status = ctx.read_or_default(&screen, roi::ACHIEVEMENTS_STATUS, &RecognizeOptions::default())?;
        if is_completed(&status, &claimed) {
            result.achievements.push(entry.id.clone());
        } else {
            crate::log_debug(&format!("Achievement \"{}\" not completed: \"{}\"", name, status));
        }

        // Clears the search.
        ctx.controller.click(search_button, TAP_SETTLE)?;
    }

    ctx.controller.press(Key::ESCAPE, 0.5)?;
    crate::log(&format!(
        "Achievements: {} of {} completed",
        result.achievements.len(),
        catalog.achievements.len()
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::config::ScanConfig;
    use crate::catalog::{Catalog, CatalogTable};
    use crate::scanners::context::tests::{fake_context, FakeState, RECOGNIZER_FAILS};

    #[test]
    fn test_is_completed() {
        assert!(is_completed("Claimed", "claimed"));
        assert!(is_completed(" 3/5 ", "claimed"));
        assert!(!is_completed("Unclaimed", "claimed"));
        assert!(!is_completed("", "claimed"));
    }

    fn script(state: &FakeState, size: (u32, u32)) -> String {
        if size != (256, 65) {
            return String::new();
        }
        match state.texts.last().map(String::as_str) {
            Some("Hello World") => "Claimed".to_string(),
            Some("你好") => "12/20".to_string(),
            _ => "Go".to_string(),
        }
    }

    fn catalog() -> Catalog {
        Catalog {
            achievements: CatalogTable::from_pairs(&[
                ("Hello World", "100001", None),
                ("你好", "100002", None),
                ("Far Away", "100003", None),
            ]),
            ..Catalog::default()
        }
    }

    #[test]
    fn test_searches_every_achievement() {
        let (mut ctx, state) = fake_context(catalog(), ScanConfig::default(), Box::new(script));
        let mut result = ScanResult::default();
        scan_achievements(&mut ctx, &mut result).unwrap();

        assert_eq!(result.achievements, vec!["100001", "100002"]);
        let state = state.lock().unwrap();
        assert_eq!(state.texts, vec!["Far Away", "Hello World", "你好"]);
        assert_eq!(state.keys, vec![Key::ESCAPE, Key::ESCAPE]);
    }

    #[test]
    fn test_unreadable_status_counts_as_not_completed() {
        let (mut ctx, state) = fake_context(
            catalog(),
            ScanConfig::default(),
            Box::new(|state: &FakeState, size: (u32, u32)| match state.texts.last().map(String::as_str) {
                Some("Hello World") if size == (256, 65) => RECOGNIZER_FAILS.to_string(),
                _ => script(state, size),
            }),
        );
        let mut result = ScanResult::default();
        scan_achievements(&mut ctx, &mut result).unwrap();

        assert_eq!(result.achievements, vec!["100002"]);
        assert_eq!(state.lock().unwrap().texts.len(), 3);
    }
}
