//! Main-menu check run before a scan starts.

use anyhow::Result;

use super::error::ScanError;
use super::input::Key;
use crate::calibration::roi;
use crate::ocr::RecognizeOptions;
use crate::scanners::context::MENU_OPEN_SETTLE;
use crate::scanners::ScanContext;

/// Tesseract often drops the final stroke of the label.
const TERMINAL_MISREAD: &str = "terminat";

/// True when `text` is the main-menu "Terminal" label.
pub fn is_main_menu_label(text: &str, terminal_label: &str) -> bool {
    let text = text.trim().to_lowercase();
    text == terminal_label || text == TERMINAL_MISREAD
}

/// Reads the terminal label and, if found, closes the menu with Esc.
///
/// Fails with [`ScanError::NotInMainMenu`] otherwise; recognition errors count
/// as "not in the menu".
pub fn confirm_main_menu(ctx: &mut ScanContext) -> Result<()> {
    let text = match ctx.read_live(roi::MENU_TERMINAL, &RecognizeOptions::default().single_line()) {
        Ok(text) => text,
        Err(e) => {
            crate::log(&format!("Failed to read the main menu label: {:#}", e));
            String::new()
        }
    };
    crate::log_debug(&format!("Main menu label: \"{}\"", text));

    if !is_main_menu_label(&text, &ctx.catalog.labels.terminal) {
        return Err(ScanError::NotInMainMenu.into());
    }

    ctx.controller.press(Key::ESCAPE, MENU_OPEN_SETTLE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::config::ScanConfig;
    use crate::catalog::Catalog;
    use crate::scanners::context::tests::{fake_context, FakeState};

    #[test]
    fn test_main_menu_label() {
        assert!(is_main_menu_label("Terminal", "terminal"));
        assert!(is_main_menu_label(" terminat\n", "terminal"));
        assert!(!is_main_menu_label("Inventory", "terminal"));
        assert!(!is_main_menu_label("", "terminal"));
    }

    #[test]
    fn test_confirm_presses_escape() {
        let script = |_: &FakeState, size: (u32, u32)| {
            if size == (150, 40) { "Terminal".to_string() } else { String::new() }
        };
        let (mut ctx, state) = fake_context(Catalog::default(), ScanConfig::default(), Box::new(script));

        confirm_main_menu(&mut ctx).unwrap();
        assert_eq!(state.lock().unwrap().keys, vec![Key::ESCAPE]);
    }

    #[test]
    fn test_other_screen_is_rejected() {
        let (mut ctx, state) = fake_context(
            Catalog::default(),
            ScanConfig::default(),
            Box::new(|_: &FakeState, _: (u32, u32)| "Resonator".to_string()),
        );

        let err = confirm_main_menu(&mut ctx).unwrap_err();
        assert_eq!(ScanError::find(&err), Some(&ScanError::NotInMainMenu));
        assert!(state.lock().unwrap().keys.is_empty());
    }
}
