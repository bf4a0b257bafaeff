//! Entity scanners.
//!
//! Each scanner opens its panel, walks a grid (or a fixed list) and appends
//! what it reads to a [`ScanResult`]. Scanners write into the result as they
//! go, so a scan stopped part-way still hands back everything read so far.

pub mod achievements;
pub mod characters;
pub mod context;
pub mod echoes;
pub mod items;
pub mod pagination;
pub mod rarity;
pub mod result;
pub mod weapons;

pub use context::ScanContext;
pub use result::ScanResult;

use anyhow::Result;

use crate::automation::config::ScannerKind;
use crate::calibration::roi;

pub const DIGITS: &str = "0123456789";
pub const LETTERS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const PUNCTUATION: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// Runs one scanner against the current game screen.
pub fn run_scanner(kind: ScannerKind, ctx: &mut ScanContext, result: &mut ScanResult) -> Result<()> {
    crate::log(&format!("Running {} scanner", kind));
    match kind {
        ScannerKind::Characters => characters::scan_characters(ctx, result),
        ScannerKind::Weapons => weapons::scan_weapons(ctx, result),
        ScannerKind::Echoes => echoes::scan_echoes(ctx, result),
        ScannerKind::DevItems => items::scan_items(ctx, roi::TAB_DEV_ITEMS, result),
        ScannerKind::Resources => items::scan_items(ctx, roi::TAB_RESOURCES, result),
        ScannerKind::Achievements => achievements::scan_achievements(ctx, result),
    }
}

/// Scanners that read the inventory grid and can pick up shell credits.
pub fn reads_inventory(kind: ScannerKind) -> bool {
    matches!(kind, ScannerKind::DevItems | ScannerKind::Resources)
}
