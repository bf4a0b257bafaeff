//! Development items and resources: inventory grids of unknown length.
//!
//! Neither tab shows an item counter, so the walk tallies names and stops
//! once the clamped last page starts repeating cells.

use anyhow::Result;
use image::RgbaImage;

use super::context::ScanContext;
use super::pagination::{walk, CellOutcome, Flow, Found, GridLayout, PaginationCursor, Termination};
use super::result::{FailedEntry, ScanResult};
use super::DIGITS;
use crate::calibration::roi;
use crate::catalog::{resolve_identity, Resolution};
use crate::ocr::extract::{parse_int, parse_owned};
use crate::ocr::RecognizeOptions;

/// Catalog ID of shell credits.
pub const SHELL_CREDIT_ID: &str = "2";

pub const ITEM_GRID: GridLayout = GridLayout {
    rows: 4,
    cols: 6,
    max_pages: 60,
};

/// Scans the inventory tab at `tab` into `result`.
///
/// Recognized items go to `result.inventory`; names missing from the catalog
/// get their description saved and a [`FailedEntry`].
pub fn scan_items(ctx: &mut ScanContext, tab: &str, result: &mut ScanResult) -> Result<()> {
    ctx.open_inventory_tab(tab)?;

    let scan = walk(ctx, &ITEM_GRID, Termination::Encounters, |ctx, cursor, image| {
        read_item_cell(ctx, cursor, image, result)
    })?;

    crate::log(&format!(
        "Items on {}: {} distinct, {} cells over {} pages",
        tab,
        scan.entries.len(),
        scan.summary.cells_visited,
        scan.summary.pages
    ));
    Ok(())
}

fn read_item_cell(
    ctx: &mut ScanContext,
    cursor: &PaginationCursor,
    image: &RgbaImage,
    result: &mut ScanResult,
) -> Result<CellOutcome<String>> {
    let observed = ctx.read_or_default(image, roi::ITEMS_NAME, &RecognizeOptions::default().single_line())?;
    if observed.trim().is_empty() {
        return Ok(CellOutcome::Skip(Flow::Continue));
    }
    let owned = parse_owned(&ctx.read_or_default(image, roi::ITEMS_VALUE, &RecognizeOptions::default())?);

    match resolve_identity(&observed, &ctx.catalog.items) {
        Resolution::Resolved(resolved) => {
            if cursor.is_sentinel(&resolved.key) {
                return Ok(CellOutcome::Seen {
                    name: resolved.key,
                    owned,
                });
            }
            result.inventory.insert(resolved.entry.id.clone(), owned);
            Ok(CellOutcome::Found(
                Found {
                    name: resolved.key,
                    owned,
                    entity: resolved.entry.id,
                },
                Flow::Continue,
            ))
        }
        Resolution::Unresolved { observed: name } => {
            // One crop per unknown name is enough for review.
            if cursor.encounter_counts.contains_key(&name) {
                return Ok(CellOutcome::Seen { name, owned });
            }
            let path = ctx.save_failed_crop(image, roi::ITEMS_DESCRIPTION, &observed)?;
            crate::log(&format!(
                "Unrecognized item \"{}\" (owned {}), saved {}",
                observed.trim(),
                owned,
                path.display()
            ));
            result.failed.push(FailedEntry {
                image: path.display().to_string(),
                observed_quantity: owned,
            });
            Ok(CellOutcome::Found(
                Found {
                    name,
                    owned,
                    entity: String::new(),
                },
                Flow::Continue,
            ))
        }
    }
}

/// Reads the shell credit balance from the inventory header unless the item
/// scan already found a non-zero amount. Unreadable balances count as 0.
pub fn fill_shell_credits(ctx: &mut ScanContext, result: &mut ScanResult) {
    if result.inventory.get(SHELL_CREDIT_ID).copied().unwrap_or(0) > 0 {
        return;
    }
    let credits = match ctx.read_live(roi::MENU_SHELL, &RecognizeOptions::allow(DIGITS)) {
        Ok(text) => parse_int(&text).unwrap_or(0),
        Err(e) => {
            crate::log_debug(&format!("Failed to read shell credits: {:#}", e));
            0
        }
    };
    crate::log_debug(&format!("Shell credits: {}", credits));
    result.inventory.insert(SHELL_CREDIT_ID.to_string(), credits);
}
