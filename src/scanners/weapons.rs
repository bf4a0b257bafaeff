//! Weapons tab: a known-count grid sorted by rarity and level, descending.
//!
//! Upgrade materials share the tab and go to the inventory. The first weapon
//! below the configured floors ends the walk since everything after it is
//! lower still.

use anyhow::Result;
use image::RgbaImage;

use super::context::ScanContext;
use super::pagination::{walk, CellOutcome, Flow, Found, GridLayout, PaginationCursor, Termination};
use super::result::{ScanResult, WeaponRecord};
use super::DIGITS;
use crate::calibration::roi;
use crate::catalog::{resolve_in, Resolved};
use crate::ocr::extract::{parse_counter, parse_int, parse_level};
use crate::ocr::RecognizeOptions;

/// Recorded when the level label is unreadable.
const DEFAULT_LEVEL: u32 = 1;
/// Recorded when the rank label is unreadable.
const DEFAULT_RANK: u32 = 0;

pub const WEAPON_GRID: GridLayout = GridLayout {
    rows: 4,
    cols: 6,
    max_pages: 60,
};

/// Reads the `"N/M"` counter of a known-count grid. `None` when unreadable.
pub fn read_grid_count(ctx: &mut ScanContext, counter_roi: &str) -> Option<u32> {
    let options = RecognizeOptions::allow(&format!("{}/", DIGITS));
    match ctx.read_live(counter_roi, &options) {
        Ok(text) => {
            let count = parse_counter(&text);
            crate::log_debug(&format!("Grid counter \"{}\" -> {:?}", text, count));
            count
        }
        Err(e) => {
            crate::log_debug(&format!("Failed to read grid counter: {:#}", e));
            None
        }
    }
}

pub fn scan_weapons(ctx: &mut ScanContext, result: &mut ScanResult) -> Result<()> {
    ctx.open_inventory_tab(roi::TAB_WEAPONS)?;
    let count = read_grid_count(ctx, roi::WEAPONS_PAGE);

    let scan = walk(ctx, &WEAPON_GRID, Termination::KnownCount(count), |ctx, cursor, image| {
        read_weapon_cell(ctx, cursor, image, result)
    })?;

    crate::log(&format!(
        "Weapons: {} recorded, {} cells visited{}",
        result.weapons.len(),
        scan.summary.cells_visited,
        if scan.summary.stopped_early { ", stopped at the floor" } else { "" }
    ));
    Ok(())
}

fn read_weapon_cell(
    ctx: &mut ScanContext,
    _cursor: &PaginationCursor,
    image: &RgbaImage,
    result: &mut ScanResult,
) -> Result<CellOutcome<String>> {
    let observed = ctx.read_or_default(image, roi::WEAPONS_NAME, &RecognizeOptions::ban(" "))?;
    if observed.is_empty() {
        return Ok(CellOutcome::Skip(Flow::Continue));
    }

    let catalog = ctx.catalog.clone();
    match resolve_in(&observed, &[&catalog.weapons, &catalog.items]) {
        Some((0, weapon)) => read_weapon(ctx, image, weapon, result),
        Some((_, item)) => {
            let text = ctx.read_or_default(image, roi::WEAPONS_VALUE, &RecognizeOptions::allow(DIGITS))?;
            let owned = parse_int(&text).unwrap_or(1);
            result.inventory.insert(item.entry.id.clone(), owned);
            Ok(CellOutcome::Found(
                Found {
                    name: item.key,
                    owned,
                    entity: item.entry.id,
                },
                Flow::Continue,
            ))
        }
        None => {
            crate::log_debug(&format!("Unknown weapon tab entry \"{}\"", observed));
            Ok(CellOutcome::Skip(Flow::Continue))
        }
    }
}

fn read_weapon(
    ctx: &mut ScanContext,
    image: &RgbaImage,
    weapon: Resolved,
    result: &mut ScanResult,
) -> Result<CellOutcome<String>> {
    let floors = ctx.config.floors;
    let rarity = weapon.entry.rarity.unwrap_or(1);
    if rarity < floors.weapons_min_rarity {
        return Ok(CellOutcome::Skip(Flow::Stop));
    }

    let level_text = ctx.read_or_default(image, roi::WEAPONS_LEVEL, &RecognizeOptions::allow(&format!("{}/", DIGITS)))?;
    let (level, ascension) = match parse_level(&level_text) {
        Some((level, ascension)) => {
            if level < floors.weapons_min_level {
                return Ok(CellOutcome::Skip(Flow::Stop));
            }
            (level, ascension)
        }
        // An unreadable label says nothing about the floor.
        None => {
            crate::log_debug(&format!("Unreadable level \"{}\" for {}", level_text, weapon.key));
            (DEFAULT_LEVEL, 0)
        }
    };

    let rank_text = ctx.read_or_default(image, roi::WEAPONS_RANK, &RecognizeOptions::allow(DIGITS))?;
    let rank = parse_int(&rank_text).unwrap_or(DEFAULT_RANK);

    result.weapons.push(WeaponRecord {
        id: weapon.entry.id.clone(),
        level,
        ascension,
        rank,
    });
    Ok(CellOutcome::Found(
        Found {
            name: weapon.key,
            owned: 1,
            entity: weapon.entry.id,
        },
        Flow::Continue,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::config::ScanConfig;
    use crate::catalog::{Catalog, CatalogTable};
    use crate::scanners::context::tests::{cell_of, fake_context, FakeState, RECOGNIZER_FAILS};

    /// Grid contents by linear index: (name, level label).
    const GRID: [(&str, &str); 5] = [
        ("Emerald of Genesis", "90/90"),
        ("Static Mist", "70/80"),
        ("Energy Core", ""),
        ("Commando of Conviction", "1/20"),
        ("Training Sword", "20/20"),
    ];

    fn catalog() -> Catalog {
        Catalog {
            weapons: CatalogTable::from_pairs(&[
                ("Emerald of Genesis", "21020015", Some(5)),
                ("Static Mist", "21030015", Some(5)),
                ("Commando of Conviction", "21020024", Some(4)),
                ("Training Sword", "21020011", Some(1)),
            ]),
            items: CatalogTable::from_pairs(&[("Energy Core", "43020001", None)]),
            ..Catalog::default()
        }
    }

    fn index(state: &FakeState) -> Option<usize> {
        let (row, col) = cell_of(state.last_click()?);
        Some(state.scrolls.len() * 24 + row * 6 + col)
    }

    fn script(state: &FakeState, size: (u32, u32)) -> String {
        let entry = index(state).and_then(|i| GRID.get(i));
        match (size, entry) {
            ((130, 40), _) => format!("{}/2000", GRID.len()),
            ((545, 55), Some((name, _))) => name.to_string(),
            ((190, 40), Some(_)) => "12".to_string(),
            ((180, 45), Some((_, level))) => level.to_string(),
            ((115, 50), Some(_)) => "1".to_string(),
            _ => String::new(),
        }
    }

    #[test]
    fn test_weapons_and_materials_until_count() {
        let (mut ctx, state) = fake_context(catalog(), ScanConfig::default(), Box::new(script));
        let mut result = ScanResult::default();
        scan_weapons(&mut ctx, &mut result).unwrap();

        assert_eq!(
            result.weapons,
            vec![
                WeaponRecord {
                    id: "21020015".into(),
                    level: 90,
                    ascension: 6,
                    rank: 1
                },
                WeaponRecord {
                    id: "21030015".into(),
                    level: 70,
                    ascension: 5,
                    rank: 1
                },
                WeaponRecord {
                    id: "21020024".into(),
                    level: 1,
                    ascension: 0,
                    rank: 1
                },
                WeaponRecord {
                    id: "21020011".into(),
                    level: 20,
                    ascension: 0,
                    rank: 1
                },
            ]
        );
        assert_eq!(result.inventory["43020001"], 12);
        // Tab click plus exactly one click per counted cell.
        assert_eq!(state.lock().unwrap().clicks.len(), 1 + GRID.len());
    }

    #[test]
    fn test_rarity_floor_stops_walk() {
        let mut config = ScanConfig::default();
        config.floors.weapons_min_rarity = 5;
        let (mut ctx, _) = fake_context(catalog(), config, Box::new(script));
        let mut result = ScanResult::default();
        scan_weapons(&mut ctx, &mut result).unwrap();

        assert_eq!(result.weapons.len(), 2);
        assert_eq!(result.inventory.len(), 1);
    }

    #[test]
    fn test_level_floor_stops_walk() {
        let mut config = ScanConfig::default();
        config.floors.weapons_min_level = 80;
        let (mut ctx, state) = fake_context(catalog(), config, Box::new(script));
        let mut result = ScanResult::default();
        scan_weapons(&mut ctx, &mut result).unwrap();

        assert_eq!(result.weapons.len(), 1);
        assert!(result.inventory.is_empty());
        assert_eq!(state.lock().unwrap().clicks.len(), 3);
    }

    #[test]
    fn test_unreadable_labels_fall_back_to_defaults() {
        let mut config = ScanConfig::default();
        config.floors.weapons_min_level = 20;
        let (mut ctx, state) = fake_context(
            catalog(),
            config,
            Box::new(|state: &FakeState, size: (u32, u32)| match (size, index(state)) {
                ((180, 45), Some(1)) | ((115, 50), Some(0)) => RECOGNIZER_FAILS.to_string(),
                _ => script(state, size),
            }),
        );
        let mut result = ScanResult::default();
        scan_weapons(&mut ctx, &mut result).unwrap();

        assert_eq!(result.weapons.len(), 2);
        assert_eq!(
            result.weapons[0],
            WeaponRecord {
                id: "21020015".into(),
                level: 90,
                ascension: 6,
                rank: 0
            }
        );
        assert_eq!(
            result.weapons[1],
            WeaponRecord {
                id: "21030015".into(),
                level: 1,
                ascension: 0,
                rank: 1
            }
        );
        // The material is still counted; the 1/20 weapon is below the floor.
        assert_eq!(result.inventory["43020001"], 12);
        assert_eq!(state.lock().unwrap().clicks.len(), 5);
    }
}
