//! Echoes tab: a known-count grid sorted by rarity and level, descending.

use anyhow::Result;
use image::RgbaImage;
use std::collections::BTreeMap;

use super::context::ScanContext;
use super::pagination::{walk, CellOutcome, Flow, Found, GridLayout, PaginationCursor, Termination};
use super::rarity::classify_rarity;
use super::result::{EchoRecord, EchoStats, ScanResult, StatValue};
use super::weapons::read_grid_count;
use super::{DIGITS, LETTERS};
use crate::calibration::roi;
use crate::capture::crop;
use crate::catalog::{normalize_name, resolve_identity, stat_key};
use crate::ocr::extract::parse_int;
use crate::ocr::RecognizeOptions;

pub const ECHO_GRID: GridLayout = GridLayout {
    rows: 4,
    cols: 6,
    max_pages: 60,
};

/// Highest echo level.
pub const MAX_ECHO_LEVEL: u32 = 25;

/// Number of leading stats that are main stats.
const MAIN_STAT_COUNT: usize = 2;

/// Name and level from the echo card text (`name`, cost, `level` lines).
/// Missing or unreadable levels are 0.
pub fn parse_card(text: &str) -> (String, u32) {
    let lines: Vec<&str> = text.lines().collect();
    let name = lines.first().map(|l| l.trim().to_lowercase()).unwrap_or_default();
    let level = lines
        .get(2)
        .and_then(|l| parse_int(l))
        .unwrap_or(0)
        .min(MAX_ECHO_LEVEL);
    (name, level)
}

/// Maps recognized stat-name lines to exported stat names.
///
/// Long names wrap onto a second line, so each adjacent pair is tried joined
/// before the single line. Lines that match nothing are dropped.
pub fn match_stats(lines: &[&str], stats: &BTreeMap<String, String>) -> Vec<String> {
    let mut matched = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if let Some(next) = lines.get(i + 1) {
            if let Some(name) = stats.get(&stat_key(&format!("{}{}", lines[i], next))) {
                matched.push(name.clone());
                i += 2;
                continue;
            }
        }
        if let Some(name) = stats.get(&stat_key(lines[i])) {
            matched.push(name.clone());
        }
        i += 1;
    }
    matched
}

/// Pairs stat names with their values. The first two are main stats; the
/// tune level is the number of sub stats.
pub fn parse_stats(names: &[String], values: &[&str]) -> (u32, EchoStats) {
    let tune_level = values.len().saturating_sub(MAIN_STAT_COUNT) as u32;
    let mut stats = EchoStats::default();

    for (index, (name, raw)) in names.iter().zip(values).enumerate() {
        let parsed = match raw.strip_suffix('%') {
            Some(number) => number
                .parse::<f32>()
                .ok()
                .map(|v| (format!("{}%", name), StatValue::Percent(v))),
            None => raw.parse::<u32>().ok().map(|v| (name.clone(), StatValue::Flat(v))),
        };
        let Some((key, value)) = parsed else {
            crate::log_debug(&format!("Unreadable value \"{}\" for stat {}", raw, name));
            continue;
        };
        let group = if index < MAIN_STAT_COUNT { &mut stats.main } else { &mut stats.sub };
        group.insert(key, value);
    }

    (tune_level, stats)
}

pub fn scan_echoes(ctx: &mut ScanContext, result: &mut ScanResult) -> Result<()> {
    ctx.open_inventory_tab(roi::TAB_ECHOES)?;
    let count = read_grid_count(ctx, roi::ECHOES_PAGE);

    let scan = walk(ctx, &ECHO_GRID, Termination::KnownCount(count), |ctx, cursor, image| {
        read_echo_cell(ctx, cursor, image, result)
    })?;

    crate::log(&format!(
        "Echoes: {} recorded, {} cells visited{}",
        result.echoes.len(),
        scan.summary.cells_visited,
        if scan.summary.stopped_early { ", stopped at the floor" } else { "" }
    ));
    Ok(())
}

fn read_echo_cell(
    ctx: &mut ScanContext,
    _cursor: &PaginationCursor,
    image: &RgbaImage,
    result: &mut ScanResult,
) -> Result<CellOutcome<String>> {
    let card_text = ctx.read_or_default(image, roi::ECHOES_CARD, &RecognizeOptions::ban(" +"))?;
    let (name, level) = parse_card(&card_text);
    let key = normalize_name(&name);
    if key.is_empty() || !ctx.catalog.echoes.contains(&key) {
        crate::log_debug(&format!("Skipping echo card \"{}\"", name));
        return Ok(CellOutcome::Skip(Flow::Continue));
    }

    let floors = ctx.config.floors;
    let card = crop(image, ctx.profile.rect(roi::ECHOES_CARD));
    let rarity = ctx.cache().tier(&card, "echo-rarity", classify_rarity);
    if rarity < floors.echo_min_rarity || level < floors.echo_min_level {
        return Ok(CellOutcome::Skip(Flow::Stop));
    }

    let name_text = ctx.read_or_default(image, roi::ECHOES_STATS_NAME, &RecognizeOptions::allow(LETTERS))?.to_lowercase();
    let name_lines: Vec<&str> = name_text.lines().collect();
    let stat_names = match_stats(&name_lines, &ctx.catalog.echo_stats);

    let value_text = ctx.read_or_default(image, roi::ECHOES_STATS_VALUE, &RecognizeOptions::allow(&format!("{}.%", DIGITS)))?;
    let values: Vec<&str> = value_text.split_whitespace().collect();
    let (tune_level, stats) = parse_stats(&stat_names, &values);

    let id = resolve_identity(&key, &ctx.catalog.echoes)
        .resolved()
        .map(|r| r.entry.id.clone())
        .unwrap_or_else(|| key.clone());

    result.echoes.push(EchoRecord {
        id: id.clone(),
        level,
        tune_level,
        rarity,
        stats,
    });
    Ok(CellOutcome::Found(
        Found {
            name: key,
            owned: 1,
            entity: id,
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

    fn stat_table() -> BTreeMap<String, String> {
        [
            ("Crit Rate", "CRIT Rate"),
            ("Crit DMG", "CRIT DMG"),
            ("ATK", "ATK"),
            ("HP", "HP"),
            ("Energy Regen", "Energy Regen"),
            ("Resonance Liberation DMG Bonus", "Resonance Liberation DMG Bonus"),
        ]
        .iter()
        .map(|(name, exported)| (stat_key(name), exported.to_string()))
        .collect()
    }

    #[test]
    fn test_parse_card() {
        assert_eq!(parse_card("crownless\ncost4\n25"), ("crownless".to_string(), 25));
        assert_eq!(parse_card("crownless\ncost4\n31"), ("crownless".to_string(), 25));
        assert_eq!(parse_card("crownless\ncost4"), ("crownless".to_string(), 0));
        assert_eq!(parse_card("Crownless\n\nxx"), ("crownless".to_string(), 0));
        assert_eq!(parse_card(""), (String::new(), 0));
    }

    #[test]
    fn test_match_stats_joins_wrapped_names() {
        let lines = ["critrate", "resonanceliberation", "dmgbonus", "", "noise", "atk"];
        assert_eq!(
            match_stats(&lines, &stat_table()),
            vec!["CRIT Rate", "Resonance Liberation DMG Bonus", "ATK"]
        );
    }

    #[test]
    fn test_parse_stats_splits_main_and_sub() {
        let names: Vec<String> = ["CRIT Rate", "ATK", "HP", "CRIT DMG"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let (tune, stats) = parse_stats(&names, &["22.0%", "150", "430", "12.6%"]);

        assert_eq!(tune, 2);
        assert_eq!(stats.main["CRIT Rate%"], StatValue::Percent(22.0));
        assert_eq!(stats.main["ATK"], StatValue::Flat(150));
        assert_eq!(stats.sub["HP"], StatValue::Flat(430));
        assert_eq!(stats.sub["CRIT DMG%"], StatValue::Percent(12.6));
    }

    #[test]
    fn test_parse_stats_without_subs() {
        let names = vec!["ATK".to_string(), "HP".to_string()];
        let (tune, stats) = parse_stats(&names, &["150", "bad"]);
        assert_eq!(tune, 0);
        assert_eq!(stats.main.len(), 1);
        assert!(stats.sub.is_empty());
    }

    fn catalog() -> Catalog {
        Catalog {
            echoes: CatalogTable::from_pairs(&[("Crownless", "6000042", Some(5)), ("Whiff Whaff", "6000044", Some(2))]),
            echo_stats: stat_table(),
            ..Catalog::default()
        }
    }

    fn script(state: &FakeState, size: (u32, u32)) -> String {
        let index = state.last_click().map(cell_of).map(|(row, col)| row * 6 + col);
        match (size, index) {
            ((130, 40), _) => "3/2000".to_string(),
            ((558, 170), Some(0)) => "Crownless\nCost 4\n+25".to_string(),
            ((558, 170), Some(1)) => "Unknown Thing\nCost 1\n+5".to_string(),
            ((558, 170), Some(2)) => "Whiff Whaff\nCost 1\n+3".to_string(),
            ((360, 380), Some(_)) => "Crit Rate\nATK\nCrit DMG".to_string(),
            ((100, 380), Some(_)) => "22.0%\n150\n12.6%".to_string(),
            _ => String::new(),
        }
    }

    #[test]
    fn test_scan_echoes_records_known_cards() {
        let (mut ctx, _) = fake_context(catalog(), ScanConfig::default(), Box::new(script));
        let mut result = ScanResult::default();
        scan_echoes(&mut ctx, &mut result).unwrap();

        assert_eq!(result.echoes.len(), 2);
        let first = &result.echoes[0];
        assert_eq!(first.id, "6000042");
        assert_eq!(first.level, 25);
        assert_eq!(first.tune_level, 1);
        assert_eq!(first.rarity, 1);
        assert_eq!(first.stats.sub["CRIT DMG%"], StatValue::Percent(12.6));
        assert_eq!(result.echoes[1].id, "6000044");
    }

    #[test]
    fn test_level_floor_stops_echo_walk() {
        let mut config = ScanConfig::default();
        config.floors.echo_min_level = 10;
        let (mut ctx, _) = fake_context(catalog(), config, Box::new(script));
        let mut result = ScanResult::default();
        scan_echoes(&mut ctx, &mut result).unwrap();

        assert_eq!(result.echoes.len(), 1);
        assert_eq!(result.echoes[0].id, "6000042");
    }

    #[test]
    fn test_failed_reads_degrade_the_record() {
        let (mut ctx, _) = fake_context(
            catalog(),
            ScanConfig::default(),
            Box::new(|state: &FakeState, size: (u32, u32)| {
                let index = state.last_click().map(cell_of).map(|(row, col)| row * 6 + col);
                match (size, index) {
                    ((100, 380), Some(0)) | ((558, 170), Some(2)) => RECOGNIZER_FAILS.to_string(),
                    _ => script(state, size),
                }
            }),
        );
        let mut result = ScanResult::default();
        scan_echoes(&mut ctx, &mut result).unwrap();

        assert_eq!(result.echoes.len(), 1);
        let first = &result.echoes[0];
        assert_eq!(first.id, "6000042");
        assert_eq!(first.level, 25);
        assert_eq!(first.tune_level, 0);
        assert!(first.stats.main.is_empty());
        assert!(first.stats.sub.is_empty());
    }
}
