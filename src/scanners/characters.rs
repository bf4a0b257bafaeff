//! Resonator roster: a single column of slots on the right edge, each opening
//! five detail sections on the left.
//!
//! The roster has no counter, so it is walked like an inventory grid of
//! unknown length with a 7x1 layout. Every character counts as one stack, so
//! the first repeated character marks the clamped last page.

use anyhow::Result;
use image::RgbaImage;

use super::context::{parse_keybind, ScanContext, MENU_OPEN_SETTLE, TAP_SETTLE};
use super::pagination::{walk, CellOutcome, Flow, Found, GridLayout, GridSurface, PaginationCursor, Termination};
use super::result::{CharacterRecord, EquippedWeapon, ScanResult, Skills};
use super::{DIGITS, PUNCTUATION};
use crate::automation::input::Key;
use crate::calibration::{indexed, roi, Point};
use crate::catalog::{normalize_name, resolve_identity, CatalogTable, Resolution};
use crate::ocr::extract::{parse_int, parse_level};
use crate::ocr::RecognizeOptions;

/// Catalog ID exported for the player character, whose name is user-defined.
pub const ROVER_ID: &str = "1502";

pub const ROSTER_LAYOUT: GridLayout = GridLayout {
    rows: 7,
    cols: 1,
    max_pages: 20,
};

const SLOT_SETTLE: f32 = 0.7;
const SECTION_SETTLE: f32 = 0.8;
const SECTION_PAUSE: f32 = 0.5;
const SKILL_TREE_SETTLE: f32 = 0.5;
const SKILL_NODE_SETTLE: f32 = 0.6;
const CHAIN_SETTLE: f32 = 0.7;

/// Detail sections in the order of the left-side tabs.
const SECTION_OVERVIEW: usize = 0;
const SECTION_WEAPON: usize = 1;
const SECTION_ECHOES: usize = 2;
const SECTION_SKILLS: usize = 3;
const SECTION_CHAIN: usize = 4;

/// Skill tree nodes above each skill that unlock stat bonuses.
const SKILL_TIERS: usize = 2;

/// The roster column as a grid: a click selects a character and opens its
/// overview.
struct Roster<'a> {
    ctx: &'a mut ScanContext,
}

impl Roster<'_> {
    fn slot_point(&self, row: usize) -> Point {
        let (_, pitch) = self.ctx.profile.offset(roi::CHARACTERS_OFFSET_RIGHT);
        self.ctx
            .profile
            .point(roi::CHARACTERS_RIGHT_SIDE)
            .offset(0, (pitch * row as f32) as i32)
    }
}

impl GridSurface for Roster<'_> {
    fn open_cell(&mut self, row: usize, _col: usize) -> Result<RgbaImage> {
        let slot = self.slot_point(row);
        self.ctx.controller.click(slot, SLOT_SETTLE)?;
        open_section(self.ctx, SECTION_OVERVIEW)
    }

    fn scroll_page(&mut self) -> Result<()> {
        let anchor = self.ctx.profile.point(roi::CHARACTERS_RIGHT_SIDE);
        let amount = self.ctx.profile.scalar(roi::SCROLL_CHARACTERS);
        self.ctx.controller.move_to(anchor, 0.3)?;
        self.ctx.controller.scroll(amount, 0.5)
    }
}

fn open_section(ctx: &mut ScanContext, section: usize) -> Result<RgbaImage> {
    let (_, pitch) = ctx.profile.offset(roi::CHARACTERS_OFFSET_LEFT);
    let tab = ctx
        .profile
        .point(roi::CHARACTERS_LEFT_SIDE)
        .offset(0, (pitch * section as f32) as i32);
    ctx.controller.click(tab, SECTION_SETTLE)?;
    ctx.screenshot()
}

/// Export ID for a recognized character name. The configured player name maps
/// to [`ROVER_ID`]; unknown names are kept as their normalized text.
pub fn character_id(observed: &str, table: &CatalogTable, rover_name: &str) -> String {
    let (key, id) = match resolve_identity(observed, table) {
        Resolution::Resolved(resolved) => (resolved.key, Some(resolved.entry.id)),
        Resolution::Unresolved { observed } => (observed, None),
    };
    if key == normalize_name(rover_name) {
        return ROVER_ID.to_string();
    }
    id.unwrap_or(key)
}

pub fn scan_characters(ctx: &mut ScanContext, result: &mut ScanResult) -> Result<()> {
    let key = parse_keybind(&ctx.config.resonator_keybind)?;
    ctx.controller.press(key, MENU_OPEN_SETTLE)?;

    let mut roster = Roster { ctx };
    let scan = walk(&mut roster, &ROSTER_LAYOUT, Termination::Encounters, |roster, cursor, image| {
        read_character(roster.ctx, cursor, image, result)
    })?;

    crate::log(&format!(
        "Characters: {} recorded over {} pages, {} slots visited",
        result.characters.len(),
        scan.summary.pages,
        scan.summary.cells_visited
    ));
    Ok(())
}

fn read_character(
    ctx: &mut ScanContext,
    _cursor: &PaginationCursor,
    overview: &RgbaImage,
    result: &mut ScanResult,
) -> Result<CellOutcome<String>> {
    let observed = ctx.read_or_default(overview, roi::CHARACTERS_NAME, &RecognizeOptions::ban(" "))?;
    if observed.is_empty() {
        return Ok(CellOutcome::Skip(Flow::Continue));
    }
    let id = character_id(&observed, &ctx.catalog.characters, &ctx.config.rover_name);
    if result.characters.contains_key(&id) {
        return Ok(CellOutcome::Seen { name: id, owned: 1 });
    }

    let mut record = CharacterRecord::new();
    let level_text = ctx.read_or_default(overview, roi::CHARACTERS_LEVEL, &RecognizeOptions::allow(&format!("{}/", DIGITS)))?;
    match parse_level(&level_text) {
        Some((level, ascension)) => {
            record.level = level;
            record.ascension = ascension;
        }
        None => crate::log_debug(&format!("Unreadable level \"{}\" for {}", level_text, id)),
    }
    ctx.controller.wait(SECTION_PAUSE)?;

    let weapon_screen = open_section(ctx, SECTION_WEAPON)?;
    read_equipped_weapon(ctx, &weapon_screen, &mut record.weapon)?;
    ctx.controller.wait(SECTION_PAUSE)?;

    // Echo loadouts are not read; the tab is still visited to keep the
    // section order the game expects.
    open_section(ctx, SECTION_ECHOES)?;
    ctx.controller.wait(SECTION_PAUSE)?;

    open_section(ctx, SECTION_SKILLS)?;
    read_skills(ctx, &mut record.skills)?;
    ctx.controller.wait(SECTION_PAUSE)?;

    open_section(ctx, SECTION_CHAIN)?;
    record.chain = read_chain(ctx)?;
    ctx.controller.wait(SECTION_PAUSE)?;

    crate::log_debug(&format!("Character {}: level {}, chain {}", id, record.level, record.chain));
    result.characters.insert(id.clone(), record);
    Ok(CellOutcome::Found(
        Found {
            name: id.clone(),
            owned: 1,
            entity: id,
        },
        Flow::Continue,
    ))
}

fn read_equipped_weapon(ctx: &mut ScanContext, screen: &RgbaImage, weapon: &mut EquippedWeapon) -> Result<()> {
    let observed = ctx.read_or_default(screen, roi::CHARACTERS_WEAPON_NAME, &RecognizeOptions::ban(" "))?;
    weapon.id = resolve_identity(&observed, &ctx.catalog.weapons)
        .resolved()
        .map(|r| r.entry.id.clone())
        .unwrap_or_else(|| normalize_name(&observed));

    let level_text = ctx.read_or_default(screen, roi::CHARACTERS_WEAPON_LEVEL, &RecognizeOptions::allow(&format!("{}/", DIGITS)))?;
    let rank_text = ctx.read_or_default(screen, roi::CHARACTERS_WEAPON_RANK, &RecognizeOptions::allow(DIGITS))?;
    match (parse_level(&level_text), parse_int(&rank_text)) {
        (Some((level, ascension)), Some(rank)) => {
            weapon.level = level;
            weapon.ascension = ascension;
            weapon.rank = rank;
        }
        _ => crate::log_debug(&format!(
            "Failed to read weapon {}: level \"{}\", rank \"{}\"",
            weapon.id, level_text, rank_text
        )),
    }
    Ok(())
}

/// Reads the five skill levels and counts activated nodes above each skill.
fn read_skills(ctx: &mut ScanContext, skills: &mut Skills) -> Result<()> {
    let tree = ctx.profile.point(roi::CHARACTERS_SKILL_CLICK);
    ctx.controller.click(tree, SKILL_TREE_SETTLE)?;
    let (_, node_pitch) = ctx.profile.offset(roi::CHARACTERS_OFFSET_SKILL);

    for index in 0..roi::SKILL_POSITION_COUNT {
        let position = ctx.profile.point(&indexed(roi::CHARACTERS_SKILL_POSITIONS, index));
        ctx.controller.click(position, TAP_SETTLE)?;

        let screen = ctx.screenshot()?;
        let text = ctx.read_or_default(&screen, roi::CHARACTERS_SKILL_LEVEL, &RecognizeOptions::allow(DIGITS))?;
        if let Some(level) = skills.level_mut(index) {
            *level = parse_int(&text).unwrap_or(1);
        }

        for tier in 1..=SKILL_TIERS {
            let node = position.offset(0, -((node_pitch * tier as f32) as i32));
            ctx.controller.click(node, SKILL_NODE_SETTLE)?;
            let label = ctx
                .read_live_or_default(roi::CHARACTERS_SKILL_BUTTON, &RecognizeOptions::default())?
                .to_lowercase();
            if label.trim() != ctx.catalog.labels.activated {
                break;
            }
            if let Some(unlocked) = skills.tier_mut(index) {
                *unlocked += 1;
            }
        }
    }

    ctx.controller.press(Key::ESCAPE, TAP_SETTLE)
}

/// Counts activated resonance chain nodes, stopping at the first locked one.
fn read_chain(ctx: &mut ScanContext) -> Result<u32> {
    let chain_view = ctx.profile.point(roi::CHARACTERS_CHAIN_CLICK);
    ctx.controller.click(chain_view, CHAIN_SETTLE)?;

    let options = RecognizeOptions::ban(&format!("{} ", PUNCTUATION));
    let mut chain = 0;
    for index in 0..roi::CHAIN_POSITION_COUNT {
        let node = ctx.profile.point(&indexed(roi::CHARACTERS_CHAIN_POSITIONS, index));
        ctx.controller.click(node, TAP_SETTLE)?;
        let status = ctx.read_live_or_default(roi::CHARACTERS_CHAIN_BUTTON, &options)?.to_lowercase();
        if status != ctx.catalog.labels.activated {
            break;
        }
        chain += 1;
    }

    ctx.controller.press(Key::ESCAPE, TAP_SETTLE)?;
    Ok(chain)
}
