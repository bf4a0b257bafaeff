//! Generic grid walker.
//!
//! Visits every cell of a rows×cols grid that spans pages reached by
//! scrolling. Two termination strategies:
//!
//! - `KnownCount`: the panel shows an `"N/M"` counter, so exactly N cells are
//!   visited.
//! - `Encounters`: the length is unknown. Names are tallied against a bound
//!   derived from the stack size; the first name seen more often than its
//!   bound means the grid has wrapped (the last page is clamped and shows
//!   cells already visited). The walker then scans the current page in
//!   reverse to pick up the cells past the wrap point.

use anyhow::Result;
use image::RgbaImage;
use std::collections::HashMap;

/// Maximum stack size of one inventory cell.
///
/// The game caps stacks at 999. If that cap ever changes, the encounter bound
/// (and therefore wrap detection) silently breaks.
pub const STACK_CAP: u32 = 999;

/// How many times a name may legitimately appear in a grid given its owned
/// quantity.
pub fn encounter_bound(owned: u32) -> u32 {
    owned.div_ceil(STACK_CAP).max(1)
}

/// The input side of a grid: opening a cell and moving to the next page.
pub trait GridSurface {
    /// Selects cell (`row`, `col`) on the current page and returns a
    /// screenshot of the resulting screen.
    fn open_cell(&mut self, row: usize, col: usize) -> Result<RgbaImage>;

    /// Scrolls the grid by one page.
    fn scroll_page(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Copy)]
pub struct GridLayout {
    pub rows: usize,
    pub cols: usize,
    /// Page limit for grids of unknown length.
    pub max_pages: usize,
}

impl GridLayout {
    pub fn cells_per_page(&self) -> usize {
        self.rows * self.cols
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Item count read from the panel counter; `None` when unreadable.
    KnownCount(Option<u32>),
    Encounters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// An entity read from one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Found<T> {
    /// Identity used for duplicate detection.
    pub name: String,
    /// Stack size, drives the encounter bound.
    pub owned: u32,
    pub entity: T,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellOutcome<T> {
    /// A new entity to record.
    Found(Found<T>, Flow),
    /// An entity was identified but nothing needs recording (already known).
    Seen { name: String, owned: u32 },
    /// The cell holds nothing usable.
    Skip(Flow),
}

/// Position and duplicate-detection state of one grid walk.
#[derive(Debug, Clone)]
pub struct PaginationCursor {
    pub page: usize,
    pub row: usize,
    pub col: usize,
    pub direction: Direction,
    pub encounter_counts: HashMap<String, u32>,
    pub sentinel: Option<String>,
}

impl PaginationCursor {
    fn new() -> Self {
        Self {
            page: 0,
            row: 0,
            col: 0,
            direction: Direction::Forward,
            encounter_counts: HashMap::new(),
            sentinel: None,
        }
    }

    /// Tallies one sighting of `name`. Returns true when it exceeds its bound.
    pub fn record_encounter(&mut self, name: &str, owned: u32) -> bool {
        let count = self.encounter_counts.entry(name.to_string()).or_insert(0);
        *count += 1;
        *count > encounter_bound(owned)
    }

    pub fn is_sentinel(&self, name: &str) -> bool {
        self.sentinel.as_deref() == Some(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub cells_visited: usize,
    pub pages: usize,
    pub scrolls: usize,
    pub reverse_cells: usize,
    pub sentinel: Option<String>,
    pub stopped_early: bool,
}

#[derive(Debug, Clone)]
pub struct GridScan<T> {
    pub entries: Vec<Found<T>>,
    pub summary: WalkSummary,
}

impl<T> GridScan<T> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            summary: WalkSummary::default(),
        }
    }

    /// Replaces the entry with the same name, or appends.
    fn upsert(&mut self, found: Found<T>) {
        match self.entries.iter_mut().find(|e| e.name == found.name) {
            Some(existing) => *existing = found,
            None => self.entries.push(found),
        }
    }
}

/// Walks the grid, calling `process` for each opened cell.
///
/// `process` receives the surface (so it can read more of the screen), the
/// cursor and the cell screenshot. Errors from the surface or `process` abort
/// the walk.
pub fn walk<S, T, F>(
    surface: &mut S,
    layout: &GridLayout,
    termination: Termination,
    process: F,
) -> Result<GridScan<T>>
where
    S: GridSurface,
    F: FnMut(&mut S, &PaginationCursor, &RgbaImage) -> Result<CellOutcome<T>>,
{
    let scan = match termination {
        Termination::KnownCount(count) => walk_known(surface, layout, count, process)?,
        Termination::Encounters => walk_encounters(surface, layout, process)?,
    };
    crate::log_debug(&format!("Grid walk finished: {:?}", scan.summary));
    Ok(scan)
}

fn walk_known<S, T, F>(
    surface: &mut S,
    layout: &GridLayout,
    count: Option<u32>,
    mut process: F,
) -> Result<GridScan<T>>
where
    S: GridSurface,
    F: FnMut(&mut S, &PaginationCursor, &RgbaImage) -> Result<CellOutcome<T>>,
{
    let per_page = layout.cells_per_page();
    let total = match count {
        Some(n) => n as usize,
        None => {
            crate::log("Item counter unreadable, scanning one page");
            per_page
        }
    };
    let pages = total.div_ceil(per_page.max(1));

    let mut scan = GridScan::new();
    let mut cursor = PaginationCursor::new();

    'pages: for page in 0..pages {
        cursor.page = page;
        scan.summary.pages += 1;

        for row in 0..layout.rows {
            for col in 0..layout.cols {
                if page * per_page + row * layout.cols + col >= total {
                    break 'pages;
                }
                cursor.row = row;
                cursor.col = col;

                let image = surface.open_cell(row, col)?;
                scan.summary.cells_visited += 1;

                let flow = match process(surface, &cursor, &image)? {
                    CellOutcome::Found(found, flow) => {
                        scan.entries.push(found);
                        flow
                    }
                    CellOutcome::Seen { .. } => Flow::Continue,
                    CellOutcome::Skip(flow) => flow,
                };
                if flow == Flow::Stop {
                    scan.summary.stopped_early = true;
                    break 'pages;
                }
            }
        }

        if page + 1 < pages {
            surface.scroll_page()?;
            scan.summary.scrolls += 1;
        }
    }

    Ok(scan)
}

fn walk_encounters<S, T, F>(
    surface: &mut S,
    layout: &GridLayout,
    mut process: F,
) -> Result<GridScan<T>>
where
    S: GridSurface,
    F: FnMut(&mut S, &PaginationCursor, &RgbaImage) -> Result<CellOutcome<T>>,
{
    let mut scan = GridScan::new();
    let mut cursor = PaginationCursor::new();

    'pages: for page in 0..layout.max_pages {
        cursor.page = page;
        scan.summary.pages += 1;
        let mut page_had_entity = false;

        for row in 0..layout.rows {
            for col in 0..layout.cols {
                cursor.row = row;
                cursor.col = col;

                let image = surface.open_cell(row, col)?;
                scan.summary.cells_visited += 1;

                let (sighting, flow) = match process(surface, &cursor, &image)? {
                    CellOutcome::Found(found, flow) => {
                        let sighting = (found.name.clone(), found.owned);
                        scan.upsert(found);
                        (Some(sighting), flow)
                    }
                    CellOutcome::Seen { name, owned } => (Some((name, owned)), Flow::Continue),
                    CellOutcome::Skip(flow) => (None, flow),
                };

                if let Some((name, owned)) = sighting {
                    page_had_entity = true;
                    if cursor.record_encounter(&name, owned) {
                        crate::log_debug(&format!(
                            "\"{}\" exceeded its bound at page {} cell ({}, {}), grid wrapped",
                            name, page, row, col
                        ));
                        cursor.sentinel = Some(name);
                        break 'pages;
                    }
                }
                if flow == Flow::Stop {
                    scan.summary.stopped_early = true;
                    return Ok(scan);
                }
            }
        }

        if !page_had_entity {
            crate::log_debug(&format!("Page {} had no entities, ending walk", page));
            return Ok(scan);
        }

        if page + 1 < layout.max_pages {
            surface.scroll_page()?;
            scan.summary.scrolls += 1;
        } else {
            crate::log(&format!(
                "Reached the {} page limit without detecting the end of the grid",
                layout.max_pages
            ));
            return Ok(scan);
        }
    }

    if cursor.sentinel.is_none() {
        return Ok(scan);
    }
    scan.summary.sentinel = cursor.sentinel.clone();
    cursor.direction = Direction::Backward;

    'reverse: for row in (0..layout.rows).rev() {
        for col in (0..layout.cols).rev() {
            cursor.row = row;
            cursor.col = col;

            let image = surface.open_cell(row, col)?;
            scan.summary.cells_visited += 1;
            scan.summary.reverse_cells += 1;

            let (sighting, flow) = match process(surface, &cursor, &image)? {
                CellOutcome::Found(found, flow) => {
                    if cursor.is_sentinel(&found.name) {
                        continue;
                    }
                    let sighting = (found.name.clone(), found.owned);
                    scan.upsert(found);
                    (Some(sighting), flow)
                }
                CellOutcome::Seen { name, owned } => {
                    if cursor.is_sentinel(&name) {
                        continue;
                    }
                    (Some((name, owned)), Flow::Continue)
                }
                CellOutcome::Skip(flow) => (None, flow),
            };

            if let Some((name, owned)) = sighting {
                if cursor.record_encounter(&name, owned) {
                    break 'reverse;
                }
            }
            if flow == Flow::Stop {
                scan.summary.stopped_early = true;
                break 'reverse;
            }
        }
    }

    Ok(scan)
}
