//! JSON catalog tables loaded from the `data/` directory.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use super::resolver::normalize_name;

/// A canonical catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: String,
    pub rarity: Option<u8>,
    pub image: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

/// Table values are either a bare ID or an object with optional metadata.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Full {
        id: RawId,
        #[serde(default)]
        rarity: Option<u8>,
        #[serde(default)]
        image: Option<String>,
    },
    Id(RawId),
}

impl From<RawEntry> for CatalogEntry {
    fn from(raw: RawEntry) -> Self {
        match raw {
            RawEntry::Full { id, rarity, image } => CatalogEntry {
                id: id.into_string(),
                rarity,
                image,
            },
            RawEntry::Id(id) => CatalogEntry {
                id: id.into_string(),
                rarity: None,
                image: None,
            },
        }
    }
}

/// Name → entry table keyed by normalized name. Display names are kept for
/// lookups that must type the name back into the game.
#[derive(Debug, Clone, Default)]
pub struct CatalogTable {
    entries: BTreeMap<String, CatalogEntry>,
    display_names: BTreeMap<String, String>,
}

impl CatalogTable {
    fn from_raw(raw: BTreeMap<String, RawEntry>) -> Self {
        let mut table = Self::default();
        for (name, entry) in raw {
            table.insert(&name, entry.into());
        }
        table
    }

    pub fn insert(&mut self, name: &str, entry: CatalogEntry) {
        let key = normalize_name(name);
        self.display_names.insert(key.clone(), name.to_string());
        self.entries.insert(key, entry);
    }

    /// Lookup by normalized key.
    pub fn get(&self, key: &str) -> Option<&CatalogEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CatalogEntry)> {
        self.entries.iter()
    }

    /// `(display name, entry)` pairs in key order.
    pub fn display_entries(&self) -> impl Iterator<Item = (&str, &CatalogEntry)> {
        self.entries.iter().map(|(key, entry)| {
            let name = self.display_names.get(key).map(String::as_str).unwrap_or(key);
            (name, entry)
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn from_pairs(pairs: &[(&str, &str, Option<u8>)]) -> Self {
        let mut table = Self::default();
        for (name, id, rarity) in pairs {
            table.insert(
                name,
                CatalogEntry {
                    id: id.to_string(),
                    rarity: *rarity,
                    image: None,
                },
            );
        }
        table
    }
}

fn default_activated() -> String {
    "activated".to_string()
}

fn default_claimed() -> String {
    "claimed".to_string()
}

fn default_terminal() -> String {
    "terminal".to_string()
}

/// UI labels compared against recognized text (lowercase).
#[derive(Debug, Clone, Deserialize)]
pub struct Labels {
    #[serde(default = "default_activated")]
    pub activated: String,
    #[serde(default = "default_claimed")]
    pub claimed: String,
    #[serde(default = "default_terminal")]
    pub terminal: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            activated: default_activated(),
            claimed: default_claimed(),
            terminal: default_terminal(),
        }
    }
}

/// All tables a scan resolves against. Read-only during a scan.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub items: CatalogTable,
    pub weapons: CatalogTable,
    pub characters: CatalogTable,
    pub echoes: CatalogTable,
    /// Stat key (see [`stat_key`]) → exported stat name.
    pub echo_stats: BTreeMap<String, String>,
    pub achievements: CatalogTable,
    pub labels: Labels,
}

impl Catalog {
    /// Loads every table from `dir`. Missing files yield empty tables; files
    /// that exist but do not parse are errors.
    pub fn load(dir: &Path) -> Result<Self> {
        let stats: BTreeMap<String, String> = read_json(dir, "echoStats.json")?.unwrap_or_default();
        let catalog = Catalog {
            items: load_table(dir, "items.json")?,
            weapons: load_table(dir, "weapons.json")?,
            characters: load_table(dir, "characters.json")?,
            echoes: load_table(dir, "echoes.json")?,
            echo_stats: stats
                .into_iter()
                .map(|(name, value)| (stat_key(&name), value))
                .collect(),
            achievements: load_table(dir, "achievements.json")?,
            labels: read_json(dir, "labels.json")?.unwrap_or_default(),
        };

        crate::log(&format!(
            "Catalog loaded: {} items, {} weapons, {} characters, {} echoes, {} echo stats, {} achievements",
            catalog.items.len(),
            catalog.weapons.len(),
            catalog.characters.len(),
            catalog.echoes.len(),
            catalog.echo_stats.len(),
            catalog.achievements.len()
        ));
        Ok(catalog)
    }
}

/// Lowercase letters only. Stat names are recognized with a letters-only
/// filter, so punctuation and spaces never reach the lookup.
pub fn stat_key(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect()
}

fn load_table(dir: &Path, file: &str) -> Result<CatalogTable> {
    let raw: Option<BTreeMap<String, RawEntry>> = read_json(dir, file)?;
    Ok(raw.map(CatalogTable::from_raw).unwrap_or_default())
}

fn read_json<T: serde::de::DeserializeOwned>(dir: &Path, file: &str) -> Result<Option<T>> {
    let path = dir.join(file);
    if !path.exists() {
        crate::log(&format!("Catalog file {} not found, using an empty table", path.display()));
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Some(value))
}
