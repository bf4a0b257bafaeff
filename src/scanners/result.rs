//! Scan output records. A `ScanResult` only grows: scanners fill one per run
//! and the orchestrator merges them.

use serde::Serialize;
use std::collections::BTreeMap;

/// An item the resolver could not map to a catalog ID.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedEntry {
    /// Path of the saved description crop.
    pub image: String,
    #[serde(rename = "owned")]
    pub observed_quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeaponRecord {
    pub id: String,
    pub level: u32,
    pub ascension: u32,
    pub rank: u32,
}

/// A numeric stat value: flat values are integers, percentages are floats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatValue {
    Flat(u32),
    Percent(f32),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EchoStats {
    pub main: BTreeMap<String, StatValue>,
    pub sub: BTreeMap<String, StatValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EchoRecord {
    pub id: String,
    pub level: u32,
    #[serde(rename = "tuneLv")]
    pub tune_level: u32,
    pub rarity: u8,
    pub stats: EchoStats,
}

/// Weapon equipped on a character.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquippedWeapon {
    pub id: String,
    pub level: u32,
    pub ascension: u32,
    pub rank: u32,
}

/// Skill levels and unlocked passive tiers of a character.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Skills {
    pub normal: u32,
    pub resonance: u32,
    pub forte: u32,
    pub liberation: u32,
    pub intro: u32,
    pub stats0: u32,
    pub stats1: u32,
    pub inherent: u32,
    pub stats3: u32,
    pub stats4: u32,
}

impl Default for Skills {
    fn default() -> Self {
        Self {
            normal: 1,
            resonance: 1,
            forte: 1,
            liberation: 1,
            intro: 1,
            stats0: 0,
            stats1: 0,
            inherent: 0,
            stats3: 0,
            stats4: 0,
        }
    }
}

impl Skills {
    /// Skill level slot for the skill tree column `index` (0..5).
    pub fn level_mut(&mut self, index: usize) -> Option<&mut u32> {
        match index {
            0 => Some(&mut self.normal),
            1 => Some(&mut self.resonance),
            2 => Some(&mut self.forte),
            3 => Some(&mut self.liberation),
            4 => Some(&mut self.intro),
            _ => None,
        }
    }

    /// Unlocked tier counter above skill column `index`. The middle column
    /// holds the inherent skills.
    pub fn tier_mut(&mut self, index: usize) -> Option<&mut u32> {
        match index {
            0 => Some(&mut self.stats0),
            1 => Some(&mut self.stats1),
            2 => Some(&mut self.inherent),
            3 => Some(&mut self.stats3),
            4 => Some(&mut self.stats4),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacterRecord {
    pub level: u32,
    pub ascension: u32,
    pub weapon: EquippedWeapon,
    /// Equipped echoes are not read yet; kept for the export shape.
    pub echoes: BTreeMap<String, String>,
    pub skills: Skills,
    pub chain: u32,
}

impl CharacterRecord {
    pub fn new() -> Self {
        Self {
            level: 0,
            ascension: 0,
            weapon: EquippedWeapon {
                id: "0".to_string(),
                level: 1,
                ascension: 0,
                rank: 0,
            },
            echoes: BTreeMap::new(),
            skills: Skills::default(),
            chain: 0,
        }
    }
}

impl Default for CharacterRecord {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanResult {
    pub inventory: BTreeMap<String, u32>,
    pub failed: Vec<FailedEntry>,
    pub characters: BTreeMap<String, CharacterRecord>,
    pub weapons: Vec<WeaponRecord>,
    pub echoes: Vec<EchoRecord>,
    pub achievements: Vec<String>,
}

impl ScanResult {
    /// Folds `other` into `self`. Keyed collections take the newer value.
    pub fn merge(&mut self, other: ScanResult) {
        self.inventory.extend(other.inventory);
        self.failed.extend(other.failed);
        self.characters.extend(other.characters);
        self.weapons.extend(other.weapons);
        self.echoes.extend(other.echoes);
        for id in other.achievements {
            if !self.achievements.contains(&id) {
                self.achievements.push(id);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inventory.is_empty()
            && self.failed.is_empty()
            && self.characters.is_empty()
            && self.weapons.is_empty()
            && self.echoes.is_empty()
            && self.achievements.is_empty()
    }

    /// One-line size summary for logs.
    pub fn summary(&self) -> String {
        format!(
            "{} items, {} failed, {} characters, {} weapons, {} echoes, {} achievements",
            self.inventory.len(),
            self.failed.len(),
            self.characters.len(),
            self.weapons.len(),
            self.echoes.len(),
            self.achievements.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_character_record_defaults() {
        let record = CharacterRecord::new();
        assert_eq!(record.level, 0);
        assert_eq!(record.weapon.level, 1);
        assert_eq!(record.skills.normal, 1);
        assert_eq!(record.skills.intro, 1);
        assert_eq!(record.skills.inherent, 0);
        assert_eq!(record.chain, 0);
    }

    #[test]
    fn test_tier_slot_for_middle_column_is_inherent() {
        let mut skills = Skills::default();
        *skills.tier_mut(2).unwrap() += 1;
        *skills.tier_mut(4).unwrap() += 2;
        assert_eq!(skills.inherent, 1);
        assert_eq!(skills.stats4, 2);
        assert!(skills.tier_mut(5).is_none());
    }

    #[test]
    fn test_merge_overwrites_keys_and_appends_lists() {
        let mut a = ScanResult::default();
        a.inventory.insert("2".into(), 100);
        a.achievements.push("1001".into());

        let mut b = ScanResult::default();
        b.inventory.insert("2".into(), 150);
        b.inventory.insert("43010001".into(), 7);
        b.achievements.push("1001".into());
        b.achievements.push("1002".into());
        b.weapons.push(WeaponRecord {
            id: "21010016".into(),
            level: 90,
            ascension: 6,
            rank: 1,
        });

        a.merge(b);
        assert_eq!(a.inventory["2"], 150);
        assert_eq!(a.inventory.len(), 2);
        assert_eq!(a.achievements, vec!["1001", "1002"]);
        assert_eq!(a.weapons.len(), 1);
    }

    #[test]
    fn test_echo_serializes_tune_level_and_stat_values() {
        let mut stats = EchoStats::default();
        stats.main.insert("Crit. Rate%".into(), StatValue::Percent(22.0));
        stats.sub.insert("ATK".into(), StatValue::Flat(50));
        let echo = EchoRecord {
            id: "6000060".into(),
            level: 25,
            tune_level: 3,
            rarity: 5,
            stats,
        };
        let json = serde_json::to_value(&echo).unwrap();
        assert_eq!(json["tuneLv"], 3);
        assert_eq!(json["stats"]["sub"]["ATK"], 50);
        assert_eq!(json["stats"]["main"]["Crit. Rate%"], 22.0);
    }
}
