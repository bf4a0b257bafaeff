//! JSON export of a finished scan.
//!
//! Each scan gets its own folder `<export>/<run_id>/`. Only sections that
//! hold data are written, so the folder is created on the first write and a
//! scan that read nothing leaves no trace.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::scanners::ScanResult;

fn write_json(value: &impl Serialize, dir: &Path, name: &str) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(value).context(format!("Failed to serialize {}", name))?;

    fs::create_dir_all(dir).context(format!("Failed to create export folder: {}", dir.display()))?;
    let path = dir.join(name);
    let mut file =
        File::create(&path).context(format!("Failed to create JSON file: {}", path.display()))?;
    file.write_all(json.as_bytes())
        .context(format!("Failed to write {}", name))?;

    Ok(path)
}

/// Wraps each record as `{id: record-without-id}`, keeping scan order.
fn keyed_by_id<T: Serialize>(records: &[T]) -> Result<Vec<Value>> {
    records
        .iter()
        .map(|record| -> Result<Value> {
            let mut fields = match serde_json::to_value(record)? {
                Value::Object(fields) => fields,
                other => return Ok(other),
            };
            let id = match fields.remove("id") {
                Some(Value::String(id)) => id,
                Some(other) => other.to_string(),
                None => return Ok(Value::Object(fields)),
            };
            let mut entry = Map::new();
            entry.insert(id, Value::Object(fields));
            Ok(Value::Object(entry))
        })
        .collect()
}

/// Writes the non-empty sections of `result`. Returns the written paths.
pub fn save(result: &ScanResult, export_root: &Path, run_id: &str) -> Result<Vec<PathBuf>> {
    let dir = export_root.join(run_id);
    let mut written = Vec::new();

    if !result.inventory.is_empty() {
        let inventory = json!({ "date": run_id, "items": result.inventory });
        written.push(write_json(&inventory, &dir, "inventory.json")?);
    }
    if !result.failed.is_empty() {
        written.push(write_json(&result.failed, &dir, "failed.json")?);
    }
    if !result.characters.is_empty() {
        written.push(write_json(&result.characters, &dir, "characters.json")?);
    }
    if !result.weapons.is_empty() {
        written.push(write_json(&keyed_by_id(&result.weapons)?, &dir, "weapons.json")?);
    }
    if !result.echoes.is_empty() {
        written.push(write_json(&keyed_by_id(&result.echoes)?, &dir, "echoes.json")?);
    }
    if !result.achievements.is_empty() {
        written.push(write_json(&result.achievements, &dir, "achievements.json")?);
    }

    for path in &written {
        crate::log(&format!("Exported {}", path.display()));
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanners::result::{FailedEntry, WeaponRecord};
    use tempfile::tempdir;

    fn read(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_empty_result_writes_nothing() {
        let dir = tempdir().unwrap();
        let written = save(&ScanResult::default(), dir.path(), "20250101_120000").unwrap();
        assert!(written.is_empty());
        assert!(!dir.path().join("20250101_120000").exists());
    }

    #[test]
    fn test_inventory_and_failed_files() {
        let mut result = ScanResult::default();
        result.inventory.insert("2".into(), 1500);
        result.inventory.insert("43010001".into(), 12);
        result.failed.push(FailedEntry {
            image: "logs/fail/x/_strange_item-101010000.png".into(),
            observed_quantity: 3,
        });

        let dir = tempdir().unwrap();
        let written = save(&result, dir.path(), "20250101_120000").unwrap();
        assert_eq!(written.len(), 2);

        let run_dir = dir.path().join("20250101_120000");
        let inventory = read(&run_dir.join("inventory.json"));
        assert_eq!(inventory["date"], "20250101_120000");
        assert_eq!(inventory["items"]["2"], 1500);
        assert_eq!(inventory["items"]["43010001"], 12);

        let failed = read(&run_dir.join("failed.json"));
        assert_eq!(failed[0]["owned"], 3);
        assert!(!run_dir.join("weapons.json").exists());
    }

    #[test]
    fn test_weapons_are_keyed_by_id() {
        let mut result = ScanResult::default();
        for (id, level) in [("21010016", 90), ("21010016", 20)] {
            result.weapons.push(WeaponRecord {
                id: id.into(),
                level,
                ascension: 0,
                rank: 1,
            });
        }

        let dir = tempdir().unwrap();
        save(&result, dir.path(), "run").unwrap();

        let weapons = read(&dir.path().join("run").join("weapons.json"));
        let list = weapons.as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["21010016"]["level"], 90);
        assert_eq!(list[1]["21010016"]["level"], 20);
        assert!(list[0]["21010016"].get("id").is_none());
    }
}
