//! Maps noisy recognized names to canonical catalog entries.

use super::store::{CatalogEntry, CatalogTable};

/// Minimum normalized similarity for a fuzzy match.
pub const SIMILARITY_CUTOFF: f32 = 0.9;

/// Canonical form of a name: lowercase with all whitespace removed.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    /// Normalized catalog key that matched.
    pub key: String,
    pub entry: CatalogEntry,
    pub exact: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(Resolved),
    Unresolved { observed: String },
}

impl Resolution {
    pub fn resolved(&self) -> Option<&Resolved> {
        match self {
            Resolution::Resolved(r) => Some(r),
            Resolution::Unresolved { .. } => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }
}

/// Exact lookup of the normalized name, then the most similar key at or
/// above [`SIMILARITY_CUTOFF`]. Ties keep the first key in table order.
pub fn resolve_identity(observed: &str, table: &CatalogTable) -> Resolution {
    let normalized = normalize_name(observed);

    if let Some(entry) = table.get(&normalized) {
        return Resolution::Resolved(Resolved {
            key: normalized,
            entry: entry.clone(),
            exact: true,
        });
    }

    let best = table
        .iter()
        .map(|(key, entry)| (similarity_ratio(&normalized, key), key, entry))
        .filter(|(score, _, _)| *score >= SIMILARITY_CUTOFF)
        .fold(None::<(f32, &String, &CatalogEntry)>, |best, candidate| match best {
            Some(b) if b.0 >= candidate.0 => Some(b),
            _ => Some(candidate),
        });

    match best {
        Some((_, key, entry)) => Resolution::Resolved(Resolved {
            key: key.clone(),
            entry: entry.clone(),
            exact: false,
        }),
        None => Resolution::Unresolved {
            observed: normalized,
        },
    }
}

/// Resolves against several tables in order. Returns the index of the first
/// table that resolved the name.
pub fn resolve_in(observed: &str, tables: &[&CatalogTable]) -> Option<(usize, Resolved)> {
    tables
        .iter()
        .enumerate()
        .find_map(|(i, table)| match resolve_identity(observed, table) {
            Resolution::Resolved(r) => Some((i, r)),
            Resolution::Unresolved { .. } => None,
        })
}

/// `1 - distance / max_len` over characters.
pub fn similarity_ratio(a: &str, b: &str) -> f32 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    let distance = levenshtein(a, b);
    1.0 - (distance as f32 / max_len as f32)
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, a_ch) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, b_ch) in b.iter().enumerate() {
            let cost = if a_ch == b_ch { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        prev.clone_from_slice(&curr);
    }

    prev[b.len()]
}
