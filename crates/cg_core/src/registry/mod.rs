use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RegistryState {
    Empty,
    Populated,
    Finalized,
}

/// Per-document mapping from source identity to a stable citation number.
///
/// Numbers form a dense sequence starting at 1 in order of first
/// appearance. The registry is single-writer state scoped to one
/// document's lifetime; callers sharing it across threads wrap it in a
/// `Mutex`. It must be `reset` (or a fresh instance used) between
/// documents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CitationRegistry {
    numbers: BTreeMap<String, u32>,
    state: RegistryState,
}

impl Default for CitationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CitationRegistry {
    pub fn new() -> Self {
        Self {
            numbers: BTreeMap::new(),
            state: RegistryState::Empty,
        }
    }

    pub fn state(&self) -> RegistryState {
        self.state
    }

    pub fn is_finalized(&self) -> bool {
        self.state == RegistryState::Finalized
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    /// Assign (or return the existing) citation number for a source.
    ///
    /// Idempotent: repeated calls for the same source id return the same
    /// number. New ids get `max(existing) + 1`, which keeps numbering
    /// append-only and in order of first appearance.
    pub fn register(&mut self, source_id: &str) -> Result<u32, AppError> {
        if self.is_finalized() {
            return Err(AppError::new(
                "REGISTRY_CLOSED",
                "Citation registry is finalized; no further registrations",
            )
            .with_details(format!("source_id={source_id}")));
        }
        if let Some(n) = self.numbers.get(source_id) {
            return Ok(*n);
        }
        let next = self.numbers.values().max().copied().unwrap_or(0) + 1;
        self.numbers.insert(source_id.to_string(), next);
        self.state = RegistryState::Populated;
        Ok(next)
    }

    pub fn number_for(&self, source_id: &str) -> Option<u32> {
        self.numbers.get(source_id).copied()
    }

    /// Resolve a citation number back to its source id.
    ///
    /// A registry loaded from an external blob may violate the dense
    /// invariant (the reviewer's job is to find that); ambiguity resolves
    /// to the lexicographically smallest id.
    pub fn source_for(&self, number: u32) -> Option<&str> {
        self.numbers
            .iter()
            .find(|(_, n)| **n == number)
            .map(|(id, _)| id.as_str())
    }

    /// Entries sorted by number, then id.
    pub fn citation_order(&self) -> Vec<(String, u32)> {
        let mut out: Vec<(String, u32)> = self
            .numbers
            .iter()
            .map(|(id, n)| (id.clone(), *n))
            .collect();
        out.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
        out
    }

    /// Numbers shared by more than one source id (possible only in a
    /// registry reloaded from a corrupted or merged blob).
    pub fn duplicate_numbers(&self) -> Vec<(u32, Vec<String>)> {
        let mut by_number: BTreeMap<u32, Vec<String>> = BTreeMap::new();
        for (id, n) in self.numbers.iter() {
            by_number.entry(*n).or_default().push(id.clone());
        }
        by_number.into_iter().filter(|(_, ids)| ids.len() > 1).collect()
    }

    /// Rebuild the mapping so numbers equal the rank of first appearance
    /// in `order`. The only operation allowed to change an existing
    /// source id's number.
    ///
    /// Registered ids absent from `order` keep their relative order after
    /// the ordered ids, so the sequence stays dense. Ids in `order` not
    /// yet registered are admitted here unless the registry is finalized.
    pub fn renumber_by_first_appearance(&mut self, order: &[String]) -> Result<(), AppError> {
        let mut ranked: Vec<String> = Vec::new();
        for id in order {
            if !ranked.iter().any(|r| r == id) {
                if !self.numbers.contains_key(id) && self.is_finalized() {
                    return Err(AppError::new(
                        "REGISTRY_CLOSED",
                        "Citation registry is finalized; renumber cannot admit new sources",
                    )
                    .with_details(format!("source_id={id}")));
                }
                ranked.push(id.clone());
            }
        }
        let mut remaining: Vec<(String, u32)> = self
            .numbers
            .iter()
            .filter(|(id, _)| !ranked.iter().any(|r| r == *id))
            .map(|(id, n)| (id.clone(), *n))
            .collect();
        remaining.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));

        let mut rebuilt: BTreeMap<String, u32> = BTreeMap::new();
        let mut next = 1u32;
        for id in ranked {
            rebuilt.insert(id, next);
            next += 1;
        }
        for (id, _) in remaining {
            rebuilt.insert(id, next);
            next += 1;
        }
        if !rebuilt.is_empty() && self.state == RegistryState::Empty {
            self.state = RegistryState::Populated;
        }
        self.numbers = rebuilt;
        Ok(())
    }

    /// Enter the terminal state. Further `register` calls fail with
    /// `REGISTRY_CLOSED`.
    pub fn finalize(&mut self) {
        self.state = RegistryState::Finalized;
    }

    /// Clear all state between documents.
    pub fn reset(&mut self) {
        self.numbers.clear();
        self.state = RegistryState::Empty;
    }

    pub fn save(&self) -> Result<String, AppError> {
        serde_json::to_string_pretty(self).map_err(|e| {
            AppError::new("REGISTRY_STORE_FAILED", "Failed to encode citation registry")
                .with_details(e.to_string())
        })
    }

    /// Decode a registry blob. Duplicate numbers are tolerated here so
    /// the reviewer can report them as findings.
    pub fn load(blob: &str) -> Result<Self, AppError> {
        serde_json::from_str(blob).map_err(|e| {
            AppError::new("REGISTRY_STORE_FAILED", "Failed to decode citation registry")
                .with_details(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_assigns_dense_numbers_in_first_appearance_order() {
        let mut reg = CitationRegistry::new();
        assert_eq!(reg.register("b").unwrap(), 1);
        assert_eq!(reg.register("a").unwrap(), 2);
        assert_eq!(reg.register("b").unwrap(), 1);
        assert_eq!(reg.register("c").unwrap(), 3);
        assert_eq!(reg.state(), RegistryState::Populated);
    }

    #[test]
    fn renumber_keeps_unlisted_ids_dense() {
        let mut reg = CitationRegistry::new();
        reg.register("a").unwrap();
        reg.register("b").unwrap();
        reg.register("c").unwrap();
        reg.renumber_by_first_appearance(&["c".to_string()]).unwrap();
        assert_eq!(reg.number_for("c"), Some(1));
        assert_eq!(reg.number_for("a"), Some(2));
        assert_eq!(reg.number_for("b"), Some(3));
    }
}
