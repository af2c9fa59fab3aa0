//! Version ledger model.
//!
//! The persisted ledger records every `(version, revision)` pair that has
//! been applied. [`VersionLedger`] is the in-memory index loaded once per
//! run and consulted before each command is dispatched.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Type discriminator written into every ledger row
pub const DATABASE_VERSION_TYPE: &str = "Database";

/// Ledger key, stored as text exactly as the ledger table holds it
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VersionKey {
    pub value: String,
    pub revision: String,
}

impl VersionKey {
    pub fn new(value: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            revision: revision.into(),
        }
    }
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.revision.is_empty() {
            write!(f, "{}", self.value)
        } else {
            write!(f, "{}.{}", self.value, self.revision)
        }
    }
}

/// One ledger row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub version_type: String,
    pub key: VersionKey,
    /// Name of the command that produced the entry
    pub command: Option<String>,
    /// Program version that applied it
    pub program: Option<String>,
}

impl LedgerEntry {
    pub fn new(key: VersionKey, command: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            version_type: DATABASE_VERSION_TYPE.to_string(),
            key,
            command: Some(command.into()),
            program: Some(program.into()),
        }
    }

    /// Entry read from a ledger that predates revision tracking
    pub fn legacy(value: impl Into<String>) -> Self {
        Self {
            version_type: DATABASE_VERSION_TYPE.to_string(),
            key: VersionKey::new(value, ""),
            command: None,
            program: None,
        }
    }

    /// Major version as a number, if the stored text parses
    pub fn major(&self) -> Option<i32> {
        self.key.value.trim().parse().ok()
    }
}

/// In-memory ledger index keyed by `(value, revision)`, remembering load order
#[derive(Debug, Clone, Default)]
pub struct VersionLedger {
    index: HashMap<VersionKey, LedgerEntry>,
    order: Vec<VersionKey>,
}

impl VersionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from rows in load order; a repeated key keeps its first row
    pub fn from_entries(entries: impl IntoIterator<Item = LedgerEntry>) -> Self {
        let mut ledger = Self::new();
        for entry in entries {
            if !ledger.insert(entry.clone()) {
                log::warn!("Duplicate version ledger entry {} ignored", entry.key);
            }
        }
        ledger
    }

    pub fn contains(&self, key: &VersionKey) -> bool {
        self.index.contains_key(key)
    }

    /// Add an entry; returns false if the key was already present
    pub fn insert(&mut self, entry: LedgerEntry) -> bool {
        if self.index.contains_key(&entry.key) {
            return false;
        }
        self.order.push(entry.key.clone());
        self.index.insert(entry.key.clone(), entry);
        true
    }

    pub fn remove(&mut self, key: &VersionKey) -> Option<LedgerEntry> {
        let removed = self.index.remove(key)?;
        self.order.retain(|k| k != key);
        Some(removed)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Entries in the order they were loaded or recorded
    pub fn entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.order.iter().filter_map(|k| self.index.get(k))
    }

    /// The earliest loaded entry
    pub fn first(&self) -> Option<&LedgerEntry> {
        self.order.first().and_then(|k| self.index.get(k))
    }

    /// Number of entries recorded for one major version
    pub fn count_for_version(&self, value: &str) -> usize {
        self.index.keys().filter(|k| k.value == value).count()
    }

    /// Current schema version: the highest major version recorded, or 0
    pub fn current_version(&self) -> i32 {
        self.index
            .values()
            .filter_map(|entry| {
                let major = entry.major();
                if major.is_none() {
                    log::warn!("Ignoring unparsable ledger version '{}'", entry.key.value);
                }
                major
            })
            .max()
            .unwrap_or(0)
    }

    /// Whether the ledger still has the coarse one-row-per-version shape that
    /// needs backfilling into per-revision entries
    pub fn has_legacy_signature(&self) -> bool {
        self.len() > 1 && self.count_for_version("1") == 1
    }
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
