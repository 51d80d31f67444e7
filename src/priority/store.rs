//! Priority store — an external, read-only mapping from relative path
//! to learned utility.
//!
//! The store is written by outside tooling (usage mining, manual
//! curation); this crate only ever reads it. It is loaded once per
//! invocation and kept immutable. Absence or unreadability is
//! non-fatal: the run degrades to static priorities, logged once.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Default store file name at the repository root.
pub const STORE_FILE_NAME: &str = ".vantage_priorities.json";

/// Tag that makes a file bypass budgeting entirely.
pub const ALWAYS_INCLUDE_TAG: &str = "always_include";

/// One learned record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreRecord {
    /// Learned utility in [0, 1].
    pub utility: f64,
    pub tags: Vec<String>,
    pub summary: Option<String>,
    /// Path of a shadow file carrying curated notes.
    pub shadow: Option<String>,
}

impl StoreRecord {
    pub fn always_include(&self) -> bool {
        self.tags.iter().any(|t| t == ALWAYS_INCLUDE_TAG)
    }

    /// Utility clamped into its documented range.
    pub fn clamped_utility(&self) -> f64 {
        if self.utility.is_nan() {
            0.0
        } else {
            self.utility.clamp(0.0, 1.0)
        }
    }
}

/// The loaded store: relative path → record.
#[derive(Debug, Clone, Default)]
pub struct PriorityStore {
    records: BTreeMap<String, StoreRecord>,
}

impl PriorityStore {
    /// Load a store from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read priority store {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse store content from JSON text.
    pub fn parse(content: &str) -> Result<Self> {
        let records: BTreeMap<String, StoreRecord> =
            serde_json::from_str(content).context("invalid priority store JSON")?;
        Ok(Self { records })
    }

    pub fn from_records(records: BTreeMap<String, StoreRecord>) -> Self {
        Self { records }
    }

    pub fn get(&self, rel_path: &str) -> Option<&StoreRecord> {
        self.records.get(rel_path)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}
