//! Configuration discovery and loading.
//!
//! The configuration file lives at the repository root as
//! `.vantage_config.json`. A missing file means built-in defaults;
//! malformed JSON is a fatal configuration error, reported before any
//! output is produced. Unknown keys are ignored with a one-line
//! diagnostic.

pub mod schema;

use std::path::Path;

use anyhow::{Context, Result};

use crate::diag::Diagnostics;

pub use schema::{ConfigFile, GroupConfig, LensConfig, SortKey, SortOrder};

/// File name looked up in the repository root.
pub const CONFIG_FILE_NAME: &str = ".vantage_config.json";

/// Load the configuration for a repository root.
///
/// Returns defaults when no config file exists. Parse failures are
/// fatal: a config the user wrote but we cannot honor must not be
/// silently replaced with defaults.
pub fn load(root: &Path, diag: &mut Diagnostics<'_>) -> Result<ConfigFile> {
    let path = root.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(ConfigFile::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config = parse(&content)
        .with_context(|| format!("malformed configuration in {}", path.display()))?;

    for key in config.unknown.keys() {
        diag.warn(&format!("ignoring unknown configuration key '{key}'"));
    }

    Ok(config)
}

/// Parse a configuration document from JSON text.
pub fn parse(content: &str) -> Result<ConfigFile> {
    serde_json::from_str(content).context("invalid JSON")
}
