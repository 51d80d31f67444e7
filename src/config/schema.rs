//! Configuration schema for the `.vantage_config.json` file.
//!
//! Maps directly to the JSON document discovered at the repository
//! root. Every field is optional: missing values fall back to lens
//! settings and built-in defaults, per the precedence chain
//! caller overrides > lens settings > configuration file > built-ins.

use serde::Deserialize;
use serde_json::Value;

use crate::truncate::TruncateMode;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Recognized top-level keys of the configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Globs added to the exclude-set.
    pub ignore_patterns: Vec<String>,
    /// Globs forming the include-set; a non-empty list whitelists.
    pub include_patterns: Vec<String>,
    /// User-defined lenses, by name. A name colliding with a built-in
    /// lens overrides it.
    pub lenses: std::collections::BTreeMap<String, LensConfig>,
    /// Everything else, collected so unknown keys can be reported on
    /// the diagnostic channel instead of silently vanishing.
    #[serde(flatten)]
    pub unknown: std::collections::BTreeMap<String, Value>,
}

// ---------------------------------------------------------------------------
// Lens configuration
// ---------------------------------------------------------------------------

/// One lens as it appears in the configuration file. Unset fields
/// inherit from the built-in lens of the same name (when overriding)
/// or from the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LensConfig {
    pub description: Option<String>,
    /// Overrides the top-level include-patterns for this lens.
    pub include: Option<Vec<String>>,
    /// Extends the top-level ignore-patterns for this lens.
    pub exclude: Option<Vec<String>>,
    pub truncate_mode: Option<TruncateMode>,
    /// Line limit for smart/simple truncation.
    pub truncate: Option<usize>,
    pub sort_by: Option<SortKey>,
    pub sort_order: Option<SortOrder>,
    pub groups: Option<Vec<GroupConfig>>,
}

/// One priority group: files matching `pattern` get `priority`, and
/// optionally a truncation-mode override or an always-include mark.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupConfig {
    pub pattern: String,
    pub priority: u8,
    #[serde(default)]
    pub truncate: Option<TruncateMode>,
    #[serde(default)]
    pub always_include: bool,
}

// ---------------------------------------------------------------------------
// Sort keys
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Name,
    Mtime,
    Ctime,
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "mtime" => Ok(Self::Mtime),
            "ctime" => Ok(Self::Ctime),
            other => Err(format!("unknown sort key '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("unknown sort order '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let config: ConfigFile = serde_json::from_str("{}").unwrap();
        assert!(config.ignore_patterns.is_empty());
        assert!(config.lenses.is_empty());
        assert!(config.unknown.is_empty());
    }

    #[test]
    fn parses_full_lens() {
        let json = r#"{
            "ignore_patterns": ["*.log"],
            "include_patterns": ["src/**"],
            "lenses": {
                "review": {
                    "description": "code review view",
                    "include": ["src/**", "tests/**"],
                    "truncate_mode": "smart",
                    "truncate": 250,
                    "sort_by": "mtime",
                    "sort_order": "desc",
                    "groups": [
                        {"pattern": "src/core/**", "priority": 95, "always_include": true},
                        {"pattern": "tests/**", "priority": 30, "truncate": "structure"}
                    ]
                }
            }
        }"#;
        let config: ConfigFile = serde_json::from_str(json).unwrap();
        let lens = &config.lenses["review"];
        assert_eq!(lens.truncate, Some(250));
        assert_eq!(lens.truncate_mode, Some(TruncateMode::Smart));
        assert_eq!(lens.sort_by, Some(SortKey::Mtime));
        let groups = lens.groups.as_ref().unwrap();
        assert_eq!(groups[0].priority, 95);
        assert!(groups[0].always_include);
        assert_eq!(groups[1].truncate, Some(TruncateMode::Structure));
    }

    #[test]
    fn unknown_keys_are_collected_not_rejected() {
        let config: ConfigFile =
            serde_json::from_str(r#"{"ignore_patterns": [], "surprise": 1}"#).unwrap();
        assert!(config.unknown.contains_key("surprise"));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let result: Result<ConfigFile, _> = serde_json::from_str("{not json");
        assert!(result.is_err());
    }
}
