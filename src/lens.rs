//! Lenses — named bundles of selection, sorting, priority-grouping,
//! and truncation defaults.
//!
//! Five lenses ship built in; the configuration file can add more or
//! override a built-in by name. Resolution order for every effective
//! parameter is: explicit caller overrides > lens settings >
//! configuration defaults > built-in defaults.

use anyhow::{Result, bail};

use crate::config::{ConfigFile, GroupConfig, LensConfig, SortKey, SortOrder};
use crate::truncate::{DEFAULT_LINE_LIMIT, TruncateMode};

// ---------------------------------------------------------------------------
// Lens model
// ---------------------------------------------------------------------------

/// A priority group: files matching `pattern` receive `priority`
/// (0–100), optionally a truncation-mode override or an
/// always-include mark that bypasses budgeting.
#[derive(Debug, Clone)]
pub struct PriorityGroup {
    pub pattern: String,
    pub priority: u8,
    pub truncate: Option<TruncateMode>,
    pub always_include: bool,
}

impl PriorityGroup {
    fn new(pattern: &str, priority: u8) -> Self {
        Self {
            pattern: pattern.to_string(),
            priority,
            truncate: None,
            always_include: false,
        }
    }
}

/// A fully resolved lens.
#[derive(Debug, Clone)]
pub struct Lens {
    pub name: String,
    pub description: String,
    /// Include globs; empty means "admit everything not excluded".
    pub include: Vec<String>,
    /// Exclude globs, extending the top-level ignore patterns.
    pub exclude: Vec<String>,
    pub truncate_mode: TruncateMode,
    pub truncate_lines: usize,
    pub sort_by: SortKey,
    pub sort_order: SortOrder,
    pub groups: Vec<PriorityGroup>,
}

impl Default for Lens {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            description: "full repository view".to_string(),
            include: Vec::new(),
            exclude: Vec::new(),
            truncate_mode: TruncateMode::None,
            truncate_lines: DEFAULT_LINE_LIMIT,
            sort_by: SortKey::Name,
            sort_order: SortOrder::Asc,
            groups: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Built-in lenses
// ---------------------------------------------------------------------------

/// Names of the built-in lenses, in presentation order.
pub const BUILTIN_NAMES: &[&str] = &[
    "architecture",
    "debug",
    "security",
    "onboarding",
    "minimal",
];

/// Construct a built-in lens by name.
pub fn builtin(name: &str) -> Option<Lens> {
    let lens = match name {
        "architecture" => Lens {
            name: name.to_string(),
            description: "signatures only: types, functions, imports".to_string(),
            truncate_mode: TruncateMode::Structure,
            groups: vec![
                PriorityGroup::new("src/**", 80),
                PriorityGroup::new("lib/**", 80),
                PriorityGroup::new("tests/**", 30),
            ],
            ..Lens::default()
        },
        "debug" => Lens {
            name: name.to_string(),
            description: "recently changed files first, untruncated".to_string(),
            truncate_mode: TruncateMode::None,
            sort_by: SortKey::Mtime,
            sort_order: SortOrder::Desc,
            ..Lens::default()
        },
        "security" => Lens {
            name: name.to_string(),
            description: "auth, crypto, and configuration surfaces".to_string(),
            include: strings(&[
                "*auth*",
                "*crypto*",
                "*secret*",
                "*token*",
                "*session*",
                "*password*",
                "*.env*",
                "*config*",
                "*settings*",
            ]),
            truncate_mode: TruncateMode::Smart,
            truncate_lines: 300,
            groups: vec![
                PriorityGroup::new("*auth*", 90),
                PriorityGroup::new("*crypto*", 90),
                PriorityGroup::new("*config*", 70),
            ],
            ..Lens::default()
        },
        "onboarding" => Lens {
            name: name.to_string(),
            description: "balanced tour for a new contributor".to_string(),
            truncate_mode: TruncateMode::Smart,
            truncate_lines: 400,
            groups: vec![
                PriorityGroup::new("README*", 95),
                PriorityGroup::new("*.md", 70),
                PriorityGroup::new("src/**", 65),
                PriorityGroup::new("tests/**", 35),
            ],
            ..Lens::default()
        },
        "minimal" => Lens {
            name: name.to_string(),
            description: "entry points, READMEs, and manifests only".to_string(),
            include: strings(&[
                "README*",
                "main.*",
                "index.*",
                "app.*",
                "Cargo.toml",
                "package.json",
                "pyproject.toml",
                "setup.py",
                "go.mod",
                "Makefile",
                "Dockerfile",
            ]),
            truncate_mode: TruncateMode::None,
            ..Lens::default()
        },
        _ => return None,
    };
    Some(lens)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve a lens by name against the configuration file.
///
/// A config lens with a built-in's name starts from that built-in and
/// overrides only the fields it sets; a config lens with a new name
/// starts from the default lens. An unknown name is a fatal
/// configuration error.
pub fn resolve(name: &str, config: &ConfigFile) -> Result<Lens> {
    let base = builtin(name);
    let user = config.lenses.get(name);

    match (base, user) {
        (Some(base), None) => Ok(base),
        (Some(base), Some(user)) => Ok(overlay(base, name, user)),
        (None, Some(user)) => Ok(overlay(Lens::default(), name, user)),
        (None, None) => bail!("unknown lens '{name}'"),
    }
}

/// Every lens available under this configuration: built-ins (possibly
/// overridden) plus user-defined ones, in stable order.
pub fn all(config: &ConfigFile) -> Vec<Lens> {
    let mut lenses = Vec::new();
    for name in BUILTIN_NAMES {
        if let Ok(lens) = resolve(name, config) {
            lenses.push(lens);
        }
    }
    for name in config.lenses.keys() {
        if !BUILTIN_NAMES.contains(&name.as_str())
            && let Ok(lens) = resolve(name, config)
        {
            lenses.push(lens);
        }
    }
    lenses
}

fn overlay(mut lens: Lens, name: &str, user: &LensConfig) -> Lens {
    lens.name = name.to_string();
    if let Some(description) = &user.description {
        lens.description = description.clone();
    }
    if let Some(include) = &user.include {
        lens.include = include.clone();
    }
    if let Some(exclude) = &user.exclude {
        lens.exclude = exclude.clone();
    }
    if let Some(mode) = user.truncate_mode {
        lens.truncate_mode = mode;
    }
    if let Some(limit) = user.truncate {
        lens.truncate_lines = limit;
    }
    if let Some(sort_by) = user.sort_by {
        lens.sort_by = sort_by;
    }
    if let Some(sort_order) = user.sort_order {
        lens.sort_order = sort_order;
    }
    if let Some(groups) = &user.groups {
        lens.groups = groups.iter().map(group_from_config).collect();
    }
    lens
}

fn group_from_config(group: &GroupConfig) -> PriorityGroup {
    PriorityGroup {
        pattern: group.pattern.clone(),
        // Priorities live in [0, 100]; higher input saturates.
        priority: group.priority.min(100),
        truncate: group.truncate,
        always_include: group.always_include,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_builtins_exist() {
        for name in BUILTIN_NAMES {
            assert!(builtin(name).is_some(), "missing builtin lens {name}");
        }
        assert_eq!(BUILTIN_NAMES.len(), 5);
    }

    #[test]
    fn architecture_uses_structure_mode() {
        let lens = builtin("architecture").unwrap();
        assert_eq!(lens.truncate_mode, TruncateMode::Structure);
    }

    #[test]
    fn debug_sorts_by_mtime_descending() {
        let lens = builtin("debug").unwrap();
        assert_eq!(lens.truncate_mode, TruncateMode::None);
        assert_eq!(lens.sort_by, SortKey::Mtime);
        assert_eq!(lens.sort_order, SortOrder::Desc);
    }

    #[test]
    fn security_caps_at_300_lines() {
        let lens = builtin("security").unwrap();
        assert_eq!(lens.truncate_mode, TruncateMode::Smart);
        assert_eq!(lens.truncate_lines, 300);
        assert!(!lens.include.is_empty());
    }

    #[test]
    fn onboarding_caps_at_400_lines() {
        let lens = builtin("onboarding").unwrap();
        assert_eq!(lens.truncate_lines, 400);
    }

    #[test]
    fn minimal_whitelists_entry_points() {
        let lens = builtin("minimal").unwrap();
        assert!(lens.include.contains(&"README*".to_string()));
        assert!(lens.include.contains(&"Cargo.toml".to_string()));
    }

    #[test]
    fn unknown_lens_is_fatal() {
        let config = ConfigFile::default();
        assert!(resolve("nope", &config).is_err());
    }

    #[test]
    fn config_lens_overrides_builtin_fields() {
        let json = r#"{"lenses": {"debug": {"truncate_mode": "simple", "truncate": 50}}}"#;
        let config: ConfigFile = serde_json::from_str(json).unwrap();
        let lens = resolve("debug", &config).unwrap();
        assert_eq!(lens.truncate_mode, TruncateMode::Simple);
        assert_eq!(lens.truncate_lines, 50);
        // Fields the user left alone keep the builtin values.
        assert_eq!(lens.sort_by, SortKey::Mtime);
    }

    #[test]
    fn user_lens_starts_from_defaults() {
        let json = r#"{"lenses": {"custom": {"description": "mine", "truncate_mode": "smart"}}}"#;
        let config: ConfigFile = serde_json::from_str(json).unwrap();
        let lens = resolve("custom", &config).unwrap();
        assert_eq!(lens.description, "mine");
        assert_eq!(lens.truncate_mode, TruncateMode::Smart);
        assert_eq!(lens.sort_by, SortKey::Name);
    }

    #[test]
    fn all_lists_builtins_and_user_lenses() {
        let json = r#"{"lenses": {"custom": {}}}"#;
        let config: ConfigFile = serde_json::from_str(json).unwrap();
        let names: Vec<String> = all(&config).into_iter().map(|l| l.name).collect();
        assert_eq!(
            names,
            vec![
                "architecture",
                "debug",
                "security",
                "onboarding",
                "minimal",
                "custom"
            ]
        );
    }

    #[test]
    fn group_priority_saturates_at_100() {
        let group = group_from_config(&GroupConfig {
            pattern: "x".to_string(),
            priority: 250,
            truncate: None,
            always_include: false,
        });
        assert_eq!(group.priority, 100);
    }
}
