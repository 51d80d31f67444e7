//! Priority resolver — maps each file to a priority in [0, 100].
//!
//! Static priority comes from the active lens's priority groups: the
//! highest-priority group whose pattern matches the file wins, with 50
//! as the unmatched default. When a priority store is present, the
//! learned utility blends in at 30% weight. Files tagged
//! `always_include` (in the store or a group) bypass budgeting
//! entirely; files below the caller's priority floor are dropped
//! outright.

pub mod store;

use anyhow::Result;

use crate::glob::PatternSet;
use crate::lens::PriorityGroup;
use crate::truncate::TruncateMode;

pub use store::{PriorityStore, StoreRecord};

/// Priority assigned to files no group matches.
pub const DEFAULT_PRIORITY: u8 = 50;

/// Weight of the static component in the blend.
const STATIC_WEIGHT: f64 = 0.7;
/// Weight of the learned component in the blend.
const LEARNED_WEIGHT: f64 = 0.3;

/// Resolution result for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPriority {
    /// Final blended priority in [0, 100].
    pub value: u8,
    /// Bypass budgeting (still subject to per-file truncation).
    pub always_include: bool,
    /// Truncation-mode override from the winning group, if any.
    pub mode_override: Option<TruncateMode>,
}

/// Compiled resolver for one invocation.
pub struct PriorityResolver {
    groups: Vec<CompiledGroup>,
    store: Option<PriorityStore>,
}

struct CompiledGroup {
    matcher: PatternSet,
    group: PriorityGroup,
}

impl PriorityResolver {
    /// Compile the active lens's groups. Invalid group patterns are a
    /// configuration error.
    pub fn new(groups: &[PriorityGroup], store: Option<PriorityStore>) -> Result<Self> {
        let compiled = groups
            .iter()
            .map(|group| {
                let matcher = PatternSet::new(std::slice::from_ref(&group.pattern), &[])?;
                Ok(CompiledGroup {
                    matcher,
                    group: group.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            groups: compiled,
            store,
        })
    }

    /// Resolve the final priority of one relative path.
    pub fn resolve(&self, rel_path: &str) -> ResolvedPriority {
        let winner = self
            .groups
            .iter()
            .filter(|cg| cg.matcher.matches(rel_path))
            .max_by_key(|cg| cg.group.priority);

        let static_priority = winner.map_or(DEFAULT_PRIORITY, |cg| cg.group.priority);
        let mut always_include = winner.is_some_and(|cg| cg.group.always_include);
        let mode_override = winner.and_then(|cg| cg.group.truncate);

        let record = self.store.as_ref().and_then(|s| s.get(rel_path));
        let value = match record {
            Some(record) => {
                let learned = record.clamped_utility() * 100.0;
                let blended =
                    STATIC_WEIGHT * f64::from(static_priority) + LEARNED_WEIGHT * learned;
                blended.round().clamp(0.0, 100.0) as u8
            }
            None => static_priority,
        };
        if record.is_some_and(StoreRecord::always_include) {
            always_include = true;
        }

        ResolvedPriority {
            value,
            always_include,
            mode_override,
        }
    }

    /// The store's summary for a path, when one is recorded.
    pub fn summary(&self, rel_path: &str) -> Option<&str> {
        self.store
            .as_ref()
            .and_then(|s| s.get(rel_path))
            .and_then(|r| r.summary.as_deref())
    }
}
