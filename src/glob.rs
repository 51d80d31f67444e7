//! Glob pattern sets — ordered include/exclude rules compiled once per
//! invocation.
//!
//! Matching is case-sensitive and always against forward-slash relative
//! paths, regardless of host. Patterns support `*` (within one path
//! segment), `**` (zero or more segments), and literal segments. A
//! pattern without `/` matches against any path segment as well as the
//! whole path, so `node_modules` excludes every `node_modules`
//! directory in the tree.
//!
//! Directory pruning is conservative: a subtree is skipped only when
//! the directory matches the exclude-set and no include pattern could
//! possibly match a path inside it.

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};

// ---------------------------------------------------------------------------
// Compiled pattern set
// ---------------------------------------------------------------------------

/// An ordered pair of compiled include/exclude glob sets.
///
/// Semantics:
/// - Empty include-set: admit any file not matched by the exclude-set.
/// - Non-empty include-set: admit only files matched by the
///   include-set; the exclude-set still removes.
#[derive(Debug)]
pub struct PatternSet {
    include: GlobSet,
    include_empty: bool,
    exclude: GlobSet,
    /// Per include pattern, the segment-level matchers used by the
    /// reachability test for pruning.
    include_reach: Vec<ReachPattern>,
}

/// Reachability form of one include pattern.
#[derive(Debug)]
struct ReachPattern {
    /// Bare patterns (no `/`) can match a segment at any depth.
    bare: bool,
    segments: Vec<Segment>,
}

#[derive(Debug)]
enum Segment {
    /// `**` — matches zero or more whole segments.
    Recursive,
    /// A single-segment glob (`*`, `?`, literals, character classes).
    One(GlobMatcher),
}

impl PatternSet {
    /// Compile a pattern set. Invalid globs are a configuration error.
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            include: compile_set(include)?,
            include_empty: include.is_empty(),
            exclude: compile_set(exclude)?,
            include_reach: include
                .iter()
                .map(|p| ReachPattern::compile(p))
                .collect::<Result<_>>()?,
        })
    }

    /// A set that admits everything.
    pub fn admit_all() -> Self {
        Self::new(&[], &[]).expect("empty pattern set always compiles")
    }

    /// Whether a file's forward-slash relative path is admitted.
    pub fn matches(&self, rel_path: &str) -> bool {
        if self.exclude.is_match(rel_path) {
            return false;
        }
        self.include_empty || self.include.is_match(rel_path)
    }

    /// Whether a directory's subtree can be skipped entirely.
    pub fn prunes(&self, rel_dir: &str) -> bool {
        if rel_dir.is_empty() || !self.exclude.is_match(rel_dir) {
            return false;
        }
        // Pruning is only safe when no include pattern could match a
        // descendant of this directory.
        !self
            .include_reach
            .iter()
            .any(|p| p.could_reach_inside(rel_dir))
    }
}

impl ReachPattern {
    fn compile(pattern: &str) -> Result<Self> {
        let bare = !pattern.contains('/');
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|seg| {
                if seg == "**" {
                    Ok(Segment::Recursive)
                } else {
                    let glob = GlobBuilder::new(seg)
                        .literal_separator(true)
                        .build()
                        .with_context(|| format!("invalid glob pattern '{pattern}'"))?;
                    Ok(Segment::One(glob.compile_matcher()))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { bare, segments })
    }

    /// Whether this include pattern could match a path strictly below
    /// `rel_dir`. Conservative: answers `true` whenever unsure.
    fn could_reach_inside(&self, rel_dir: &str) -> bool {
        // A bare pattern matches a segment at any depth, so it can
        // always reach inside any directory.
        if self.bare {
            return true;
        }

        let dir_segments: Vec<&str> = rel_dir.split('/').filter(|s| !s.is_empty()).collect();
        let mut i = 0;
        for dir_seg in &dir_segments {
            match self.segments.get(i) {
                // Pattern exhausted before the directory: it cannot
                // name anything deeper.
                None => return false,
                // `**` swallows the rest of the directory and anything
                // below it.
                Some(Segment::Recursive) => return true,
                Some(Segment::One(glob)) => {
                    if !glob.is_match(dir_seg) {
                        return false;
                    }
                }
            }
            i += 1;
        }
        // Every directory segment was compatible; the pattern reaches
        // inside if it still has segments left to match below.
        i < self.segments.len()
    }
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

/// Compile an ordered list of patterns into a single `GlobSet`.
///
/// Bare patterns (no `/`) are expanded so they match a segment at any
/// depth: `name`, `**/name`, `name/**`, `**/name/**`.
fn compile_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        for variant in expand(pattern) {
            let glob = GlobBuilder::new(&variant)
                .literal_separator(true)
                .build()
                .with_context(|| format!("invalid glob pattern '{pattern}'"))?;
            builder.add(glob);
        }
    }
    builder.build().context("failed to compile glob set")
}

fn expand(pattern: &str) -> Vec<String> {
    if pattern.contains('/') {
        vec![pattern.to_string()]
    } else {
        vec![
            pattern.to_string(),
            format!("**/{pattern}"),
            format!("{pattern}/**"),
            format!("**/{pattern}/**"),
        ]
    }
}
