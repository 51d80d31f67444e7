//! Truncator — applies analyzer keep-ranges under a truncation mode.
//!
//! Four modes: `none` passes content through; `simple` keeps the first
//! N lines; `smart` keeps the analyzer's important ranges (signatures,
//! documentation, entry points) with omission markers and a fact
//! summary; `structure` keeps only declarations and imports, with no
//! inline markers.
//!
//! Analyzer panics never abort the run: the mode degrades one step
//! (structure → smart → simple) and processing continues. An unknown
//! language degrades structure to smart the same way, because its
//! structure keep-range set is empty.

use std::collections::BTreeSet;
use std::panic::{AssertUnwindSafe, catch_unwind};

use serde::{Deserialize, Serialize};

use crate::analyze::{Analysis, Analyzer, KeepRange, SALIENCE_IMPORT};

// ---------------------------------------------------------------------------
// Modes
// ---------------------------------------------------------------------------

/// Truncation mode for a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TruncateMode {
    /// Content unchanged.
    #[default]
    None,
    /// First N lines.
    Simple,
    /// Analyzer-chosen ranges with omission markers and a summary.
    Smart,
    /// Imports and signatures only.
    Structure,
}

impl std::fmt::Display for TruncateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Simple => "simple",
            Self::Smart => "smart",
            Self::Structure => "structure",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for TruncateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "simple" => Ok(Self::Simple),
            "smart" => Ok(Self::Smart),
            "structure" => Ok(Self::Structure),
            other => Err(format!("unknown truncation mode '{other}'")),
        }
    }
}

/// Default line limit applied when a lens or caller does not set one.
pub const DEFAULT_LINE_LIMIT: usize = 400;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of truncating one file.
#[derive(Debug, Clone)]
pub struct TruncationOutcome {
    /// Retained content, line endings preserved, plus any marker and
    /// summary lines. Always ends in a newline when non-empty.
    pub content: String,
    /// Line count of the original content.
    pub original_lines: usize,
    /// Retained source lines (marker and summary lines not counted).
    pub final_lines: usize,
    /// Whether any source line was removed.
    pub truncated: bool,
    /// The mode actually applied, after any degradation.
    pub mode_used: TruncateMode,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Truncate `text` under `mode` with a line `limit`.
pub fn truncate(
    text: &str,
    analyzer: &dyn Analyzer,
    mode: TruncateMode,
    limit: usize,
) -> TruncationOutcome {
    let raw_lines: Vec<&str> = text.split_inclusive('\n').collect();
    let original = raw_lines.len();

    match mode {
        TruncateMode::None => unchanged(text, original),
        TruncateMode::Simple => simple(text, &raw_lines, limit),
        TruncateMode::Smart => match analyze_lines(text, analyzer) {
            Some(analysis) => smart(text, &raw_lines, &analysis, limit),
            None => simple(text, &raw_lines, limit),
        },
        TruncateMode::Structure => match analyze_lines(text, analyzer) {
            Some(analysis) if !analysis.structure.is_empty() => {
                structure(text, &raw_lines, &analysis)
            }
            Some(analysis) => smart(text, &raw_lines, &analysis, limit),
            None => simple(text, &raw_lines, limit),
        },
    }
}

/// Run the analyzer, treating a panic as a degradation signal rather
/// than an abort.
fn analyze_lines(text: &str, analyzer: &dyn Analyzer) -> Option<Analysis> {
    let stripped: Vec<&str> = text
        .split_inclusive('\n')
        .map(|l| l.trim_end_matches('\n').trim_end_matches('\r'))
        .collect();
    catch_unwind(AssertUnwindSafe(|| analyzer.analyze(&stripped))).ok()
}

// ---------------------------------------------------------------------------
// Modes
// ---------------------------------------------------------------------------

fn unchanged(text: &str, original: usize) -> TruncationOutcome {
    TruncationOutcome {
        content: text.to_string(),
        original_lines: original,
        final_lines: original,
        truncated: false,
        mode_used: TruncateMode::None,
    }
}

fn simple(text: &str, raw_lines: &[&str], limit: usize) -> TruncationOutcome {
    let original = raw_lines.len();
    if original <= limit {
        let mut outcome = unchanged(text, original);
        outcome.mode_used = TruncateMode::Simple;
        return outcome;
    }

    let mut content: String = raw_lines[..limit].concat();
    ensure_newline(&mut content);
    content.push_str(&format!("[... kept {limit} of {original} lines ...]\n"));

    TruncationOutcome {
        content,
        original_lines: original,
        final_lines: limit,
        truncated: true,
        mode_used: TruncateMode::Simple,
    }
}

fn smart(
    text: &str,
    raw_lines: &[&str],
    analysis: &Analysis,
    limit: usize,
) -> TruncationOutcome {
    let original = raw_lines.len();
    let kept = select_lines(&analysis.smart, original, limit);

    // Nothing removed: hand the content back untouched, summary and
    // markers included only when truncation actually happened.
    if kept.len() == original {
        let mut outcome = unchanged(text, original);
        outcome.mode_used = TruncateMode::Smart;
        return outcome;
    }

    let mut content = String::new();
    let mut omitted_run = 0usize;
    for (idx, line) in raw_lines.iter().enumerate() {
        if kept.contains(&idx) {
            if omitted_run > 0 {
                content.push_str(&format!("[... {omitted_run} lines omitted ...]\n"));
                omitted_run = 0;
            }
            content.push_str(line);
        } else {
            omitted_run += 1;
        }
    }
    if omitted_run > 0 {
        ensure_newline(&mut content);
        content.push_str(&format!("[... {omitted_run} lines omitted ...]\n"));
    }
    ensure_newline(&mut content);

    for line in analysis.facts.summary_lines() {
        content.push_str(&format!("[summary] {line}\n"));
    }

    TruncationOutcome {
        content,
        original_lines: original,
        final_lines: kept.len(),
        truncated: true,
        mode_used: TruncateMode::Smart,
    }
}

fn structure(text: &str, raw_lines: &[&str], analysis: &Analysis) -> TruncationOutcome {
    let original = raw_lines.len();
    let kept = covered_lines(&analysis.structure, original);

    if kept.len() == original {
        let mut outcome = unchanged(text, original);
        outcome.mode_used = TruncateMode::Structure;
        return outcome;
    }

    let mut content = String::new();
    for idx in &kept {
        content.push_str(raw_lines[*idx]);
    }
    ensure_newline(&mut content);

    TruncationOutcome {
        content,
        original_lines: original,
        final_lines: kept.len(),
        truncated: true,
        mode_used: TruncateMode::Structure,
    }
}

// ---------------------------------------------------------------------------
// Range selection
// ---------------------------------------------------------------------------

/// Lines covered by a set of ranges, clipped to the file.
fn covered_lines(ranges: &[KeepRange], line_count: usize) -> BTreeSet<usize> {
    let mut lines = BTreeSet::new();
    for range in ranges {
        for idx in range.start..range.end.min(line_count) {
            lines.insert(idx);
        }
    }
    lines
}

/// Smart-mode line selection: all ranges, then trim the least salient
/// whole ranges while over the limit. Import ranges are never trimmed,
/// so every recognized import line survives even when that leaves the
/// result above the limit.
fn select_lines(ranges: &[KeepRange], line_count: usize, limit: usize) -> BTreeSet<usize> {
    let mut active: Vec<bool> = vec![true; ranges.len()];

    loop {
        let kept = covered_active(ranges, &active, line_count);
        if kept.len() <= limit {
            return kept;
        }

        // Least salience first; among equals the later range goes
        // first, so the top of the file survives longest.
        let victim = active
            .iter()
            .enumerate()
            .filter(|&(i, &on)| on && ranges[i].salience < SALIENCE_IMPORT)
            .min_by_key(|&(i, _)| (ranges[i].salience, usize::MAX - ranges[i].start))
            .map(|(i, _)| i);

        match victim {
            Some(i) => active[i] = false,
            None => return kept,
        }
    }
}

fn covered_active(ranges: &[KeepRange], active: &[bool], line_count: usize) -> BTreeSet<usize> {
    let mut lines = BTreeSet::new();
    for (range, &on) in ranges.iter().zip(active) {
        if !on {
            continue;
        }
        for idx in range.start..range.end.min(line_count) {
            lines.insert(idx);
        }
    }
    lines
}

fn ensure_newline(content: &mut String) {
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::analyzer_for;

    #[test]
    fn none_mode_passes_through() {
        let text = "a\nb\nc\n";
        let outcome = truncate(text, analyzer_for("x.txt"), TruncateMode::None, 1);
        assert_eq!(outcome.content, text);
        assert!(!outcome.truncated);
        assert_eq!(outcome.original_lines, 3);
        assert_eq!(outcome.final_lines, 3);
    }

    #[test]
    fn simple_mode_keeps_head() {
        let text = "1\n2\n3\n4\n5\n";
        let outcome = truncate(text, analyzer_for("x.txt"), TruncateMode::Simple, 2);
        assert!(outcome.content.starts_with("1\n2\n"));
        assert!(outcome.content.contains("kept 2 of 5 lines"));
        assert_eq!(outcome.final_lines, 2);
        assert!(outcome.truncated);
    }

    #[test]
    fn simple_mode_within_limit_is_untouched() {
        let text = "1\n2\n";
        let outcome = truncate(text, analyzer_for("x.txt"), TruncateMode::Simple, 10);
        assert_eq!(outcome.content, text);
        assert!(!outcome.truncated);
    }

    #[test]
    fn structure_mode_keeps_signatures_only() {
        let text = "import os\nclass A:\n    def f(self, x):\n        return x + 1\n";
        let outcome = truncate(text, analyzer_for("m.py"), TruncateMode::Structure, 100);
        assert_eq!(
            outcome.content,
            "import os\nclass A:\n    def f(self, x):\n"
        );
        assert_eq!(outcome.original_lines, 4);
        assert_eq!(outcome.final_lines, 3);
        assert!(outcome.truncated);
        assert_eq!(outcome.mode_used, TruncateMode::Structure);
    }

    #[test]
    fn structure_degrades_to_smart_for_unknown_language() {
        let text = "line one\nline two\n";
        let outcome = truncate(text, analyzer_for("data.csv"), TruncateMode::Structure, 100);
        // Plain analyzer smart mode keeps everything.
        assert_eq!(outcome.content, text);
        assert_eq!(outcome.mode_used, TruncateMode::Smart);
    }

    #[test]
    fn smart_mode_adds_omission_markers_and_summary() {
        let mut src = String::from("import sys\n");
        src.push_str("def handler():\n");
        for i in 0..30 {
            src.push_str(&format!("    step_{i}()\n"));
        }
        let outcome = truncate(&src, analyzer_for("app.py"), TruncateMode::Smart, 10);
        assert!(outcome.truncated);
        assert!(outcome.content.contains("import sys"));
        assert!(outcome.content.contains("def handler():"));
        assert!(outcome.content.contains("lines omitted"));
        assert!(outcome.content.contains("[summary] functions: handler"));
    }

    #[test]
    fn smart_mode_never_drops_imports() {
        let mut src = String::new();
        for i in 0..20 {
            src.push_str(&format!("import mod_{i}\n"));
        }
        src.push_str("def f():\n    pass\n");
        // Limit below the import count: imports still survive.
        let outcome = truncate(&src, analyzer_for("app.py"), TruncateMode::Smart, 5);
        for i in 0..20 {
            assert!(
                outcome.content.contains(&format!("import mod_{i}")),
                "import mod_{i} must be retained"
            );
        }
    }

    #[test]
    fn trimming_prefers_later_ranges() {
        let mut src = String::new();
        for i in 0..10 {
            src.push_str(&format!("def fn_{i}():\n    pass\n\n"));
        }
        let outcome = truncate(&src, analyzer_for("app.py"), TruncateMode::Smart, 4);
        // The earliest definitions survive the trim.
        assert!(outcome.content.contains("def fn_0"));
        assert!(!outcome.content.contains("def fn_9"));
    }

    #[test]
    fn truncation_preserves_line_order() {
        let text = "import a\nimport b\nimport c\n";
        let outcome = truncate(text, analyzer_for("m.py"), TruncateMode::Structure, 100);
        let a = outcome.content.find("import a").unwrap();
        let b = outcome.content.find("import b").unwrap();
        let c = outcome.content.find("import c").unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn crlf_endings_survive() {
        let text = "import os\r\nclass A:\r\n    pass\r\n";
        let outcome = truncate(text, analyzer_for("m.py"), TruncateMode::Structure, 100);
        assert!(outcome.content.contains("import os\r\n"));
        assert!(outcome.content.contains("class A:\r\n"));
    }

    #[test]
    fn empty_content() {
        let outcome = truncate("", analyzer_for("m.py"), TruncateMode::Smart, 10);
        assert_eq!(outcome.content, "");
        assert_eq!(outcome.original_lines, 0);
        assert!(!outcome.truncated);
    }
}
