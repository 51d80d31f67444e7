//! Python analyzer — `.py`, `.pyw`.
//!
//! Recognizes class defs, function/async-function defs, imports,
//! decorators, module docstrings, and the `if __name__ == "__main__"`
//! script guard.

use std::sync::LazyLock;

use regex::Regex;

use super::{
    Analysis, Analyzer, Facts, KeepRange, SALIENCE_DOC, SALIENCE_ENTRY, SALIENCE_IMPORT,
    SALIENCE_SIGNATURE, extend_upward, scan_markers,
};

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:import\s+([\w.]+)|from\s+([\w.]+)\s+import\b)").expect("import regex")
});

static CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^class\s+(\w+)").expect("class regex"));

static DEF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(async\s+)?def\s+(\w+)").expect("def regex"));

static GUARD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^if\s+__name__\s*==\s*["']__main__["']"#).expect("guard regex")
});

/// Lines a signature range may absorb from above: decorators and
/// comments directly attached to the definition.
fn is_signature_prefix(line: &str) -> bool {
    line.starts_with('@') || line.starts_with('#')
}

pub struct PythonAnalyzer;

impl Analyzer for PythonAnalyzer {
    fn language(&self) -> &'static str {
        "python"
    }

    fn analyze(&self, lines: &[&str]) -> Analysis {
        let mut facts = Facts::default();
        let mut smart = Vec::new();
        let mut structure = Vec::new();

        // Module docstring and shebang at the top of the file.
        if let Some(first) = lines.first()
            && first.starts_with("#!")
        {
            facts.entry_points.push("shebang".to_string());
            smart.push(KeepRange::line(0, SALIENCE_ENTRY));
            structure.push(KeepRange::line(0, SALIENCE_ENTRY));
        }
        if let Some(doc) = module_docstring(lines) {
            smart.push(KeepRange::new(doc.0, doc.1, SALIENCE_DOC));
            structure.push(KeepRange::new(doc.0, doc.1, SALIENCE_DOC));
        }

        for (idx, raw) in lines.iter().enumerate() {
            let line = raw.trim_start();
            scan_markers(line, idx, &mut facts.markers);

            if let Some(caps) = IMPORT_RE.captures(line) {
                let module = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();
                facts.imports.push(module);
                smart.push(KeepRange::line(idx, SALIENCE_IMPORT));
                structure.push(KeepRange::line(idx, SALIENCE_IMPORT));
                continue;
            }

            if let Some(caps) = CLASS_RE.captures(line) {
                facts.classes.push(caps[1].to_string());
                let start = extend_upward(lines, idx, is_signature_prefix);
                smart.push(signature_range(lines, start, idx));
                structure.push(decorated_signature(lines, idx));
                continue;
            }

            if let Some(caps) = DEF_RE.captures(line) {
                let name = caps[2].to_string();
                if caps.get(1).is_some() {
                    facts.functions.push(format!("async {name}"));
                } else {
                    facts.functions.push(name);
                }
                let start = extend_upward(lines, idx, is_signature_prefix);
                smart.push(signature_range(lines, start, idx));
                structure.push(decorated_signature(lines, idx));
                continue;
            }

            if line.starts_with('@') {
                let name = line.split('(').next().unwrap_or(line);
                facts.decorators.push(name.to_string());
                continue;
            }

            if GUARD_RE.is_match(line) {
                facts.entry_points.push("__main__ guard".to_string());
                smart.push(KeepRange::new(idx, guard_block_end(lines, idx), SALIENCE_ENTRY));
            }
        }

        Analysis {
            facts,
            smart,
            structure,
        }
    }
}

/// Signature range for smart mode: prefix lines (decorators, attached
/// comments) through the signature, extended downward over a docstring
/// that immediately follows.
fn signature_range(lines: &[&str], start: usize, sig_idx: usize) -> KeepRange {
    let mut end = sig_idx + 1;
    if let Some(next) = lines.get(sig_idx + 1) {
        let trimmed = next.trim_start();
        if trimmed.starts_with("\"\"\"") || trimmed.starts_with("'''") {
            let quote = &trimmed[..3];
            // Single-line docstring closes on the same line.
            if trimmed.len() >= 6 && trimmed.ends_with(quote) {
                end = sig_idx + 2;
            } else {
                let mut cursor = sig_idx + 2;
                while cursor < lines.len() && cursor < sig_idx + 12 {
                    if lines[cursor].trim_end().ends_with(quote) {
                        end = cursor + 1;
                        break;
                    }
                    cursor += 1;
                }
            }
        }
    }
    KeepRange::new(start, end, SALIENCE_SIGNATURE)
}

/// Signature range for structure mode: decorator prefix plus the
/// signature line only. Bodies never appear here.
fn decorated_signature(lines: &[&str], sig_idx: usize) -> KeepRange {
    let start = extend_upward(lines, sig_idx, |l| l.starts_with('@'));
    KeepRange::new(start, sig_idx + 1, SALIENCE_SIGNATURE)
}

/// Locate the module docstring, if the file opens with one.
fn module_docstring(lines: &[&str]) -> Option<(usize, usize)> {
    let mut idx = 0;
    while idx < lines.len() {
        let line = lines[idx].trim();
        if line.is_empty() || line.starts_with('#') {
            idx += 1;
            continue;
        }
        if !line.starts_with("\"\"\"") && !line.starts_with("'''") {
            return None;
        }
        let quote = &line[..3];
        if line.len() >= 6 && line.ends_with(quote) {
            return Some((idx, idx + 1));
        }
        let mut end = idx + 1;
        while end < lines.len() {
            if lines[end].trim_end().ends_with(quote) {
                return Some((idx, end + 1));
            }
            end += 1;
        }
        return Some((idx, lines.len()));
    }
    None
}

/// End of the script-guard block: the guard line plus its indented
/// body, capped so a giant main block cannot dominate smart output.
fn guard_block_end(lines: &[&str], guard_idx: usize) -> usize {
    let cap = (guard_idx + 9).min(lines.len());
    let mut end = guard_idx + 1;
    while end < cap {
        let line = lines[end];
        if !line.trim().is_empty() && !line.starts_with(' ') && !line.starts_with('\t') {
            break;
        }
        end += 1;
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(src: &str) -> Analysis {
        let lines: Vec<&str> = src.lines().collect();
        PythonAnalyzer.analyze(&lines)
    }

    #[test]
    fn detects_imports_classes_and_functions() {
        let analysis = analyze(
            "import os\n\
             from pathlib import Path\n\
             class Walker:\n\
                 def visit(self, node):\n\
                     return node\n\
             async def main():\n\
                 pass\n",
        );
        assert_eq!(analysis.facts.imports, vec!["os", "pathlib"]);
        assert_eq!(analysis.facts.classes, vec!["Walker"]);
        assert_eq!(analysis.facts.functions, vec!["visit", "async main"]);
    }

    #[test]
    fn structure_keeps_signatures_not_bodies() {
        let analysis = analyze(
            "import os\n\
             class A:\n\
                 def f(self, x):\n\
                     return x + 1\n",
        );
        let kept: Vec<usize> = analysis
            .structure
            .iter()
            .flat_map(|r| r.start..r.end)
            .collect();
        assert!(kept.contains(&0));
        assert!(kept.contains(&1));
        assert!(kept.contains(&2));
        assert!(!kept.contains(&3), "body line must not be kept");
    }

    #[test]
    fn decorator_is_attached_to_signature() {
        let analysis = analyze(
            "@app.route('/health')\n\
             def health():\n\
                 return 'ok'\n",
        );
        let sig = analysis
            .structure
            .iter()
            .find(|r| r.salience == SALIENCE_SIGNATURE)
            .unwrap();
        assert_eq!((sig.start, sig.end), (0, 2));
    }

    #[test]
    fn script_guard_is_an_entry_point() {
        let analysis = analyze(
            "def main():\n\
                 pass\n\
             if __name__ == \"__main__\":\n\
                 main()\n",
        );
        assert_eq!(analysis.facts.entry_points, vec!["__main__ guard"]);
        let entry = analysis
            .smart
            .iter()
            .find(|r| r.salience == SALIENCE_ENTRY)
            .unwrap();
        assert_eq!(entry.start, 2);
        assert_eq!(entry.end, 4);
    }

    #[test]
    fn module_docstring_is_kept_in_structure() {
        let analysis = analyze(
            "\"\"\"Utilities for parsing.\n\
             More detail.\n\
             \"\"\"\n\
             import re\n",
        );
        let doc = analysis
            .structure
            .iter()
            .find(|r| r.salience == SALIENCE_DOC)
            .unwrap();
        assert_eq!((doc.start, doc.end), (0, 3));
    }

    #[test]
    fn single_line_docstring_after_def_joins_smart_range() {
        let analysis = analyze(
            "def f():\n\
                 \"\"\"Do the thing.\"\"\"\n\
                 return 1\n",
        );
        let sig = analysis
            .smart
            .iter()
            .find(|r| r.salience == SALIENCE_SIGNATURE)
            .unwrap();
        assert_eq!((sig.start, sig.end), (0, 2));
    }

    #[test]
    fn todo_markers_are_collected() {
        let analysis = analyze("x = 1  # TODO tighten bounds\n");
        assert_eq!(analysis.facts.markers.len(), 1);
        assert!(analysis.facts.markers[0].contains("TODO"));
    }

    #[test]
    fn empty_file_yields_empty_analysis() {
        let analysis = analyze("");
        assert!(analysis.smart.is_empty());
        assert!(analysis.structure.is_empty());
        assert!(analysis.facts.functions.is_empty());
    }
}
