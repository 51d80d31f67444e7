//! JSON analyzer — `.json`.
//!
//! Line-oriented: tracks brace/bracket depth (string-aware) to find
//! top-level keys and the maximum nesting depth. No JSON parsing; a
//! malformed document still analyzes deterministically.

use std::sync::LazyLock;

use regex::Regex;

use super::{Analysis, Analyzer, Facts, KeepRange, SALIENCE_CONTEXT, SALIENCE_SIGNATURE};

static KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*"([^"]+)"\s*:"#).expect("key regex"));

pub struct JsonAnalyzer;

impl Analyzer for JsonAnalyzer {
    fn language(&self) -> &'static str {
        "json"
    }

    fn analyze(&self, lines: &[&str]) -> Analysis {
        let mut facts = Facts::default();
        let mut smart = Vec::new();
        let mut structure = Vec::new();

        let mut depth = 0i64;
        let mut max_depth = 0i64;

        for (idx, raw) in lines.iter().enumerate() {
            // A key sitting at depth 1 (inside the root object only) is
            // a top-level key.
            if depth == 1
                && let Some(caps) = KEY_RE.captures(raw)
            {
                facts.keys.push(caps[1].to_string());
                smart.push(KeepRange::line(idx, SALIENCE_SIGNATURE));
                structure.push(KeepRange::line(idx, SALIENCE_SIGNATURE));
            }

            let (new_depth, line_max) = scan_depth(raw, depth);
            depth = new_depth;
            max_depth = max_depth.max(line_max);
        }

        facts.max_depth = max_depth.max(0) as usize;

        // The root braces frame the document in both modes.
        if !lines.is_empty() {
            smart.push(KeepRange::line(0, SALIENCE_CONTEXT));
            smart.push(KeepRange::line(lines.len() - 1, SALIENCE_CONTEXT));
            structure.push(KeepRange::line(0, SALIENCE_CONTEXT));
            structure.push(KeepRange::line(lines.len() - 1, SALIENCE_CONTEXT));
        }

        Analysis {
            facts,
            smart,
            structure,
        }
    }
}

/// Walk one line, ignoring braces inside string literals. Returns the
/// depth after the line and the deepest point reached within it.
fn scan_depth(line: &str, start_depth: i64) -> (i64, i64) {
    let mut depth = start_depth;
    let mut max = start_depth;
    let mut in_string = false;
    let mut escaped = false;

    for c in line.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' | '[' if !in_string => {
                depth += 1;
                max = max.max(depth);
            }
            '}' | ']' if !in_string => depth -= 1,
            _ => {}
        }
    }
    (depth, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(src: &str) -> Analysis {
        let lines: Vec<&str> = src.lines().collect();
        JsonAnalyzer.analyze(&lines)
    }

    #[test]
    fn detects_top_level_keys() {
        let analysis = analyze(
            "{\n\
               \"name\": \"demo\",\n\
               \"dependencies\": {\n\
                 \"serde\": \"1.0\"\n\
               },\n\
               \"version\": \"0.1.0\"\n\
             }\n",
        );
        assert_eq!(analysis.facts.keys, vec!["name", "dependencies", "version"]);
    }

    #[test]
    fn nested_keys_are_not_top_level() {
        let analysis = analyze(
            "{\n\
               \"outer\": {\n\
                 \"inner\": 1\n\
               }\n\
             }\n",
        );
        assert_eq!(analysis.facts.keys, vec!["outer"]);
    }

    #[test]
    fn tracks_nesting_depth() {
        let analysis = analyze("{\"a\": {\"b\": [{\"c\": 1}]}}\n");
        assert_eq!(analysis.facts.max_depth, 4);
    }

    #[test]
    fn braces_inside_strings_do_not_count() {
        let analysis = analyze(
            "{\n\
               \"pattern\": \"{not[a]brace}\"\n\
             }\n",
        );
        assert_eq!(analysis.facts.max_depth, 1);
        assert_eq!(analysis.facts.keys, vec!["pattern"]);
    }

    #[test]
    fn structure_keeps_root_frame_and_keys() {
        let analysis = analyze(
            "{\n\
               \"a\": 1,\n\
               \"b\": {\n\
                 \"c\": 2\n\
               }\n\
             }\n",
        );
        let kept: Vec<usize> = analysis
            .structure
            .iter()
            .flat_map(|r| r.start..r.end)
            .collect();
        assert!(kept.contains(&0));
        assert!(kept.contains(&1));
        assert!(kept.contains(&2));
        assert!(!kept.contains(&3), "nested body line must not be kept");
        assert!(kept.contains(&5));
    }

    #[test]
    fn empty_file() {
        let analysis = analyze("");
        assert!(analysis.facts.keys.is_empty());
        assert_eq!(analysis.facts.max_depth, 0);
    }
}
