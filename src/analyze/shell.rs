//! Shell analyzer — `.sh`, `.bash`, `.zsh`, `.fish`.
//!
//! Recognizes the shebang, function declarations in both `name()` and
//! `function name` forms, and `source`/`.` statements.

use std::sync::LazyLock;

use regex::Regex;

use super::{
    Analysis, Analyzer, Facts, KeepRange, SALIENCE_DOC, SALIENCE_ENTRY, SALIENCE_IMPORT,
    SALIENCE_SIGNATURE, extend_upward, scan_markers,
};

static FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:function\s+(\w+)\s*(?:\(\))?|(\w+)\s*\(\))\s*\{?").expect("function regex")
});

static SOURCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:source|\.)\s+(\S+)").expect("source regex"));

pub struct ShellAnalyzer;

impl Analyzer for ShellAnalyzer {
    fn language(&self) -> &'static str {
        "shell"
    }

    fn analyze(&self, lines: &[&str]) -> Analysis {
        let mut facts = Facts::default();
        let mut smart = Vec::new();
        let mut structure = Vec::new();

        let mut body_start = 0;
        if let Some(first) = lines.first()
            && first.starts_with("#!")
        {
            facts.entry_points.push("shebang".to_string());
            smart.push(KeepRange::line(0, SALIENCE_ENTRY));
            structure.push(KeepRange::line(0, SALIENCE_ENTRY));
            body_start = 1;
        }

        // Comment block under the shebang is the script's own
        // documentation.
        let mut doc_end = body_start;
        while doc_end < lines.len() && lines[doc_end].trim_start().starts_with('#') {
            doc_end += 1;
        }
        if doc_end > body_start {
            smart.push(KeepRange::new(body_start, doc_end, SALIENCE_DOC));
            structure.push(KeepRange::new(body_start, doc_end, SALIENCE_DOC));
        }

        for (idx, raw) in lines.iter().enumerate().skip(body_start) {
            let line = raw.trim_start();
            scan_markers(line, idx, &mut facts.markers);

            if let Some(caps) = SOURCE_RE.captures(line) {
                facts.imports.push(caps[1].to_string());
                smart.push(KeepRange::line(idx, SALIENCE_IMPORT));
                structure.push(KeepRange::line(idx, SALIENCE_IMPORT));
                continue;
            }

            if idx >= doc_end
                && let Some(caps) = FUNCTION_RE.captures(line)
            {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();
                // `if (cond)` and friends are not functions.
                if matches!(name.as_str(), "if" | "while" | "for" | "case" | "until") {
                    continue;
                }
                facts.functions.push(name);
                let start = extend_upward(lines, idx, |l| l.starts_with('#'));
                smart.push(KeepRange::new(start, idx + 1, SALIENCE_SIGNATURE));
                structure.push(KeepRange::line(idx, SALIENCE_SIGNATURE));
            }
        }

        Analysis {
            facts,
            smart,
            structure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(src: &str) -> Analysis {
        let lines: Vec<&str> = src.lines().collect();
        ShellAnalyzer.analyze(&lines)
    }

    #[test]
    fn detects_shebang_and_functions() {
        let analysis = analyze(
            "#!/usr/bin/env bash\n\
             set -euo pipefail\n\
             build() {\n\
                 cargo build\n\
             }\n\
             function deploy {\n\
                 scp target/app host:\n\
             }\n",
        );
        assert_eq!(analysis.facts.entry_points, vec!["shebang"]);
        assert_eq!(analysis.facts.functions, vec!["build", "deploy"]);
    }

    #[test]
    fn detects_source_statements() {
        let analysis = analyze(
            "#!/bin/sh\n\
             source ./lib/common.sh\n\
             . ./env.sh\n",
        );
        assert_eq!(analysis.facts.imports, vec!["./lib/common.sh", "./env.sh"]);
    }

    #[test]
    fn keywords_are_not_functions() {
        let analysis = analyze("if (true); then\n  echo hi\nfi\n");
        assert!(analysis.facts.functions.is_empty());
    }

    #[test]
    fn header_comment_block_is_documentation() {
        let analysis = analyze(
            "#!/bin/bash\n\
             # Deploy script.\n\
             # Usage: deploy.sh <env>\n\
             echo start\n",
        );
        let doc = analysis
            .smart
            .iter()
            .find(|r| r.salience == SALIENCE_DOC)
            .unwrap();
        assert_eq!((doc.start, doc.end), (1, 3));
    }

    #[test]
    fn structure_keeps_function_line_only() {
        let analysis = analyze(
            "#!/bin/bash\n\
             run() {\n\
                 echo running\n\
             }\n",
        );
        let kept: Vec<usize> = analysis
            .structure
            .iter()
            .flat_map(|r| r.start..r.end)
            .collect();
        assert!(kept.contains(&1));
        assert!(!kept.contains(&2));
    }
}
