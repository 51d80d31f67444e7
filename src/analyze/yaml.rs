//! YAML analyzer — `.yaml`, `.yml`.
//!
//! Recognizes top-level keys (column-zero mappings) and document
//! separators. Comment headers count as module-level documentation.

use std::sync::LazyLock;

use regex::Regex;

use super::{Analysis, Analyzer, Facts, KeepRange, SALIENCE_DOC, SALIENCE_SIGNATURE, scan_markers};

static TOP_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^([\w$][\w.$/-]*)\s*:"#).expect("top key regex"));

pub struct YamlAnalyzer;

impl Analyzer for YamlAnalyzer {
    fn language(&self) -> &'static str {
        "yaml"
    }

    fn analyze(&self, lines: &[&str]) -> Analysis {
        let mut facts = Facts::default();
        let mut smart = Vec::new();
        let mut structure = Vec::new();

        let mut doc_end = 0;
        while doc_end < lines.len() && lines[doc_end].trim_start().starts_with('#') {
            doc_end += 1;
        }
        if doc_end > 0 {
            smart.push(KeepRange::new(0, doc_end, SALIENCE_DOC));
            structure.push(KeepRange::new(0, doc_end, SALIENCE_DOC));
        }

        for (idx, raw) in lines.iter().enumerate() {
            scan_markers(raw, idx, &mut facts.markers);

            if raw.trim() == "---" {
                smart.push(KeepRange::line(idx, SALIENCE_SIGNATURE));
                structure.push(KeepRange::line(idx, SALIENCE_SIGNATURE));
                continue;
            }

            if let Some(caps) = TOP_KEY_RE.captures(raw) {
                facts.keys.push(caps[1].to_string());
                smart.push(KeepRange::line(idx, SALIENCE_SIGNATURE));
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
