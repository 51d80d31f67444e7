//! Markdown analyzer — `.md`, `.markdown`.
//!
//! Recognizes ATX headers, fenced code blocks, and links. Smart mode
//! keeps each header with the opening lines of its section; structure
//! mode keeps the header skeleton only.

use std::sync::LazyLock;

use regex::Regex;

use super::{
    Analysis, Analyzer, Facts, KeepRange, SALIENCE_DOC, SALIENCE_SIGNATURE, scan_markers,
};

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+?)\s*$").expect("header regex"));

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]+\]\(([^)]+)\)").expect("link regex"));

/// How many lines of a section body smart mode keeps under its header.
const SECTION_PREVIEW_LINES: usize = 3;

pub struct MarkdownAnalyzer;

impl Analyzer for MarkdownAnalyzer {
    fn language(&self) -> &'static str {
        "markdown"
    }

    fn analyze(&self, lines: &[&str]) -> Analysis {
        let mut facts = Facts::default();
        let mut smart = Vec::new();
        let mut structure = Vec::new();

        let mut fences = 0usize;
        let mut links = 0usize;
        let mut in_fence = false;

        for (idx, raw) in lines.iter().enumerate() {
            let line = raw.trim_start();
            scan_markers(line, idx, &mut facts.markers);

            if line.starts_with("```") || line.starts_with("~~~") {
                in_fence = !in_fence;
                if in_fence {
                    fences += 1;
                }
                continue;
            }
            if in_fence {
                continue;
            }

            links += LINK_RE.find_iter(line).count();

            if let Some(caps) = HEADER_RE.captures(line) {
                facts.headings.push(caps[2].to_string());
                // The document title carries its intro; other headers
                // carry a short section preview.
                let salience = if idx == 0 { SALIENCE_DOC } else { SALIENCE_SIGNATURE };
                smart.push(KeepRange::new(
                    idx,
                    section_preview_end(lines, idx),
                    salience,
                ));
                structure.push(KeepRange::line(idx, salience));
            }
        }

        if fences > 0 {
            facts.markers.push(format!("{fences} code fences"));
        }
        if links > 0 {
            facts.markers.push(format!("{links} links"));
        }

        Analysis {
            facts,
            smart,
            structure,
        }
    }
}

/// End of the smart-mode preview under a header: the header line plus
/// up to [`SECTION_PREVIEW_LINES`] non-blank lines, stopping at the
/// next header or fence.
fn section_preview_end(lines: &[&str], header_idx: usize) -> usize {
    let mut end = header_idx + 1;
    let mut kept = 0;
    while end < lines.len() && kept < SECTION_PREVIEW_LINES {
        let line = lines[end].trim_start();
        if line.starts_with('#') || line.starts_with("```") || line.starts_with("~~~") {
            break;
        }
        if !line.is_empty() {
            kept += 1;
        }
        end += 1;
    }
    end
}
