//! Rust analyzer — `.rs`.
//!
//! Recognizes structs, enums, traits, impl headers, `use` paths, `mod`
//! declarations, functions (including `async fn`), attributes, doc
//! comments, and the `main` entry point.

use std::sync::LazyLock;

use regex::Regex;

use super::{
    Analysis, Analyzer, Facts, KeepRange, SALIENCE_DOC, SALIENCE_ENTRY, SALIENCE_IMPORT,
    SALIENCE_SIGNATURE, extend_upward, scan_markers,
};

static USE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:pub(?:\([^)]*\))?\s+)?use\s+([\w:]+)").expect("use regex"));

static TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:pub(?:\([^)]*\))?\s+)?(struct|enum|trait|union|type)\s+(\w+)")
        .expect("type regex")
});

static IMPL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^impl(?:<[^>]*>)?\s+(?:([\w:]+)(?:<[^>]*>)?\s+for\s+)?([\w:]+)")
        .expect("impl regex")
});

static FN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(?:pub(?:\([^)]*\))?\s+)?(?:default\s+)?(?:const\s+)?(async\s+)?(?:unsafe\s+)?(?:extern\s+"[^"]*"\s+)?fn\s+(\w+)"#,
    )
    .expect("fn regex")
});

static MOD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:pub(?:\([^)]*\))?\s+)?mod\s+(\w+)\s*;").expect("mod regex"));

/// Attribute and doc-comment lines that belong to the item below them.
fn is_item_prefix(line: &str) -> bool {
    line.starts_with("#[") || line.starts_with("///") || line.starts_with("#![")
}

pub struct RustAnalyzer;

impl Analyzer for RustAnalyzer {
    fn language(&self) -> &'static str {
        "rust"
    }

    fn analyze(&self, lines: &[&str]) -> Analysis {
        let mut facts = Facts::default();
        let mut smart = Vec::new();
        let mut structure = Vec::new();

        if let Some((start, end)) = module_doc_block(lines) {
            smart.push(KeepRange::new(start, end, SALIENCE_DOC));
            structure.push(KeepRange::new(start, end, SALIENCE_DOC));
        }

        for (idx, raw) in lines.iter().enumerate() {
            let line = raw.trim_start();
            scan_markers(line, idx, &mut facts.markers);

            if let Some(caps) = USE_RE.captures(line) {
                // Grouped imports capture up to the brace: `use a::{b, c}`
                // records the `a` prefix.
                facts.imports.push(caps[1].trim_end_matches(':').to_string());
                smart.push(KeepRange::line(idx, SALIENCE_IMPORT));
                structure.push(KeepRange::line(idx, SALIENCE_IMPORT));
                continue;
            }

            if let Some(caps) = MOD_RE.captures(line) {
                facts.exports.push(format!("mod {}", &caps[1]));
                smart.push(KeepRange::line(idx, SALIENCE_IMPORT));
                structure.push(KeepRange::line(idx, SALIENCE_IMPORT));
                continue;
            }

            if let Some(caps) = TYPE_RE.captures(line) {
                facts.classes.push(format!("{} {}", &caps[1], &caps[2]));
                push_signature(lines, idx, &mut smart, &mut structure);
                continue;
            }

            if let Some(caps) = IMPL_RE.captures(line) {
                let target = caps[2].to_string();
                match caps.get(1) {
                    Some(trait_name) => facts
                        .classes
                        .push(format!("impl {} for {}", trait_name.as_str(), target)),
                    None => facts.classes.push(format!("impl {target}")),
                }
                push_signature(lines, idx, &mut smart, &mut structure);
                continue;
            }

            if let Some(caps) = FN_RE.captures(line) {
                let name = caps[2].to_string();
                let display = if caps.get(1).is_some() {
                    format!("async {name}")
                } else {
                    name.clone()
                };
                facts.functions.push(display);
                if name == "main" && !raw.starts_with(' ') && !raw.starts_with('\t') {
                    facts.entry_points.push("main function".to_string());
                    let start = extend_upward(lines, idx, is_item_prefix);
                    smart.push(KeepRange::new(start, idx + 1, SALIENCE_ENTRY));
                    structure.push(KeepRange::new(start, idx + 1, SALIENCE_ENTRY));
                } else {
                    push_signature(lines, idx, &mut smart, &mut structure);
                }
                continue;
            }

            if line.starts_with("#[") {
                let name = line
                    .trim_start_matches("#[")
                    .trim_end_matches(']')
                    .split('(')
                    .next()
                    .unwrap_or("")
                    .to_string();
                facts.decorators.push(name);
            }
        }

        Analysis {
            facts,
            smart,
            structure,
        }
    }
}

fn push_signature(
    lines: &[&str],
    idx: usize,
    smart: &mut Vec<KeepRange>,
    structure: &mut Vec<KeepRange>,
) {
    let start = extend_upward(lines, idx, is_item_prefix);
    smart.push(KeepRange::new(start, idx + 1, SALIENCE_SIGNATURE));
    structure.push(KeepRange::new(start, idx + 1, SALIENCE_SIGNATURE));
}

/// A leading `//!` block is module-level documentation.
fn module_doc_block(lines: &[&str]) -> Option<(usize, usize)> {
    if !lines.first()?.trim_start().starts_with("//!") {
        return None;
    }
    let mut end = 1;
    while end < lines.len() && lines[end].trim_start().starts_with("//!") {
        end += 1;
    }
    Some((0, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(src: &str) -> Analysis {
        let lines: Vec<&str> = src.lines().collect();
        RustAnalyzer.analyze(&lines)
    }

    #[test]
    fn detects_uses_types_and_functions() {
        let analysis = analyze(
            "use std::fs;\n\
             use anyhow::Result;\n\
             pub struct Config {\n\
                 name: String,\n\
             }\n\
             pub enum Mode { A, B }\n\
             pub trait Render {\n\
                 fn render(&self) -> String;\n\
             }\n\
             impl Render for Config {\n\
                 fn render(&self) -> String {\n\
                     self.name.clone()\n\
                 }\n\
             }\n",
        );
        assert_eq!(analysis.facts.imports, vec!["std::fs", "anyhow::Result"]);
        assert_eq!(
            analysis.facts.classes,
            vec![
                "struct Config",
                "enum Mode",
                "trait Render",
                "impl Render for Config"
            ]
        );
        assert_eq!(analysis.facts.functions, vec!["render", "render"]);
    }

    #[test]
    fn async_fn_is_labeled() {
        let analysis = analyze("pub async fn run() {}\n");
        assert_eq!(analysis.facts.functions, vec!["async run"]);
    }

    #[test]
    fn main_fn_is_an_entry_point() {
        let analysis = analyze(
            "fn main() {\n\
                 println!(\"hi\");\n\
             }\n",
        );
        assert_eq!(analysis.facts.entry_points, vec!["main function"]);
        assert!(analysis.smart.iter().any(|r| r.salience == SALIENCE_ENTRY));
    }

    #[test]
    fn method_named_main_is_not_an_entry_point() {
        let analysis = analyze(
            "impl App {\n\
                 fn main(&self) {}\n\
             }\n",
        );
        assert!(analysis.facts.entry_points.is_empty());
    }

    #[test]
    fn attributes_attach_to_signatures() {
        let analysis = analyze(
            "#[derive(Debug, Clone)]\n\
             pub struct Point {\n\
                 x: f64,\n\
             }\n",
        );
        assert_eq!(analysis.facts.decorators, vec!["derive"]);
        let sig = analysis
            .structure
            .iter()
            .find(|r| r.salience == SALIENCE_SIGNATURE)
            .unwrap();
        assert_eq!((sig.start, sig.end), (0, 2));
    }

    #[test]
    fn module_doc_is_kept() {
        let analysis = analyze(
            "//! Widget rendering.\n\
             //! Second line.\n\
             use std::fmt;\n",
        );
        let doc = analysis
            .structure
            .iter()
            .find(|r| r.salience == SALIENCE_DOC)
            .unwrap();
        assert_eq!((doc.start, doc.end), (0, 2));
    }

    #[test]
    fn structure_excludes_bodies_and_fields() {
        let analysis = analyze(
            "pub fn compute(x: i32) -> i32 {\n\
                 let y = x * 2;\n\
                 y + 1\n\
             }\n",
        );
        let kept: Vec<usize> = analysis
            .structure
            .iter()
            .flat_map(|r| r.start..r.end)
            .collect();
        assert_eq!(kept, vec![0]);
    }

    #[test]
    fn mod_declarations_are_recorded() {
        let analysis = analyze("pub mod config;\nmod util;\n");
        assert_eq!(analysis.facts.exports, vec!["mod config", "mod util"]);
    }
}
