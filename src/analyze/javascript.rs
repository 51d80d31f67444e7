//! JavaScript / TypeScript analyzer — `.js`, `.jsx`, `.ts`, `.tsx`,
//! `.mjs`, `.cjs`.
//!
//! Recognizes classes, function declarations, arrow-function bindings,
//! `import`/`export` statements, `require()` bindings, TypeScript
//! interface/type/enum declarations, and JSDoc blocks attached to
//! declarations.

use std::sync::LazyLock;

use regex::Regex;

use super::{
    Analysis, Analyzer, Facts, KeepRange, SALIENCE_DOC, SALIENCE_IMPORT, SALIENCE_SIGNATURE,
    extend_upward, scan_markers,
};

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^import\b.*?from\s+['"]([^'"]+)['"]|^import\s+['"]([^'"]+)['"]"#)
        .expect("import regex")
});

static REQUIRE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:const|let|var)\s+.+?=\s*require\(\s*['"]([^'"]+)['"]"#)
        .expect("require regex")
});

static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+(\w+)")
        .expect("class regex")
});

static FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:export\s+)?(?:default\s+)?(async\s+)?function\s*\*?\s*(\w+)")
        .expect("function regex")
});

static ARROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:export\s+)?(?:const|let|var)\s+(\w+)\s*(?::[^=]+)?=\s*(async\s+)?(?:\([^)]*\)|\w+)\s*(?::[^=]+)?=>",
    )
    .expect("arrow regex")
});

static TYPE_DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:export\s+)?(?:declare\s+)?(interface|type|enum)\s+(\w+)")
        .expect("type decl regex")
});

static EXPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^export\s+(?:default\s+)?(?:\{([^}]*)\}|(\w+))").expect("export regex"));

/// Lines that may sit directly above a declaration and belong to it:
/// JSDoc and plain comments.
fn is_doc_prefix(line: &str) -> bool {
    line.starts_with("/**") || line.starts_with('*') || line.starts_with("*/") || line.starts_with("//")
}

pub struct JavaScriptAnalyzer;

impl Analyzer for JavaScriptAnalyzer {
    fn language(&self) -> &'static str {
        "javascript"
    }

    fn analyze(&self, lines: &[&str]) -> Analysis {
        let mut facts = Facts::default();
        let mut smart = Vec::new();
        let mut structure = Vec::new();

        if let Some((start, end)) = leading_comment_block(lines) {
            smart.push(KeepRange::new(start, end, SALIENCE_DOC));
            structure.push(KeepRange::new(start, end, SALIENCE_DOC));
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
            if let Some(caps) = REQUIRE_RE.captures(line) {
                facts.imports.push(caps[1].to_string());
                smart.push(KeepRange::line(idx, SALIENCE_IMPORT));
                structure.push(KeepRange::line(idx, SALIENCE_IMPORT));
                continue;
            }

            if let Some(caps) = CLASS_RE.captures(line) {
                facts.classes.push(caps[1].to_string());
                push_signature(lines, idx, &mut smart, &mut structure);
                note_export(line, &caps[1], &mut facts);
                continue;
            }

            if let Some(caps) = TYPE_DECL_RE.captures(line) {
                facts.classes.push(format!("{} {}", &caps[1], &caps[2]));
                push_signature(lines, idx, &mut smart, &mut structure);
                note_export(line, &caps[2], &mut facts);
                continue;
            }

            if let Some(caps) = FUNCTION_RE.captures(line) {
                let name = caps[2].to_string();
                if caps.get(1).is_some() {
                    facts.functions.push(format!("async {name}"));
                } else {
                    facts.functions.push(name.clone());
                }
                if name == "main" {
                    facts.entry_points.push("main function".to_string());
                }
                push_signature(lines, idx, &mut smart, &mut structure);
                note_export(line, &name, &mut facts);
                continue;
            }

            if let Some(caps) = ARROW_RE.captures(line) {
                let name = caps[1].to_string();
                if caps.get(2).is_some() {
                    facts.functions.push(format!("async {name}"));
                } else {
                    facts.functions.push(name.clone());
                }
                push_signature(lines, idx, &mut smart, &mut structure);
                note_export(line, &name, &mut facts);
                continue;
            }

            // Bare export statements: `export { a, b }` / `export default x`.
            if let Some(caps) = EXPORT_RE.captures(line) {
                if let Some(names) = caps.get(1) {
                    for name in names.as_str().split(',') {
                        let name = name.trim();
                        if !name.is_empty() {
                            facts.exports.push(name.to_string());
                        }
                    }
                } else if let Some(name) = caps.get(2) {
                    facts.exports.push(name.as_str().to_string());
                }
                smart.push(KeepRange::line(idx, SALIENCE_IMPORT));
                structure.push(KeepRange::line(idx, SALIENCE_IMPORT));
            }
        }

        Analysis {
            facts,
            smart,
            structure,
        }
    }
}

/// Record the declaration at `idx` in both keep-range sets, absorbing
/// any JSDoc block sitting directly above it.
fn push_signature(
    lines: &[&str],
    idx: usize,
    smart: &mut Vec<KeepRange>,
    structure: &mut Vec<KeepRange>,
) {
    let start = extend_upward(lines, idx, is_doc_prefix);
    smart.push(KeepRange::new(start, idx + 1, SALIENCE_SIGNATURE));
    structure.push(KeepRange::new(start, idx + 1, SALIENCE_SIGNATURE));
}

/// Mark a declaration that is exported inline.
fn note_export(line: &str, name: &str, facts: &mut Facts) {
    if line.starts_with("export") {
        facts.exports.push(name.to_string());
    }
}

/// A comment block opening the file (JSDoc or `//` run) counts as
/// module-level documentation.
fn leading_comment_block(lines: &[&str]) -> Option<(usize, usize)> {
    let first = lines.first()?.trim_start();
    if first.starts_with("/*") {
        let mut end = 0;
        while end < lines.len() && end < 20 {
            if lines[end].trim_end().ends_with("*/") {
                return Some((0, end + 1));
            }
            end += 1;
        }
        return Some((0, end.min(lines.len())));
    }
    if first.starts_with("//") {
        let mut end = 1;
        while end < lines.len() && lines[end].trim_start().starts_with("//") {
            end += 1;
        }
        return Some((0, end));
    }
    None
}
