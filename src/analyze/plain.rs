//! Fallback analyzer for unrecognized extensions.
//!
//! Smart mode keeps every line (there is nothing to rank); structure
//! mode keeps nothing, which signals the truncator to degrade
//! structure requests to smart for this file.

use super::{Analysis, Analyzer, Facts, KeepRange, SALIENCE_CONTEXT};

pub struct PlainAnalyzer;

impl Analyzer for PlainAnalyzer {
    fn language(&self) -> &'static str {
        "plain"
    }

    fn analyze(&self, lines: &[&str]) -> Analysis {
        let smart = if lines.is_empty() {
            Vec::new()
        } else {
            vec![KeepRange::new(0, lines.len(), SALIENCE_CONTEXT)]
        };

        Analysis {
            facts: Facts::default(),
            smart,
            structure: Vec::new(),
        }
    }
}
