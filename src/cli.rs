//! CLI command implementations.
//!
//! Thin handlers over the library surface:
//! - `vantage pack` — serialize a repository to stdout or a file
//! - `vantage lenses` — list built-in and user-defined lenses
//! - `vantage check` — verify the checksums of a framed artifact

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::config;
use crate::diag::Diagnostics;
use crate::emit::{self, PackOptions};
use crate::lens;

// ---------------------------------------------------------------------------
// vantage pack
// ---------------------------------------------------------------------------

/// Run a pack and write the artifact to `output` (stdout when `None`).
/// Diagnostics go to stderr.
pub fn run_pack(root: &Path, options: &PackOptions, output: Option<&Path>) -> Result<()> {
    let root = root
        .canonicalize()
        .with_context(|| format!("invalid root directory {}", root.display()))?;

    let mut stderr = std::io::stderr();
    let diag = Diagnostics::new(&mut stderr);

    let report = match output {
        Some(path) => {
            let mut file = std::fs::File::create(path)
                .with_context(|| format!("cannot create {}", path.display()))?;
            emit::pack(&root, options, &mut file, diag)?
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            let report = emit::pack(&root, options, &mut lock, diag)?;
            lock.flush()?;
            report
        }
    };

    eprintln!(
        "{} {} emitted, {} dropped",
        "done:".green().bold(),
        report.emitted,
        report.dropped
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// vantage lenses
// ---------------------------------------------------------------------------

/// List every lens available for a repository root.
pub fn run_lenses(root: &Path) -> Result<()> {
    let mut stderr = std::io::stderr();
    let mut diag = Diagnostics::new(&mut stderr);
    let config = config::load(root, &mut diag)?;

    println!("{}", "Available lenses".bold().cyan());
    for lens in lens::all(&config) {
        let marker = if lens::BUILTIN_NAMES.contains(&lens.name.as_str()) {
            "builtin"
        } else {
            "user"
        };
        println!(
            "  {:<14} {:<8} {} (mode: {}, sort: {:?} {:?})",
            lens.name.bold(),
            marker.dimmed(),
            lens.description,
            lens.truncate_mode,
            lens.sort_by,
            lens.sort_order,
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// vantage check
// ---------------------------------------------------------------------------

/// Verify a framed artifact. Returns `false` when any record fails its
/// checksum, so the front-end can exit non-zero.
pub fn run_check(artifact_path: &Path) -> Result<bool> {
    let artifact = std::fs::read_to_string(artifact_path)
        .with_context(|| format!("cannot read {}", artifact_path.display()))?;
    let checks = emit::verify(&artifact)?;

    let mut all_ok = true;
    for check in &checks {
        let verdict = match check.digest_ok {
            Some(true) => "ok".green(),
            Some(false) => {
                all_ok = false;
                "checksum mismatch".red().bold()
            }
            None => "truncated (not verifiable)".yellow(),
        };
        println!("  {:<40} {verdict}", check.rel_path);
    }
    println!(
        "{} {} records, {} verified",
        if all_ok { "ok:".green().bold() } else { "FAILED:".red().bold() },
        checks.len(),
        checks
            .iter()
            .filter(|c| c.digest_ok == Some(true))
            .count()
    );
    Ok(all_ok)
}
