//! Wire framing — start/end markers and per-file checksums.
//!
//! Each emitted file is bracketed byte-exactly:
//!
//! ```text
//! ++++++++++ <relative-path> [TRUNCATED: <original> lines] ++++++++++
//! <content, exactly as retained, always ending in a newline>
//! ---------- <relative-path> [TRUNCATED:<original>→<final>] <md5-hex> <relative-path> ----------
//! ```
//!
//! The `[TRUNCATED …]` annotations appear only when truncation
//! occurred. The digest is the MD5 of the original decoded content,
//! never of the truncated content, so a consumer detects truncation by
//! recomputing over what it received. This module also parses framed
//! artifacts back, which powers the `check` operation.

use std::io::Write;

use anyhow::{Context, Result, bail};

/// Marker halves: exactly ten `+` and ten `-`.
const START_FENCE: &str = "++++++++++";
const END_FENCE: &str = "----------";

// ---------------------------------------------------------------------------
// Emission records
// ---------------------------------------------------------------------------

/// What the emitter writes for one file.
#[derive(Debug, Clone)]
pub struct EmissionRecord {
    pub rel_path: String,
    /// Retained content. A trailing newline is injected on write when
    /// missing; the digest is unaffected.
    pub content: String,
    /// MD5 over the original decoded content, lowercase hex.
    pub digest: String,
    pub original_lines: usize,
    pub final_lines: usize,
    pub truncated: bool,
}

/// MD5 digest of decoded content, lowercase hex.
pub fn content_digest(content: &str) -> String {
    format!("{:x}", md5::compute(content.as_bytes()))
}

/// Write one framed record.
pub fn write_record(sink: &mut dyn Write, record: &EmissionRecord) -> Result<()> {
    if record.truncated {
        writeln!(
            sink,
            "{START_FENCE} {} [TRUNCATED: {} lines] {START_FENCE}",
            record.rel_path, record.original_lines
        )?;
    } else {
        writeln!(sink, "{START_FENCE} {} {START_FENCE}", record.rel_path)?;
    }

    sink.write_all(record.content.as_bytes())?;
    if !record.content.is_empty() && !record.content.ends_with('\n') {
        sink.write_all(b"\n")?;
    }

    if record.truncated {
        writeln!(
            sink,
            "{END_FENCE} {} [TRUNCATED:{}\u{2192}{}] {} {} {END_FENCE}",
            record.rel_path,
            record.original_lines,
            record.final_lines,
            record.digest,
            record.rel_path
        )?;
    } else {
        writeln!(
            sink,
            "{END_FENCE} {} {} {} {END_FENCE}",
            record.rel_path, record.digest, record.rel_path
        )?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Parsing framed artifacts
// ---------------------------------------------------------------------------

/// One record parsed back out of a framed artifact.
#[derive(Debug, Clone)]
pub struct ParsedRecord {
    pub rel_path: String,
    pub content: String,
    pub digest: String,
    pub truncated: bool,
}

/// Integrity verdict for one parsed record.
#[derive(Debug, Clone)]
pub struct RecordCheck {
    pub rel_path: String,
    pub truncated: bool,
    /// `Some(true)` when the recomputed digest matches; `Some(false)`
    /// on mismatch; `None` for truncated records, whose digest covers
    /// content that was not emitted.
    pub digest_ok: Option<bool>,
}

/// Parse a framed artifact into its records.
pub fn parse_records(artifact: &str) -> Result<Vec<ParsedRecord>> {
    let mut records = Vec::new();
    let mut lines = artifact.split_inclusive('\n');

    while let Some(line) = lines.next() {
        let trimmed = line.trim_end_matches('\n');
        if trimmed.is_empty() {
            continue;
        }
        let (rel_path, truncated) =
            parse_start_marker(trimmed).with_context(|| format!("bad start marker: {trimmed}"))?;

        let mut content = String::new();
        let mut closed = false;
        for line in lines.by_ref() {
            let inner = line.trim_end_matches('\n');
            if let Some((end_path, digest)) = parse_end_marker(inner) {
                if end_path != rel_path {
                    bail!(
                        "end marker path '{end_path}' does not match start marker '{rel_path}'"
                    );
                }
                records.push(ParsedRecord {
                    rel_path: rel_path.clone(),
                    content: std::mem::take(&mut content),
                    digest,
                    truncated,
                });
                closed = true;
                break;
            }
            content.push_str(line);
        }
        if !closed {
            bail!("unterminated record for '{rel_path}'");
        }
    }

    Ok(records)
}

/// Verify every record in a framed artifact.
pub fn verify(artifact: &str) -> Result<Vec<RecordCheck>> {
    let records = parse_records(artifact)?;
    Ok(records
        .into_iter()
        .map(|record| {
            let digest_ok = if record.truncated {
                None
            } else {
                // The writer injects a trailing newline when the
                // original lacked one; accept either form.
                let direct = content_digest(&record.content) == record.digest;
                let unterminated = record
                    .content
                    .strip_suffix('\n')
                    .is_some_and(|body| content_digest(body) == record.digest);
                Some(direct || unterminated)
            };
            RecordCheck {
                rel_path: record.rel_path,
                truncated: record.truncated,
                digest_ok,
            }
        })
        .collect())
}

fn parse_start_marker(line: &str) -> Result<(String, bool)> {
    let Some(rest) = line.strip_prefix(START_FENCE) else {
        bail!("expected start fence");
    };
    let Some(middle) = rest.strip_suffix(START_FENCE) else {
        bail!("missing closing start fence");
    };
    let middle = middle.trim();

    if let Some(path) = middle.strip_suffix(" lines]")
        && let Some((path, count)) = path.rsplit_once(" [TRUNCATED: ")
    {
        count
            .parse::<usize>()
            .context("bad line count in start marker")?;
        return Ok((path.to_string(), true));
    }
    Ok((middle.to_string(), false))
}

/// Parse an end marker line; `None` if the line is not one.
fn parse_end_marker(line: &str) -> Option<(String, String)> {
    let rest = line.strip_prefix(END_FENCE)?;
    let middle = rest.strip_suffix(END_FENCE)?.trim();

    // Layout from the right: <digest> <rel-path>, with the rel-path
    // repeated at the front and an optional [TRUNCATED:a→b] between.
    let (before_path, path) = middle.rsplit_once(' ')?;
    let (before_digest, digest) = before_path.rsplit_once(' ')?;
    if digest.len() != 32 || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    if before_digest != path && !before_digest.starts_with(&format!("{path} [TRUNCATED:")) {
        return None;
    }
    Some((path.to_string(), digest.to_string()))
}
