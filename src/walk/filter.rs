//! Binary & size filter — rejects non-text or oversize files before
//! their content is read in full, and decodes the survivors.
//!
//! The binary check reads at most the first kilobyte and looks for a
//! zero byte. Oversize files are rejected from their declared size
//! alone, without any read. Both rejections are reported on the
//! diagnostic channel by the caller; they never abort a run.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

/// Default ceiling on file size (bytes). Files larger than this are
/// excluded from output.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// How many leading bytes the binary probe inspects.
const PROBE_BYTES: usize = 1024;

/// Why a candidate file was rejected before emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// A zero byte appeared in the first kilobyte.
    Binary,
    /// Declared size exceeds the configured ceiling.
    Oversize { size: u64, limit: u64 },
    /// The file could not be opened or read.
    Unreadable(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Binary => write!(f, "binary content"),
            Self::Oversize { size, limit } => {
                write!(f, "size {size} bytes exceeds limit {limit}")
            }
            Self::Unreadable(err) => write!(f, "unreadable: {err}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Probing
// ---------------------------------------------------------------------------

/// Decide whether a file should be skipped without reading it in full.
///
/// Returns `None` for files that pass both the size and the binary
/// check.
pub fn probe(path: &Path, size: u64, max_size: u64) -> Option<SkipReason> {
    if size > max_size {
        return Some(SkipReason::Oversize {
            size,
            limit: max_size,
        });
    }

    let mut head = [0u8; PROBE_BYTES];
    let read = match File::open(path).and_then(|mut f| f.read(&mut head)) {
        Ok(n) => n,
        Err(err) => return Some(SkipReason::Unreadable(err.to_string())),
    };

    if head[..read].contains(&0) {
        return Some(SkipReason::Binary);
    }

    None
}

/// The zero-byte check on an in-memory buffer, for the pure `process`
/// surface where no filesystem is involved.
pub fn probe_bytes(bytes: &[u8]) -> Option<SkipReason> {
    let head = &bytes[..bytes.len().min(PROBE_BYTES)];
    if head.contains(&0) {
        Some(SkipReason::Binary)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Read and decode a file's content.
pub fn read_decoded(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(decode(bytes))
}

/// Decode file bytes to text.
///
/// UTF-8 first; on failure, an 8-bit pass-through (each byte mapped to
/// the Unicode code point of the same value) so that no text-ish file
/// is lost to a stray high byte. A leading UTF-8 BOM is stripped, so a
/// file holding only a BOM decodes to empty text.
pub fn decode(bytes: Vec<u8>) -> String {
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => err
            .into_bytes()
            .iter()
            .map(|&b| b as char)
            .collect::<String>(),
    };
    text.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn utf8_passes_through() {
        assert_eq!(decode(b"hello\n".to_vec()), "hello\n");
    }

    #[test]
    fn invalid_utf8_falls_back_to_latin1() {
        // 0xE9 alone is invalid UTF-8; Latin-1 maps it to é.
        let decoded = decode(vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(decoded, "café");
    }

    #[test]
    fn bom_only_file_is_empty_text() {
        assert_eq!(decode(vec![0xEF, 0xBB, 0xBF]), "");
    }

    #[test]
    fn bom_prefix_is_stripped() {
        assert_eq!(decode(vec![0xEF, 0xBB, 0xBF, b'h', b'i']), "hi");
    }

    #[test]
    fn zero_byte_in_buffer_is_binary() {
        assert_eq!(probe_bytes(b"ab\0cd"), Some(SkipReason::Binary));
        assert_eq!(probe_bytes(b"abcd"), None);
    }

    #[test]
    fn zero_byte_past_first_kb_is_not_detected() {
        let mut bytes = vec![b'a'; 2048];
        bytes[1500] = 0;
        assert_eq!(probe_bytes(&bytes), None);
    }

    #[test]
    fn probe_rejects_oversize_without_reading() {
        // The path does not need to exist; size alone decides.
        let reason = probe(Path::new("/nonexistent"), 10, 5);
        assert_eq!(
            reason,
            Some(SkipReason::Oversize { size: 10, limit: 5 })
        );
    }

    #[test]
    fn probe_detects_binary_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"MZ\0\0binary").unwrap();
        let reason = probe(file.path(), 10, DEFAULT_MAX_FILE_SIZE);
        assert_eq!(reason, Some(SkipReason::Binary));
    }

    #[test]
    fn probe_passes_text_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"plain text content\n").unwrap();
        assert_eq!(probe(file.path(), 19, DEFAULT_MAX_FILE_SIZE), None);
    }

    #[test]
    fn size_exactly_at_ceiling_passes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"12345").unwrap();
        assert_eq!(probe(file.path(), 5, 5), None);
        assert!(probe(file.path(), 6, 5).is_some());
    }
}
