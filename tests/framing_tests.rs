//! Wire-format properties: byte-exact framing, checksum semantics,
//! and the round-trip law (re-parsing an artifact reconstructs the
//! emitted file set with verifying hashes).

use std::fs;

use tempfile::TempDir;

use vantage::diag::Diagnostics;
use vantage::emit::{self, PackOptions};

fn pack_to_string(root: &std::path::Path, options: &PackOptions) -> String {
    let mut out: Vec<u8> = Vec::new();
    emit::pack(root, options, &mut out, Diagnostics::disabled()).unwrap();
    String::from_utf8(out).unwrap()
}

// ---------------------------------------------------------------------------
// Framing scenario: one file, exact bytes
// ---------------------------------------------------------------------------

#[test]
fn single_file_frames_byte_exactly() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("hello.txt"), "hi\n").unwrap();

    let output = pack_to_string(dir.path(), &PackOptions::default());
    assert_eq!(
        output,
        "++++++++++ hello.txt ++++++++++\n\
         hi\n\
         ---------- hello.txt b1946ac92492d2347c6235b4d2611184 hello.txt ----------\n"
    );
}

#[test]
fn empty_repository_emits_zero_bytes() {
    let dir = TempDir::new().unwrap();
    assert!(pack_to_string(dir.path(), &PackOptions::default()).is_empty());
}

#[test]
fn markers_bracket_every_file_with_matching_paths() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("a.txt"), "alpha\n").unwrap();
    fs::write(dir.path().join("sub/b.txt"), "beta\n").unwrap();

    let output = pack_to_string(dir.path(), &PackOptions::default());
    let records = emit::parse_records(&output).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].rel_path, "a.txt");
    assert_eq!(records[1].rel_path, "sub/b.txt");
    // Forward slashes regardless of host.
    assert!(output.contains("++++++++++ sub/b.txt ++++++++++"));
}

// ---------------------------------------------------------------------------
// Checksum semantics
// ---------------------------------------------------------------------------

#[test]
fn file_without_trailing_newline_gets_one_injected_but_hash_covers_original() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("raw.txt"), "no newline").unwrap();

    let output = pack_to_string(dir.path(), &PackOptions::default());
    // Content is newline-terminated before the end marker.
    assert!(output.contains("no newline\n----------"));
    // The digest is over the unterminated original bytes.
    let expected = format!("{:x}", md5::compute(b"no newline"));
    assert!(output.contains(&expected));
}

#[test]
fn bom_only_file_is_emitted_as_empty_text() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("bom.txt"), [0xEF, 0xBB, 0xBF]).unwrap();

    let output = pack_to_string(dir.path(), &PackOptions::default());
    let records = emit::parse_records(&output).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].content, "");
}

#[test]
fn latin1_fallback_content_is_framed() {
    let dir = TempDir::new().unwrap();
    // 0xE9 is invalid UTF-8 on its own; Latin-1 maps it to é.
    fs::write(dir.path().join("legacy.txt"), [b'c', b'a', b'f', 0xE9, b'\n']).unwrap();

    let output = pack_to_string(dir.path(), &PackOptions::default());
    assert!(output.contains("café"));
}

// ---------------------------------------------------------------------------
// Round trip
// ---------------------------------------------------------------------------

#[test]
fn artifact_verifies_against_itself() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.rs"), "fn main() {}\n").unwrap();
    fs::write(dir.path().join("b.md"), "# Title\n\nBody.\n").unwrap();
    fs::write(dir.path().join("c.txt"), "plain\n").unwrap();

    let output = pack_to_string(dir.path(), &PackOptions::default());
    let checks = emit::verify(&output).unwrap();
    assert_eq!(checks.len(), 3);
    assert!(checks.iter().all(|c| c.digest_ok == Some(true)));
}

#[test]
fn binary_file_content_never_appears() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("blob.bin"), b"MAGIC\x00SECRET").unwrap();
    fs::write(dir.path().join("ok.txt"), "fine\n").unwrap();

    let output = pack_to_string(dir.path(), &PackOptions::default());
    assert!(!output.contains("SECRET"));
    assert!(!output.contains("blob.bin"));
    assert!(output.contains("ok.txt"));
}

#[test]
fn oversize_boundary_is_exact() {
    let dir = TempDir::new().unwrap();
    let at_limit = "x".repeat(100);
    let over_limit = "y".repeat(101);
    fs::write(dir.path().join("at.txt"), &at_limit).unwrap();
    fs::write(dir.path().join("over.txt"), &over_limit).unwrap();

    let options = PackOptions {
        max_file_size: 100,
        ..PackOptions::default()
    };
    let output = pack_to_string(dir.path(), &options);
    assert!(output.contains("at.txt"));
    assert!(!output.contains("over.txt"));
}
