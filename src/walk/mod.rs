//! Path walker — lazy directory traversal with pruning and
//! deterministic ordering.
//!
//! The walker is a bounded-memory generator: descriptors are yielded
//! one at a time as the traversal proceeds, so the first output bytes
//! of a run never wait on the last file being discovered. At each
//! directory, entries are visited in lexicographic name order before
//! recursing, and subtrees the pattern set prunes are never entered.
//!
//! Non-fatal problems (unreadable directories, vanished files, binary
//! or oversize content) surface as [`WalkEvent::Skipped`] so the
//! caller can forward them to the diagnostic channel; they never abort
//! the traversal.

pub mod filter;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use ignore::WalkBuilder;

use crate::glob::PatternSet;

// ---------------------------------------------------------------------------
// File descriptors
// ---------------------------------------------------------------------------

/// One candidate file, produced by the walker. Immutable after
/// creation.
#[derive(Debug, Clone)]
pub struct FileDescriptor {
    /// Path relative to the root, forward-slash normalized.
    pub rel_path: String,
    /// Absolute path, for I/O.
    pub abs_path: PathBuf,
    /// Declared size in bytes.
    pub size: u64,
    /// Modification time.
    pub mtime: SystemTime,
    /// Creation time; falls back to `mtime` where the platform or
    /// filesystem does not record one.
    pub ctime: SystemTime,
}

/// One step of the traversal.
#[derive(Debug)]
pub enum WalkEvent {
    /// An admissible file.
    File(FileDescriptor),
    /// Something was skipped; `path` may be empty when the error did
    /// not name one.
    Skipped { path: String, reason: String },
}

// ---------------------------------------------------------------------------
// Walker
// ---------------------------------------------------------------------------

/// Lazy traversal of a repository root.
pub struct Walker {
    root: PathBuf,
    patterns: Arc<PatternSet>,
    max_file_size: u64,
    inner: ignore::Walk,
}

impl Walker {
    /// Build a walker over `root`.
    ///
    /// All of the `ignore` crate's implicit filtering (hidden files,
    /// gitignore and friends) is disabled: which files are admitted
    /// depends only on the explicit pattern set, so identical inputs
    /// yield identical traversals on any host.
    pub fn new(root: &Path, patterns: Arc<PatternSet>, max_file_size: u64) -> Self {
        let filter_patterns = Arc::clone(&patterns);
        let filter_root = root.to_path_buf();

        let inner = WalkBuilder::new(root)
            .standard_filters(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                if entry.depth() == 0 {
                    return true;
                }
                if !entry.file_type().is_some_and(|t| t.is_dir()) {
                    return true;
                }
                let rel = relative_path(&filter_root, entry.path());
                !filter_patterns.prunes(&rel)
            })
            .build();

        Self {
            root: root.to_path_buf(),
            patterns,
            max_file_size,
            inner,
        }
    }
}

impl Iterator for Walker {
    type Item = WalkEvent;

    fn next(&mut self) -> Option<WalkEvent> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    return Some(WalkEvent::Skipped {
                        path: String::new(),
                        reason: err.to_string(),
                    });
                }
            };

            if entry.depth() == 0 {
                continue;
            }
            let Some(file_type) = entry.file_type() else {
                continue;
            };
            // Directories are traversal structure, not candidates;
            // symlinks and special files are never followed.
            if !file_type.is_file() {
                continue;
            }

            let rel_path = relative_path(&self.root, entry.path());
            if !self.patterns.matches(&rel_path) {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) => {
                    return Some(WalkEvent::Skipped {
                        path: rel_path,
                        reason: err.to_string(),
                    });
                }
            };

            let size = metadata.len();
            if let Some(reason) = filter::probe(entry.path(), size, self.max_file_size) {
                return Some(WalkEvent::Skipped {
                    path: rel_path,
                    reason: reason.to_string(),
                });
            }

            let mtime = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            let ctime = metadata.created().unwrap_or(mtime);

            return Some(WalkEvent::File(FileDescriptor {
                rel_path,
                abs_path: entry.path().to_path_buf(),
                size,
                mtime,
                ctime,
            }));
        }
    }
}

/// Forward-slash path of `path` relative to `root`.
fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walk::filter::DEFAULT_MAX_FILE_SIZE;
    use std::fs;
    use tempfile::TempDir;

    fn walk_paths(root: &Path, patterns: PatternSet) -> Vec<String> {
        Walker::new(root, Arc::new(patterns), DEFAULT_MAX_FILE_SIZE)
            .filter_map(|event| match event {
                WalkEvent::File(desc) => Some(desc.rel_path),
                WalkEvent::Skipped { .. } => None,
            })
            .collect()
    }

    #[test]
    fn yields_files_in_lexicographic_order() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("b")).unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("b/y.txt"), "y").unwrap();
        fs::write(dir.path().join("a/x.txt"), "x").unwrap();
        fs::write(dir.path().join("c.txt"), "c").unwrap();

        let paths = walk_paths(dir.path(), PatternSet::admit_all());
        assert_eq!(paths, vec!["a/x.txt", "b/y.txt", "c.txt"]);
    }

    #[test]
    fn each_file_yielded_exactly_once() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("one.txt"), "1").unwrap();
        fs::write(dir.path().join("two.txt"), "2").unwrap();

        let paths = walk_paths(dir.path(), PatternSet::admit_all());
        assert_eq!(paths.len(), 2);
        let mut deduped = paths.clone();
        deduped.dedup();
        assert_eq!(deduped, paths);
    }

    #[test]
    fn pruned_directory_is_not_descended() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("node_modules")).unwrap();
        fs::write(dir.path().join("node_modules/big.js"), "x").unwrap();
        fs::write(dir.path().join("app.js"), "x").unwrap();

        let patterns = PatternSet::new(&[], &["node_modules".to_string()]).unwrap();
        let paths = walk_paths(dir.path(), patterns);
        assert_eq!(paths, vec!["app.js"]);
    }

    #[test]
    fn include_set_restricts_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("main.rs"), "fn main() {}").unwrap();
        fs::write(dir.path().join("notes.txt"), "notes").unwrap();

        let patterns = PatternSet::new(&["*.rs".to_string()], &[]).unwrap();
        let paths = walk_paths(dir.path(), patterns);
        assert_eq!(paths, vec!["main.rs"]);
    }

    #[test]
    fn binary_file_is_skipped_with_reason() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("blob.bin"), b"\x00\x01\x02").unwrap();
        fs::write(dir.path().join("text.txt"), "hello").unwrap();

        let events: Vec<WalkEvent> = Walker::new(
            dir.path(),
            Arc::new(PatternSet::admit_all()),
            DEFAULT_MAX_FILE_SIZE,
        )
        .collect();

        let mut files = Vec::new();
        let mut skipped = Vec::new();
        for event in events {
            match event {
                WalkEvent::File(d) => files.push(d.rel_path),
                WalkEvent::Skipped { path, reason } => skipped.push((path, reason)),
            }
        }
        assert_eq!(files, vec!["text.txt"]);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].0, "blob.bin");
        assert!(skipped[0].1.contains("binary"));
    }

    #[test]
    fn oversize_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("large.txt"), "abcdefghij").unwrap();

        let events: Vec<WalkEvent> =
            Walker::new(dir.path(), Arc::new(PatternSet::admit_all()), 5).collect();
        assert!(matches!(
            &events[0],
            WalkEvent::Skipped { path, .. } if path == "large.txt"
        ));
    }

    #[test]
    fn empty_directory_yields_nothing() {
        let dir = TempDir::new().unwrap();
        let paths = walk_paths(dir.path(), PatternSet::admit_all());
        assert!(paths.is_empty());
    }
}
