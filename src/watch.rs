//! Watch mode: rerun the build pass whenever the sources change.
//!
//! Change detection is polling. Every tick the source roots are walked and
//! reduced to one SHA-256 fingerprint over each entry's path, size and
//! modification time; a pass runs on the first tick and whenever the
//! fingerprint differs from the one the last pass saw.
//!
//! A failing pass never ends the loop. Pass-aborting errors and per-job errors
//! are both logged, and the loop waits for the next change.

use crate::build;
use crate::config::BuildConfig;
use crate::imaging::ImageBackend;
use crate::output;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, UNIX_EPOCH};
use tracing::{debug, error, info};
use walkdir::WalkDir;

/// Default pause between polls.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

fn hash_root(hasher: &mut Sha256, root: &Path) {
    hasher.update(root.as_os_str().as_encoded_bytes());
    hasher.update(b"\0");

    if !root.exists() {
        hasher.update(b"missing\0");
        return;
    }

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(_) => {
                hasher.update(b"unreadable\0");
                continue;
            }
        };
        hasher.update(entry.path().as_os_str().as_encoded_bytes());
        hasher.update(b"\0");
        if let Ok(meta) = entry.metadata() {
            hasher.update(meta.len().to_le_bytes());
            let mtime = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_nanos())
                .unwrap_or_default();
            hasher.update(mtime.to_le_bytes());
        }
    }
}

/// Fingerprint of everything under `roots`.
///
/// Missing roots contribute a fixed marker, so a root appearing or
/// disappearing also counts as a change.
pub fn fingerprint(roots: &[PathBuf]) -> String {
    let mut hasher = Sha256::new();
    for root in roots {
        hash_root(&mut hasher, root);
    }
    format!("{:x}", hasher.finalize())
}

/// Remembers the last fingerprint seen for a set of roots.
#[derive(Debug)]
pub struct Watcher {
    roots: Vec<PathBuf>,
    last: Option<String>,
}

impl Watcher {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots, last: None }
    }

    /// Whether the roots changed since the previous call. The first call
    /// always reports a change.
    pub fn poll(&mut self) -> bool {
        let current = fingerprint(&self.roots);
        if self.last.as_deref() == Some(current.as_str()) {
            return false;
        }
        self.last = Some(current);
        true
    }
}

/// Run one pass and report it. Errors are logged, never returned.
fn run_pass(config: &BuildConfig, backend: &Arc<dyn ImageBackend>) {
    match build::build(config, backend.clone()) {
        Ok(outcome) => output::log_outcome(&outcome),
        Err(e) => error!("Build failed: {e}"),
    }
}

/// Poll the source roots every `interval`, running a pass on each change.
///
/// `keep_going` is asked after every poll with the number of passes run so
/// far; the loop ends when it returns `false`. Returns the number of passes.
pub fn watch<F>(
    config: &BuildConfig,
    backend: Arc<dyn ImageBackend>,
    interval: Duration,
    mut keep_going: F,
) -> usize
where
    F: FnMut(usize) -> bool,
{
    let mut watcher = Watcher::new(config.source_dirs.clone());
    let mut passes = 0;

    info!("Watching {} source directories", config.source_dirs.len());
    loop {
        if watcher.poll() {
            if passes > 0 {
                info!("Change detected, rebuilding");
            }
            run_pass(config, &backend);
            passes += 1;
        } else {
            debug!("No changes");
        }

        if !keep_going(passes) {
            return passes;
        }
        thread::sleep(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{RecordingBackend, test_config, write_tree};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn fingerprint_is_stable_without_changes() {
        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &["src/a.jpg", "src/sub/b.jpg"]);
        let roots = vec![tmp.path().join("src")];

        assert_eq!(fingerprint(&roots), fingerprint(&roots));
    }

    #[test]
    fn fingerprint_sees_new_files_and_edits() {
        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &["src/a.jpg"]);
        let roots = vec![tmp.path().join("src")];
        let before = fingerprint(&roots);

        write_tree(tmp.path(), &["src/sub/new.jpg"]);
        let added = fingerprint(&roots);
        assert_ne!(before, added);

        fs::write(tmp.path().join("src/a.jpg"), "a much longer replacement").unwrap();
        assert_ne!(added, fingerprint(&roots));
    }

    #[test]
    fn fingerprint_sees_root_appearing() {
        let tmp = TempDir::new().unwrap();
        let roots = vec![tmp.path().join("later")];
        let missing = fingerprint(&roots);

        fs::create_dir_all(tmp.path().join("later")).unwrap();
        assert_ne!(missing, fingerprint(&roots));
    }

    #[test]
    fn watcher_reports_first_poll_then_changes_only() {
        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &["src/a.jpg"]);
        let mut watcher = Watcher::new(vec![tmp.path().join("src")]);

        assert!(watcher.poll());
        assert!(!watcher.poll());

        fs::remove_file(tmp.path().join("src/a.jpg")).unwrap();
        assert!(watcher.poll());
        assert!(!watcher.poll());
    }

    #[test]
    fn watch_rebuilds_after_change() {
        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &["src/a.jpg"]);
        let config = test_config(tmp.path(), &["src"]);
        let backend = Arc::new(RecordingBackend::with_dimensions(600, 900));
        let mut polls = 0;

        let passes = watch(&config, backend.clone(), Duration::ZERO, |passes| {
            polls += 1;
            if polls == 1 {
                write_tree(tmp.path(), &["src/b.jpg"]);
            }
            passes < 2 && polls < 10
        });

        assert_eq!(passes, 2);
        let html = fs::read_to_string(tmp.path().join("public/index.html")).unwrap();
        assert!(html.contains("photos/src/b.jpg"));
        // a.jpg was cached by the first pass; only b.jpg is encoded again.
        assert_eq!(backend.resizes().len(), 4);
    }

    #[test]
    fn watch_survives_failing_pass() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path(), &["missing"]);
        let backend = Arc::new(RecordingBackend::with_dimensions(600, 900));
        let mut polls = 0;

        let passes = watch(&config, backend, Duration::ZERO, |passes| {
            polls += 1;
            if polls == 1 {
                write_tree(tmp.path(), &["missing/a.jpg"]);
            }
            passes < 2 && polls < 10
        });

        assert_eq!(passes, 2);
        assert!(tmp.path().join("public/photos/missing/a.jpg").is_file());
    }
}
