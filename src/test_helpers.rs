//! Shared test utilities for the gal test suite.
//!
//! Provides a recording image backend, fixture tree setup and a ready-made
//! build configuration pointing into a temp directory.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_tree(tmp.path(), &["src/2023/a.jpg", "src/2023/trip/b.jpg"]);
//!
//! let backend = RecordingBackend::with_dimensions(600, 900);
//! // ... run jobs against &backend ...
//! assert_eq!(backend.resizes().len(), 4);
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::BuildConfig;
use crate::imaging::{BackendError, Dimensions, ImageBackend, ResizeParams};

// =========================================================================
// Recording backend
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedOp {
    Identify(PathBuf),
    Resize(ResizeParams),
}

/// Backend that records every call and writes a small placeholder file for
/// each resize, so cache freshness checks see real outputs.
///
/// Uses Mutex (not RefCell) so it is Sync and works from rayon workers.
pub struct RecordingBackend {
    dimensions: Dimensions,
    fail_on: Option<String>,
    operations: Mutex<Vec<RecordedOp>>,
}

impl RecordingBackend {
    /// Every identify reports `width`×`height`.
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            dimensions: Dimensions { width, height },
            fail_on: None,
            operations: Mutex::new(Vec::new()),
        }
    }

    /// Fail resizes whose source path contains `needle`.
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    pub fn operations(&self) -> Vec<RecordedOp> {
        self.operations.lock().unwrap().clone()
    }

    /// Just the resize calls, in call order.
    pub fn resizes(&self) -> Vec<ResizeParams> {
        self.operations()
            .into_iter()
            .filter_map(|op| match op {
                RecordedOp::Resize(params) => Some(params),
                RecordedOp::Identify(_) => None,
            })
            .collect()
    }
}

impl ImageBackend for RecordingBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        self.operations
            .lock()
            .unwrap()
            .push(RecordedOp::Identify(path.to_path_buf()));
        Ok(self.dimensions)
    }

    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError> {
        self.operations
            .lock()
            .unwrap()
            .push(RecordedOp::Resize(params.clone()));

        if let Some(needle) = &self.fail_on
            && params.source.to_string_lossy().contains(needle.as_str())
        {
            return Err(BackendError::ProcessingFailed(format!(
                "refusing to resize {}",
                params.source.display()
            )));
        }

        let placeholder = format!(
            "{}x{} from {}",
            params.width,
            params.height,
            params.source.display()
        );
        fs::write(&params.output, placeholder)?;
        Ok(())
    }
}

// =========================================================================
// Fixture setup
// =========================================================================

/// Create every file in `files` (paths relative to `root`), with parents.
///
/// File contents are the relative path itself, so distinct files hash
/// differently.
pub fn write_tree(root: &Path, files: &[&str]) {
    for rel in files {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, rel.as_bytes()).unwrap();
    }
}

/// A build config for `sources` (relative to `root`) writing into
/// `<root>/public`.
pub fn test_config(root: &Path, sources: &[&str]) -> BuildConfig {
    let mut config = BuildConfig::new(
        sources.iter().map(|s| root.join(s)).collect(),
        root.join("public"),
    );
    config.asset_dir = root.join("assets");
    config.concurrency = 4;
    config.shuffle_seed = Some(1);
    config
}
