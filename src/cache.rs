//! Photo variant cache for incremental builds.
//!
//! Resizing through ImageMagick and MozJPEG is by far the slowest part of a
//! pass. This module lets a photo job skip the external tools when neither the
//! source photo nor the variant's parameters changed since the last pass, and
//! report `changed = false` for it.
//!
//! ## Cache keys
//!
//! Lookups are **content-addressed** by `source_hash` + `params_hash`:
//!
//! - **`source_hash`**: SHA-256 of the source file contents. Content-based
//!   rather than mtime-based so it survives `git checkout` and `rsync` (which
//!   reset modification times).
//! - **`params_hash`**: SHA-256 of the variant descriptor (suffix, width, crop
//!   ratios, quality) and the gravity. Any change re-encodes the variant.
//!
//! A hit requires a matching entry *and* the previously written file still on
//! disk. When the content matches but the file was written under another path
//! (a source directory was renamed), the old file is copied instead of
//! re-encoded.
//!
//! ## Storage
//!
//! The manifest is `<target>/.gal-cache.json`, with paths relative to the
//! target directory. It is loaded once before a pass is scheduled and saved
//! once after all jobs finished; photo jobs only touch it through
//! [`PhotoCache`], whose entries are keyed by each job's own output paths.

use crate::imaging::{Gravity, PhotoSize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Name of the cache manifest file within the target directory.
pub const MANIFEST_FILENAME: &str = ".gal-cache.json";

/// Bump to invalidate all existing caches when the key computation changes.
const MANIFEST_VERSION: u32 = 1;

/// A single cached output file.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub source_hash: String,
    pub params_hash: String,
}

/// On-disk cache manifest mapping output paths to their cache entries.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    pub entries: HashMap<String, CacheEntry>,
    /// `"{source_hash}:{params_hash}"` → output path. Rebuilt on load.
    #[serde(skip)]
    content_index: HashMap<String, String>,
}

impl CacheManifest {
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: HashMap::new(),
            content_index: HashMap::new(),
        }
    }

    /// Load from the target directory. Missing, corrupt, or outdated
    /// manifests all yield an empty one.
    pub fn load(target_dir: &Path) -> Self {
        let path = target_dir.join(MANIFEST_FILENAME);
        let Ok(content) = std::fs::read_to_string(&path) else {
            return Self::empty();
        };
        let mut manifest: Self = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(_) => return Self::empty(),
        };
        if manifest.version != MANIFEST_VERSION {
            return Self::empty();
        }
        manifest.content_index = manifest
            .entries
            .iter()
            .map(|(output, entry)| (content_key(&entry.source_hash, &entry.params_hash), output.clone()))
            .collect();
        manifest
    }

    pub fn save(&self, target_dir: &Path) -> io::Result<()> {
        let path = target_dir.join(MANIFEST_FILENAME);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Whether `output_path` was recorded with exactly this content and is
    /// still on disk.
    pub fn is_current(&self, output_path: &str, source_hash: &str, params_hash: &str, target_dir: &Path) -> bool {
        self.entries.get(output_path).is_some_and(|entry| {
            entry.source_hash == source_hash && entry.params_hash == params_hash
        }) && target_dir.join(output_path).exists()
    }

    /// Some output path holding this content, if that file still exists.
    pub fn find_cached(&self, source_hash: &str, params_hash: &str, target_dir: &Path) -> Option<String> {
        let stored = self.content_index.get(&content_key(source_hash, params_hash))?;
        target_dir.join(stored).exists().then(|| stored.clone())
    }

    /// Record what an output file now holds.
    pub fn insert(&mut self, output_path: String, source_hash: String, params_hash: String) {
        let key = content_key(&source_hash, &params_hash);
        // The file at output_path no longer holds its previous content.
        if let Some(previous) = self.entries.get(&output_path) {
            let previous_key = content_key(&previous.source_hash, &previous.params_hash);
            if previous_key != key && self.content_index.get(&previous_key) == Some(&output_path) {
                self.content_index.remove(&previous_key);
            }
        }
        self.content_index.insert(key, output_path.clone());
        self.entries.insert(
            output_path,
            CacheEntry {
                source_hash,
                params_hash,
            },
        );
    }

    /// Forget outputs that no longer exist under `target_dir`.
    pub fn prune_missing(&mut self, target_dir: &Path) {
        self.entries.retain(|output, _| target_dir.join(output).exists());
        let entries = &self.entries;
        self.content_index.retain(|_, output| entries.contains_key(output));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn content_key(source_hash: &str, params_hash: &str) -> String {
    format!("{source_hash}:{params_hash}")
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// SHA-256 hash of everything that determines a variant's pixels.
pub fn hash_variant_params(size: &PhotoSize, gravity: Gravity) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"variant\0");
    hasher.update(size.suffix.as_bytes());
    hasher.update(b"\0");
    hasher.update(size.width.to_le_bytes());
    for (w, h) in [size.crop.portrait, size.crop.landscape, size.crop.square] {
        hasher.update(w.to_le_bytes());
        hasher.update(h.to_le_bytes());
    }
    hasher.update(size.quality.value().to_le_bytes());
    hasher.update(gravity.as_magick().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// What to do for one variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// The output file is current.
    Fresh,
    /// Identical output exists elsewhere under the target; copy it.
    CopyFrom(PathBuf),
    /// Nothing usable; run the pipeline.
    Miss,
}

/// Summary of cache performance for a pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub copies: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn total(&self) -> u32 {
        self.hits + self.copies + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.copies > 0 {
            write!(
                f,
                "{} cached, {} copied, {} encoded ({} total)",
                self.hits,
                self.copies,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} cached, {} encoded ({} total)", self.hits, self.misses, self.total())
        }
    }
}

struct CacheState {
    manifest: CacheManifest,
    stats: CacheStats,
}

/// Thread-safe view of the cache manifest shared by the photo jobs of a pass.
pub struct PhotoCache {
    target_dir: PathBuf,
    state: Mutex<CacheState>,
}

impl PhotoCache {
    pub fn new(target_dir: &Path, manifest: CacheManifest) -> Self {
        Self {
            target_dir: target_dir.to_path_buf(),
            state: Mutex::new(CacheState {
                manifest,
                stats: CacheStats::default(),
            }),
        }
    }

    /// Load the manifest stored under `target_dir` (or start empty).
    pub fn load(target_dir: &Path) -> Self {
        Self::new(target_dir, CacheManifest::load(target_dir))
    }

    fn key(&self, output: &Path) -> String {
        output
            .strip_prefix(&self.target_dir)
            .unwrap_or(output)
            .to_string_lossy()
            .replace('\\', "/")
    }

    fn state(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decide whether `output` needs work. Updates hit/copy/miss counts.
    pub fn lookup(&self, output: &Path, source_hash: &str, params_hash: &str) -> CacheLookup {
        let key = self.key(output);
        let mut state = self.state();
        if state
            .manifest
            .is_current(&key, source_hash, params_hash, &self.target_dir)
        {
            state.stats.hits += 1;
            return CacheLookup::Fresh;
        }
        let found = state
            .manifest
            .find_cached(source_hash, params_hash, &self.target_dir);
        match found {
            Some(stored) if stored != key => {
                state.stats.copies += 1;
                CacheLookup::CopyFrom(self.target_dir.join(stored))
            }
            _ => {
                state.stats.misses += 1;
                CacheLookup::Miss
            }
        }
    }

    /// Record that `output` now holds this content.
    pub fn record(&self, output: &Path, source_hash: &str, params_hash: &str) {
        let key = self.key(output);
        self.state()
            .manifest
            .insert(key, source_hash.to_string(), params_hash.to_string());
    }

    pub fn stats(&self) -> CacheStats {
        self.state().stats
    }

    /// Write the manifest, dropping entries whose files are gone.
    pub fn save(&self) -> io::Result<()> {
        let mut state = self.state();
        state.manifest.prune_missing(&self.target_dir);
        state.manifest.save(&self.target_dir)
    }
}
