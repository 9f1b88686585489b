//! Source directory walking: from a tree of photos to a flat set of jobs.
//!
//! [`walk`] lists `<base>/<relative_dir>` and, for every entry:
//!
//! - **directory**: recurses into it and appends whatever it yields;
//! - **`.jpg` file** (any case, symlinks included): registers a `photo: <input path>` job that
//!   resizes it into `<target>/photos/<relative_dir>/`, and appends the photo
//!   path `photos/<relative_dir>/<escaped file name>`;
//! - **anything else**: ignored, including symlinks to directories.
//!
//! Entries are visited in file name order, so a pass registers jobs and
//! returns photo paths deterministically. Registration order has no effect on
//! execution order; the scheduler runs photo jobs independently.
//!
//! ```text
//! 2023/                       photos/2023/a.jpg
//! ├── a.jpg            →      photos/2023/b.JPG
//! ├── b.JPG                   photos/2023/trip/c.jpg
//! ├── notes.txt
//! └── trip/
//!     └── c.jpg
//! ```
//!
//! Output directories for photo jobs are created here, during registration, so
//! they exist before any job writes into them.

use crate::cache::PhotoCache;
use crate::files;
use crate::imaging::{self, Gravity, ImageBackend, PhotoSize};
use crate::job::{JobError, JobRegistry, JobResult, RegistryError};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_encode};
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// The one extension (compared case-insensitively) that makes a file a photo.
pub const PHOTO_EXTENSION: &str = "jpg";

/// Characters left alone when escaping a single URL path segment. Everything
/// else, including `/`, `?`, `;`, `,` and all non-ASCII bytes, is escaped.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b':')
    .remove(b'=')
    .remove(b'@');

#[derive(Error, Debug)]
pub enum WalkError {
    #[error("error reading directory '{}': {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("error creating directory '{}': {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// The job body shared by every photo of a pass.
#[derive(Clone)]
pub struct PhotoPipeline {
    pub backend: Arc<dyn ImageBackend>,
    pub cache: Option<Arc<PhotoCache>>,
    pub sizes: Arc<[PhotoSize]>,
    pub gravity: Gravity,
}

impl PhotoPipeline {
    pub fn new(backend: Arc<dyn ImageBackend>) -> Self {
        Self {
            backend,
            cache: None,
            sizes: imaging::default_photo_sizes().into(),
            gravity: Gravity::Center,
        }
    }

    pub fn with_cache(mut self, cache: Option<Arc<PhotoCache>>) -> Self {
        self.cache = cache;
        self
    }

    /// Resize `input` into `output_dir`, one file per configured size.
    pub fn resize(&self, input: &Path, output_dir: &Path) -> JobResult {
        let base_name = input.file_stem().unwrap_or_default();
        imaging::resize_photo(
            self.backend.as_ref(),
            self.cache.as_deref(),
            input,
            output_dir,
            base_name,
            self.gravity,
            &self.sizes,
        )
        .map_err(|source| JobError::Imaging {
            path: input.to_path_buf(),
            source,
        })
    }
}

/// What the walker needs besides the directory itself.
pub struct WalkContext<'a> {
    pub target_dir: &'a Path,
    pub pipeline: &'a PhotoPipeline,
}

/// Whether `name` has the photo extension, in any case.
pub fn is_photo(name: &OsStr) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case(PHOTO_EXTENSION))
}

/// Escape one path segment for use in a URL (`my photo.jpg` → `my%20photo.jpg`).
///
/// Names that are not valid UTF-8 are escaped byte for byte, so the URL still
/// decodes to the name on disk.
pub fn escape_path_segment(segment: &OsStr) -> String {
    percent_encode(segment.as_encoded_bytes(), PATH_SEGMENT).to_string()
}

/// The index path of a photo: `photos/<relative_dir>/<escaped name>`.
///
/// Directory names are kept verbatim unless they are not valid UTF-8.
pub fn photo_entry(relative_dir: &Path, file_name: &OsStr) -> String {
    let mut parts = vec!["photos".to_string()];
    for component in relative_dir.components() {
        if let Component::Normal(part) = component {
            parts.push(match part.to_str() {
                Some(name) => name.to_string(),
                None => escape_path_segment(part),
            });
        }
    }
    parts.push(escape_path_segment(file_name));
    parts.join("/")
}

/// Whether a directory entry should be treated as a file. Symlinks count
/// unless they point at a directory; a dangling link surfaces as a job error.
fn is_file_like(entry: &fs::DirEntry, file_type: fs::FileType) -> bool {
    if file_type.is_symlink() {
        return !fs::metadata(entry.path()).is_ok_and(|m| m.is_dir());
    }
    file_type.is_file()
}

/// Split a source root into the directory it lives in and its own name.
///
/// `content/2023/` → (`content`, `2023`), so its photos end up under
/// `photos/2023/`. Roots without a final name (`.`, `..`) are resolved first.
pub fn split_source_root(root: &Path) -> Result<(PathBuf, PathBuf), WalkError> {
    let cleaned: PathBuf = root.components().collect();
    if let (Some(parent), Some(name)) = (cleaned.parent(), cleaned.file_name()) {
        return Ok((parent.to_path_buf(), PathBuf::from(name)));
    }

    let resolved = fs::canonicalize(&cleaned).map_err(|source| WalkError::ReadDir {
        path: root.to_path_buf(),
        source,
    })?;
    match (resolved.parent(), resolved.file_name()) {
        (Some(parent), Some(name)) => Ok((parent.to_path_buf(), PathBuf::from(name))),
        // The filesystem root itself.
        _ => Ok((resolved, PathBuf::new())),
    }
}

/// Walk `<base>/<relative_dir>`, registering one job per photo.
///
/// Returns the photo paths of the whole subtree. Failing to list any directory
/// aborts the walk with an error naming that directory.
pub fn walk(
    base: &Path,
    relative_dir: &Path,
    ctx: &WalkContext<'_>,
    registry: &mut JobRegistry,
) -> Result<Vec<String>, WalkError> {
    let dir_path = base.join(relative_dir);
    let read_err = |source: io::Error| WalkError::ReadDir {
        path: dir_path.clone(),
        source,
    };

    let mut entries = fs::read_dir(&dir_path)
        .and_then(|rd| rd.collect::<io::Result<Vec<_>>>())
        .map_err(read_err)?;
    entries.sort_by_key(|e| e.file_name());

    let output_dir = ctx.target_dir.join("photos").join(relative_dir);
    let mut output_dir_ready = false;
    let mut photo_paths = Vec::with_capacity(entries.len());

    for entry in entries {
        let name = entry.file_name();
        let file_type = entry.file_type().map_err(read_err)?;

        if file_type.is_dir() {
            let sub_paths = walk(base, &relative_dir.join(&name), ctx, registry)?;
            photo_paths.extend(sub_paths);
            continue;
        }
        if !is_photo(&name) || !is_file_like(&entry, file_type) {
            continue;
        }

        if !output_dir_ready {
            files::ensure_dir(&output_dir).map_err(|source| WalkError::CreateDir {
                path: output_dir.clone(),
                source,
            })?;
            output_dir_ready = true;
        }

        let input_path = dir_path.join(&name);
        photo_paths.push(photo_entry(relative_dir, &name));

        let job_name = format!("photo: {}", input_path.display());
        let pipeline = ctx.pipeline.clone();
        let job_output_dir = output_dir.clone();
        registry.register(job_name, move || pipeline.resize(&input_path, &job_output_dir))?;
    }

    debug!("Walked {}: {} photos", dir_path.display(), photo_paths.len());
    Ok(photo_paths)
}
