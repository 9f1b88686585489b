//! Filesystem primitives used by the orchestrator and as job bodies.
//!
//! - [`ensure_dir`] / [`ensure_symlink`] — pass preconditions, run before any
//!   job is registered.
//! - [`write_static_assets`] — mirrors the CSS bundled into the binary into the
//!   target directory (production mode).
//! - [`write_if_changed`] — writes a file only when its content differs, so
//!   jobs can report an accurate `changed` flag.

use crate::job::{JobError, JobResult};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A file bundled into the binary, with its path relative to the target root.
#[derive(Debug, Clone, Copy)]
pub struct StaticAsset {
    pub path: &'static str,
    pub contents: &'static [u8],
}

/// Static assets embedded at compile time.
pub const STATIC_ASSETS: &[StaticAsset] = &[StaticAsset {
    path: "assets/css/main.css",
    contents: include_bytes!("../assets/css/main.css"),
}];

pub fn ensure_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

/// Make `dest` a symlink to `source` (resolved to an absolute path).
///
/// An existing symlink pointing elsewhere is replaced. A real file or
/// directory at `dest` is left alone and reported as an error. Returns
/// whether the link was (re)created.
pub fn ensure_symlink(source: &Path, dest: &Path) -> io::Result<bool> {
    let target = fs::canonicalize(source)?;

    match fs::symlink_metadata(dest) {
        Ok(meta) if meta.file_type().is_symlink() => {
            if fs::read_link(dest)? == target {
                return Ok(false);
            }
            fs::remove_file(dest)?;
        }
        Ok(_) => {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("'{}' exists and is not a symlink", dest.display()),
            ));
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    debug!("Linking {} → {}", dest.display(), target.display());
    create_symlink(&target, dest)?;
    Ok(true)
}

#[cfg(unix)]
fn create_symlink(target: &Path, dest: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, dest)
}

#[cfg(windows)]
fn create_symlink(target: &Path, dest: &Path) -> io::Result<()> {
    if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, dest)
    } else {
        std::os::windows::fs::symlink_file(target, dest)
    }
}

/// Write `contents` to `path` unless it already holds exactly that.
pub fn write_if_changed(path: &Path, contents: &[u8]) -> io::Result<bool> {
    match fs::read(path) {
        Ok(existing) if existing == contents => return Ok(false),
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    fs::write(path, contents)?;
    Ok(true)
}

/// Replace a symlinked directory (left behind by a development build) with a
/// real one, so mirrored files never land in the linked source tree.
fn ensure_real_dir(path: &Path) -> io::Result<()> {
    if let Ok(meta) = fs::symlink_metadata(path)
        && meta.file_type().is_symlink()
    {
        fs::remove_file(path)?;
    }
    fs::create_dir_all(path)
}

/// Mirror `assets` into `target_dir`, preserving their relative paths.
pub fn write_static_assets(target_dir: &Path, assets: &[StaticAsset]) -> JobResult {
    let mut changed = false;
    for asset in assets {
        let dest: PathBuf = target_dir.join(asset.path);
        if let Some(parent) = dest.parent() {
            // Outermost first: target/assets, then target/assets/css.
            let dirs: Vec<&Path> = parent.ancestors().take_while(|d| *d != target_dir).collect();
            for dir in dirs.into_iter().rev() {
                ensure_real_dir(dir).map_err(|e| JobError::io(dir, e))?;
            }
        }
        changed |= write_if_changed(&dest, asset.contents).map_err(|e| JobError::io(&dest, e))?;
    }
    Ok(changed)
}
