//! High-level photo operations.
//!
//! [`resize_photo`] turns one source photo into one output file per
//! [`PhotoSize`], consulting the [`PhotoCache`] so unchanged variants are not
//! re-encoded. It reports whether anything was written.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{Orientation, crop_dimensions, variant_file_name};
use super::params::{Gravity, PhotoSize, ResizeParams};
use crate::cache::{CacheLookup, PhotoCache, hash_file, hash_variant_params};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Produce every variant of `source` in `output_dir`.
///
/// Each variant is written to `<output_dir>/<base_name><suffix><ext>`, where
/// `ext` is the source's own extension. The source is only identified when at
/// least one variant actually has to be produced.
///
/// Returns `Ok(true)` if any output file was written.
pub fn resize_photo(
    backend: &dyn ImageBackend,
    cache: Option<&PhotoCache>,
    source: &Path,
    output_dir: &Path,
    base_name: &OsStr,
    gravity: Gravity,
    sizes: &[PhotoSize],
) -> Result<bool> {
    let ext = source
        .extension()
        .map(|e| {
            let mut dotted = OsString::from(".");
            dotted.push(e);
            dotted
        })
        .unwrap_or_default();

    let source_hash = match cache {
        Some(_) => Some(hash_file(source)?),
        None => None,
    };

    let mut dims: Option<Dimensions> = None;
    let mut changed = false;

    for size in sizes {
        let output = output_dir.join(variant_file_name(base_name, &size.suffix, &ext));
        let params_hash = hash_variant_params(size, gravity);

        if let (Some(cache), Some(source_hash)) = (cache, source_hash.as_deref()) {
            match cache.lookup(&output, source_hash, &params_hash) {
                CacheLookup::Fresh => {
                    debug!("Up to date: {}", output.display());
                    continue;
                }
                CacheLookup::CopyFrom(previous) => {
                    debug!("Copying {} → {}", previous.display(), output.display());
                    fs::copy(&previous, &output)?;
                    cache.record(&output, source_hash, &params_hash);
                    changed = true;
                    continue;
                }
                CacheLookup::Miss => {}
            }
        }

        let source_dims = match dims {
            Some(d) => d,
            None => {
                let d = backend.identify(source)?;
                dims = Some(d);
                d
            }
        };
        let ratio = size.crop.ratio_for(Orientation::of(source_dims));
        let (width, height) = crop_dimensions(size.width, ratio);

        backend.resize(&ResizeParams {
            source: source.to_path_buf(),
            output: output.clone(),
            width,
            height,
            gravity,
            quality: size.quality,
        })?;

        if let (Some(cache), Some(source_hash)) = (cache, source_hash.as_deref()) {
            cache.record(&output, source_hash, &params_hash);
        }
        changed = true;
    }

    Ok(changed)
}
