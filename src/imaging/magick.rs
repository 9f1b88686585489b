//! Production backend: ImageMagick for geometry, MozJPEG for encoding.
//!
//! ## Pipeline per variant
//!
//! ```text
//! magick <source> -auto-orient -resize WxH^ -gravity G -extent WxH -strip <out>.gal-tmp.ppm
//! cjpeg  -quality Q -optimize -progressive -outfile <out> <out>.gal-tmp.ppm
//! ```
//!
//! The intermediate PPM is uncompressed so the only lossy step is MozJPEG's.
//! It is removed whether or not encoding succeeded.
//!
//! Dimensions are read from the JPEG header with the `image` crate, which is
//! far cheaper than spawning `magick identify` for every photo. Since
//! `-auto-orient` rotates the pixels before cropping, the reported dimensions
//! are the displayed ones: width and height are swapped when the EXIF
//! orientation turns the image by 90° or 270°.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::ResizeParams;
use image::metadata::Orientation as ExifOrientation;
use image::{ImageDecoder, ImageReader, ImageResult};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

/// Paths to the two external binaries the pipeline runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub magick_bin: PathBuf,
    pub mozjpeg_bin: PathBuf,
}

pub struct MagickBackend {
    tools: ToolPaths,
}

impl MagickBackend {
    pub fn new(tools: ToolPaths) -> Self {
        Self { tools }
    }
}

/// Scratch file for the uncompressed intermediate of `output`.
fn scratch_path(output: &Path) -> PathBuf {
    output.with_extension("gal-tmp.ppm")
}

/// Whether `orientation` turns the stored image on its side.
fn swaps_axes(orientation: ExifOrientation) -> bool {
    matches!(
        orientation,
        ExifOrientation::Rotate90
            | ExifOrientation::Rotate270
            | ExifOrientation::Rotate90FlipH
            | ExifOrientation::Rotate270FlipH
    )
}

/// Dimensions of `path` as displayed, after applying its EXIF orientation.
fn oriented_dimensions(path: &Path) -> ImageResult<Dimensions> {
    let mut decoder = ImageReader::open(path)?.with_guessed_format()?.into_decoder()?;
    let (width, height) = decoder.dimensions();
    // A missing or unreadable orientation tag means the pixels are upright.
    let orientation = decoder.orientation().unwrap_or(ExifOrientation::NoTransforms);
    Ok(if swaps_axes(orientation) {
        Dimensions {
            width: height,
            height: width,
        }
    } else {
        Dimensions { width, height }
    })
}

fn run_tool<I, S>(bin: &Path, args: I) -> Result<(), BackendError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let tool = bin.display().to_string();
    let output = Command::new(bin)
        .args(args)
        .output()
        .map_err(|source| BackendError::Spawn {
            tool: tool.clone(),
            source,
        })?;

    if output.status.success() {
        Ok(())
    } else {
        Err(BackendError::ToolFailed {
            tool,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

impl ImageBackend for MagickBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        oriented_dimensions(path)
            .map_err(|e| BackendError::ProcessingFailed(format!("{}: {}", path.display(), e)))
    }

    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError> {
        let geometry = format!("{}x{}", params.width, params.height);
        let scratch = scratch_path(&params.output);
        debug!(
            "Resizing {} → {} ({})",
            params.source.display(),
            params.output.display(),
            geometry
        );

        run_tool(
            &self.tools.magick_bin,
            [
                params.source.as_os_str(),
                OsStr::new("-auto-orient"),
                OsStr::new("-resize"),
                OsStr::new(&format!("{geometry}^")),
                OsStr::new("-gravity"),
                OsStr::new(params.gravity.as_magick()),
                OsStr::new("-extent"),
                OsStr::new(&geometry),
                OsStr::new("-strip"),
                scratch.as_os_str(),
            ],
        )?;

        let encoded = run_tool(
            &self.tools.mozjpeg_bin,
            [
                OsStr::new("-quality"),
                OsStr::new(&params.quality.value().to_string()),
                OsStr::new("-optimize"),
                OsStr::new("-progressive"),
                OsStr::new("-outfile"),
                params.output.as_os_str(),
                scratch.as_os_str(),
            ],
        );

        if let Err(e) = fs::remove_file(&scratch) {
            warn!("Could not remove {}: {}", scratch.display(), e);
        }
        encoded
    }
}
