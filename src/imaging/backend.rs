//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the photo pipeline
//! needs: identify (read dimensions) and resize (resize, crop, encode).
//!
//! The production implementation is
//! [`MagickBackend`](super::magick::MagickBackend), which shells out to
//! ImageMagick and MozJPEG. Tests use recording mocks.

use super::params::ResizeParams;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to start '{tool}': {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{tool}' exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// Backends are shared by every photo job of a pass, across worker threads.
pub trait ImageBackend: Send + Sync {
    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Resize and crop `params.source` to exactly `width`×`height` and write
    /// the encoded result to `params.output`.
    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError>;
}
