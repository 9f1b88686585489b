//! Pure calculation functions for photo variants.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::Dimensions;
use std::ffi::{OsStr, OsString};

/// Orientation of a source photo, used to pick its crop ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
    Square,
}

impl Orientation {
    pub fn of(dims: Dimensions) -> Self {
        use std::cmp::Ordering;
        match dims.width.cmp(&dims.height) {
            Ordering::Less => Orientation::Portrait,
            Ordering::Greater => Orientation::Landscape,
            Ordering::Equal => Orientation::Square,
        }
    }
}

/// Output dimensions for a variant of `width` pixels cropped to `ratio`.
///
/// # Examples
/// ```
/// # use gal::imaging::crop_dimensions;
/// assert_eq!(crop_dimensions(400, (2, 3)), (400, 600));
/// assert_eq!(crop_dimensions(400, (3, 2)), (400, 267));
/// ```
pub fn crop_dimensions(width: u32, ratio: (u32, u32)) -> (u32, u32) {
    let (ratio_w, ratio_h) = ratio;
    let height = (width as f64 * ratio_h as f64 / ratio_w as f64).round() as u32;
    (width, height.max(1))
}

/// File name of a variant: `<stem><suffix><ext>`, with `ext` including its dot.
///
/// The original extension is kept as-is (`b.JPG` → `b@2x.JPG`) so the paths
/// rendered into the index resolve to the generated files.
pub fn variant_file_name(stem: &OsStr, suffix: &str, ext: &OsStr) -> OsString {
    let mut name = stem.to_os_string();
    name.push(suffix);
    name.push(ext);
    name
}
