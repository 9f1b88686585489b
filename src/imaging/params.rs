//! Parameter types for photo resizing.
//!
//! These structs describe *what* to produce, not *how*. [`PhotoSize`] is the
//! per-variant descriptor handed to [`resize_photo`](super::resize_photo);
//! [`ResizeParams`] is the fully resolved instruction a backend executes.
//!
//! ## Types
//!
//! - [`Quality`] — JPEG encoding quality (1–100, default 85). Clamped on construction.
//! - [`Gravity`] — Anchor used when cropping to the target ratio.
//! - [`CropSettings`] — Crop ratio per source orientation (portrait, landscape, square).
//! - [`PhotoSize`] — One output variant: file name suffix, target width, crop settings, quality.
//! - [`ResizeParams`] — Source, output path, final width/height, gravity, quality.

use super::calculations::Orientation;
use std::path::PathBuf;

/// Quality setting for lossy JPEG encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Anchor point kept in frame when cropping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gravity {
    #[default]
    Center,
    North,
    South,
    East,
    West,
}

impl Gravity {
    /// Value for ImageMagick's `-gravity` option.
    pub fn as_magick(self) -> &'static str {
        match self {
            Gravity::Center => "Center",
            Gravity::North => "North",
            Gravity::South => "South",
            Gravity::East => "East",
            Gravity::West => "West",
        }
    }
}

/// Crop ratio, as `(width, height)`, for each source orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropSettings {
    pub portrait: (u32, u32),
    pub landscape: (u32, u32),
    pub square: (u32, u32),
}

impl CropSettings {
    pub fn ratio_for(&self, orientation: Orientation) -> (u32, u32) {
        match orientation {
            Orientation::Portrait => self.portrait,
            Orientation::Landscape => self.landscape,
            Orientation::Square => self.square,
        }
    }
}

impl Default for CropSettings {
    fn default() -> Self {
        Self {
            portrait: (2, 3),
            landscape: (3, 2),
            square: (1, 1),
        }
    }
}

/// One output variant of a source photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoSize {
    /// Inserted between the file stem and extension (`"@2x"` → `a@2x.jpg`).
    pub suffix: String,
    /// Output width in pixels. Height follows from the crop ratio.
    pub width: u32,
    pub crop: CropSettings,
    pub quality: Quality,
}

impl PhotoSize {
    pub fn new(suffix: &str, width: u32) -> Self {
        Self {
            suffix: suffix.to_string(),
            width,
            crop: CropSettings::default(),
            quality: Quality::default(),
        }
    }
}

/// The variants every gallery photo gets: a base size and a double-density one.
pub fn default_photo_sizes() -> Vec<PhotoSize> {
    vec![PhotoSize::new("", 400), PhotoSize::new("@2x", 800)]
}

/// Parameters for a single resize-and-crop operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub gravity: Gravity,
    pub quality: Quality,
}
