//! The external image pipeline: resize and crop photos into gallery variants.
//!
//! | Operation | Tool |
//! |---|---|
//! | **Identify** | `image::image_dimensions` (header only) |
//! | **Resize + crop** | ImageMagick (`-resize WxH^ -gravity G -extent WxH`) |
//! | **Encode** | MozJPEG `cjpeg` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for orientation and crop math (unit testable)
//! - **Parameters**: Variant descriptors and resolved resize instructions
//! - **Backend**: [`ImageBackend`] trait + [`MagickBackend`]
//! - **Operations**: [`resize_photo`], combining calculations, cache and backend

pub mod backend;
mod calculations;
pub mod magick;
pub mod operations;
mod params;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{Orientation, crop_dimensions, variant_file_name};
pub use magick::{MagickBackend, ToolPaths};
pub use operations::resize_photo;
pub use params::{CropSettings, Gravity, PhotoSize, Quality, ResizeParams, default_photo_sizes};
