#![deny(missing_docs)]
//! Raster buffers shared by the phenotyping crates: RGB images, binary
//! masks, distance maps and label images.

/// The image buffer and its size.
pub mod image;

/// Errors raised when building or indexing images.
pub mod error;

pub use crate::error::ImageError;
pub use crate::image::{Image, ImageSize};
