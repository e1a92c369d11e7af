//! Pixelmill Core - Image transcoding library
//!
//! This crate provides the per-image half of the Pixelmill pipeline:
//! EXIF orientation decoding, bounded-size transform planning, and
//! decode/transform/re-encode execution. Everything here is synchronous
//! and allocation-bounded; the worker pool lives in `pixelmill-pipeline`.

pub mod encode;
pub mod executor;
pub mod orientation;
pub mod plan;

pub use encode::{encode, EncodeError, OutputFormat};
pub use executor::{compress, CompressError, CompressOptions, CompressedImage};
pub use orientation::Orientation;
pub use plan::TransformPlan;

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Dimensions with width and height exchanged.
    pub fn swapped(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
