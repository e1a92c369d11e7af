//! Image encoding to the pipeline's target formats.
//!
//! JPEG takes a quality setting; PNG and WebP are encoded losslessly and
//! ignore it. Quality arrives as a fraction in [0, 1] (the pipeline's wire
//! unit) and is mapped to the JPEG encoder's 1-100 scale.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::ExtendedColorType;
use image::ImageEncoder;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Target format for re-encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
    Webp,
}

impl OutputFormat {
    /// Lossless formats ignore the quality setting.
    pub fn is_lossless(self) -> bool {
        matches!(self, OutputFormat::Png | OutputFormat::Webp)
    }
}

/// Errors that can occur during encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Pixel data length doesn't match expected dimensions
    #[error("Invalid pixel data: expected {expected} bytes (width * height * 3), got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Width or height is zero
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// The codec rejected the image
    #[error("{format:?} encoding failed: {message}")]
    EncodingFailed {
        format: OutputFormat,
        message: String,
    },
}

/// Encode RGB pixel data to the given format.
///
/// # Arguments
///
/// * `pixels` - RGB pixel data (3 bytes per pixel, row-major order)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `format` - Target format
/// * `quality` - Quality fraction in [0, 1]; ignored for lossless formats
///
/// # Returns
///
/// Encoded bytes on success, or an error if encoding fails.
pub fn encode(
    pixels: &[u8],
    width: u32,
    height: u32,
    format: OutputFormat,
    quality: f32,
) -> Result<Vec<u8>, EncodeError> {
    if width == 0 || height == 0 {
        return Err(EncodeError::InvalidDimensions { width, height });
    }

    let expected_len = (width as usize) * (height as usize) * 3;
    if pixels.len() != expected_len {
        return Err(EncodeError::InvalidPixelData {
            expected: expected_len,
            actual: pixels.len(),
        });
    }

    let mut buffer = Cursor::new(Vec::new());
    let result = match format {
        OutputFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buffer, jpeg_quality(quality));
            encoder.write_image(pixels, width, height, ExtendedColorType::Rgb8)
        }
        OutputFormat::Png => {
            let encoder = PngEncoder::new(&mut buffer);
            encoder.write_image(pixels, width, height, ExtendedColorType::Rgb8)
        }
        OutputFormat::Webp => {
            let encoder = WebPEncoder::new_lossless(&mut buffer);
            encoder.write_image(pixels, width, height, ExtendedColorType::Rgb8)
        }
    };

    result.map_err(|e| EncodeError::EncodingFailed {
        format,
        message: e.to_string(),
    })?;

    Ok(buffer.into_inner())
}

/// Map a [0, 1] quality fraction to the JPEG encoder's 1-100 scale.
fn jpeg_quality(quality: f32) -> u8 {
    ((quality.clamp(0.0, 1.0) * 100.0).round() as u8).clamp(1, 100)
}


// ============================================================================
// Property-Based Tests
// ============================================================================
