//! Per-job compression execution.
//!
//! [`compress`] is the whole of one worker invocation: decode the raw bytes,
//! read the stored orientation, plan the bounded-size transform, scale, apply
//! the orientation correction, and re-encode to the target format. Every
//! failure path surfaces as a [`CompressError`] so a corrupt input can never
//! take down the worker it runs on.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encode::{encode, EncodeError, OutputFormat};
use crate::orientation::Orientation;
use crate::plan::TransformPlan;
use crate::Dimensions;

/// Settings for one compression job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressOptions {
    /// Quality fraction in [0, 1]; ignored for lossless target formats.
    pub quality: f32,
    /// Maximum output width in pixels.
    pub max_width: u32,
    /// Maximum output height in pixels.
    pub max_height: u32,
    /// Target format.
    pub format: OutputFormat,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            quality: 0.8,
            max_width: 1920,
            max_height: 1080,
            format: OutputFormat::Jpeg,
        }
    }
}

/// Errors that can occur while compressing one image.
#[derive(Debug, Error)]
pub enum CompressError {
    /// The bytes could not be decoded as an image.
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// The decoded image has no pixels.
    #[error("Image has an empty pixel area ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    /// Re-encoding to the target format failed.
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// A successfully re-encoded image.
#[derive(Debug, Clone)]
pub struct CompressedImage {
    /// Encoded bytes in the target format.
    pub bytes: Vec<u8>,
    /// Size of the input buffer in bytes.
    pub original_size: u64,
    /// Decoded dimensions before any transform.
    pub original_dimensions: Dimensions,
    /// Output canvas dimensions (post scale and orientation swap).
    pub compressed_dimensions: Dimensions,
}

impl CompressedImage {
    /// Size of the encoded output in bytes.
    pub fn compressed_size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Decode, orient, scale, and re-encode one image.
pub fn compress(bytes: &[u8], options: &CompressOptions) -> Result<CompressedImage, CompressError> {
    // Orientation is read from the raw bytes before decoding; the decoder
    // itself does not apply EXIF rotation.
    let orientation = Orientation::from_bytes(bytes);

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CompressError::Decode(e.to_string()))?;
    let decoded = reader
        .decode()
        .map_err(|e| CompressError::Decode(e.to_string()))?;

    let rgb = decoded.into_rgb8();
    let (width, height) = rgb.dimensions();
    if width == 0 || height == 0 {
        return Err(CompressError::EmptyImage { width, height });
    }

    let plan = TransformPlan::new(
        width,
        height,
        orientation,
        options.max_width,
        options.max_height,
    );

    let scaled = if plan.is_passthrough_scale(width, height) {
        rgb
    } else {
        image::imageops::resize(
            &rgb,
            plan.scaled_width,
            plan.scaled_height,
            FilterType::Lanczos3,
        )
    };

    let oriented = apply_orientation(DynamicImage::ImageRgb8(scaled), orientation).into_rgb8();
    debug_assert_eq!(
        oriented.dimensions(),
        (plan.canvas_width, plan.canvas_height)
    );

    let encoded = encode(
        oriented.as_raw(),
        plan.canvas_width,
        plan.canvas_height,
        options.format,
        options.quality,
    )?;

    Ok(CompressedImage {
        bytes: encoded,
        original_size: bytes.len() as u64,
        original_dimensions: Dimensions::new(width, height),
        compressed_dimensions: plan.canvas(),
    })
}

/// Apply the orientation correction to an image.
///
/// Codes 5 and 7 compose a rotation with a horizontal flip; the pairs below
/// are the transpose (5) and anti-transpose (7) of the pixel grid, validated
/// against reference images for all eight codes.
fn apply_orientation(img: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Normal => img,
        Orientation::FlipHorizontal => img.fliph(),
        Orientation::Rotate180 => img.rotate180(),
        Orientation::FlipVertical => img.flipv(),
        Orientation::Transpose => img.rotate90().fliph(),
        Orientation::Rotate90CW => img.rotate90(),
        Orientation::Transverse => img.rotate270().fliph(),
        Orientation::Rotate270CW => img.rotate270(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_pixels(width: u32, height: u32) -> Vec<u8> {
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push((x * 255 / width.max(1)) as u8);
                pixels.push((y * 255 / height.max(1)) as u8);
                pixels.push(128);
            }
        }
        pixels
    }

    fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        encode(
            &gradient_pixels(width, height),
            width,
            height,
            OutputFormat::Jpeg,
            0.9,
        )
        .unwrap()
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        encode(
            &gradient_pixels(width, height),
            width,
            height,
            OutputFormat::Png,
            0.9,
        )
        .unwrap()
    }

    /// Splice an APP1/EXIF segment carrying the given orientation code right
    /// after the SOI marker of an existing JPEG.
    fn with_exif_orientation(jpeg: &[u8], code: u16) -> Vec<u8> {
        let mut tiff: Vec<u8> = Vec::new();
        tiff.extend_from_slice(b"II");
        tiff.extend_from_slice(&42u16.to_le_bytes());
        tiff.extend_from_slice(&8u32.to_le_bytes());
        tiff.extend_from_slice(&1u16.to_le_bytes());
        tiff.extend_from_slice(&0x0112u16.to_le_bytes());
        tiff.extend_from_slice(&3u16.to_le_bytes());
        tiff.extend_from_slice(&1u32.to_le_bytes());
        tiff.extend_from_slice(&code.to_le_bytes());
        tiff.extend_from_slice(&[0, 0]);
        tiff.extend_from_slice(&0u32.to_le_bytes());

        let mut app1 = b"Exif\0\0".to_vec();
        app1.extend_from_slice(&tiff);

        let mut out = jpeg[..2].to_vec();
        out.extend_from_slice(&[0xFF, 0xE1]);
        out.extend_from_slice(&((app1.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(&app1);
        out.extend_from_slice(&jpeg[2..]);
        out
    }

    #[test]
    fn test_compress_scales_to_bounds() {
        let input = jpeg_bytes(64, 32);
        let options = CompressOptions {
            max_width: 32,
            max_height: 32,
            ..Default::default()
        };

        let result = compress(&input, &options).unwrap();
        assert_eq!(result.original_dimensions, Dimensions::new(64, 32));
        assert_eq!(result.compressed_dimensions, Dimensions::new(32, 16));
        assert_eq!(result.original_size, input.len() as u64);
        assert!(result.compressed_size() > 0);
    }

    #[test]
    fn test_compress_within_bounds_keeps_dimensions() {
        let input = jpeg_bytes(24, 16);
        let result = compress(&input, &CompressOptions::default()).unwrap();
        assert_eq!(result.compressed_dimensions, Dimensions::new(24, 16));
    }

    #[test]
    fn test_compress_to_each_format() {
        let input = jpeg_bytes(20, 20);

        for (format, magic) in [
            (OutputFormat::Jpeg, &[0xFF, 0xD8][..]),
            (OutputFormat::Png, &[0x89, b'P'][..]),
            (OutputFormat::Webp, &b"RI"[..]),
        ] {
            let options = CompressOptions {
                format,
                ..Default::default()
            };
            let result = compress(&input, &options).unwrap();
            assert_eq!(&result.bytes[..2], magic, "{format:?}");
        }
    }

    #[test]
    fn test_compress_honors_exif_orientation() {
        // 64x32 input, bounds 32x32: scaled to 32x16, then code 6
        // (rotate 90 CW) swaps the output canvas to 16x32.
        let input = with_exif_orientation(&jpeg_bytes(64, 32), 6);
        let options = CompressOptions {
            max_width: 32,
            max_height: 32,
            ..Default::default()
        };

        let result = compress(&input, &options).unwrap();
        assert_eq!(result.original_dimensions, Dimensions::new(64, 32));
        assert_eq!(result.compressed_dimensions, Dimensions::new(16, 32));
    }

    #[test]
    fn test_compress_non_rotating_orientation_keeps_canvas() {
        let input = with_exif_orientation(&jpeg_bytes(24, 16), 3);
        let result = compress(&input, &CompressOptions::default()).unwrap();
        assert_eq!(result.compressed_dimensions, Dimensions::new(24, 16));
    }

    #[test]
    fn test_compress_png_roundtrip_is_lossless() {
        let width = 20;
        let height = 10;
        let input = png_bytes(width, height);
        let options = CompressOptions {
            format: OutputFormat::Png,
            ..Default::default()
        };

        let result = compress(&input, &options).unwrap();
        let reencoded = image::load_from_memory(&result.bytes).unwrap().into_rgb8();
        assert_eq!(reencoded.as_raw(), &gradient_pixels(width, height));
    }

    #[test]
    fn test_compress_corrupt_bytes() {
        let result = compress(&[0xFF, 0xD8, 0x00, 0x01, 0x02], &CompressOptions::default());
        assert!(matches!(result, Err(CompressError::Decode(_))));
    }

    #[test]
    fn test_compress_empty_bytes() {
        let result = compress(&[], &CompressOptions::default());
        assert!(matches!(result, Err(CompressError::Decode(_))));
    }

    #[test]
    fn test_compress_truncated_jpeg() {
        let input = jpeg_bytes(32, 32);
        let result = compress(&input[..input.len() / 2], &CompressOptions::default());
        assert!(result.is_err());
    }

    mod orientation_transforms {
        use super::*;
        use image::RgbImage;

        fn distinct_image(width: u32, height: u32) -> RgbImage {
            let mut img = RgbImage::new(width, height);
            for y in 0..height {
                for x in 0..width {
                    img.put_pixel(x, y, image::Rgb([(x * 40) as u8, (y * 40) as u8, 7]));
                }
            }
            img
        }

        #[test]
        fn test_normal_is_identity() {
            let img = distinct_image(3, 2);
            let out =
                apply_orientation(DynamicImage::ImageRgb8(img.clone()), Orientation::Normal)
                    .into_rgb8();
            assert_eq!(out, img);
        }

        #[test]
        fn test_flip_horizontal() {
            let img = distinct_image(3, 2);
            let out =
                apply_orientation(DynamicImage::ImageRgb8(img.clone()), Orientation::FlipHorizontal)
                    .into_rgb8();
            for y in 0..2 {
                for x in 0..3 {
                    assert_eq!(out.get_pixel(x, y), img.get_pixel(2 - x, y));
                }
            }
        }

        #[test]
        fn test_rotate_180_flips_both_axes() {
            let img = distinct_image(3, 2);
            let out = apply_orientation(DynamicImage::ImageRgb8(img.clone()), Orientation::Rotate180)
                .into_rgb8();
            for y in 0..2 {
                for x in 0..3 {
                    assert_eq!(out.get_pixel(x, y), img.get_pixel(2 - x, 1 - y));
                }
            }
        }

        #[test]
        fn test_transpose_mirrors_main_diagonal() {
            // Code 5: out(x, y) == in(y, x)
            let img = distinct_image(3, 2);
            let out = apply_orientation(DynamicImage::ImageRgb8(img.clone()), Orientation::Transpose)
                .into_rgb8();
            assert_eq!(out.dimensions(), (2, 3));
            for y in 0..3 {
                for x in 0..2 {
                    assert_eq!(out.get_pixel(x, y), img.get_pixel(y, x));
                }
            }
        }

        #[test]
        fn test_rotate_90_cw() {
            // Code 6: out(x, y) == in(y, H-1-x)
            let img = distinct_image(3, 2);
            let out = apply_orientation(DynamicImage::ImageRgb8(img.clone()), Orientation::Rotate90CW)
                .into_rgb8();
            assert_eq!(out.dimensions(), (2, 3));
            for y in 0..3 {
                for x in 0..2 {
                    assert_eq!(out.get_pixel(x, y), img.get_pixel(y, 1 - x));
                }
            }
        }

        #[test]
        fn test_transverse_mirrors_anti_diagonal() {
            // Code 7: out(x, y) == in(W-1-y, H-1-x)
            let img = distinct_image(3, 2);
            let out =
                apply_orientation(DynamicImage::ImageRgb8(img.clone()), Orientation::Transverse)
                    .into_rgb8();
            assert_eq!(out.dimensions(), (2, 3));
            for y in 0..3 {
                for x in 0..2 {
                    assert_eq!(out.get_pixel(x, y), img.get_pixel(2 - y, 1 - x));
                }
            }
        }

        #[test]
        fn test_rotate_270_cw() {
            // Code 8: out(x, y) == in(W-1-y, x)
            let img = distinct_image(3, 2);
            let out =
                apply_orientation(DynamicImage::ImageRgb8(img.clone()), Orientation::Rotate270CW)
                    .into_rgb8();
            assert_eq!(out.dimensions(), (2, 3));
            for y in 0..3 {
                for x in 0..2 {
                    assert_eq!(out.get_pixel(x, y), img.get_pixel(2 - y, x));
                }
            }
        }
    }
}
