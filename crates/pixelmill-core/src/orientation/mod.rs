//! EXIF orientation decoding.
//!
//! Extracts the stored orientation code (1-8) from a raw image byte buffer
//! by walking the JPEG marker structure and the embedded TIFF directory
//! directly. The scan is total: any unrecognized container, missing APP1
//! segment, or truncated directory yields [`Orientation::Normal`] rather
//! than an error.
//!
//! # Why not a full EXIF parser
//!
//! The pipeline only ever needs the orientation tag, read before the image
//! is handed to the decoder. A single bounds-checked marker walk is cheaper
//! than materializing every IFD, and it cannot fail - malformed metadata is
//! indistinguishable from absent metadata at this layer.

mod exif;
mod reader;

use serde::{Deserialize, Serialize};

/// The eight EXIF orientation codes.
///
/// The code describes the operation a viewer must apply to the stored pixel
/// grid to display the image upright. Discriminants match the on-wire tag
/// values, so code N is `Orientation::from(N)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Orientation {
    /// Stored upright; nothing to apply.
    #[default]
    Normal = 1,
    /// Mirrored left-right.
    FlipHorizontal = 2,
    /// Stored upside down.
    Rotate180 = 3,
    /// Mirrored top-bottom.
    FlipVertical = 4,
    /// Mirrored across the main diagonal.
    Transpose = 5,
    /// Needs a quarter turn clockwise.
    Rotate90CW = 6,
    /// Mirrored across the anti-diagonal.
    Transverse = 7,
    /// Needs a quarter turn counter-clockwise.
    Rotate270CW = 8,
}

impl Orientation {
    /// Decode the orientation stored in a raw image buffer.
    ///
    /// Never fails: buffers that are not JPEG, carry no EXIF segment, or
    /// carry a truncated/malformed one all decode as `Normal`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        exif::scan_orientation(bytes)
            .map(Orientation::from)
            .unwrap_or_default()
    }

    /// Whether applying this orientation trades width for height.
    ///
    /// True exactly for codes 5-8, the four codes that carry a quarter-turn
    /// rotation.
    #[inline]
    pub fn swaps_dimensions(self) -> bool {
        matches!(
            self,
            Orientation::Transpose
                | Orientation::Rotate90CW
                | Orientation::Transverse
                | Orientation::Rotate270CW
        )
    }
}

impl From<u16> for Orientation {
    /// Map a raw tag value to its code. Anything outside 1-8 is treated the
    /// same as absent metadata and maps to `Normal`.
    fn from(value: u16) -> Self {
        match value {
            1 => Orientation::Normal,
            2 => Orientation::FlipHorizontal,
            3 => Orientation::Rotate180,
            4 => Orientation::FlipVertical,
            5 => Orientation::Transpose,
            6 => Orientation::Rotate90CW,
            7 => Orientation::Transverse,
            8 => Orientation::Rotate270CW,
            _ => Orientation::Normal,
        }
    }
}
