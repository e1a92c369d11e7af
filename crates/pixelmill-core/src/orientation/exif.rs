//! JPEG marker walk and TIFF directory scan for the orientation tag.
//!
//! The scan is deliberately narrow: it looks only at IFD0 of the first APP1
//! segment carrying an `Exif\0\0` signature, which is where cameras store
//! the orientation tag. All reads go through the bounds-checked
//! [`ByteReader`], so truncated segments and out-of-range IFD offsets fall
//! out as `None` ("not found") instead of faulting.

use super::reader::{ByteOrder, ByteReader};

/// Start-of-image marker, first two bytes of every JPEG.
const SOI: &[u8] = &[0xFF, 0xD8];
/// APP1, the segment EXIF metadata lives in.
const MARKER_APP1: u8 = 0xE1;
/// Start-of-scan: entropy-coded data follows, no further metadata segments.
const MARKER_SOS: u8 = 0xDA;
/// End-of-image.
const MARKER_EOI: u8 = 0xD9;

const EXIF_SIGNATURE: &[u8] = b"Exif\0\0";
const TIFF_MAGIC: u16 = 42;
const TAG_ORIENTATION: u16 = 0x0112;

/// Walk the JPEG marker segments looking for an EXIF orientation value.
///
/// Returns `None` when the buffer is not a JPEG, no APP1/EXIF segment is
/// present before the scan data, or the embedded directory is malformed.
pub(super) fn scan_orientation(bytes: &[u8]) -> Option<u16> {
    let mut r = ByteReader::new(bytes);
    if r.bytes(2)? != SOI {
        return None;
    }

    loop {
        if r.u8()? != 0xFF {
            // Not a marker where one is expected; stop scanning.
            return None;
        }
        let mut marker = r.u8()?;
        // 0xFF bytes may pad the gap between segments.
        while marker == 0xFF {
            marker = r.u8()?;
        }

        match marker {
            MARKER_SOS | MARKER_EOI => return None,
            // TEM and restart markers carry no length field.
            0x01 | 0xD0..=0xD7 => continue,
            MARKER_APP1 => {
                // Segment length includes the length field itself.
                let len = (r.u16_be()? as usize).checked_sub(2)?;
                let payload = r.bytes(len)?;
                if let Some(value) = parse_exif_segment(payload) {
                    return Some(value);
                }
                // APP1 without a usable EXIF body (XMP etc.): keep walking.
            }
            _ => {
                let len = (r.u16_be()? as usize).checked_sub(2)?;
                r.skip(len)?;
            }
        }
    }
}

/// Parse an APP1 payload: EXIF signature, TIFF header, then IFD0 entries.
fn parse_exif_segment(payload: &[u8]) -> Option<u16> {
    let mut r = ByteReader::new(payload);
    if r.bytes(EXIF_SIGNATURE.len())? != EXIF_SIGNATURE {
        return None;
    }

    // IFD offsets are relative to the start of the TIFF header.
    let tiff = payload.get(EXIF_SIGNATURE.len()..)?;
    let mut t = ByteReader::new(tiff);
    let order = match t.bytes(2)? {
        b"II" => ByteOrder::Little,
        b"MM" => ByteOrder::Big,
        _ => return None,
    };
    if t.u16(order)? != TIFF_MAGIC {
        return None;
    }

    let ifd_offset = t.u32(order)? as usize;
    t.seek(ifd_offset)?;

    let entry_count = t.u16(order)?;
    for _ in 0..entry_count {
        let tag = t.u16(order)?;
        let _field_type = t.u16(order)?;
        let _value_count = t.u32(order)?;
        if tag == TAG_ORIENTATION {
            // A SHORT value sits in the first two bytes of the value field,
            // in the directory's declared byte order.
            return t.u16(order);
        }
        // Skip the 4-byte value field of a non-matching entry.
        t.skip(4)?;
    }
    None
}
