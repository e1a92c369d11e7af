//! Bounds-checked cursor over a byte slice.
//!
//! Every accessor returns `Option`: a read past the end of the buffer yields
//! `None` instead of panicking, so a truncated or malformed metadata segment
//! simply short-circuits the scan via `?`.

/// Byte order declared by a TIFF directory header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ByteOrder {
    Big,
    Little,
}

#[derive(Debug)]
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Read `n` bytes, advancing the cursor.
    pub(crate) fn bytes(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        let slice = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    pub(crate) fn u8(&mut self) -> Option<u8> {
        let byte = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    /// Big-endian u16, as used for JPEG segment lengths.
    pub(crate) fn u16_be(&mut self) -> Option<u16> {
        let bytes = self.bytes(2)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub(crate) fn u16(&mut self, order: ByteOrder) -> Option<u16> {
        let bytes = self.bytes(2)?;
        let raw = [bytes[0], bytes[1]];
        Some(match order {
            ByteOrder::Big => u16::from_be_bytes(raw),
            ByteOrder::Little => u16::from_le_bytes(raw),
        })
    }

    pub(crate) fn u32(&mut self, order: ByteOrder) -> Option<u32> {
        let bytes = self.bytes(4)?;
        let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
        Some(match order {
            ByteOrder::Big => u32::from_be_bytes(raw),
            ByteOrder::Little => u32::from_le_bytes(raw),
        })
    }

    /// Advance the cursor by `n` bytes without reading them.
    pub(crate) fn skip(&mut self, n: usize) -> Option<()> {
        let end = self.pos.checked_add(n)?;
        if end > self.data.len() {
            return None;
        }
        self.pos = end;
        Some(())
    }

    /// Move the cursor to an absolute offset within the buffer.
    pub(crate) fn seek(&mut self, pos: usize) -> Option<()> {
        if pos > self.data.len() {
            return None;
        }
        self.pos = pos;
        Some(())
    }
}
