//! Capture file layout: constants, header and little-endian primitives.
//!
//! ```text
//! u32 magic, u32 version, u32 platform length + UTF-8, u8 flags
//! u64 frame table offset, u64 string table offset, u64 metadata table offset
//! frame payloads (u32 length + bytes, LZ4 size-prepended when compressed)
//! u32 end-of-stream marker
//! string table   (u32 count, then u32 length + UTF-8 per string)
//! metadata table (u32 length + JSON metadata snapshot)
//! frame table    (u32 count, then i64 target frame + u64 payload offset)
//! ```

use crate::utils::error::CaptureError;
use serde::Serialize;

pub const CAPTURE_MAGIC: u32 = 0x1029_3847;
/// `CAPTURE_MAGIC` as seen when the writer had the opposite byte order
pub const CAPTURE_MAGIC_SWAPPED: u32 = 0x4738_2910;
/// Header-less captures from before the versioned format
pub const LEGACY_MAGIC: u32 = 0x7E1B_83C1;
pub const END_OF_STREAM_MARKER: u32 = 0xE5B4_B2A9;
pub const CAPTURE_VERSION: u32 = 1;

pub const FLAG_COMPRESSED: u8 = 0b01;
pub const FLAG_RAW: u8 = 0b10;

/// Decoded capture header
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureHeader {
    pub version: u32,
    pub platform: String,
    pub compressed: bool,
    /// Frames are raw event streams rather than cycle graphs
    pub raw: bool,
    pub frame_table_offset: u64,
    pub string_table_offset: u64,
    pub metadata_table_offset: u64,
}

impl CaptureHeader {
    pub fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.compressed {
            flags |= FLAG_COMPRESSED;
        }
        if self.raw {
            flags |= FLAG_RAW;
        }
        flags
    }

    /// Byte position of the three table offsets
    pub fn offsets_position(&self) -> usize {
        4 + 4 + 4 + self.platform.len() + 1
    }
}

/// Check the leading magic number
///
/// # Errors
/// * `CaptureError::ByteSwapped` / `CaptureError::LegacyFormat` - recognized
///   but unsupported captures
/// * `CaptureError::BadMagic` - anything else
pub fn check_magic(magic: u32) -> Result<(), CaptureError> {
    match magic {
        CAPTURE_MAGIC => Ok(()),
        CAPTURE_MAGIC_SWAPPED => Err(CaptureError::ByteSwapped),
        LEGACY_MAGIC => Err(CaptureError::LegacyFormat),
        other => Err(CaptureError::BadMagic(other)),
    }
}

/// Bounds-checked little-endian cursor over an in-memory capture
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left after the cursor
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// u32 element count of a table whose entries take at least `entry_size` bytes
    ///
    /// # Errors
    /// * `CaptureError::Truncated` - the count cannot fit in the remaining data
    pub fn read_count(&mut self, entry_size: usize) -> Result<usize, CaptureError> {
        let count = self.read_u32()? as usize;
        let needed = count.checked_mul(entry_size).filter(|needed| *needed <= self.remaining());
        if needed.is_none() {
            return Err(CaptureError::Truncated(format!(
                "table of {} entries at offset {} exceeds the {} bytes left",
                count,
                self.pos,
                self.remaining()
            )));
        }
        Ok(count)
    }

    /// Jump to an absolute offset
    pub fn seek(&mut self, offset: u64) -> Result<(), CaptureError> {
        let offset = usize::try_from(offset)
            .ok()
            .filter(|offset| *offset <= self.data.len())
            .ok_or_else(|| {
                CaptureError::Truncated(format!(
                    "offset {} beyond end of data ({} bytes)",
                    offset,
                    self.data.len()
                ))
            })?;
        self.pos = offset;
        Ok(())
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CaptureError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                CaptureError::Truncated(format!("need {} bytes at offset {}", len, self.pos))
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8, CaptureError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32, CaptureError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, CaptureError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, CaptureError> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    /// u32 length followed by UTF-8 bytes
    pub fn read_string(&mut self) -> Result<String, CaptureError> {
        let len = self.read_u32()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| CaptureError::Truncated(format!("invalid UTF-8 string: {}", e)))
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CaptureError> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.read_bytes(N)?);
        Ok(array)
    }
}

pub fn write_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub fn write_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub fn write_i64(out: &mut Vec<u8>, value: i64) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub fn write_string(out: &mut Vec<u8>, value: &str) {
    write_u32(out, value.len() as u32);
    out.extend_from_slice(value.as_bytes());
}
