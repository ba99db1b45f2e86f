//! Capture file reader.
//!
//! The whole file is decoded and validated up front, so a session is only
//! ever created from a capture that loaded completely.

use super::format::{
    check_magic, ByteReader, CaptureHeader, CAPTURE_VERSION, END_OF_STREAM_MARKER,
    FLAG_COMPRESSED, FLAG_RAW,
};
use crate::metadata::MetadataSnapshot;
use crate::reconstruct::{FrameDataMessage, RawStatMessage};
use crate::utils::error::CaptureError;
use log::{debug, info};
use lz4_flex::decompress_size_prepended;
use std::fs;
use std::path::Path;

/// u32 length prefix of an empty string
const STRING_ENTRY_MIN_SIZE: usize = 4;
/// i64 target frame + u64 payload offset
const FRAME_TABLE_ENTRY_SIZE: usize = 16;
/// Upper bound of the LZ4 block expansion ratio
const MAX_LZ4_RATIO: usize = 255;

/// One decoded frame payload
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureFrame {
    Data(FrameDataMessage),
    Raw {
        source_frame: i64,
        messages: Vec<RawStatMessage>,
    },
}

/// A fully decoded capture file
#[derive(Debug, Clone)]
pub struct CaptureReader {
    header: CaptureHeader,
    strings: Vec<String>,
    metadata: MetadataSnapshot,
    frames: Vec<CaptureFrame>,
}

impl CaptureReader {
    /// Read and validate a capture file
    ///
    /// **Public** - main entry point for loading captures
    ///
    /// # Errors
    /// Any `CaptureError`; nothing is returned for a partially valid file.
    ///
    /// # Example
    /// ```ignore
    /// let capture = CaptureReader::open("session.ftrace")?;
    /// println!("{} frames", capture.num_frames());
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let path = path.as_ref();
        info!("Reading capture: {}", path.display());
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Decode a capture held in memory
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CaptureError> {
        let mut reader = ByteReader::new(bytes);

        check_magic(reader.read_u32()?)?;
        let version = reader.read_u32()?;
        if version != CAPTURE_VERSION {
            return Err(CaptureError::UnsupportedVersion(version));
        }
        let platform = reader.read_string()?;
        let flags = reader.read_u8()?;
        let header = CaptureHeader {
            version,
            platform,
            compressed: flags & FLAG_COMPRESSED != 0,
            raw: flags & FLAG_RAW != 0,
            frame_table_offset: reader.read_u64()?,
            string_table_offset: reader.read_u64()?,
            metadata_table_offset: reader.read_u64()?,
        };
        debug!("Capture header: {:?}", header);

        // The end marker sits right before the string table.
        let marker_offset = header
            .string_table_offset
            .checked_sub(4)
            .ok_or(CaptureError::MissingEndMarker)?;
        reader.seek(marker_offset)?;
        if reader.read_u32()? != END_OF_STREAM_MARKER {
            return Err(CaptureError::MissingEndMarker);
        }

        let count = reader.read_count(STRING_ENTRY_MIN_SIZE)?;
        let strings = (0..count)
            .map(|_| reader.read_string())
            .collect::<Result<Vec<_>, _>>()?;

        reader.seek(header.metadata_table_offset)?;
        let len = reader.read_u32()? as usize;
        let metadata: MetadataSnapshot = serde_json::from_slice(reader.read_bytes(len)?)?;

        reader.seek(header.frame_table_offset)?;
        let count = reader.read_count(FRAME_TABLE_ENTRY_SIZE)?;
        let mut table = Vec::with_capacity(count);
        for _ in 0..count {
            table.push((reader.read_i64()?, reader.read_u64()?));
        }

        let mut frames = Vec::with_capacity(table.len());
        for (target_frame, offset) in table {
            reader.seek(offset)?;
            let len = reader.read_u32()? as usize;
            let payload = reader.read_bytes(len)?;
            frames.push(decode_frame(&header, target_frame, payload)?);
        }

        info!(
            "Capture decoded: {} frames, platform {}, {}",
            frames.len(),
            header.platform,
            if header.raw { "raw" } else { "cycle graphs" }
        );

        Ok(Self {
            header,
            strings,
            metadata,
            frames,
        })
    }

    pub fn header(&self) -> &CaptureHeader {
        &self.header
    }

    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    pub fn metadata(&self) -> &MetadataSnapshot {
        &self.metadata
    }

    pub fn frames(&self) -> &[CaptureFrame] {
        &self.frames
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn into_parts(self) -> (CaptureHeader, MetadataSnapshot, Vec<CaptureFrame>) {
        (self.header, self.metadata, self.frames)
    }
}

fn decode_frame(
    header: &CaptureHeader,
    target_frame: i64,
    payload: &[u8],
) -> Result<CaptureFrame, CaptureError> {
    let decompressed;
    let payload = if header.compressed {
        check_decompressed_size(target_frame, payload)?;
        decompressed = decompress_size_prepended(payload)
            .map_err(|e| CaptureError::Decompress(format!("frame {}: {}", target_frame, e)))?;
        decompressed.as_slice()
    } else {
        payload
    };

    if header.raw {
        Ok(CaptureFrame::Raw {
            source_frame: target_frame,
            messages: serde_json::from_slice(payload)?,
        })
    } else {
        Ok(CaptureFrame::Data(serde_json::from_slice(payload)?))
    }
}

/// Reject a size prefix no LZ4 block of this length can expand to
fn check_decompressed_size(target_frame: i64, payload: &[u8]) -> Result<(), CaptureError> {
    let Some(prefix) = payload.get(..4) else {
        return Err(CaptureError::Decompress(format!("frame {}: missing size prefix", target_frame)));
    };
    let mut size = [0u8; 4];
    size.copy_from_slice(prefix);
    let size = u32::from_le_bytes(size) as usize;
    if size > (payload.len() - 4).saturating_mul(MAX_LZ4_RATIO) + 16 {
        return Err(CaptureError::Decompress(format!(
            "frame {}: declared size {} cannot come from {} compressed bytes",
            target_frame,
            size,
            payload.len() - 4
        )));
    }
    Ok(())
}
