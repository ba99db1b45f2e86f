//! Capture file writer.

use super::format::{
    write_i64, write_string, write_u32, write_u64, CaptureHeader, CAPTURE_MAGIC, CAPTURE_VERSION,
    END_OF_STREAM_MARKER,
};
use crate::metadata::MetadataSnapshot;
use crate::reconstruct::{FrameDataMessage, RawEvent, RawStatMessage, StatRef};
use crate::utils::error::CaptureError;
use log::{debug, info};
use lz4_flex::compress_prepend_size;
use std::fs;
use std::path::Path;

/// Builds a capture file in memory
#[derive(Debug, Clone)]
pub struct CaptureWriter {
    platform: String,
    raw: bool,
    compressed: bool,
    metadata: MetadataSnapshot,
    strings: Vec<String>,
    /// (target frame, encoded payload)
    frames: Vec<(i64, Vec<u8>)>,
}

impl CaptureWriter {
    /// Writer for cycle-graph frames (`raw == false`) or raw event streams
    pub fn new(platform: &str, raw: bool) -> Self {
        Self {
            platform: platform.to_string(),
            raw,
            compressed: true,
            metadata: MetadataSnapshot::default(),
            strings: Vec::new(),
            frames: Vec::new(),
        }
    }

    pub fn with_compression(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    pub fn set_metadata(&mut self, metadata: MetadataSnapshot) {
        self.metadata = metadata;
    }

    /// Add a string to the string table
    ///
    /// # Returns
    /// Index of the string
    pub fn add_string(&mut self, value: &str) -> u32 {
        if let Some(index) = self.strings.iter().position(|s| s == value) {
            return index as u32;
        }
        self.strings.push(value.to_string());
        (self.strings.len() - 1) as u32
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Append one cycle-graph frame
    ///
    /// # Errors
    /// * `CaptureError::MismatchedPayload` - writer holds raw frames
    pub fn add_frame(&mut self, message: &FrameDataMessage) -> Result<(), CaptureError> {
        if self.raw {
            return Err(CaptureError::MismatchedPayload { expected: "raw" });
        }
        let payload = serde_json::to_vec(message)?;
        self.push_payload(message.frame, payload);
        Ok(())
    }

    /// Append the raw messages of one frame; stat names go to the string table
    ///
    /// # Errors
    /// * `CaptureError::MismatchedPayload` - writer holds cycle-graph frames
    pub fn add_raw_frame(
        &mut self,
        target_frame: i64,
        messages: &[RawStatMessage],
    ) -> Result<(), CaptureError> {
        if !self.raw {
            return Err(CaptureError::MismatchedPayload {
                expected: "cycle graph",
            });
        }
        for msg in messages {
            if let RawEvent::ScopeStart { stat: StatRef::Name(name), .. }
            | RawEvent::Counter { stat: StatRef::Name(name), .. } = &msg.event
            {
                self.add_string(name);
            }
        }
        let payload = serde_json::to_vec(messages)?;
        self.push_payload(target_frame, payload);
        Ok(())
    }

    /// Encode the complete capture
    pub fn to_bytes(&self) -> Result<Vec<u8>, CaptureError> {
        let mut header = CaptureHeader {
            version: CAPTURE_VERSION,
            platform: self.platform.clone(),
            compressed: self.compressed,
            raw: self.raw,
            frame_table_offset: 0,
            string_table_offset: 0,
            metadata_table_offset: 0,
        };

        let mut out = Vec::new();
        write_u32(&mut out, CAPTURE_MAGIC);
        write_u32(&mut out, header.version);
        write_string(&mut out, &header.platform);
        out.push(header.flags());
        let offsets_position = out.len();
        debug_assert_eq!(offsets_position, header.offsets_position());
        out.extend_from_slice(&[0u8; 24]);

        let mut frame_offsets = Vec::with_capacity(self.frames.len());
        for (target_frame, payload) in &self.frames {
            frame_offsets.push((*target_frame, out.len() as u64));
            write_u32(&mut out, payload.len() as u32);
            out.extend_from_slice(payload);
        }
        write_u32(&mut out, END_OF_STREAM_MARKER);

        header.string_table_offset = out.len() as u64;
        write_u32(&mut out, self.strings.len() as u32);
        for value in &self.strings {
            write_string(&mut out, value);
        }

        header.metadata_table_offset = out.len() as u64;
        let metadata = serde_json::to_vec(&self.metadata)?;
        write_u32(&mut out, metadata.len() as u32);
        out.extend_from_slice(&metadata);

        header.frame_table_offset = out.len() as u64;
        write_u32(&mut out, frame_offsets.len() as u32);
        for (target_frame, offset) in frame_offsets {
            write_i64(&mut out, target_frame);
            write_u64(&mut out, offset);
        }

        let mut offsets = Vec::with_capacity(24);
        write_u64(&mut offsets, header.frame_table_offset);
        write_u64(&mut offsets, header.string_table_offset);
        write_u64(&mut offsets, header.metadata_table_offset);
        out[offsets_position..offsets_position + 24].copy_from_slice(&offsets);

        Ok(out)
    }

    /// Write the capture to `path`
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), CaptureError> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        fs::write(path, &bytes)?;
        info!(
            "Wrote capture {} ({} frames, {} bytes)",
            path.display(),
            self.frames.len(),
            bytes.len()
        );
        Ok(())
    }

    fn push_payload(&mut self, target_frame: i64, payload: Vec<u8>) {
        let payload = if self.compressed {
            compress_prepend_size(&payload)
        } else {
            payload
        };
        debug!("Frame {} payload: {} bytes", target_frame, payload.len());
        self.frames.push((target_frame, payload));
    }
}
