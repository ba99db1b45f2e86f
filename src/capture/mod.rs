//! Capture file persistence.
//!
//! This module provides:
//! - The file layout and its primitives (`format`)
//! - `CaptureWriter` / `CaptureReader`
//! - `open_capture_session` (capture file -> queued file-backed session)

pub mod format;
pub mod load;
pub mod reader;
pub mod writer;

// Re-export main types and functions
pub use format::{CaptureHeader, CAPTURE_MAGIC, END_OF_STREAM_MARKER};
pub use load::{open_capture_session, session_from_capture};
pub use reader::{CaptureFrame, CaptureReader};
pub use writer::CaptureWriter;
