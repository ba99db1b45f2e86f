//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.
//!
//! Query APIs (frame lookups, event graphs, time series) never return these;
//! they answer with sentinel values instead. Errors only cross the ingestion
//! and load boundaries.

use thiserror::Error;

/// Structural problems found while building one frame's hierarchy
///
/// Fatal to the frame being reconstructed: the frame is discarded and
/// ingestion resumes at the next frame boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructuralError {
    #[error("Scope end on thread {thread_id} with no open scope")]
    UnbalancedScopeEnd { thread_id: u32 },

    #[error("{open} scope(s) still open on thread {thread_id} at frame end")]
    UnclosedScope { thread_id: u32, open: usize },

    #[error("Invalid sample index {index} (store holds {len} samples)")]
    InvalidSampleIndex { index: usize, len: usize },

    #[error("Sample {0} belongs to a sealed frame")]
    SealedSample(usize),

    #[error("Sample {0} was already patched")]
    AlreadyPatched(usize),

    #[error("Negative scope duration ({cycles} cycles) on thread {thread_id}")]
    NegativeDuration { thread_id: u32, cycles: i64 },

    #[error("No game thread span recorded for this frame")]
    MissingGameThread,

    #[error("Frame carries no thread time")]
    EmptyFrame,
}

/// Errors that can occur while reading or writing a capture file
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Unrecognized capture magic: {0:#010x}")]
    BadMagic(u32),

    #[error("Capture was written with the opposite byte order")]
    ByteSwapped,

    #[error("Header-less legacy captures are not supported")]
    LegacyFormat,

    #[error("Unsupported capture version: {0}")]
    UnsupportedVersion(u32),

    #[error("Capture data is truncated: {0}")]
    Truncated(String),

    #[error("Missing end-of-stream marker")]
    MissingEndMarker,

    #[error("Capture holds {expected} payloads")]
    MismatchedPayload { expected: &'static str },

    #[error("Failed to decompress frame payload: {0}")]
    Decompress(String),

    #[error("Invalid frame payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by invalid session state changes
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    #[error("Cannot {action} while session is {from}")]
    InvalidTransition { from: String, action: &'static str },
}

/// Errors that can occur while loading engine configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}
