//! Sample storage: the append-only sample arena and its frame index.
//!
//! This module provides:
//! - `Sample` / `SampleKind` (one recorded event)
//! - `FrameIndex` (sealed frame ranges, elapsed time, per-second frame counts)
//! - `SampleStore` (the arena itself)

pub mod frame_index;
pub mod sample;
pub mod sample_store;

// Re-export main types
pub use frame_index::{FrameIndex, FrameRecord, SecondBucket};
pub use sample::{Sample, SampleIndex, SampleKind, INVALID_SAMPLE};
pub use sample_store::SampleStore;
