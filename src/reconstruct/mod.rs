//! Turning decoded input into hierarchical samples.
//!
//! This module provides:
//! - `RawCaptureReconstructor` (scope-start/scope-end streams)
//! - `ingest_frame_data` (per-thread cycle graphs)
//! - the decoded message types both consume

pub mod cycle_graph;
pub mod messages;
pub mod raw;
pub mod self_time;

// Re-export main types
pub use cycle_graph::{ingest_frame_data, IngestedFrame};
pub use messages::{
    CycleGraph, FloatCounter, FrameDataMessage, IntCounter, RawEvent, RawStatMessage, StatRef,
};
pub use raw::{cycle_delta, DroppedFrame, RawCaptureReconstructor, ReconstructedFrame, StreamSummary};
pub use self_time::append_self_sample;
