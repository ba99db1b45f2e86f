//! Profiling sessions.
//!
//! This module provides:
//! - `ProfilerSession` (queue, budgeted ingestion, aggregates, notifications)
//! - `CaptureState` (the per-session state machine)
//! - `RunningGraph` (worker-backed total/maximum event graph aggregates)

pub mod combine;
pub mod profiler_session;
pub mod state;

// Re-export main types
pub use combine::RunningGraph;
pub use profiler_session::{ProfilerSession, SessionEvent, SessionKind, TickReport};
pub use state::{CaptureState, SessionState};
