//! Streaming aggregation over ingested frames.
//!
//! This module provides:
//! - Per-stat running statistics (`AggregatedStat`, `AggregatedStats`)
//! - The frame-rate histogram (`FpsAnalyzer`)

pub mod fps;
pub mod stat;

// Re-export main types
pub use fps::{FpsAnalyzer, FpsSummary};
pub use stat::{AggregateField, AggregatedStat, AggregatedStats};
