//! Time-series views for charts.
//!
//! This module provides:
//! - `GraphDataSource` (one stat of one session, with a bucket cache)
//! - `CombinedGraphDataSource` (one stat across sessions)

pub mod combined;
pub mod data_source;

// Re-export main types
pub use combined::{CombinedGraphDataSource, CombinedValue};
pub use data_source::{GraphDataSource, TimeAccuracy};
