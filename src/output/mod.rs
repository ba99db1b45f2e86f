//! Report output for processed sessions.
//!
//! This module turns a session into something a person can read:
//! - A serializable report (stats, FPS histogram, event graph)
//! - JSON files
//! - Text summaries

pub mod json;
pub mod report;
pub mod summary;

// Re-export main functions
pub use json::{report_to_string, write_report};
pub use report::{build_report, GraphReport, ReportOptions, SessionReport, StatSummary};
pub use summary::generate_text_summary;
