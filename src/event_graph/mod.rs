//! Event graphs: named call trees built per query.
//!
//! This module provides:
//! - `EventGraphNode` (owned tree with timing fields and display flags)
//! - single-frame construction and the combine/max/divide folds

pub mod builder;
pub mod node;

// Re-export main types and functions
pub use builder::{
    build_for_frame, build_for_range, combine_and_add, combine_and_find_max, divide, fixup_times,
    EventGraphKind,
};
pub use node::{EventGraphNode, NodeFlags};
