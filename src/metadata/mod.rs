//! Stat, group and thread metadata.
//!
//! This module provides:
//! - `MetadataSnapshot` (descriptor lists as delivered by a source)
//! - `StatMetadataRegistry` (the id-keyed catalog built from snapshots)

pub mod registry;
pub mod snapshot;

// Re-export main types
pub use registry::{GroupDescriptor, StatDescriptor, StatMetadataRegistry};
pub use snapshot::{GroupEntry, MetadataSnapshot, StatEntry, ThreadEntry};
