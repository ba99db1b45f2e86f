//! Metadata snapshot schema, as delivered by a live source or a capture file.

use crate::store::SampleKind;
use serde::{Deserialize, Serialize};

/// Stat/group/thread descriptor lists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataSnapshot {
    /// Conversion factor for cycle counters (0 when unknown)
    #[serde(default)]
    pub seconds_per_cycle: f64,

    #[serde(default)]
    pub groups: Vec<GroupEntry>,

    #[serde(default)]
    pub stats: Vec<StatEntry>,

    #[serde(default)]
    pub threads: Vec<ThreadEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupEntry {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatEntry {
    pub id: u32,

    /// None for stats the source sent without a group
    #[serde(default)]
    pub group_id: Option<u32>,

    /// Short (code) name, e.g. `STAT_InitViews`
    pub name: String,

    /// Display description; falls back to `name` when empty
    #[serde(default)]
    pub description: Option<String>,

    pub kind: SampleKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadEntry {
    pub thread_id: u32,
    pub name: String,

    /// Stat representing this thread; looked up by name when absent
    #[serde(default)]
    pub stat_id: Option<u32>,
}

impl MetadataSnapshot {
    /// Number of descriptors carried, used for the monotonic replacement check
    pub fn size(&self) -> usize {
        self.groups.len() + self.stats.len() + self.threads.len()
    }
}
