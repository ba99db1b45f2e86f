//! A single recorded sample and its kind.

use serde::{Deserialize, Serialize};

/// Stable position of a sample inside its `SampleStore`
pub type SampleIndex = usize;

/// What a sample measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleKind {
    /// Scoped CPU time, part of a call hierarchy
    HierarchicalTime,
    /// Flat integer counter
    NumberInt,
    /// Flat floating point counter
    NumberFloat,
    /// Flat memory counter, in bytes
    Memory,
    /// Only used by the out-of-range sentinel
    Invalid,
}

impl SampleKind {
    /// Multiplier applied to raw values before display
    ///
    /// Memory is reported in kilobytes.
    pub fn display_scale(self) -> f64 {
        match self {
            SampleKind::Memory => 1.0 / 1024.0,
            _ => 1.0,
        }
    }

    pub fn is_hierarchical(self) -> bool {
        self == SampleKind::HierarchicalTime
    }
}

/// One recorded event
///
/// Hierarchical samples form a tree rooted at a per-frame root sample;
/// links are indices into the owning store, never references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub thread_id: u32,
    pub group_id: u32,
    pub stat_id: u32,
    pub start_ms: f64,
    pub duration_ms: f64,
    /// Call count for hierarchical samples, value for counters
    pub counter_value: f64,
    pub kind: SampleKind,
    pub parent: Option<SampleIndex>,
    pub children: Vec<SampleIndex>,
    #[serde(skip)]
    pub(crate) patched: bool,
}

/// Returned for any out-of-range lookup
pub static INVALID_SAMPLE: Sample = Sample {
    thread_id: u32::MAX,
    group_id: u32::MAX,
    stat_id: u32::MAX,
    start_ms: 0.0,
    duration_ms: 0.0,
    counter_value: 0.0,
    kind: SampleKind::Invalid,
    parent: None,
    children: Vec::new(),
    patched: true,
};

impl Sample {
    pub(crate) fn hierarchical(
        thread_id: u32,
        group_id: u32,
        stat_id: u32,
        start_ms: f64,
        duration_ms: f64,
        calls: u32,
        parent: Option<SampleIndex>,
    ) -> Self {
        Self {
            thread_id,
            group_id,
            stat_id,
            start_ms,
            duration_ms,
            counter_value: calls as f64,
            kind: SampleKind::HierarchicalTime,
            parent,
            children: Vec::new(),
            patched: false,
        }
    }

    pub(crate) fn counter(group_id: u32, stat_id: u32, value: f64, kind: SampleKind) -> Self {
        Self {
            thread_id: 0,
            group_id,
            stat_id,
            start_ms: 0.0,
            duration_ms: 0.0,
            counter_value: value,
            kind,
            parent: None,
            children: Vec::new(),
            patched: false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.kind != SampleKind::Invalid
    }

    pub fn end_ms(&self) -> f64 {
        self.start_ms + self.duration_ms
    }

    /// Number of calls recorded for a hierarchical sample
    pub fn calls(&self) -> f64 {
        if self.kind.is_hierarchical() {
            self.counter_value
        } else {
            0.0
        }
    }

    /// Value this sample contributes to a per-stat total, before display scaling
    pub fn value(&self) -> f64 {
        if self.kind.is_hierarchical() {
            self.duration_ms
        } else {
            self.counter_value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_is_invalid() {
        assert!(!INVALID_SAMPLE.is_valid());
        assert!(INVALID_SAMPLE.children.is_empty());
    }

    #[test]
    fn test_value_by_kind() {
        let timed = Sample::hierarchical(1, 2, 3, 1.0, 4.5, 2, None);
        assert_eq!(timed.value(), 4.5);
        assert_eq!(timed.calls(), 2.0);
        assert_eq!(timed.end_ms(), 5.5);

        let counter = Sample::counter(2, 4, 2048.0, SampleKind::Memory);
        assert_eq!(counter.value(), 2048.0);
        assert_eq!(counter.calls(), 0.0);
        assert_eq!(counter.value() * counter.kind.display_scale(), 2.0);
    }
}
