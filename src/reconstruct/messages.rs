//! Decoded input messages consumed by the reconstructors.
//!
//! Both shapes are produced by an external decoder (live transport or the
//! capture reader); nothing here knows about wire encodings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One node of a per-thread cycle graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleGraph {
    pub thread_id: u32,
    pub stat_id: u32,
    pub cycles_value: u64,
    #[serde(default = "one")]
    pub calls_per_frame: u32,
    #[serde(default)]
    pub children: Vec<CycleGraph>,
}

fn one() -> u32 {
    1
}

impl CycleGraph {
    pub fn new(thread_id: u32, stat_id: u32, cycles_value: u64) -> Self {
        Self {
            thread_id,
            stat_id,
            cycles_value,
            calls_per_frame: 1,
            children: Vec::new(),
        }
    }

    pub fn with_calls(mut self, calls_per_frame: u32) -> Self {
        self.calls_per_frame = calls_per_frame;
        self
    }

    pub fn with_child(mut self, child: CycleGraph) -> Self {
        self.children.push(child);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntCounter {
    pub stat_id: u32,
    pub value: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloatCounter {
    pub stat_id: u32,
    pub value: f64,
}

/// One decoded frame from a live source or a cycle-graph capture
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameDataMessage {
    /// Source frame number
    pub frame: i64,

    /// Thread id -> thread cycle graph (children are the top-level scopes)
    #[serde(default)]
    pub cycle_graphs: BTreeMap<u32, CycleGraph>,

    #[serde(default)]
    pub count_accumulators: Vec<IntCounter>,

    #[serde(default)]
    pub float_accumulators: Vec<FloatCounter>,
}

/// Stat reference inside a raw stream: an id, or a name to resolve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatRef {
    Id(u32),
    Name(String),
}

/// Operation carried by one raw message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum RawEvent {
    ScopeStart { stat: StatRef, cycles: u64 },
    ScopeEnd { cycles: u64 },
    Counter { stat: StatRef, value: f64 },
    Advance { frame: i64 },
}

/// One message of a raw capture stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawStatMessage {
    pub thread_id: u32,
    #[serde(flatten)]
    pub event: RawEvent,
}

impl RawStatMessage {
    pub fn scope_start(thread_id: u32, stat: StatRef, cycles: u64) -> Self {
        Self {
            thread_id,
            event: RawEvent::ScopeStart { stat, cycles },
        }
    }

    pub fn scope_end(thread_id: u32, cycles: u64) -> Self {
        Self {
            thread_id,
            event: RawEvent::ScopeEnd { cycles },
        }
    }

    pub fn counter(thread_id: u32, stat: StatRef, value: f64) -> Self {
        Self {
            thread_id,
            event: RawEvent::Counter { stat, value },
        }
    }

    pub fn advance(thread_id: u32, frame: i64) -> Self {
        Self {
            thread_id,
            event: RawEvent::Advance { frame },
        }
    }

    pub fn is_advance(&self) -> bool {
        matches!(self.event, RawEvent::Advance { .. })
    }
}
