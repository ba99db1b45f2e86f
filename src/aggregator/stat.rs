//! Streaming per-stat statistics across frames.
//!
//! Samples of the current frame are folded into a one-frame accumulator;
//! `advance` commits it into the all-frames fields and resets it.

use crate::metadata::StatMetadataRegistry;
use crate::store::{Sample, SampleKind, SampleStore};
use log::debug;
use serde::Serialize;
use std::cell::Cell;
use std::collections::BTreeMap;

/// Which value `AggregatedStat::formatted` renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateField {
    Average,
    Minimum,
    Maximum,
    Sum,
    AveragePerFrameWithCall,
}

/// Running statistics for one stat
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedStat {
    pub stat_id: u32,
    pub name: String,
    pub group_name: String,
    pub kind: SampleKind,

    sum_all_frames: f64,
    min_all_frames: f64,
    max_all_frames: f64,
    calls_all_frames: f64,
    min_calls: f64,
    max_calls: f64,
    frames_with_call: u64,
    num_frames: u64,

    #[serde(skip)]
    one_frame_value: f64,
    #[serde(skip)]
    one_frame_calls: f64,
    #[serde(skip)]
    empty_logged: Cell<bool>,
}

impl AggregatedStat {
    pub fn new(stat_id: u32, name: &str, group_name: &str, kind: SampleKind) -> Self {
        Self {
            stat_id,
            name: name.to_string(),
            group_name: group_name.to_string(),
            kind,
            sum_all_frames: 0.0,
            min_all_frames: f64::MAX,
            max_all_frames: f64::MIN,
            calls_all_frames: 0.0,
            min_calls: f64::MAX,
            max_calls: f64::MIN,
            frames_with_call: 0,
            num_frames: 0,
            one_frame_value: 0.0,
            one_frame_calls: 0.0,
            empty_logged: Cell::new(false),
        }
    }

    /// Create from the registry's descriptor for `stat_id`
    pub fn from_registry(stat_id: u32, registry: &StatMetadataRegistry) -> Self {
        let stat = registry.stat(stat_id);
        Self::new(stat_id, &stat.name, &registry.group(stat.group_id).name, stat.kind)
    }

    /// Fold one sample of the current frame
    ///
    /// Hierarchical samples add their duration and call count; counters add
    /// their value (kilobytes for memory) and count as one call.
    pub fn accumulate(&mut self, sample: &Sample) {
        if sample.kind.is_hierarchical() {
            self.one_frame_value += sample.duration_ms;
            self.one_frame_calls += sample.counter_value;
        } else {
            self.one_frame_value += sample.counter_value * sample.kind.display_scale();
            self.one_frame_calls += 1.0;
        }
    }

    /// Commit the current frame; call exactly once per frame
    pub fn advance(&mut self) {
        self.sum_all_frames += self.one_frame_value;
        self.min_all_frames = self.min_all_frames.min(self.one_frame_value);
        self.max_all_frames = self.max_all_frames.max(self.one_frame_value);

        self.calls_all_frames += self.one_frame_calls;
        self.min_calls = self.min_calls.min(self.one_frame_calls);
        self.max_calls = self.max_calls.max(self.one_frame_calls);

        self.num_frames += 1;
        if self.one_frame_calls != 0.0 {
            self.frames_with_call += 1;
        }

        self.one_frame_value = 0.0;
        self.one_frame_calls = 0.0;
    }

    pub fn num_frames(&self) -> u64 {
        self.num_frames
    }

    pub fn frames_with_call(&self) -> u64 {
        self.frames_with_call
    }

    pub fn sum(&self) -> f64 {
        self.sum_all_frames
    }

    /// Average per frame; 0 before the first frame
    pub fn avg(&self) -> f64 {
        self.per_frame(self.sum_all_frames, self.num_frames)
    }

    /// Smallest per-frame value; 0 before the first frame
    pub fn min(&self) -> f64 {
        if self.num_frames == 0 {
            return 0.0;
        }
        self.min_all_frames
    }

    /// Largest per-frame value; 0 before the first frame
    pub fn max(&self) -> f64 {
        if self.num_frames == 0 {
            return 0.0;
        }
        self.max_all_frames
    }

    pub fn avg_num_calls(&self) -> f64 {
        self.per_frame(self.calls_all_frames, self.num_frames)
    }

    pub fn min_calls(&self) -> f64 {
        if self.num_frames == 0 {
            return 0.0;
        }
        self.min_calls
    }

    pub fn max_calls(&self) -> f64 {
        if self.num_frames == 0 {
            return 0.0;
        }
        self.max_calls
    }

    /// Average over the frames where the stat was called
    pub fn avg_per_frame_with_call(&self) -> f64 {
        self.per_frame(self.sum_all_frames, self.frames_with_call)
    }

    pub fn frames_with_call_pct(&self) -> f64 {
        self.per_frame(self.frames_with_call as f64 * 100.0, self.num_frames)
    }

    /// Human-readable value with the unit for this stat's kind
    pub fn formatted(&self, field: AggregateField) -> String {
        let value = match field {
            AggregateField::Average => self.avg(),
            AggregateField::Minimum => self.min(),
            AggregateField::Maximum => self.max(),
            AggregateField::Sum => self.sum(),
            AggregateField::AveragePerFrameWithCall => self.avg_per_frame_with_call(),
        };
        match self.kind {
            SampleKind::HierarchicalTime => format!("{:.3} ms", value),
            SampleKind::Memory => format!("{:.2} KB", value),
            SampleKind::NumberInt => format!("{:.0}", value),
            SampleKind::NumberFloat | SampleKind::Invalid => format!("{:.3}", value),
        }
    }

    fn per_frame(&self, total: f64, frames: u64) -> f64 {
        if frames == 0 {
            if !self.empty_logged.replace(true) {
                debug!("Aggregate for stat {} has no frames yet", self.stat_id);
            }
            return 0.0;
        }
        total / frames as f64
    }
}

/// Aggregated statistics for every stat seen by a session
#[derive(Debug, Clone, Default)]
pub struct AggregatedStats {
    stats: BTreeMap<u32, AggregatedStat>,
    frames: u64,
}

impl AggregatedStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold every sample of a sealed frame, then advance every known stat
    ///
    /// **Public** - called once per ingested frame
    ///
    /// Stats absent from the frame advance with zero, so their minimum
    /// reflects frames where they did not occur.
    pub fn accumulate_frame(
        &mut self,
        store: &SampleStore,
        frame: usize,
        registry: &StatMetadataRegistry,
    ) {
        for sample in store.frame_samples(frame) {
            if !sample.is_valid() {
                continue;
            }
            self.stats
                .entry(sample.stat_id)
                .or_insert_with(|| AggregatedStat::from_registry(sample.stat_id, registry))
                .accumulate(sample);
        }
        for stat in self.stats.values_mut() {
            stat.advance();
        }
        self.frames += 1;
    }

    pub fn get(&self, stat_id: u32) -> Option<&AggregatedStat> {
        self.stats.get(&stat_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AggregatedStat> {
        self.stats.values()
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Stats ordered by average per frame, descending
    pub fn top_by_average(&self, n: usize) -> Vec<&AggregatedStat> {
        let mut stats: Vec<&AggregatedStat> = self.stats.values().collect();
        stats.sort_by(|a, b| b.avg().total_cmp(&a.avg()));
        stats.truncate(n);
        stats
    }
}
