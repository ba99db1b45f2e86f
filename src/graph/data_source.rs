//! Time-series view over one stat of one sample store.
//!
//! The source borrows its store, so the store cannot grow while the view
//! (and its bucket cache) is alive.

use crate::store::{SampleKind, SampleStore};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;

/// Time-series cache granularity, in buckets per second
///
/// Only sizes the cache; values do not depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeAccuracy {
    Fps008,
    Fps015,
    Fps030,
    Fps060,
    Fps120,
}

impl TimeAccuracy {
    pub fn buckets_per_second(self) -> u32 {
        match self {
            TimeAccuracy::Fps008 => 8,
            TimeAccuracy::Fps015 => 15,
            TimeAccuracy::Fps030 => 30,
            TimeAccuracy::Fps060 => 60,
            TimeAccuracy::Fps120 => 120,
        }
    }

    pub fn from_buckets_per_second(buckets: u32) -> Option<Self> {
        match buckets {
            8 => Some(TimeAccuracy::Fps008),
            15 => Some(TimeAccuracy::Fps015),
            30 => Some(TimeAccuracy::Fps030),
            60 => Some(TimeAccuracy::Fps060),
            120 => Some(TimeAccuracy::Fps120),
            _ => None,
        }
    }

    pub fn bucket_duration_ms(self) -> f64 {
        1000.0 / self.buckets_per_second() as f64
    }
}

impl Default for TimeAccuracy {
    fn default() -> Self {
        TimeAccuracy::Fps060
    }
}

/// Values of one `(stat, group, kind)` over the frames of one store
#[derive(Debug)]
pub struct GraphDataSource<'s> {
    store: &'s SampleStore,
    stat_id: u32,
    group_id: u32,
    kind: SampleKind,
    accuracy: TimeAccuracy,
    cache: RefCell<HashMap<usize, f64>>,
}

impl<'s> GraphDataSource<'s> {
    pub fn new(store: &'s SampleStore, stat_id: u32, group_id: u32, kind: SampleKind) -> Self {
        Self {
            store,
            stat_id,
            group_id,
            kind,
            accuracy: TimeAccuracy::default(),
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Change the cache granularity; drops cached buckets
    pub fn with_accuracy(mut self, accuracy: TimeAccuracy) -> Self {
        self.accuracy = accuracy;
        self.cache.get_mut().clear();
        self
    }

    pub fn stat_id(&self) -> u32 {
        self.stat_id
    }

    pub fn group_id(&self) -> u32 {
        self.group_id
    }

    pub fn kind(&self) -> SampleKind {
        self.kind
    }

    pub fn accuracy(&self) -> TimeAccuracy {
        self.accuracy
    }

    pub fn num_frames(&self) -> usize {
        self.store.num_frames()
    }

    pub fn total_time_ms(&self) -> f64 {
        self.store.total_elapsed_ms()
    }

    /// Sum of this stat's samples in frame `frame`, display-scaled
    ///
    /// Hierarchical samples contribute their duration, counters their value.
    /// Unknown frames read as 0.
    pub fn value_at_frame(&self, frame: usize) -> f64 {
        let total: f64 = self
            .store
            .frame_samples(frame)
            .iter()
            .filter(|sample| sample.stat_id == self.stat_id)
            .map(|sample| {
                if sample.kind.is_hierarchical() {
                    sample.duration_ms
                } else {
                    sample.counter_value
                }
            })
            .sum();
        total * self.kind.display_scale()
    }

    /// Largest per-frame value among the frames overlapping `[start_ms, end_ms]`
    pub fn value_over_time_range(&self, start_ms: f64, end_ms: f64) -> f64 {
        self.max_over_time_range(start_ms, end_ms)
            .map_or(0.0, |(_, value)| value)
    }

    /// Frame holding the largest value in `[start_ms, end_ms]`, with that value
    ///
    /// Ties resolve to the earliest frame.
    pub fn max_over_time_range(&self, start_ms: f64, end_ms: f64) -> Option<(usize, f64)> {
        let (first, last) = self.store.frames_overlapping_time(start_ms, end_ms)?;
        (first..=last)
            .map(|frame| (frame, self.value_at_frame(frame)))
            .fold(None, |best: Option<(usize, f64)>, (frame, value)| match best {
                Some((_, best_value)) if best_value >= value => best,
                _ => Some((frame, value)),
            })
    }

    /// Value of the time bucket containing `time_ms`, cached per bucket
    pub fn value_at_time(&self, time_ms: f64) -> f64 {
        if time_ms < 0.0 {
            return 0.0;
        }
        let bucket_ms = self.accuracy.bucket_duration_ms();
        let bucket = (time_ms / bucket_ms) as usize;

        if let Some(value) = self.cache.borrow().get(&bucket) {
            return *value;
        }

        let start_ms = bucket as f64 * bucket_ms;
        let end_ms = (start_ms + bucket_ms).min(self.total_time_ms());
        let value = self.value_over_time_range(start_ms, end_ms);
        self.cache.borrow_mut().insert(bucket, value);
        value
    }

    pub fn cached_buckets(&self) -> usize {
        self.cache.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Frames of 10 ms, each with one "Tick" sample and one memory counter
    fn store(ticks: &[f64]) -> SampleStore {
        let mut store = SampleStore::new();
        for tick in ticks {
            let root = store.add_hierarchical_sample(0, 0, 1, 0.0, 10.0, 1, None).unwrap();
            store.add_hierarchical_sample(1, 3, 10, 0.0, *tick, 1, Some(root)).unwrap();
            store.add_counter_sample(4, 50, 2048.0, SampleKind::Memory);
            store.advance_frame(10.0);
        }
        store
    }

    #[test]
    fn test_value_at_frame() {
        let store = store(&[2.0, 5.0]);
        let ticks = GraphDataSource::new(&store, 10, 3, SampleKind::HierarchicalTime);
        assert_eq!(ticks.value_at_frame(1), 5.0);
        assert_eq!(ticks.value_at_frame(9), 0.0);

        let memory = GraphDataSource::new(&store, 50, 4, SampleKind::Memory);
        assert_eq!(memory.value_at_frame(0), 2.0);
    }

    #[test]
    fn test_range_takes_maximum() {
        let store = store(&[2.0, 7.0, 3.0, 1.0]);
        let source = GraphDataSource::new(&store, 10, 3, SampleKind::HierarchicalTime);
        assert_eq!(source.value_over_time_range(0.0, 40.0), 7.0);
        assert_eq!(source.max_over_time_range(25.0, 40.0), Some((2, 3.0)));
        assert_eq!(source.value_over_time_range(50.0, 60.0), 0.0);
    }

    #[test]
    fn test_value_at_time_is_cached() {
        let store = store(&[2.0, 7.0, 3.0, 1.0]);
        let source = GraphDataSource::new(&store, 10, 3, SampleKind::HierarchicalTime)
            .with_accuracy(TimeAccuracy::Fps120);
        // Bucket 0 covers 0..8.33 ms
        assert_eq!(source.value_at_time(4.0), 2.0);
        assert_eq!(source.value_at_time(5.0), 2.0);
        assert_eq!(source.cached_buckets(), 1);
        // Bucket 1 covers 8.33..16.67 ms: frames 0 and 1
        assert_eq!(source.value_at_time(9.0), 7.0);
        assert_eq!(source.cached_buckets(), 2);
    }

    #[test]
    fn test_accuracy_choices() {
        assert_eq!(TimeAccuracy::from_buckets_per_second(30), Some(TimeAccuracy::Fps030));
        assert_eq!(TimeAccuracy::from_buckets_per_second(25), None);
        assert_eq!(TimeAccuracy::Fps008.bucket_duration_ms(), 125.0);
    }
}
