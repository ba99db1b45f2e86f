//! One stat compared across several sessions.

use super::data_source::GraphDataSource;
use log::warn;
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Spread of one stat across sessions for a time range
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CombinedValue {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

/// Per-session sources of the same stat, keyed by session instance id
#[derive(Debug)]
pub struct CombinedGraphDataSource<'s> {
    stat_id: u32,
    sources: BTreeMap<Uuid, GraphDataSource<'s>>,
}

impl<'s> CombinedGraphDataSource<'s> {
    pub fn new(stat_id: u32) -> Self {
        Self {
            stat_id,
            sources: BTreeMap::new(),
        }
    }

    pub fn stat_id(&self) -> u32 {
        self.stat_id
    }

    /// Add a session's source; a source for another stat is rejected
    ///
    /// # Returns
    /// true if the source was added (or replaced a previous one)
    pub fn add_source(&mut self, session_id: Uuid, source: GraphDataSource<'s>) -> bool {
        if source.stat_id() != self.stat_id {
            warn!(
                "Refusing source for stat {} in combined source for stat {}",
                source.stat_id(),
                self.stat_id
            );
            return false;
        }
        self.sources.insert(session_id, source);
        true
    }

    pub fn remove_source(&mut self, session_id: &Uuid) -> Option<GraphDataSource<'s>> {
        self.sources.remove(session_id)
    }

    pub fn num_sources(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn session_ids(&self) -> impl Iterator<Item = &Uuid> {
        self.sources.keys()
    }

    /// Longest capture among the sources
    pub fn total_time_ms(&self) -> f64 {
        self.sources
            .values()
            .map(GraphDataSource::total_time_ms)
            .fold(0.0, f64::max)
    }

    /// Min, max and average of the sources' range values
    ///
    /// Sessions with no frames in the range are left out; None when no
    /// session has any.
    pub fn value_over_time_range(&self, start_ms: f64, end_ms: f64) -> Option<CombinedValue> {
        let values: Vec<f64> = self
            .sources
            .values()
            .filter_map(|source| source.max_over_time_range(start_ms, end_ms))
            .map(|(_, value)| value)
            .collect();
        summarize(&values)
    }

    /// Like `value_over_time_range`, using each source's bucket cache
    pub fn value_at_time(&self, time_ms: f64) -> Option<CombinedValue> {
        let values: Vec<f64> = self
            .sources
            .values()
            .filter(|source| time_ms <= source.total_time_ms())
            .map(|source| source.value_at_time(time_ms))
            .collect();
        summarize(&values)
    }

    /// Per session, the frame holding its highest value in the range
    pub fn frame_indices_of_max(&self, start_ms: f64, end_ms: f64) -> BTreeMap<Uuid, usize> {
        self.sources
            .iter()
            .filter_map(|(id, source)| {
                source
                    .max_over_time_range(start_ms, end_ms)
                    .map(|(frame, _)| (*id, frame))
            })
            .collect()
    }
}

fn summarize(values: &[f64]) -> Option<CombinedValue> {
    if values.is_empty() {
        return None;
    }
    let min = values.iter().copied().fold(f64::MAX, f64::min);
    let max = values.iter().copied().fold(f64::MIN, f64::max);
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    Some(CombinedValue { min, max, avg })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{SampleKind, SampleStore};

    fn store(ticks: &[f64]) -> SampleStore {
        let mut store = SampleStore::new();
        for tick in ticks {
            let root = store.add_hierarchical_sample(0, 0, 1, 0.0, 10.0, 1, None).unwrap();
            store.add_hierarchical_sample(1, 3, 10, 0.0, *tick, 1, Some(root)).unwrap();
            store.advance_frame(10.0);
        }
        store
    }

    #[test]
    fn test_min_max_avg_across_sessions() {
        let a = store(&[2.0, 6.0, 1.0]);
        let b = store(&[4.0, 3.0, 8.0]);
        let (id_a, id_b) = (Uuid::new_v4(), Uuid::new_v4());

        let mut combined = CombinedGraphDataSource::new(10);
        assert!(combined.add_source(id_a, GraphDataSource::new(&a, 10, 3, SampleKind::HierarchicalTime)));
        assert!(combined.add_source(id_b, GraphDataSource::new(&b, 10, 3, SampleKind::HierarchicalTime)));

        let value = combined.value_over_time_range(0.0, 20.0).unwrap();
        assert_eq!(value, CombinedValue { min: 4.0, max: 6.0, avg: 5.0 });

        let frames = combined.frame_indices_of_max(0.0, 30.0);
        assert_eq!(frames[&id_a], 1);
        assert_eq!(frames[&id_b], 2);
    }

    #[test]
    fn test_rejects_other_stat() {
        let a = store(&[1.0]);
        let mut combined = CombinedGraphDataSource::new(10);
        assert!(!combined.add_source(Uuid::new_v4(), GraphDataSource::new(&a, 11, 3, SampleKind::HierarchicalTime)));
        assert!(combined.is_empty());
        assert!(combined.value_over_time_range(0.0, 10.0).is_none());
    }

    #[test]
    fn test_shorter_session_drops_out() {
        let a = store(&[1.0, 1.0, 1.0, 9.0]);
        let b = store(&[5.0]);
        let mut combined = CombinedGraphDataSource::new(10);
        combined.add_source(Uuid::new_v4(), GraphDataSource::new(&a, 10, 3, SampleKind::HierarchicalTime));
        combined.add_source(Uuid::new_v4(), GraphDataSource::new(&b, 10, 3, SampleKind::HierarchicalTime));

        let value = combined.value_over_time_range(31.0, 40.0).unwrap();
        assert_eq!(value, CombinedValue { min: 9.0, max: 9.0, avg: 9.0 });
        assert_eq!(combined.total_time_ms(), 40.0);
    }
}
