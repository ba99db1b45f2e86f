//! Self-time synthesis shared by both reconstructors.

use crate::store::{SampleIndex, SampleStore};
use crate::utils::config::{NO_GROUP_ID, SELF_STAT_ID};
use crate::utils::error::StructuralError;

/// Append a `Self` child carrying `parent`'s exclusive time
///
/// Exclusive time is the parent's duration minus the durations of its
/// current children. Nothing is added for leaves or when the exclusive time
/// is not positive, so a negative self sample can never appear.
///
/// # Returns
/// Index of the new self sample, if one was added
pub fn append_self_sample(
    store: &mut SampleStore,
    parent: SampleIndex,
) -> Result<Option<SampleIndex>, StructuralError> {
    let sample = store.sample(parent);
    if sample.children.is_empty() {
        return Ok(None);
    }

    let children_ms: f64 = sample
        .children
        .iter()
        .map(|&child| store.sample(child).duration_ms)
        .sum();
    let exclusive_ms = sample.duration_ms - children_ms;
    if exclusive_ms <= 0.0 {
        return Ok(None);
    }

    let thread_id = sample.thread_id;
    let start_ms = sample.end_ms() - exclusive_ms;
    store
        .add_hierarchical_sample(
            thread_id,
            NO_GROUP_ID,
            SELF_STAT_ID,
            start_ms,
            exclusive_ms,
            1,
            Some(parent),
        )
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_sample_fills_gap() {
        let mut store = SampleStore::new();
        let root = store.add_hierarchical_sample(1, 0, 10, 0.0, 10.0, 1, None).unwrap();
        store.add_hierarchical_sample(1, 0, 11, 1.0, 3.0, 1, Some(root)).unwrap();

        let self_index = append_self_sample(&mut store, root).unwrap().unwrap();
        let sample = store.sample(self_index);
        assert_eq!(sample.stat_id, SELF_STAT_ID);
        assert_eq!(sample.duration_ms, 7.0);
        assert_eq!(sample.start_ms, 3.0);
    }

    #[test]
    fn test_no_self_for_leaves_or_full_parents() {
        let mut store = SampleStore::new();
        let root = store.add_hierarchical_sample(1, 0, 10, 0.0, 4.0, 1, None).unwrap();
        assert_eq!(append_self_sample(&mut store, root).unwrap(), None);

        store.add_hierarchical_sample(1, 0, 11, 0.0, 5.0, 1, Some(root)).unwrap();
        assert_eq!(append_self_sample(&mut store, root).unwrap(), None);
    }
}
