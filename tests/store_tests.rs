use frametrace::store::{SampleKind, SampleStore};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

/// Seal one frame per duration, each holding a single root sample
fn store_with_frames(durations: &[f64]) -> SampleStore {
    let mut store = SampleStore::new();
    for &duration in durations {
        store
            .add_hierarchical_sample(0, 0, 1, 0.0, duration, 1, None)
            .unwrap();
        store.advance_frame(duration);
    }
    store
}

#[test]
fn test_frame_lookup_by_time() {
    let store = store_with_frames(&[10.0, 20.0, 30.0]);

    assert_eq!(store.total_elapsed_ms(), 60.0);
    assert_eq!(store.frame_index().frame_at_time(0.0), Some(0));
    assert_eq!(store.frame_index().frame_at_time(10.0), Some(1));
    assert_eq!(store.frame_index().frame_at_time(59.0), Some(2));
    assert_eq!(store.frame_index().frame_at_time(60.0), Some(2));
    assert_eq!(store.frame_index().frame_at_time(61.0), None);

    assert_eq!(store.frames_overlapping_time(5.0, 25.0), Some((0, 1)));
    assert_eq!(store.frames_overlapping_time(25.0, 5.0), None);
}

#[test]
fn test_discarding_pending_frame_keeps_sealed_frames() {
    let mut store = store_with_frames(&[16.0]);
    let sealed = store.num_samples();

    let root = store
        .add_hierarchical_sample(0, 0, 1, 0.0, 0.0, 1, None)
        .unwrap();
    store
        .add_hierarchical_sample(0, 0, 5, 0.0, 3.0, 1, Some(root))
        .unwrap();
    store.add_counter_sample(0, 7, 42.0, SampleKind::NumberInt);

    assert_eq!(store.discard_pending_frame(), 3);
    assert_eq!(store.num_samples(), sealed);
    assert_eq!(store.num_frames(), 1);
    assert_eq!(store.frame_samples(0).len(), 1);
    assert_eq!(store.frame_root(0), Some(0));
}

#[test]
fn test_sealed_samples_cannot_be_parents() {
    let mut store = store_with_frames(&[16.0]);
    assert!(store
        .add_hierarchical_sample(0, 0, 5, 0.0, 1.0, 1, Some(0))
        .is_err());
    assert!(store.set_duration(0, 4.0).is_err());
}

#[test]
fn test_out_of_range_lookups_are_sentinels() {
    let store = store_with_frames(&[16.0]);

    assert!(!store.sample(999).is_valid());
    assert!(store.frame_samples(5).is_empty());
    assert_eq!(store.frame_root(5), None);
    assert_eq!(store.samples_for_frame(5), None);
}

#[test]
fn test_second_buckets_roll_over() {
    let store = store_with_frames(&[400.0, 400.0, 400.0, 1500.0]);
    let seconds = store.frame_index().seconds();

    // 1200 ms closes second 0; 2700 ms closes second 1.
    assert_eq!(seconds.len(), 2);
    assert_eq!(seconds[0].frame_count, 3);
    assert_eq!(seconds[1].frame_count, 1);
    assert_eq!(seconds[1].total_frames, 4);
    assert_eq!(store.frame_index().open_second_frames(), 0);
}

proptest! {
    #[test]
    fn prop_overlapping_frames_bracket_the_span(
        durations in prop::collection::vec(1u32..50, 1..40),
        a in 0.0f64..1.0,
        b in 0.0f64..1.0,
    ) {
        let durations: Vec<f64> = durations.into_iter().map(f64::from).collect();
        let store = store_with_frames(&durations);
        let total = store.total_elapsed_ms();
        let (start, end) = if a <= b { (a * total, b * total) } else { (b * total, a * total) };

        let (first, last) = store.frames_overlapping_time(start, end).unwrap();
        let records = store.frame_index().records();

        prop_assert!(first <= last);
        prop_assert!(records[first].start_ms() <= start + 1e-9);
        prop_assert!(records[last].elapsed_ms >= end - 1e-9);
    }
}
