use frametrace::aggregator::{AggregateField, AggregatedStats, FpsAnalyzer};
use frametrace::metadata::StatMetadataRegistry;
use frametrace::reconstruct::{ingest_frame_data, CycleGraph, FrameDataMessage, IntCounter};
use frametrace::store::{SampleKind, SampleStore};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const GAME: u32 = 100;
const TICK: u32 = 10;
const POOL: u32 = 50;

fn registry() -> StatMetadataRegistry {
    let mut registry = StatMetadataRegistry::new();
    registry.set_seconds_per_cycle(1e-3);
    registry.register_thread(GAME, "GameThread", None);
    registry.register_group(4, "Engine");
    registry.register_stat(TICK, 4, "Tick", SampleKind::HierarchicalTime, None);
    registry.register_stat(POOL, 4, "Pool", SampleKind::Memory, None);
    registry
}

fn tick_frame(number: i64, tick_cycles: u64, calls: u32) -> FrameDataMessage {
    let mut message = FrameDataMessage {
        frame: number,
        ..FrameDataMessage::default()
    };
    message.cycle_graphs.insert(
        GAME,
        CycleGraph::new(GAME, 0, 0).with_child(CycleGraph::new(GAME, TICK, tick_cycles).with_calls(calls)),
    );
    message
}

#[test]
fn test_three_frames_of_tick() {
    let mut store = SampleStore::new();
    let mut registry = registry();
    let mut stats = AggregatedStats::new();

    for (n, (cycles, calls)) in [(5, 1), (6, 2), (7, 1)].into_iter().enumerate() {
        let frame = ingest_frame_data(&mut store, &mut registry, &tick_frame(n as i64, cycles, calls)).unwrap();
        stats.accumulate_frame(&store, frame.frame, &registry);
    }

    let tick = stats.get(TICK).unwrap();
    assert_eq!(stats.frames(), 3);
    assert_eq!(tick.name, "Tick");
    assert_eq!(tick.group_name, "Engine");
    assert_eq!(tick.avg(), 6.0);
    assert_eq!(tick.min(), 5.0);
    assert_eq!(tick.max(), 7.0);
    assert_eq!(tick.sum(), 18.0);
    assert!((tick.avg_num_calls() - 4.0 / 3.0).abs() < 1e-9);
    assert_eq!(tick.formatted(AggregateField::Average), "6.000 ms");
}

#[test]
fn test_stat_missing_from_a_frame_counts_as_zero() {
    let mut store = SampleStore::new();
    let mut registry = registry();
    let mut stats = AggregatedStats::new();

    let mut with_pool = tick_frame(0, 5, 1);
    with_pool.count_accumulators.push(IntCounter {
        stat_id: POOL,
        value: 4096,
    });
    for message in [with_pool, tick_frame(1, 5, 1)] {
        let frame = ingest_frame_data(&mut store, &mut registry, &message).unwrap();
        stats.accumulate_frame(&store, frame.frame, &registry);
    }

    let pool = stats.get(POOL).unwrap();
    assert_eq!(pool.max(), 4.0);
    assert_eq!(pool.min(), 0.0);
    assert_eq!(pool.avg(), 2.0);
    assert_eq!(pool.frames_with_call_pct(), 50.0);
    assert_eq!(pool.avg_per_frame_with_call(), 4.0);
    assert_eq!(pool.formatted(AggregateField::Maximum), "4.00 KB");
}

#[test]
fn test_top_by_average_orders_descending() {
    let mut store = SampleStore::new();
    let mut registry = registry();
    let mut stats = AggregatedStats::new();

    let frame = ingest_frame_data(&mut store, &mut registry, &tick_frame(0, 8, 1)).unwrap();
    stats.accumulate_frame(&store, frame.frame, &registry);

    let top = stats.top_by_average(2);
    assert_eq!(top.len(), 2);
    assert!(top[0].avg() >= top[1].avg());
}

#[test]
fn test_fps_histogram_percentages() {
    let mut fps = FpsAnalyzer::new(5, 0, 60);
    for sample in [15.0, 25.0, 35.0, 65.0] {
        fps.add_sample(sample);
    }

    assert_eq!(fps.sample_count(), 4);
    assert_eq!(fps.pct_at_least_20(), 75.0);
    assert_eq!(fps.pct_at_least_30(), 50.0);
    assert_eq!(fps.pct_at_least_60(), 25.0);
    assert_eq!(fps.min_fps(), 15.0);
    assert_eq!(fps.max_fps(), 65.0);
    assert_eq!(fps.avg_fps(), 35.0);
    // 65 fps lands in the last bucket.
    assert_eq!(fps.buckets()[11], 1);

    let summary = fps.summary();
    assert_eq!(summary.buckets.iter().sum::<u64>(), 4);

    fps.reset();
    assert_eq!(fps.sample_count(), 0);
    assert_eq!(fps.min_fps(), 0.0);
}

proptest! {
    #[test]
    fn prop_every_fps_sample_lands_in_one_bucket(
        samples in prop::collection::vec(0.0f64..500.0, 0..200),
        interval in 1u32..20,
        max_fps in 20u32..240,
    ) {
        let mut fps = FpsAnalyzer::new(interval, 0, max_fps);
        for &sample in &samples {
            fps.add_sample(sample);
        }
        prop_assert_eq!(fps.buckets().iter().sum::<u64>(), samples.len() as u64);
        prop_assert!(fps.pct_at_least_20() >= fps.pct_at_least_30());
        prop_assert!(fps.pct_at_least_30() >= fps.pct_at_least_60());
    }
}
