//! Ingestion of decoded frame-data messages (per-thread cycle graphs).
//!
//! Cycle graphs carry durations but no start times, so children are laid out
//! back to back from their parent's start.

use super::messages::{CycleGraph, FrameDataMessage};
use super::self_time::append_self_sample;
use crate::metadata::StatMetadataRegistry;
use crate::store::{SampleIndex, SampleKind, SampleStore};
use crate::utils::config::{NO_GROUP_ID, SECONDS_PER_CYCLE_STAT, THREAD_ROOT_STAT_ID};
use crate::utils::error::StructuralError;
use log::{debug, warn};

/// Outcome of one ingested frame-data message
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedFrame {
    /// Index of the sealed frame in the store
    pub frame: usize,
    pub source_frame: i64,
    /// Longest thread time
    pub duration_ms: f64,
    pub game_thread_ms: Option<f64>,
    /// `1000 / game thread ms`, 0 without a game thread
    pub fps: f64,
}

/// Append one decoded frame to the store and seal it
///
/// **Public** - entry point for live frames and cycle-graph captures
///
/// # Errors
/// `StructuralError::EmptyFrame` when no thread reported any time. The
/// pending frame is discarded on any error.
pub fn ingest_frame_data(
    store: &mut SampleStore,
    registry: &mut StatMetadataRegistry,
    message: &FrameDataMessage,
) -> Result<IngestedFrame, StructuralError> {
    match build_frame(store, registry, message) {
        Ok(frame) => Ok(frame),
        Err(err) => {
            store.discard_pending_frame();
            warn!("Dropping frame {}: {}", message.frame, err);
            Err(err)
        }
    }
}

fn build_frame(
    store: &mut SampleStore,
    registry: &mut StatMetadataRegistry,
    message: &FrameDataMessage,
) -> Result<IngestedFrame, StructuralError> {
    let frame_root =
        store.add_hierarchical_sample(0, NO_GROUP_ID, THREAD_ROOT_STAT_ID, 0.0, 0.0, 1, None)?;

    let mut game_thread_ms = None;
    let mut longest_ms: f64 = 0.0;

    for (&thread_id, graph) in &message.cycle_graphs {
        let thread_ms: f64 = graph
            .children
            .iter()
            .map(|child| registry.convert_cycles_to_ms(child.cycles_value as f64))
            .sum();
        if thread_ms <= 0.0 {
            continue;
        }

        if game_thread_ms.is_none() && registry.is_game_thread(thread_id) {
            game_thread_ms = Some(thread_ms);
        }
        longest_ms = longest_ms.max(thread_ms);

        let stat_id = registry.thread_root_stat(thread_id);
        let group_id = registry.stat(stat_id).group_id;
        let thread_root = store.add_hierarchical_sample(
            thread_id,
            group_id,
            stat_id,
            0.0,
            thread_ms,
            1,
            Some(frame_root),
        )?;
        populate_children(store, registry, thread_id, graph, thread_root, 0.0)?;
    }

    if longest_ms <= 0.0 {
        return Err(StructuralError::EmptyFrame);
    }
    store.set_start_and_end(frame_root, 0.0, game_thread_ms.unwrap_or(longest_ms))?;

    for counter in &message.count_accumulators {
        let descriptor = registry.stat(counter.stat_id);
        let kind = match descriptor.kind {
            SampleKind::Memory => SampleKind::Memory,
            _ => SampleKind::NumberInt,
        };
        store.add_counter_sample(descriptor.group_id, counter.stat_id, counter.value as f64, kind);
    }
    for counter in &message.float_accumulators {
        let descriptor = registry.stat(counter.stat_id);
        if descriptor.name == SECONDS_PER_CYCLE_STAT {
            if registry.set_seconds_per_cycle(counter.value) {
                debug!("Seconds per cycle set to {} by frame {}", counter.value, message.frame);
            }
            continue;
        }
        store.add_counter_sample(
            descriptor.group_id,
            counter.stat_id,
            counter.value,
            SampleKind::NumberFloat,
        );
    }

    let frame = store.advance_frame(longest_ms);
    let fps = game_thread_ms.map_or(0.0, |ms| 1000.0 / ms);
    debug!(
        "Ingested frame {} as {} ({:.3} ms, {:.1} fps)",
        message.frame, frame, longest_ms, fps
    );

    Ok(IngestedFrame {
        frame,
        source_frame: message.frame,
        duration_ms: longest_ms,
        game_thread_ms,
        fps,
    })
}

/// Append `graph`'s children under `parent`, sequentially from `start_ms`
fn populate_children(
    store: &mut SampleStore,
    registry: &StatMetadataRegistry,
    thread_id: u32,
    graph: &CycleGraph,
    parent: SampleIndex,
    start_ms: f64,
) -> Result<(), StructuralError> {
    let mut cursor_ms = start_ms;
    for child in &graph.children {
        let duration_ms = registry.convert_cycles_to_ms(child.cycles_value as f64);
        if duration_ms <= 0.0 {
            continue;
        }
        let sample = store.add_hierarchical_sample(
            thread_id,
            registry.stat(child.stat_id).group_id,
            child.stat_id,
            cursor_ms,
            duration_ms,
            child.calls_per_frame,
            Some(parent),
        )?;
        populate_children(store, registry, thread_id, child, sample, cursor_ms)?;
        append_self_sample(store, sample)?;
        cursor_ms += duration_ms;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconstruct::messages::{FloatCounter, IntCounter};
    use crate::utils::config::SELF_STAT_ID;

    const GAME: u32 = 100;
    const RENDER: u32 = 200;

    fn registry() -> StatMetadataRegistry {
        let mut registry = StatMetadataRegistry::new();
        registry.set_seconds_per_cycle(1e-3);
        registry.register_thread(GAME, "GameThread", None);
        registry.register_thread(RENDER, "RenderThread", None);
        registry.register_group(4, "Memory");
        registry.register_stat(50, 4, "Pool", SampleKind::Memory, None);
        registry
    }

    fn message() -> FrameDataMessage {
        let mut message = FrameDataMessage {
            frame: 7,
            ..FrameDataMessage::default()
        };
        message.cycle_graphs.insert(
            GAME,
            CycleGraph::new(GAME, 1, 0)
                .with_child(
                    CycleGraph::new(GAME, 10, 10)
                        .with_child(CycleGraph::new(GAME, 11, 3).with_calls(2))
                        .with_child(CycleGraph::new(GAME, 12, 0)),
                )
                .with_child(CycleGraph::new(GAME, 13, 4)),
        );
        message.cycle_graphs.insert(
            RENDER,
            CycleGraph::new(RENDER, 1, 0).with_child(CycleGraph::new(RENDER, 20, 20)),
        );
        message
    }

    #[test]
    fn test_layout_and_self_time() {
        let mut store = SampleStore::new();
        let mut registry = registry();
        let frame = ingest_frame_data(&mut store, &mut registry, &message()).unwrap();

        assert_eq!(frame.game_thread_ms, Some(14.0));
        assert_eq!(frame.duration_ms, 20.0);
        assert!((frame.fps - 1000.0 / 14.0).abs() < 1e-9);

        let root = store.sample(store.frame_root(0).unwrap());
        assert_eq!(root.duration_ms, 14.0);
        assert_eq!(root.children.len(), 2);

        let game_root = store.sample(root.children[0]);
        let tick = store.sample(game_root.children[0]);
        let second = store.sample(game_root.children[1]);
        assert_eq!(second.start_ms, 10.0);

        // Zero-duration child skipped, self time appended
        assert_eq!(tick.children.len(), 2);
        let inner = store.sample(tick.children[0]);
        assert_eq!(inner.counter_value, 2.0);
        let self_sample = store.sample(tick.children[1]);
        assert_eq!(self_sample.stat_id, SELF_STAT_ID);
        assert_eq!(self_sample.duration_ms, 7.0);
    }

    #[test]
    fn test_counters() {
        let mut store = SampleStore::new();
        let mut registry = registry();
        let mut message = message();
        message.count_accumulators.push(IntCounter { stat_id: 50, value: 2048 });
        message.float_accumulators.push(FloatCounter { stat_id: 60, value: 0.5 });
        ingest_frame_data(&mut store, &mut registry, &message).unwrap();

        let samples = store.frame_samples(0);
        let memory = samples.iter().find(|s| s.stat_id == 50).unwrap();
        assert_eq!(memory.kind, SampleKind::Memory);
        let float = samples.iter().find(|s| s.stat_id == 60).unwrap();
        assert_eq!(float.kind, SampleKind::NumberFloat);
    }

    #[test]
    fn test_longest_thread_without_game_thread() {
        let mut store = SampleStore::new();
        let mut registry = registry();
        let mut message = message();
        message.cycle_graphs.remove(&GAME);
        let frame = ingest_frame_data(&mut store, &mut registry, &message).unwrap();
        assert_eq!(frame.fps, 0.0);
        assert_eq!(store.sample(store.frame_root(0).unwrap()).duration_ms, 20.0);
    }

    #[test]
    fn test_empty_frame_is_dropped() {
        let mut store = SampleStore::new();
        let mut registry = registry();
        let err = ingest_frame_data(&mut store, &mut registry, &FrameDataMessage::default()).unwrap_err();
        assert_eq!(err, StructuralError::EmptyFrame);
        assert_eq!(store.num_samples(), 0);
    }
}
