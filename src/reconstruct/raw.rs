//! Hierarchy reconstruction from a flat scope-start/scope-end stream.
//!
//! Each thread keeps an explicit stack of open scopes, seeded with that
//! thread's root sample, which hangs off one synthetic per-frame root.
//! Durations are patched when the matching scope end arrives, then every
//! scope with children gets a synthesized `Self` child.

use super::messages::{RawEvent, RawStatMessage, StatRef};
use super::self_time::append_self_sample;
use crate::metadata::StatMetadataRegistry;
use crate::store::{SampleIndex, SampleKind, SampleStore};
use crate::utils::config::{NO_GROUP_ID, SECONDS_PER_CYCLE_STAT, STAT_NAME_PREFIX, THREAD_ROOT_STAT_ID};
use crate::utils::error::StructuralError;
use log::{debug, warn};
use std::collections::BTreeMap;

/// Outcome of one successfully reconstructed frame
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructedFrame {
    /// Index of the sealed frame in the store
    pub frame: usize,
    /// Frame number reported by the source
    pub source_frame: i64,
    /// Game thread span
    pub duration_ms: f64,
    pub num_samples: usize,
    pub num_threads: usize,
}

/// A frame that failed reconstruction and was discarded
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedFrame {
    pub source_frame: i64,
    pub error: StructuralError,
}

/// Result of ingesting a whole raw stream
#[derive(Debug, Clone, Default)]
pub struct StreamSummary {
    pub frames: Vec<ReconstructedFrame>,
    pub dropped: Vec<DroppedFrame>,
    /// Messages after the last frame boundary
    pub ignored_trailing: usize,
}

struct OpenScope {
    sample: SampleIndex,
    start_cycles: u64,
}

struct ThreadState {
    root: SampleIndex,
    stack: Vec<OpenScope>,
    first_start_ms: Option<f64>,
    last_end_ms: f64,
}

/// Rebuilds per-frame call trees from raw event streams
#[derive(Debug, Default)]
pub struct RawCaptureReconstructor {
    frames_reconstructed: usize,
    frames_dropped: usize,
}

impl RawCaptureReconstructor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_reconstructed(&self) -> usize {
        self.frames_reconstructed
    }

    pub fn frames_dropped(&self) -> usize {
        self.frames_dropped
    }

    /// Split a raw stream at its `Advance` messages and reconstruct every frame
    ///
    /// **Public** - main entry point for raw captures
    ///
    /// Frames with structural errors are dropped and ingestion resumes at the
    /// next boundary. Messages after the last `Advance` are ignored.
    pub fn ingest_stream(
        &mut self,
        store: &mut SampleStore,
        registry: &mut StatMetadataRegistry,
        messages: &[RawStatMessage],
    ) -> StreamSummary {
        let mut summary = StreamSummary::default();
        let mut frame_start = 0;

        for (i, msg) in messages.iter().enumerate() {
            let RawEvent::Advance { frame } = msg.event else {
                continue;
            };
            match self.reconstruct_frame(store, registry, &messages[frame_start..i], frame) {
                Ok(reconstructed) => summary.frames.push(reconstructed),
                Err(error) => summary.dropped.push(DroppedFrame {
                    source_frame: frame,
                    error,
                }),
            }
            frame_start = i + 1;
        }

        summary.ignored_trailing = messages.len() - frame_start;
        if summary.ignored_trailing > 0 {
            warn!(
                "Ignoring {} message(s) after the last frame boundary",
                summary.ignored_trailing
            );
        }
        summary
    }

    /// Reconstruct one frame from its messages and seal it
    ///
    /// `messages` holds everything between two frame boundaries; `Advance`
    /// messages inside it are ignored.
    ///
    /// # Errors
    /// Any `StructuralError`. The partially built frame is discarded from the
    /// store before returning, so sealed frames are never affected.
    pub fn reconstruct_frame(
        &mut self,
        store: &mut SampleStore,
        registry: &mut StatMetadataRegistry,
        messages: &[RawStatMessage],
        source_frame: i64,
    ) -> Result<ReconstructedFrame, StructuralError> {
        match build_frame(store, registry, messages, source_frame) {
            Ok(frame) => {
                self.frames_reconstructed += 1;
                debug!(
                    "Reconstructed frame {} ({} samples, {} threads)",
                    source_frame, frame.num_samples, frame.num_threads
                );
                Ok(frame)
            }
            Err(err) => {
                let discarded = store.discard_pending_frame();
                self.frames_dropped += 1;
                warn!(
                    "Dropping frame {}: {} ({} samples discarded)",
                    source_frame, err, discarded
                );
                Err(err)
            }
        }
    }
}

/// Signed difference of two 32-bit cycle stamps, tolerant of counter wrap
pub fn cycle_delta(start: u64, end: u64) -> i32 {
    (end as u32).wrapping_sub(start as u32) as i32
}

fn build_frame(
    store: &mut SampleStore,
    registry: &mut StatMetadataRegistry,
    messages: &[RawStatMessage],
    source_frame: i64,
) -> Result<ReconstructedFrame, StructuralError> {
    let base_cycles = frame_base_cycles(messages, registry);
    let frame_root =
        store.add_hierarchical_sample(0, NO_GROUP_ID, THREAD_ROOT_STAT_ID, 0.0, 0.0, 1, None)?;

    let mut threads: BTreeMap<u32, ThreadState> = BTreeMap::new();
    let mut scopes = Vec::new();

    for msg in messages {
        let thread_id = msg.thread_id;
        match &msg.event {
            RawEvent::ScopeStart { stat, cycles } => {
                if !threads.contains_key(&thread_id) {
                    let root = add_thread_root(store, registry, thread_id, frame_root)?;
                    threads.insert(
                        thread_id,
                        ThreadState {
                            root,
                            stack: Vec::new(),
                            first_start_ms: None,
                            last_end_ms: 0.0,
                        },
                    );
                }
                let Some(state) = threads.get_mut(&thread_id) else {
                    continue;
                };

                let stat_id = resolve_stat(registry, stat, SampleKind::HierarchicalTime);
                let group_id = registry.stat(stat_id).group_id;
                let start_ms =
                    registry.convert_cycles_to_ms(cycle_delta(base_cycles, *cycles) as f64);
                let parent = state.stack.last().map_or(state.root, |open| open.sample);

                let sample = store.add_hierarchical_sample(
                    thread_id,
                    group_id,
                    stat_id,
                    start_ms,
                    0.0,
                    1,
                    Some(parent),
                )?;
                state.stack.push(OpenScope {
                    sample,
                    start_cycles: *cycles,
                });
                scopes.push(sample);
            }
            RawEvent::ScopeEnd { cycles } => {
                let state = threads
                    .get_mut(&thread_id)
                    .ok_or(StructuralError::UnbalancedScopeEnd { thread_id })?;
                let open = state
                    .stack
                    .pop()
                    .ok_or(StructuralError::UnbalancedScopeEnd { thread_id })?;

                let delta = cycle_delta(open.start_cycles, *cycles);
                if delta < 0 {
                    return Err(StructuralError::NegativeDuration {
                        thread_id,
                        cycles: delta as i64,
                    });
                }
                let duration_ms = registry.convert_cycles_to_ms(delta as f64);
                store.set_duration(open.sample, duration_ms)?;

                if state.stack.is_empty() {
                    let start_ms = store.sample(open.sample).start_ms;
                    state.first_start_ms.get_or_insert(start_ms);
                    state.last_end_ms = start_ms + duration_ms;
                }
            }
            RawEvent::Counter { stat, value } => {
                if is_seconds_per_cycle(registry, stat) {
                    registry.set_seconds_per_cycle(*value);
                    continue;
                }
                let stat_id = resolve_stat(registry, stat, SampleKind::NumberFloat);
                let descriptor = registry.stat(stat_id);
                let kind = match descriptor.kind {
                    SampleKind::HierarchicalTime | SampleKind::Invalid => SampleKind::NumberFloat,
                    kind => kind,
                };
                store.add_counter_sample(descriptor.group_id, stat_id, *value, kind);
            }
            RawEvent::Advance { .. } => {}
        }
    }

    for (&thread_id, state) in &threads {
        if !state.stack.is_empty() {
            return Err(StructuralError::UnclosedScope {
                thread_id,
                open: state.stack.len(),
            });
        }
    }

    let mut game_span = None;
    for (&thread_id, state) in &threads {
        let Some(start_ms) = state.first_start_ms else {
            continue;
        };
        store.set_start_and_end(state.root, start_ms, state.last_end_ms)?;
        if game_span.is_none() && registry.is_game_thread(thread_id) {
            game_span = Some((start_ms, state.last_end_ms));
        }
    }

    let (start_ms, end_ms) = game_span
        .filter(|(start, end)| end > start)
        .ok_or(StructuralError::MissingGameThread)?;
    store.set_start_and_end(frame_root, start_ms, end_ms)?;

    for scope in scopes {
        append_self_sample(store, scope)?;
    }

    let num_samples = store.pending_range().len();
    let frame = store.advance_frame(end_ms - start_ms);
    Ok(ReconstructedFrame {
        frame,
        source_frame,
        duration_ms: end_ms - start_ms,
        num_samples,
        num_threads: threads.len(),
    })
}

/// Cycle stamp that maps to 0 ms: the first game-thread scope start, else the
/// first scope start of any thread
fn frame_base_cycles(messages: &[RawStatMessage], registry: &StatMetadataRegistry) -> u64 {
    let scope_start = |msg: &RawStatMessage| match msg.event {
        RawEvent::ScopeStart { cycles, .. } => Some(cycles),
        _ => None,
    };
    messages
        .iter()
        .filter(|msg| registry.is_game_thread(msg.thread_id))
        .find_map(scope_start)
        .or_else(|| messages.iter().find_map(scope_start))
        .unwrap_or(0)
}

fn add_thread_root(
    store: &mut SampleStore,
    registry: &mut StatMetadataRegistry,
    thread_id: u32,
    frame_root: SampleIndex,
) -> Result<SampleIndex, StructuralError> {
    let stat_id = registry.thread_root_stat(thread_id);
    let group_id = registry.stat(stat_id).group_id;
    store.add_hierarchical_sample(thread_id, group_id, stat_id, 0.0, 0.0, 1, Some(frame_root))
}

fn resolve_stat(registry: &mut StatMetadataRegistry, stat: &StatRef, kind: SampleKind) -> u32 {
    match stat {
        StatRef::Id(id) => *id,
        StatRef::Name(name) => registry.intern_stat(name, kind),
    }
}

fn is_seconds_per_cycle(registry: &StatMetadataRegistry, stat: &StatRef) -> bool {
    match stat {
        StatRef::Id(id) => registry.contains_stat(*id) && registry.stat(*id).name == SECONDS_PER_CYCLE_STAT,
        StatRef::Name(name) => {
            name.strip_prefix(STAT_NAME_PREFIX).unwrap_or(name) == SECONDS_PER_CYCLE_STAT
        }
    }
}
