//! One profiling session: queued ingestion, aggregation and queries.
//!
//! A single thread owns the session and is its only writer. Each sealed
//! frame's event graph is folded into a running total and a running maximum
//! on two worker threads; both are awaited before the next fold, before the
//! aggregate graphs are read and when the session is dropped.

use super::combine::RunningGraph;
use super::state::CaptureState;
use crate::aggregator::{AggregatedStats, FpsAnalyzer};
use crate::event_graph::{
    build_for_frame, build_for_range, combine_and_add, combine_and_find_max, divide,
    fixup_times, EventGraphKind, EventGraphNode,
};
use crate::graph::{GraphDataSource, TimeAccuracy};
use crate::metadata::{MetadataSnapshot, StatMetadataRegistry};
use crate::reconstruct::{
    ingest_frame_data, FrameDataMessage, RawCaptureReconstructor, RawEvent, RawStatMessage,
};
use crate::store::SampleStore;
use crate::utils::config::{EngineConfig, MAX_UNOBSERVED_EVENTS};
use crate::utils::error::{StateError, StructuralError};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Where a session's frames come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionKind {
    Live,
    CaptureFile,
    RawCaptureFile,
}

impl SessionKind {
    pub fn is_file_backed(self) -> bool {
        self != SessionKind::Live
    }
}

/// Notifications sent on the session channel
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Frame `frame` is sealed and aggregated
    FrameAggregated { session: Uuid, frame: usize },
    /// The registry was replaced by a larger snapshot
    MetadataUpdated { session: Uuid, descriptors: usize },
    /// A frame failed reconstruction and was discarded
    FrameDropped {
        session: Uuid,
        source_frame: i64,
        error: StructuralError,
    },
    /// Every frame of a file-backed session has been processed
    CaptureProcessed {
        session: Uuid,
        frames: usize,
        dropped: usize,
    },
}

/// What one call to `tick` did
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickReport {
    pub processed: usize,
    pub dropped: usize,
    /// Frames still queued
    pub remaining: usize,
    pub elapsed: Duration,
    /// True on the tick that finished a file-backed session
    pub completed: bool,
}

enum QueuedFrame {
    Data(FrameDataMessage),
    Raw {
        source_frame: i64,
        messages: Vec<RawStatMessage>,
    },
}

/// A capture session and everything derived from it
pub struct ProfilerSession {
    id: Uuid,
    kind: SessionKind,
    created_at: DateTime<Utc>,
    config: EngineConfig,

    registry: StatMetadataRegistry,
    store: SampleStore,
    reconstructor: RawCaptureReconstructor,
    stats: AggregatedStats,
    fps: FpsAnalyzer,
    state: CaptureState,

    queue: VecDeque<QueuedFrame>,
    frames_dropped: usize,
    all_data_received: bool,
    completed: bool,

    current_graph: Option<Arc<EventGraphNode>>,
    total_graph: RunningGraph,
    maximum_graph: RunningGraph,
    frames_combined: usize,

    events: Sender<SessionEvent>,
    receiver: Option<Receiver<SessionEvent>>,
    /// Events buffered before anyone took the receiver
    unobserved_events: usize,
}

impl ProfilerSession {
    /// Create an idle session
    ///
    /// **Public** - file-backed sessions are usually created by
    /// `capture::open_capture_session`
    pub fn new(kind: SessionKind, config: EngineConfig) -> Self {
        let (events, receiver) = mpsc::channel();
        let session = Self {
            id: Uuid::new_v4(),
            kind,
            created_at: Utc::now(),
            fps: FpsAnalyzer::from_config(&config.fps_histogram),
            config,
            registry: StatMetadataRegistry::new(),
            store: SampleStore::new(),
            reconstructor: RawCaptureReconstructor::new(),
            stats: AggregatedStats::new(),
            state: CaptureState::new(kind.is_file_backed()),
            queue: VecDeque::new(),
            frames_dropped: 0,
            all_data_received: false,
            completed: false,
            current_graph: None,
            total_graph: RunningGraph::new("total", combine_and_add),
            maximum_graph: RunningGraph::new("maximum", combine_and_find_max),
            frames_combined: 0,
            events,
            receiver: Some(receiver),
            unobserved_events: 0,
        };
        info!("Created {:?} session {}", kind, session.id);
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &StatMetadataRegistry {
        &self.registry
    }

    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    pub fn stats(&self) -> &AggregatedStats {
        &self.stats
    }

    pub fn fps(&self) -> &FpsAnalyzer {
        &self.fps
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn queued_frames(&self) -> usize {
        self.queue.len()
    }

    pub fn frames_dropped(&self) -> usize {
        self.frames_dropped
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Receiver for session notifications; available once
    ///
    /// Until it is taken, only the first `MAX_UNOBSERVED_EVENTS` events are
    /// buffered; later ones are discarded.
    pub fn take_event_receiver(&mut self) -> Option<Receiver<SessionEvent>> {
        self.receiver.take()
    }

    pub fn start_capture(&mut self) -> Result<(), StateError> {
        self.state.start_capture()
    }

    pub fn start_preview(&mut self) -> Result<(), StateError> {
        self.state.start_preview()
    }

    pub fn stop(&mut self) -> Result<(), StateError> {
        self.state.stop()
    }

    pub fn set_data_capture(&mut self, enabled: bool) {
        self.state.set_data_capture(enabled);
    }

    pub fn set_data_preview(&mut self, enabled: bool) {
        self.state.set_data_preview(enabled);
    }

    /// Replace the registry when `snapshot` is larger than the current one
    ///
    /// # Returns
    /// true if the registry was replaced
    pub fn update_metadata(&mut self, snapshot: &MetadataSnapshot) -> bool {
        if !self.registry.replace_if_larger(snapshot) {
            return false;
        }
        self.notify(SessionEvent::MetadataUpdated {
            session: self.id,
            descriptors: snapshot.size(),
        });
        true
    }

    /// Queue a decoded cycle-graph frame
    pub fn enqueue_frame(&mut self, message: FrameDataMessage) {
        self.queue.push_back(QueuedFrame::Data(message));
    }

    /// Queue the raw messages of one frame
    pub fn enqueue_raw_frame(&mut self, source_frame: i64, messages: Vec<RawStatMessage>) {
        self.queue.push_back(QueuedFrame::Raw {
            source_frame,
            messages,
        });
    }

    /// Split a raw stream at its frame boundaries and queue every complete frame
    ///
    /// # Returns
    /// Number of trailing messages ignored
    pub fn enqueue_raw_stream(&mut self, messages: Vec<RawStatMessage>) -> usize {
        let mut frame = Vec::new();
        for msg in messages {
            if let RawEvent::Advance { frame: source_frame } = msg.event {
                self.enqueue_raw_frame(source_frame, std::mem::take(&mut frame));
            } else {
                frame.push(msg);
            }
        }
        if !frame.is_empty() {
            warn!(
                "Ignoring {} message(s) after the last frame boundary",
                frame.len()
            );
        }
        frame.len()
    }

    /// No more frames will be queued; the session completes once drained
    pub fn mark_all_data_received(&mut self) {
        self.all_data_received = true;
    }

    /// Process queued frames in arrival order within a wall-clock budget
    ///
    /// **Public** - drive this from the owning thread's loop
    ///
    /// At least one frame is processed per call (when any is queued and the
    /// session is ingesting), then processing stops when either the budget
    /// or the per-tick frame cap is used up.
    pub fn tick(&mut self, budget: Duration) -> TickReport {
        let started = Instant::now();
        let mut report = TickReport::default();

        if self.state.should_ingest() {
            let cap = if self.kind.is_file_backed() {
                self.config.file_frames_per_tick
            } else {
                self.config.live_frames_per_tick
            };

            while let Some(item) = self.queue.pop_front() {
                if self.process(item) {
                    report.processed += 1;
                } else {
                    report.dropped += 1;
                }
                if report.processed + report.dropped >= cap || started.elapsed() >= budget {
                    break;
                }
            }
        }

        report.remaining = self.queue.len();
        if self.all_data_received && self.queue.is_empty() && !self.completed {
            self.finish();
            report.completed = true;
        }
        report.elapsed = started.elapsed();
        report
    }

    /// Tick with the configured budget until the queue is drained
    ///
    /// # Returns
    /// Number of ticks taken
    pub fn drain(&mut self) -> usize {
        let budget = self.config.tick_budget();
        let mut ticks = 0;
        loop {
            let report = self.tick(budget);
            ticks += 1;
            if report.remaining == 0 || !self.state.should_ingest() {
                return ticks;
            }
        }
    }

    /// Graph of the most recently aggregated frame
    pub fn current_event_graph(&self) -> Option<&EventGraphNode> {
        self.current_graph.as_deref()
    }

    /// Average of every aggregated frame's graph
    pub fn average_event_graph(&mut self) -> Option<EventGraphNode> {
        self.join_combine();
        let mut graph = self.total_graph.graph()?.clone();
        divide(&mut graph, self.frames_combined as f64);
        fixup_times(&mut graph);
        Some(graph)
    }

    /// Elementwise maximum of every aggregated frame's graph
    pub fn maximum_event_graph(&mut self) -> Option<EventGraphNode> {
        self.join_combine();
        let mut graph = self.maximum_graph.graph()?.clone();
        fixup_times(&mut graph);
        Some(graph)
    }

    /// Graph over a frame range, rebuilt from the store
    pub fn event_graph_for_range(
        &self,
        kind: EventGraphKind,
        first: usize,
        last: usize,
    ) -> Option<EventGraphNode> {
        build_for_range(&self.store, &self.registry, kind, first, last)
    }

    /// Time-series view of `stat_id` bound to this session's store
    pub fn graph_data_source(&self, stat_id: u32) -> GraphDataSource<'_> {
        let stat = self.registry.stat(stat_id);
        let accuracy = TimeAccuracy::from_buckets_per_second(self.config.time_accuracy)
            .unwrap_or_default();
        GraphDataSource::new(&self.store, stat_id, stat.group_id, stat.kind).with_accuracy(accuracy)
    }

    /// Ingest one queued frame; false when it was dropped
    fn process(&mut self, item: QueuedFrame) -> bool {
        let result = match item {
            QueuedFrame::Data(message) => {
                ingest_frame_data(&mut self.store, &mut self.registry, &message)
                    .map(|frame| (frame.frame, frame.fps))
                    .map_err(|error| (message.frame, error))
            }
            QueuedFrame::Raw {
                source_frame,
                messages,
            } => self
                .reconstructor
                .reconstruct_frame(&mut self.store, &mut self.registry, &messages, source_frame)
                .map(|frame| (frame.frame, 1000.0 / frame.duration_ms))
                .map_err(|error| (source_frame, error)),
        };

        match result {
            Ok((frame, fps)) => {
                self.fps.add_sample(fps);
                self.stats.accumulate_frame(&self.store, frame, &self.registry);
                let graph = build_for_frame(&self.store, frame, &self.registry);
                self.combine_frame_graph(graph);
                if self.state.should_notify_frames() {
                    self.notify(SessionEvent::FrameAggregated {
                        session: self.id,
                        frame,
                    });
                }
                true
            }
            Err((source_frame, error)) => {
                self.frames_dropped += 1;
                self.notify(SessionEvent::FrameDropped {
                    session: self.id,
                    source_frame,
                    error,
                });
                false
            }
        }
    }

    /// Fold a frame graph into the running total and maximum on their workers
    fn combine_frame_graph(&mut self, graph: EventGraphNode) {
        self.join_combine();
        let graph = Arc::new(graph);
        self.current_graph = Some(Arc::clone(&graph));
        self.frames_combined += 1;
        self.total_graph.fold(&graph);
        self.maximum_graph.fold(&graph);
    }

    /// Barrier for the outstanding combine tasks
    fn join_combine(&mut self) {
        self.total_graph.wait();
        self.maximum_graph.wait();
    }

    fn finish(&mut self) {
        self.join_combine();
        self.completed = true;
        if let Err(err) = self.state.stop() {
            debug!("Session {} already stopped: {}", self.id, err);
        }
        info!(
            "Session {} processed: {} frames, {} dropped",
            self.id,
            self.store.num_frames(),
            self.frames_dropped
        );
        self.notify(SessionEvent::CaptureProcessed {
            session: self.id,
            frames: self.store.num_frames(),
            dropped: self.frames_dropped,
        });
    }

    fn notify(&mut self, event: SessionEvent) {
        if self.receiver.is_some() {
            if self.unobserved_events >= MAX_UNOBSERVED_EVENTS {
                if self.unobserved_events == MAX_UNOBSERVED_EVENTS {
                    debug!(
                        "Session {} has no event listener, discarding further events",
                        self.id
                    );
                    self.unobserved_events += 1;
                }
                return;
            }
            self.unobserved_events += 1;
        }
        if self.events.send(event).is_err() {
            debug!("Session {} has no event listener", self.id);
        }
    }
}

impl Drop for ProfilerSession {
    fn drop(&mut self) {
        self.join_combine();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconstruct::CycleGraph;
    use crate::session::state::SessionState;

    const GAME: u32 = 100;

    fn frame(number: i64, tick_cycles: u64) -> FrameDataMessage {
        let mut message = FrameDataMessage {
            frame: number,
            ..FrameDataMessage::default()
        };
        message.cycle_graphs.insert(
            GAME,
            CycleGraph::new(GAME, 0, 0).with_child(CycleGraph::new(GAME, 10, tick_cycles)),
        );
        message
    }

    fn live_session() -> ProfilerSession {
        let mut session = ProfilerSession::new(SessionKind::Live, EngineConfig::default());
        session.registry.set_seconds_per_cycle(1e-3);
        session.registry.register_thread(GAME, "GameThread", None);
        session
            .registry
            .register_stat(10, 0, "Tick", crate::store::SampleKind::HierarchicalTime, None);
        session.start_capture().unwrap();
        session
    }

    #[test]
    fn test_idle_session_does_not_ingest() {
        let mut session = ProfilerSession::new(SessionKind::Live, EngineConfig::default());
        session.enqueue_frame(frame(0, 10));
        let report = session.tick(Duration::from_secs(1));
        assert_eq!(report.processed, 0);
        assert_eq!(report.remaining, 1);
    }

    #[test]
    fn test_live_tick_respects_frame_cap() {
        let mut session = live_session();
        for n in 0..5 {
            session.enqueue_frame(frame(n, 10));
        }
        let report = session.tick(Duration::from_secs(1));
        assert_eq!(report.processed, 2);
        assert_eq!(report.remaining, 3);
    }

    #[test]
    fn test_zero_budget_processes_one_frame() {
        let mut session = ProfilerSession::new(SessionKind::CaptureFile, EngineConfig::default());
        session.registry.set_seconds_per_cycle(1e-3);
        session.start_capture().unwrap();
        session.enqueue_frame(frame(0, 10));
        session.enqueue_frame(frame(1, 10));
        let report = session.tick(Duration::ZERO);
        assert_eq!(report.processed, 1);
    }

    #[test]
    fn test_dual_combine_results() {
        let mut session = live_session();
        for (n, cycles) in [(0, 10), (1, 20), (2, 30)] {
            session.enqueue_frame(frame(n, cycles));
        }
        session.drain();

        let average = session.average_event_graph().unwrap();
        assert_eq!(average.find("Tick").unwrap().inclusive_ms, 20.0);
        assert_eq!(average.inclusive_pct, 100.0);
        let maximum = session.maximum_event_graph().unwrap();
        assert_eq!(maximum.inclusive_ms, 30.0);
        assert_eq!(session.current_event_graph().unwrap().inclusive_ms, 30.0);
    }

    #[test]
    fn test_unobserved_events_are_bounded() {
        let mut session = live_session();
        let frames = MAX_UNOBSERVED_EVENTS + 10;
        for n in 0..frames {
            session.enqueue_frame(frame(n as i64, 10));
        }
        session.drain();
        assert_eq!(session.store().num_frames(), frames);

        let receiver = session.take_event_receiver().unwrap();
        assert_eq!(receiver.try_iter().count(), MAX_UNOBSERVED_EVENTS);

        // Once taken, every event is delivered.
        session.enqueue_frame(frame(frames as i64, 10));
        session.drain();
        assert_eq!(receiver.try_iter().count(), 1);
    }

    #[test]
    fn test_events_and_completion() {
        let mut session = live_session();
        let receiver = session.take_event_receiver().unwrap();
        assert!(session.take_event_receiver().is_none());

        session.enqueue_frame(frame(0, 10));
        session.enqueue_frame(FrameDataMessage {
            frame: 1,
            ..FrameDataMessage::default()
        });
        session.mark_all_data_received();
        session.drain();
        assert!(session.is_completed());
        assert!(!session.tick(Duration::from_secs(1)).completed);

        let events: Vec<SessionEvent> = receiver.try_iter().collect();
        assert!(events.contains(&SessionEvent::FrameAggregated {
            session: session.id(),
            frame: 0
        }));
        assert!(events.contains(&SessionEvent::FrameDropped {
            session: session.id(),
            source_frame: 1,
            error: StructuralError::EmptyFrame,
        }));
        assert_eq!(
            events.last(),
            Some(&SessionEvent::CaptureProcessed {
                session: session.id(),
                frames: 1,
                dropped: 1
            })
        );
        assert_eq!(session.state().state(), SessionState::Stopped);
    }
}
