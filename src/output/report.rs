//! Serializable session report.
//!
//! Collects what a processed session knows (frame counts, FPS histogram,
//! per-stat aggregates and one event graph) into a single JSON document.

use crate::aggregator::{AggregatedStat, FpsSummary};
use crate::event_graph::{EventGraphKind, EventGraphNode};
use crate::session::{ProfilerSession, SessionKind};
use crate::store::SampleKind;
use crate::utils::config::SCHEMA_VERSION;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What to put in a report
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub graph_kind: EventGraphKind,
    /// Inclusive frame range; the whole session when None
    pub frame_range: Option<(usize, usize)>,
    pub hot_path_threshold_pct: f64,
    /// Number of stats listed, by average descending
    pub top_stats: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            graph_kind: EventGraphKind::Average,
            frame_range: None,
            hot_path_threshold_pct: 20.0,
            top_stats: 50,
        }
    }
}

/// Aggregates of one stat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatSummary {
    pub stat_id: u32,
    pub name: String,
    pub group: String,
    pub kind: SampleKind,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub avg_calls: f64,
    pub frames_with_call_pct: f64,
}

impl From<&AggregatedStat> for StatSummary {
    fn from(stat: &AggregatedStat) -> Self {
        Self {
            stat_id: stat.stat_id,
            name: stat.name.clone(),
            group: stat.group_name.clone(),
            kind: stat.kind,
            avg: stat.avg(),
            min: stat.min(),
            max: stat.max(),
            avg_calls: stat.avg_num_calls(),
            frames_with_call_pct: stat.frames_with_call_pct(),
        }
    }
}

/// The event graph included in a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphReport {
    pub kind: EventGraphKind,
    pub first_frame: usize,
    pub last_frame: usize,
    pub root: EventGraphNode,
}

/// Complete report for one session
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub version: String,
    pub session_id: Uuid,
    pub kind: SessionKind,
    pub created_at: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    pub frames: usize,
    pub dropped_frames: usize,
    pub total_time_ms: f64,
    pub fps: FpsSummary,
    pub stats: Vec<StatSummary>,
    pub event_graph: Option<GraphReport>,
}

/// Build a report from a session
///
/// **Public** - main entry point for reporting
///
/// Takes the session mutably because reading the running aggregate graphs
/// waits for outstanding combine tasks.
pub fn build_report(session: &mut ProfilerSession, options: &ReportOptions) -> SessionReport {
    let frames = session.store().num_frames();
    let event_graph = build_graph(session, options, frames);

    let stats = session
        .stats()
        .top_by_average(options.top_stats)
        .into_iter()
        .map(StatSummary::from)
        .collect();

    SessionReport {
        version: SCHEMA_VERSION.to_string(),
        session_id: session.id(),
        kind: session.kind(),
        created_at: session.created_at(),
        generated_at: Utc::now(),
        frames,
        dropped_frames: session.frames_dropped(),
        total_time_ms: session.store().total_elapsed_ms(),
        fps: session.fps().summary(),
        stats,
        event_graph,
    }
}

fn build_graph(
    session: &mut ProfilerSession,
    options: &ReportOptions,
    frames: usize,
) -> Option<GraphReport> {
    if frames == 0 {
        debug!("No frames, report has no event graph");
        return None;
    }

    let (first, last, root) = match (options.frame_range, options.graph_kind) {
        (Some((first, last)), kind) => (first, last, session.event_graph_for_range(kind, first, last)?),
        (None, EventGraphKind::Average) => (0, frames - 1, session.average_event_graph()?),
        (None, EventGraphKind::Maximum) => (0, frames - 1, session.maximum_event_graph()?),
        (None, EventGraphKind::OneFrame) => {
            (frames - 1, frames - 1, session.current_event_graph()?.clone())
        }
    };

    let mut root = root;
    root.sort_by_inclusive();
    root.mark_hot_path(options.hot_path_threshold_pct);

    Some(GraphReport {
        kind: options.graph_kind,
        first_frame: first,
        last_frame: last,
        root,
    })
}
