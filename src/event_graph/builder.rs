//! Building event graphs from sealed frames and folding them together.
//!
//! Sibling nodes are matched by name, first match wins; two same-named
//! nodes under different call paths therefore stay separate only when their
//! parents differ.

use super::node::EventGraphNode;
use crate::metadata::StatMetadataRegistry;
use crate::store::{SampleIndex, SampleStore};
use crate::utils::config::{SELF_STAT_ID, THREAD_ROOT_STAT_ID};
use log::debug;
use serde::{Deserialize, Serialize};

/// What an event graph summarizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventGraphKind {
    OneFrame,
    Average,
    Maximum,
}

/// Build the call tree of one sealed frame
///
/// **Public** - main entry point for single-frame graphs
///
/// The root node is the frame root; its children are the thread roots.
/// An unknown frame yields an empty root.
pub fn build_for_frame(
    store: &SampleStore,
    frame: usize,
    registry: &StatMetadataRegistry,
) -> EventGraphNode {
    let Some(root) = store.frame_root(frame) else {
        debug!("No frame root for frame {}, returning empty graph", frame);
        return EventGraphNode::new(THREAD_ROOT_STAT_ID, registry.stat(THREAD_ROOT_STAT_ID).name.as_str());
    };
    let frame_duration_ms = store.frame(frame).map_or(0.0, |record| record.duration_ms);

    let mut node = build_node(store, registry, root, frame_duration_ms, true);
    fixup_times(&mut node);
    node
}

/// Build, fold and post-process the graphs of frames `first..=last`
///
/// Returns None for an empty or out-of-range frame range.
pub fn build_for_range(
    store: &SampleStore,
    registry: &StatMetadataRegistry,
    kind: EventGraphKind,
    first: usize,
    last: usize,
) -> Option<EventGraphNode> {
    if first > last || last >= store.num_frames() {
        return None;
    }

    let mut graph = build_for_frame(store, first, registry);
    match kind {
        EventGraphKind::OneFrame => {}
        EventGraphKind::Average => {
            for frame in first + 1..=last {
                combine_and_add(&mut graph, &build_for_frame(store, frame, registry));
            }
            divide(&mut graph, (last - first + 1) as f64);
        }
        EventGraphKind::Maximum => {
            for frame in first + 1..=last {
                combine_and_find_max(&mut graph, &build_for_frame(store, frame, registry));
            }
        }
    }
    fixup_times(&mut graph);
    Some(graph)
}

/// Sum every numeric field of `other` into the matching nodes of `target`
///
/// Children of `other` without a same-named sibling in `target` are deep-copied.
pub fn combine_and_add(target: &mut EventGraphNode, other: &EventGraphNode) {
    target.add_fields(other);
    merge_children(target, other, combine_and_add);
}

/// Keep the elementwise maximum of every numeric field; `combine(X, X) == X`
pub fn combine_and_find_max(target: &mut EventGraphNode, other: &EventGraphNode) {
    target.max_fields(other);
    merge_children(target, other, combine_and_find_max);
}

/// Divide every numeric field of every node by `n`
///
/// Dividing by zero zeroes the tree.
pub fn divide(target: &mut EventGraphNode, n: f64) {
    let factor = if n == 0.0 {
        debug!("Dividing event graph by zero frames");
        0.0
    } else {
        1.0 / n
    };
    target.visit_mut(&mut |node| node.scale_fields(factor));
}

/// Recompute exclusive times and percentages relative to the root
///
/// A `Self` node's exclusive time is its inclusive time; any other node's is
/// its inclusive time minus that of its non-`Self` children, clamped at zero.
pub fn fixup_times(root: &mut EventGraphNode) {
    let total_ms = root.inclusive_ms;
    fixup_node(root, total_ms);
}

fn fixup_node(node: &mut EventGraphNode, total_ms: f64) {
    node.exclusive_ms = if node.stat_id == SELF_STAT_ID {
        node.inclusive_ms
    } else {
        let children_ms: f64 = node
            .children
            .iter()
            .filter(|child| child.stat_id != SELF_STAT_ID)
            .map(|child| child.inclusive_ms)
            .sum();
        (node.inclusive_ms - children_ms).max(0.0)
    };

    if total_ms > 0.0 {
        node.inclusive_pct = node.inclusive_ms * 100.0 / total_ms;
        node.exclusive_pct = node.exclusive_ms * 100.0 / total_ms;
    } else {
        node.inclusive_pct = 0.0;
        node.exclusive_pct = 0.0;
    }

    for child in &mut node.children {
        fixup_node(child, total_ms);
    }
}

fn merge_children(
    target: &mut EventGraphNode,
    other: &EventGraphNode,
    merge: fn(&mut EventGraphNode, &EventGraphNode),
) {
    for other_child in &other.children {
        match target
            .children
            .iter_mut()
            .find(|child| child.name == other_child.name)
        {
            Some(child) => merge(child, other_child),
            None => target.children.push(other_child.clone()),
        }
    }
}

fn build_node(
    store: &SampleStore,
    registry: &StatMetadataRegistry,
    index: SampleIndex,
    frame_duration_ms: f64,
    is_frame_root: bool,
) -> EventGraphNode {
    let sample = store.sample(index);
    let is_thread_root = !is_frame_root
        && sample
            .parent
            .is_some_and(|parent| store.sample(parent).parent.is_none());

    let name = if is_thread_root && registry.contains_thread(sample.thread_id) {
        registry.thread_description(sample.thread_id).to_string()
    } else {
        registry.stat(sample.stat_id).name.clone()
    };

    let mut node = EventGraphNode::new(sample.stat_id, &name).with_timing(
        sample.start_ms,
        sample.duration_ms,
        sample.counter_value,
    );
    node.group_name = registry.group(sample.group_id).name.clone();
    node.thread_name = registry.thread_description(sample.thread_id).to_string();
    node.frame_duration_ms = frame_duration_ms;
    node.children = sample
        .children
        .iter()
        .map(|&child| build_node(store, registry, child, frame_duration_ms, false))
        .collect();
    node
}
