//! Event graph node: an owned, named call tree.
//!
//! Nodes own their children by value. Nothing points back to a parent;
//! context a child needs (frame total, thread) is passed down on recursion.

use serde::{Deserialize, Serialize};

/// Display flags set by the tree queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFlags {
    pub is_hot_path: bool,
    pub is_filtered: bool,
    pub is_culled: bool,
}

/// One node of an event graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventGraphNode {
    pub stat_id: u32,
    pub name: String,
    pub group_name: String,
    pub thread_name: String,

    pub start_ms: f64,
    pub inclusive_ms: f64,
    pub exclusive_ms: f64,
    pub min_inclusive_ms: f64,
    pub max_inclusive_ms: f64,
    pub avg_inclusive_ms: f64,
    pub num_calls: f64,
    pub avg_num_calls: f64,
    pub frame_duration_ms: f64,
    pub inclusive_pct: f64,
    pub exclusive_pct: f64,

    pub flags: NodeFlags,
    pub children: Vec<EventGraphNode>,
}

impl EventGraphNode {
    /// Node with every numeric field zeroed
    pub fn new(stat_id: u32, name: &str) -> Self {
        Self {
            stat_id,
            name: name.to_string(),
            group_name: String::new(),
            thread_name: String::new(),
            start_ms: 0.0,
            inclusive_ms: 0.0,
            exclusive_ms: 0.0,
            min_inclusive_ms: 0.0,
            max_inclusive_ms: 0.0,
            avg_inclusive_ms: 0.0,
            num_calls: 0.0,
            avg_num_calls: 0.0,
            frame_duration_ms: 0.0,
            inclusive_pct: 0.0,
            exclusive_pct: 0.0,
            flags: NodeFlags::default(),
            children: Vec::new(),
        }
    }

    /// Node for one sample's timing: `inclusive_ms` over `calls` calls
    pub fn with_timing(mut self, start_ms: f64, inclusive_ms: f64, calls: f64) -> Self {
        self.start_ms = start_ms;
        self.inclusive_ms = inclusive_ms;
        self.min_inclusive_ms = inclusive_ms;
        self.max_inclusive_ms = inclusive_ms;
        self.avg_inclusive_ms = inclusive_ms;
        self.num_calls = calls;
        self.avg_num_calls = calls;
        self
    }

    pub fn with_child(mut self, child: EventGraphNode) -> Self {
        self.children.push(child);
        self
    }

    /// Nodes in this subtree, including self
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(EventGraphNode::node_count).sum::<usize>()
    }

    /// First node named `name`, depth-first
    pub fn find(&self, name: &str) -> Option<&EventGraphNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    /// Sort every sibling list by inclusive time, largest first
    pub fn sort_by_inclusive(&mut self) {
        self.children
            .sort_by(|a, b| b.inclusive_ms.total_cmp(&a.inclusive_ms));
        for child in &mut self.children {
            child.sort_by_inclusive();
        }
    }

    /// Flag the chain of heaviest children whose share is at least `threshold_pct`
    ///
    /// # Returns
    /// Number of nodes flagged
    pub fn mark_hot_path(&mut self, threshold_pct: f64) -> usize {
        self.visit_mut(&mut |node| node.flags.is_hot_path = false);

        let mut flagged = 0;
        let mut node = self;
        loop {
            let heaviest = node
                .children
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.inclusive_ms.total_cmp(&b.inclusive_ms))
                .map(|(index, _)| index);
            let Some(index) = heaviest else {
                break;
            };
            if node.children[index].inclusive_pct < threshold_pct {
                break;
            }
            node = &mut node.children[index];
            node.flags.is_hot_path = true;
            flagged += 1;
        }
        flagged
    }

    /// Flag every node that neither matches `needle` nor has a matching descendant
    ///
    /// Matching is a case-insensitive substring test on the name. An empty
    /// needle clears the filter.
    ///
    /// # Returns
    /// true if this node or a descendant matched
    pub fn filter_by_name(&mut self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.filter_lowercase(&needle)
    }

    fn filter_lowercase(&mut self, needle: &str) -> bool {
        let mut matched = needle.is_empty() || self.name.to_lowercase().contains(needle);
        for child in &mut self.children {
            matched |= child.filter_lowercase(needle);
        }
        self.flags.is_filtered = !matched;
        matched
    }

    /// Flag nodes whose inclusive time is below `threshold_ms`
    ///
    /// # Returns
    /// Number of nodes culled
    pub fn cull_below(&mut self, threshold_ms: f64) -> usize {
        let mut culled = 0;
        self.visit_mut(&mut |node| {
            node.flags.is_culled = node.inclusive_ms < threshold_ms;
            if node.flags.is_culled {
                culled += 1;
            }
        });
        culled
    }

    pub fn clear_flags(&mut self) {
        self.visit_mut(&mut |node| node.flags = NodeFlags::default());
    }

    /// Apply `f` to every node, parents before children
    pub fn visit_mut(&mut self, f: &mut impl FnMut(&mut EventGraphNode)) {
        f(self);
        for child in &mut self.children {
            child.visit_mut(f);
        }
    }

    pub(crate) fn add_fields(&mut self, other: &EventGraphNode) {
        self.start_ms += other.start_ms;
        self.inclusive_ms += other.inclusive_ms;
        self.exclusive_ms += other.exclusive_ms;
        self.min_inclusive_ms += other.min_inclusive_ms;
        self.max_inclusive_ms += other.max_inclusive_ms;
        self.avg_inclusive_ms += other.avg_inclusive_ms;
        self.num_calls += other.num_calls;
        self.avg_num_calls += other.avg_num_calls;
        self.frame_duration_ms += other.frame_duration_ms;
        self.inclusive_pct += other.inclusive_pct;
        self.exclusive_pct += other.exclusive_pct;
        self.merge_flags(other.flags);
    }

    pub(crate) fn max_fields(&mut self, other: &EventGraphNode) {
        self.start_ms = self.start_ms.max(other.start_ms);
        self.inclusive_ms = self.inclusive_ms.max(other.inclusive_ms);
        self.exclusive_ms = self.exclusive_ms.max(other.exclusive_ms);
        self.min_inclusive_ms = self.min_inclusive_ms.max(other.min_inclusive_ms);
        self.max_inclusive_ms = self.max_inclusive_ms.max(other.max_inclusive_ms);
        self.avg_inclusive_ms = self.avg_inclusive_ms.max(other.avg_inclusive_ms);
        self.num_calls = self.num_calls.max(other.num_calls);
        self.avg_num_calls = self.avg_num_calls.max(other.avg_num_calls);
        self.frame_duration_ms = self.frame_duration_ms.max(other.frame_duration_ms);
        self.inclusive_pct = self.inclusive_pct.max(other.inclusive_pct);
        self.exclusive_pct = self.exclusive_pct.max(other.exclusive_pct);
        self.merge_flags(other.flags);
    }

    pub(crate) fn scale_fields(&mut self, factor: f64) {
        self.start_ms *= factor;
        self.inclusive_ms *= factor;
        self.exclusive_ms *= factor;
        self.min_inclusive_ms *= factor;
        self.max_inclusive_ms *= factor;
        self.avg_inclusive_ms *= factor;
        self.num_calls *= factor;
        self.avg_num_calls *= factor;
        self.frame_duration_ms *= factor;
        self.inclusive_pct *= factor;
        self.exclusive_pct *= factor;
    }

    fn merge_flags(&mut self, other: NodeFlags) {
        self.flags.is_hot_path |= other.is_hot_path;
        self.flags.is_filtered |= other.is_filtered;
        self.flags.is_culled |= other.is_culled;
    }
}
