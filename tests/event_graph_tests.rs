use frametrace::event_graph::{
    combine_and_add, combine_and_find_max, divide, fixup_times, EventGraphNode,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn node(n: u32, inclusive_ms: u32) -> EventGraphNode {
    EventGraphNode::new(20 + n, &format!("Scope{}", n)).with_timing(0.0, inclusive_ms as f64, 1.0)
}

/// Random trees with unique sibling names and integral timings
fn tree() -> impl Strategy<Value = EventGraphNode> {
    let leaf = (0u32..4, 0u32..100).prop_map(|(n, ms)| node(n, ms));
    leaf.prop_recursive(3, 32, 4, |inner| {
        (0u32..4, 0u32..100, prop::collection::vec(inner, 0..4)).prop_map(|(n, ms, children)| {
            let mut parent = node(n, ms);
            for child in children {
                if !parent.children.iter().any(|c| c.name == child.name) {
                    parent.children.push(child);
                }
            }
            parent
        })
    })
}

fn assert_close(a: &EventGraphNode, b: &EventGraphNode) {
    assert_eq!(a.name, b.name);
    assert!((a.inclusive_ms - b.inclusive_ms).abs() < 1e-9, "{} vs {}", a.inclusive_ms, b.inclusive_ms);
    assert!((a.num_calls - b.num_calls).abs() < 1e-9);
    assert_eq!(a.children.len(), b.children.len());
    for (x, y) in a.children.iter().zip(&b.children) {
        assert_close(x, y);
    }
}

proptest! {
    #[test]
    fn prop_combine_add_is_associative(a in tree(), b in tree(), c in tree()) {
        let mut left = a.clone();
        combine_and_add(&mut left, &b);
        combine_and_add(&mut left, &c);

        let mut right_tail = b.clone();
        combine_and_add(&mut right_tail, &c);
        let mut right = a.clone();
        combine_and_add(&mut right, &right_tail);

        prop_assert_eq!(left, right);
    }

    #[test]
    fn prop_combine_max_is_idempotent(a in tree()) {
        let mut combined = a.clone();
        combine_and_find_max(&mut combined, &a);
        prop_assert_eq!(combined, a);
    }

    #[test]
    fn prop_average_of_copies_is_the_original(a in tree(), copies in 1usize..6) {
        let mut total = a.clone();
        for _ in 1..copies {
            combine_and_add(&mut total, &a);
        }
        divide(&mut total, copies as f64);
        assert_close(&total, &a);
    }
}

#[test]
fn test_fixup_recomputes_exclusive_and_percentages() {
    let mut root = EventGraphNode::new(1, "ThreadRoot")
        .with_timing(0.0, 20.0, 1.0)
        .with_child(
            EventGraphNode::new(10, "Tick")
                .with_timing(0.0, 10.0, 1.0)
                .with_child(EventGraphNode::new(11, "Physics").with_timing(0.0, 4.0, 1.0))
                .with_child(EventGraphNode::new(0, "Self").with_timing(4.0, 6.0, 1.0)),
        );
    fixup_times(&mut root);

    assert_eq!(root.exclusive_ms, 10.0);
    assert_eq!(root.inclusive_pct, 100.0);
    let tick = root.find("Tick").unwrap();
    assert_eq!(tick.exclusive_ms, 6.0);
    assert_eq!(tick.inclusive_pct, 50.0);
    assert_eq!(tick.exclusive_pct, 30.0);
    assert_eq!(root.find("Self").unwrap().exclusive_ms, 6.0);
}

#[test]
fn test_tree_queries() {
    let mut root = EventGraphNode::new(1, "ThreadRoot")
        .with_timing(0.0, 20.0, 1.0)
        .with_child(EventGraphNode::new(12, "Audio").with_timing(0.0, 2.0, 1.0))
        .with_child(
            EventGraphNode::new(10, "Tick")
                .with_timing(0.0, 18.0, 1.0)
                .with_child(EventGraphNode::new(11, "Physics").with_timing(0.0, 12.0, 1.0)),
        );
    fixup_times(&mut root);
    root.sort_by_inclusive();
    assert_eq!(root.children[0].name, "Tick");
    assert_eq!(root.node_count(), 4);

    assert_eq!(root.mark_hot_path(50.0), 2);
    assert!(root.find("Tick").unwrap().flags.is_hot_path);
    assert!(root.find("Physics").unwrap().flags.is_hot_path);
    assert!(!root.find("Audio").unwrap().flags.is_hot_path);

    assert!(root.filter_by_name("PHYS"));
    assert!(!root.find("Tick").unwrap().flags.is_filtered);
    assert!(root.find("Audio").unwrap().flags.is_filtered);

    assert_eq!(root.cull_below(5.0), 1);
    assert!(root.find("Audio").unwrap().flags.is_culled);

    root.clear_flags();
    assert!(!root.find("Physics").unwrap().flags.is_hot_path);
}
