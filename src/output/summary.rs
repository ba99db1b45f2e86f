//! Plain-text session summary for the terminal.

use super::report::SessionReport;
use crate::event_graph::EventGraphNode;

const NAME_WIDTH: usize = 40;

/// Render a report as a text summary
///
/// **Public** - used by the `load --summary` command
///
/// # Arguments
/// * `report` - Report to render
/// * `max_stats` - Number of stat rows to show
pub fn generate_text_summary(report: &SessionReport, max_stats: usize) -> String {
    let mut lines = Vec::new();

    lines.push(format!(
        "  Frames: {} ({} dropped), {:.1} s captured",
        report.frames,
        report.dropped_frames,
        report.total_time_ms / 1000.0
    ));
    lines.push(format!(
        "  FPS: avg {:.1}, min {:.1}, max {:.1} | >=20: {:.1}%  >=30: {:.1}%  >=60: {:.1}%",
        report.fps.avg_fps,
        report.fps.min_fps,
        report.fps.max_fps,
        report.fps.pct_at_least_20,
        report.fps.pct_at_least_30,
        report.fps.pct_at_least_60
    ));
    lines.push(String::new());

    lines.push("  TOP STATS".to_string());
    lines.push(format!("  ┏{}┳{}┳{}┳{}┓", "━".repeat(NAME_WIDTH + 2), "━".repeat(14), "━".repeat(14), "━".repeat(9)));
    lines.push(format!(
        "  ┃ {:<width$} ┃ {:^12} ┃ {:^12} ┃ {:^7} ┃",
        "Stat",
        "AVG",
        "MAX",
        "CALLS",
        width = NAME_WIDTH
    ));
    lines.push(format!("  ┣{}╋{}╋{}╋{}┫", "━".repeat(NAME_WIDTH + 2), "━".repeat(14), "━".repeat(14), "━".repeat(9)));
    for stat in report.stats.iter().take(max_stats) {
        lines.push(format!(
            "  ┃ {:<width$} ┃ {:>12.3} ┃ {:>12.3} ┃ {:>7.2} ┃",
            truncate(&stat.name),
            stat.avg,
            stat.max,
            stat.avg_calls,
            width = NAME_WIDTH
        ));
    }
    lines.push(format!("  ┗{}┻{}┻{}┻{}┛", "━".repeat(NAME_WIDTH + 2), "━".repeat(14), "━".repeat(14), "━".repeat(9)));

    if let Some(graph) = &report.event_graph {
        lines.push(String::new());
        lines.push(format!(
            "  HOT PATH ({:?}, frames {}..={})",
            graph.kind, graph.first_frame, graph.last_frame
        ));
        push_hot_path(&graph.root, 0, &mut lines);
    }

    lines.join("\n")
}

fn push_hot_path(node: &EventGraphNode, depth: usize, lines: &mut Vec<String>) {
    lines.push(format!(
        "  {}{} {:.3} ms ({:.1}%)",
        "  ".repeat(depth),
        node.name,
        node.inclusive_ms,
        node.inclusive_pct
    ));
    if let Some(next) = node.children.iter().find(|child| child.flags.is_hot_path) {
        push_hot_path(next, depth + 1, lines);
    }
}

fn truncate(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= NAME_WIDTH {
        return name.to_string();
    }
    let tail: String = chars[chars.len() - (NAME_WIDTH - 3)..].iter().collect();
    format!("...{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_tail() {
        let long = "a".repeat(50) + "Tick";
        let short = truncate(&long);
        assert_eq!(short.chars().count(), NAME_WIDTH);
        assert!(short.ends_with("Tick"));
        assert_eq!(truncate("Tick"), "Tick");
    }
}
