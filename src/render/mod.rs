//! Rendering of the execution model into frames.
//!
//! Rendering is a pure read of an [`ExecutionTree`]: it never mutates the
//! model and depends only on the tree, the renderer settings and the clock
//! value passed in. Three densities are supported (see [`DisplayMode`]) plus
//! a flat indented rendering for targets that cannot redraw in place.

mod frame;
pub mod symbols;

pub use frame::{Frame, Line, Span, Tone, TreeItem};

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::display::{DisplayConfig, DisplayMode};
use crate::model::{ExecutionTree, Node, NodeRef, Phase, Status};

/// Renders an [`ExecutionTree`] according to display settings.
#[derive(Debug, Clone)]
pub struct Renderer {
    mode: DisplayMode,
    show_model_nodes: bool,
    show_completion_summary: bool,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(DisplayMode::default())
    }
}

impl Renderer {
    /// Create a renderer for `mode`. Model-request lines are shown only in
    /// verbose mode.
    pub fn new(mode: DisplayMode) -> Self {
        Self {
            mode,
            show_model_nodes: mode == DisplayMode::Verbose,
            show_completion_summary: true,
        }
    }

    /// Create a renderer from display configuration.
    pub fn from_config(config: &DisplayConfig) -> Self {
        Self {
            mode: config.mode,
            show_model_nodes: config.shows_model_nodes(),
            show_completion_summary: config.persist,
        }
    }

    /// Show or hide model-request lines inside expanded phases.
    pub fn with_model_nodes(mut self, show: bool) -> Self {
        self.show_model_nodes = show;
        self
    }

    /// Show or hide the minimal-mode completion line.
    pub fn with_completion_summary(mut self, show: bool) -> Self {
        self.show_completion_summary = show;
        self
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// Render the tree for an interactive target.
    pub fn render(&self, tree: &ExecutionTree, now: DateTime<Utc>) -> Frame {
        let items = if tree.phases().is_empty() {
            tree.roots()
                .iter()
                .map(|root| node_item(tree, *root))
                .collect()
        } else {
            match self.mode {
                DisplayMode::Minimal => self.minimal(tree, now),
                DisplayMode::Default => self.condensed(tree, now),
                DisplayMode::Verbose => self.verbose(tree, now),
            }
        };

        if items.is_empty() {
            return placeholder();
        }
        Frame::from_items(items)
    }

    /// Flat rendering of the raw node forest, ignoring phases.
    ///
    /// Each line is indented two spaces per depth level and carries no tree
    /// guides, so it reads well in logs and pipes.
    pub fn render_plain(&self, tree: &ExecutionTree) -> Frame {
        let mut items = Vec::new();
        for root in tree.roots() {
            plain_items(tree, *root, 0, &mut items);
        }
        Frame::from_items(items)
    }

    fn minimal(&self, tree: &ExecutionTree, now: DateTime<Utc>) -> Vec<TreeItem> {
        if let Some(phase) = open_phase(tree) {
            let mut header = TreeItem::new(vec![
                Span::new(format!("{} working... ", symbols::ACTIVE), Tone::Active),
                Span::new(
                    format!(
                        "(msg:{} tool:{})",
                        phase.message_count(tree),
                        tree.total_tool_calls()
                    ),
                    Tone::Muted,
                ),
            ]);
            self.expand(tree, phase, &mut header);
            return vec![header];
        }

        let all_closed = tree.phases().iter().all(|phase| !phase.is_open());
        match tree.phases().last() {
            Some(last) if all_closed && self.show_completion_summary => {
                let elapsed = (now - tree.session_started_at())
                    .to_std()
                    .unwrap_or_default();
                vec![TreeItem::new(vec![
                    Span::new(symbols::QUERY, Tone::Query),
                    Span::new(
                        format!(" Complete ({}) - ", seconds(elapsed, 1)),
                        Tone::Success,
                    ),
                    Span::new(
                        format!(
                            "msg:{} tool:{}",
                            last.message_count(tree),
                            tree.total_tool_calls()
                        ),
                        Tone::Muted,
                    ),
                ])]
            }
            _ => Vec::new(),
        }
    }

    fn condensed(&self, tree: &ExecutionTree, now: DateTime<Utc>) -> Vec<TreeItem> {
        let mut items: Vec<TreeItem> = tree
            .closed_phases()
            .filter(|phase| phase.has_nodes())
            .map(|phase| {
                TreeItem::text(
                    format!(
                        "{} {} ({})",
                        symbols::COMPLETE,
                        phase.title(tree),
                        seconds(phase.duration(now), 1)
                    ),
                    Tone::Done,
                )
            })
            .collect();

        if let Some(phase) = open_phase(tree) {
            let mut header = TreeItem::text(
                format!("{} {}", symbols::ACTIVE, phase.summary(tree)),
                Tone::Active,
            );
            self.expand(tree, phase, &mut header);
            items.push(header);
        }
        items
    }

    fn verbose(&self, tree: &ExecutionTree, now: DateTime<Utc>) -> Vec<TreeItem> {
        tree.phases()
            .iter()
            .filter(|phase| phase.has_nodes())
            .map(|phase| {
                let (mark, tone) = status_mark(phase.status());
                let mut header = TreeItem::text(
                    format!(
                        "{mark} {} ({})",
                        phase.title(tree),
                        seconds(phase.duration(now), 1)
                    ),
                    tone,
                );
                self.expand(tree, phase, &mut header);
                header
            })
            .collect()
    }

    /// Attach a phase's model line (when enabled) and its tool subtrees.
    fn expand(&self, tree: &ExecutionTree, phase: &Phase, header: &mut TreeItem) {
        if self.show_model_nodes {
            if let Some(model) = phase.model_node() {
                // Drawn as a leaf: its children are the phase's tools below.
                header.push(TreeItem::new(node_spans(tree.node(model))));
            }
        }
        for tool in phase.tool_nodes() {
            header.push(node_item(tree, *tool));
        }
    }
}

fn open_phase(tree: &ExecutionTree) -> Option<&Phase> {
    tree.current_phase()
        .filter(|phase| phase.is_open() && phase.has_nodes())
}

fn placeholder() -> Frame {
    Frame::from_items(vec![TreeItem::text(
        format!("{} {}", symbols::ACTIVE, symbols::PLACEHOLDER),
        Tone::Active,
    )])
}

fn status_mark(status: Status) -> (&'static str, Tone) {
    match status {
        Status::InProgress => (symbols::ACTIVE, Tone::Active),
        Status::Completed => (symbols::COMPLETE, Tone::Done),
        Status::Error => (symbols::ERROR, Tone::Error),
    }
}

fn seconds(duration: Duration, precision: usize) -> String {
    format!("{:.*}s", precision, duration.as_secs_f64())
}

fn node_spans(node: &Node) -> Vec<Span> {
    let (mark, tone) = status_mark(node.status());
    let glyph = if node.kind().is_tool_like() {
        format!("{} ", symbols::TOOL)
    } else {
        String::new()
    };

    let mut spans = vec![Span::new(format!("{mark} {glyph}{}", node.label()), tone)];
    match node.status() {
        Status::Completed => {
            if let Some(summary) = node.summary() {
                spans.push(Span::new(format!(" - {summary}"), tone));
            }
        }
        Status::Error => {
            if let Some(error) = node.error() {
                spans.push(Span::new(format!(" - {error}"), Tone::Error));
            }
        }
        Status::InProgress => {}
    }
    if let Some(duration) = node.duration() {
        spans.push(Span::new(format!(" ({})", seconds(duration, 2)), tone));
    }
    spans
}

fn node_item(tree: &ExecutionTree, node: NodeRef) -> TreeItem {
    let node = tree.node(node);
    let mut item = TreeItem::new(node_spans(node));
    for child in node.children() {
        item.push(node_item(tree, *child));
    }
    item
}

fn plain_items(tree: &ExecutionTree, node: NodeRef, depth: usize, out: &mut Vec<TreeItem>) {
    let node = tree.node(node);
    let mut spans = vec![Span::plain(symbols::PLAIN_INDENT.repeat(depth))];
    spans.extend(node_spans(node));
    out.push(TreeItem::new(spans));
    for child in node.children() {
        plain_items(tree, *child, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ExecutionEvent, StepStatus};
    use chrono::Duration as ChronoDuration;
    use pretty_assertions::assert_eq;

    fn at(start: DateTime<Utc>, millis: i64) -> DateTime<Utc> {
        start + ChronoDuration::milliseconds(millis)
    }

    fn build(events: Vec<(i64, ExecutionEvent)>) -> (ExecutionTree, DateTime<Utc>) {
        let start = Utc::now();
        let mut tree = ExecutionTree::new();
        tree.mark_session_start(start);
        for (offset, event) in events {
            tree.apply_at(&event, at(start, offset)).unwrap();
        }
        (tree, start)
    }

    fn two_phases() -> (ExecutionTree, DateTime<Utc>) {
        build(vec![
            (0, ExecutionEvent::model_request("p1", 3)),
            (0, ExecutionEvent::tool_started("t1", "scan").with_parent("p1")),
            (2000, ExecutionEvent::model_request("p2", 5)),
            (3000, ExecutionEvent::tool_started("t2", "fetch")),
            (3500, ExecutionEvent::tool_errored("t2", "timeout")),
        ])
    }

    #[test]
    fn test_placeholder_when_empty() {
        let frame = Renderer::default().render(&ExecutionTree::new(), Utc::now());
        assert_eq!(frame.plain_lines(), vec!["● Thinking..."]);
        assert_eq!(frame.items()[0].label[0].tone, Tone::Active);
    }

    #[test]
    fn test_minimal_shows_only_current_phase() {
        let (tree, start) = build(vec![
            (0, ExecutionEvent::model_request("p1", 3)),
            (
                0,
                ExecutionEvent::tool_started("t1", "scan").with_argument("repo", "os-core"),
            ),
            (
                1200,
                ExecutionEvent::tool_completed("t1")
                    .with_summary("3 findings")
                    .with_duration(Duration::from_millis(1200)),
            ),
            (1300, ExecutionEvent::tool_started("t2", "read_file")),
        ]);

        let frame = Renderer::new(DisplayMode::Minimal).render(&tree, at(start, 2000));
        assert_eq!(
            frame.plain_lines(),
            vec![
                "● working... (msg:3 tool:2)",
                "├── • → scan (os-core) - 3 findings (1.20s)",
                "└── ● → read_file",
            ]
        );
    }

    #[test]
    fn test_minimal_tool_count_spans_all_phases() {
        let (tree, start) = two_phases();
        let frame = Renderer::new(DisplayMode::Minimal).render(&tree, at(start, 4000));
        assert_eq!(
            frame.plain_lines(),
            vec!["● working... (msg:5 tool:2)", "└── ✗ → fetch - timeout"]
        );
    }

    #[test]
    fn test_minimal_completion_summary() {
        let (mut tree, start) = two_phases();
        tree.close_current_phase_at(at(start, 4000));

        let frame = Renderer::new(DisplayMode::Minimal).render(&tree, at(start, 4500));
        assert_eq!(frame.plain_lines(), vec!["◉ Complete (4.5s) - msg:5 tool:2"]);
        assert_eq!(frame.items()[0].label[0].tone, Tone::Query);
        assert_eq!(frame.items()[0].label[1].tone, Tone::Success);

        let hidden = Renderer::new(DisplayMode::Minimal)
            .with_completion_summary(false)
            .render(&tree, at(start, 4500));
        assert_eq!(hidden.plain_lines(), vec!["● Thinking..."]);
    }

    #[test]
    fn test_default_condenses_closed_phases() {
        let (tree, start) = two_phases();
        let frame = Renderer::new(DisplayMode::Default).render(&tree, at(start, 4000));
        assert_eq!(
            frame.plain_lines(),
            vec![
                "• Phase 1: scan (2.0s)",
                "● working... (Tools:1 Messages:5)",
                "└── ✗ → fetch - timeout",
            ]
        );
    }

    #[test]
    fn test_default_after_close_keeps_last_phase() {
        let (mut tree, start) = two_phases();
        tree.close_current_phase_at(at(start, 5000));

        let frame = Renderer::new(DisplayMode::Default).render(&tree, at(start, 6000));
        assert_eq!(
            frame.plain_lines(),
            vec!["• Phase 1: scan (2.0s)", "• Phase 2: fetch (3.0s)"]
        );
    }

    #[test]
    fn test_verbose_expands_every_phase() {
        let (tree, start) = two_phases();
        let frame = Renderer::new(DisplayMode::Verbose).render(&tree, at(start, 4000));
        assert_eq!(
            frame.plain_lines(),
            vec![
                "• Phase 1: scan (2.0s)",
                "├── ● Thinking (3 messages)",
                "└── ● → scan",
                "● Phase 2: fetch (2.0s)",
                "├── ● Thinking (5 messages)",
                "└── ✗ → fetch - timeout",
            ]
        );
    }

    #[test]
    fn test_verbose_without_model_nodes() {
        let (tree, start) = two_phases();
        let frame = Renderer::new(DisplayMode::Verbose)
            .with_model_nodes(false)
            .render(&tree, at(start, 4000));
        assert_eq!(
            frame.plain_lines(),
            vec![
                "• Phase 1: scan (2.0s)",
                "└── ● → scan",
                "● Phase 2: fetch (2.0s)",
                "└── ✗ → fetch - timeout",
            ]
        );
    }

    #[test]
    fn test_forest_without_phases() {
        let (tree, start) = build(vec![
            (0, ExecutionEvent::workflow_step("w1", "build", StepStatus::Started)),
            (
                10,
                ExecutionEvent::subprocess_output("s1", "cargo test", "ok").with_parent("w1"),
            ),
            (20, ExecutionEvent::workflow_step("w2", "deploy", StepStatus::Started)),
            (
                30,
                ExecutionEvent::workflow_step("w2", "deploy", StepStatus::Completed)
                    .with_metadata("summary", "done"),
            ),
        ]);

        let frame = Renderer::default().render(&tree, at(start, 100));
        assert_eq!(
            frame.plain_lines(),
            vec!["● build", "└── ● → cargo test", "• deploy - done"]
        );
    }

    #[test]
    fn test_plain_rendering_indents_forest() {
        let (tree, _) = build(vec![
            (0, ExecutionEvent::model_request("p1", 2)),
            (0, ExecutionEvent::tool_started("t1", "scan").with_parent("p1")),
            (0, ExecutionEvent::tool_started("t2", "lint").with_parent("t1")),
            (
                10,
                ExecutionEvent::tool_completed("t2").with_duration(Duration::from_millis(250)),
            ),
        ]);

        let frame = Renderer::default().render_plain(&tree);
        assert_eq!(
            frame.plain_lines(),
            vec![
                "● Thinking (2 messages)",
                "  ● → scan",
                "    • → lint (0.25s)",
            ]
        );
        assert!(Renderer::default().render_plain(&ExecutionTree::new()).is_empty());
    }

    #[test]
    fn test_error_text_uses_error_tone() {
        let (tree, start) = two_phases();
        let frame = Renderer::new(DisplayMode::Minimal).render(&tree, at(start, 4000));
        let tool = &frame.items()[0].children[0];
        assert!(tool.label.iter().all(|span| span.tone == Tone::Error));
    }
}
