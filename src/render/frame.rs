//! Terminal-displayable frames.
//!
//! A [`Frame`] is an ordered list of [`TreeItem`]s. Each item carries a label
//! made of styled [`Span`]s and nested children. Surfaces turn a frame into
//! [`Line`]s with box-drawing guides:
//!
//! ```text
//! ● working... (msg:3 tool:2)
//! ├── • → scan (os-core) - 3 findings (1.20s)
//! └── ● → read_file
//! ```

use console::Style;
use serde::{Deserialize, Serialize};

use super::symbols;

/// Style hint for a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    /// Unstyled
    Plain,
    /// Session-level information (cyan)
    Query,
    /// Finished work (dim)
    Done,
    /// Running work (yellow)
    Active,
    /// Successful session (green)
    Success,
    /// Failures (red)
    Error,
    /// Secondary details (dim)
    Muted,
}

impl Tone {
    /// Terminal style for this tone.
    pub fn style(&self) -> Style {
        match self {
            Self::Plain => Style::new(),
            Self::Query => Style::new().cyan(),
            Self::Done | Self::Muted => Style::new().dim(),
            Self::Active => Style::new().yellow(),
            Self::Success => Style::new().green(),
            Self::Error => Style::new().red(),
        }
    }
}

/// A run of text with one tone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    pub tone: Tone,
}

impl Span {
    pub fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Tone::Plain)
    }

    fn styled(&self) -> String {
        match self.tone {
            Tone::Plain => self.text.clone(),
            tone => tone
                .style()
                .force_styling(true)
                .apply_to(&self.text)
                .to_string(),
        }
    }
}

/// One entry of a frame, with nested children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeItem {
    pub label: Vec<Span>,
    pub children: Vec<TreeItem>,
}

impl TreeItem {
    /// Create a childless item.
    pub fn new(label: Vec<Span>) -> Self {
        Self {
            label,
            children: Vec::new(),
        }
    }

    /// Create a childless item with a single span.
    pub fn text(text: impl Into<String>, tone: Tone) -> Self {
        Self::new(vec![Span::new(text, tone)])
    }

    /// Add a child.
    pub fn with_child(mut self, child: TreeItem) -> Self {
        self.children.push(child);
        self
    }

    /// Add a child in place.
    pub fn push(&mut self, child: TreeItem) {
        self.children.push(child);
    }

    /// Label text without styling.
    pub fn label_text(&self) -> String {
        self.label.iter().map(|span| span.text.as_str()).collect()
    }
}

/// A flattened output line: guide characters followed by the item label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub guide: String,
    pub spans: Vec<Span>,
}

impl Line {
    /// Text without styling.
    pub fn text(&self) -> String {
        let mut out = self.guide.clone();
        for span in &self.spans {
            out.push_str(&span.text);
        }
        out
    }

    /// Text with ANSI styling.
    pub fn styled(&self) -> String {
        let mut out = String::new();
        if !self.guide.is_empty() {
            out.push_str(&Span::new(self.guide.as_str(), Tone::Muted).styled());
        }
        for span in &self.spans {
            out.push_str(&span.styled());
        }
        out
    }
}

/// A complete rendering of the display state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    items: Vec<TreeItem>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<TreeItem>) -> Self {
        Self { items }
    }

    pub fn push(&mut self, item: TreeItem) {
        self.items.push(item);
    }

    pub fn items(&self) -> &[TreeItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Flatten into lines with tree guides.
    pub fn lines(&self) -> Vec<Line> {
        let mut out = Vec::new();
        for item in &self.items {
            flatten(item, "", String::new(), &mut out);
        }
        out
    }

    /// Unstyled lines.
    pub fn plain_lines(&self) -> Vec<String> {
        self.lines().iter().map(Line::text).collect()
    }

    /// Lines for a terminal, styled only when `colors` is set.
    pub fn styled_lines(&self, colors: bool) -> Vec<String> {
        self.lines()
            .iter()
            .map(|line| if colors { line.styled() } else { line.text() })
            .collect()
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.plain_lines().join("\n"))
    }
}

fn flatten(item: &TreeItem, prefix: &str, guide: String, out: &mut Vec<Line>) {
    out.push(Line {
        guide,
        spans: item.label.clone(),
    });

    let last = item.children.len().saturating_sub(1);
    for (index, child) in item.children.iter().enumerate() {
        let (branch, continuation) = if index == last {
            (symbols::LAST_BRANCH, symbols::BLANK)
        } else {
            (symbols::BRANCH, symbols::PIPE)
        };
        let next_prefix = format!("{prefix}{continuation}");
        flatten(child, &next_prefix, format!("{prefix}{branch}"), out);
    }
}
