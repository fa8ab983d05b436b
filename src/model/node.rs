//! Execution nodes.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::event::EventId;

/// Handle to a node inside an [`ExecutionTree`](super::ExecutionTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(pub(crate) usize);

/// Lifecycle status shared by nodes and phases.
///
/// `InProgress` is initial; `Completed` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    InProgress,
    Completed,
    Error,
}

impl Status {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::InProgress
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Which kind of event lineage produced a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    ToolCall,
    ModelRequest,
    WorkflowStep,
    SubprocessOutput,
}

impl NodeKind {
    /// Tool-like nodes are drawn with the tool glyph.
    pub fn is_tool_like(&self) -> bool {
        matches!(self, Self::ToolCall | Self::SubprocessOutput)
    }
}

/// Free-form details accumulated on a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Human-readable result summary
    pub summary: Option<String>,
    /// Duration reported by the producer
    pub duration: Option<Duration>,
    /// Message count of a model request
    pub message_count: Option<u32>,
    /// Most recent subprocess output lines
    pub output_lines: VecDeque<String>,
    /// Producer-supplied metadata (workflow steps)
    pub extra: Map<String, Value>,
}

/// One rendered unit of work.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: EventId,
    pub(crate) kind: NodeKind,
    pub(crate) name: String,
    pub(crate) label: String,
    pub(crate) status: Status,
    pub(crate) children: Vec<NodeRef>,
    pub(crate) parent: Option<NodeRef>,
    pub(crate) metadata: NodeMetadata,
    pub(crate) error: Option<String>,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) ended_at: Option<DateTime<Utc>>,
}

impl Node {
    /// Create an in-progress node.
    pub fn new(
        id: EventId,
        kind: NodeKind,
        name: impl Into<String>,
        label: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            label: label.into(),
            status: Status::InProgress,
            children: Vec::new(),
            parent: None,
            metadata: NodeMetadata::default(),
            error: None,
            started_at: now,
            ended_at: None,
        }
    }

    pub fn id(&self) -> &EventId {
        &self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Tool name, step name or command.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn children(&self) -> &[NodeRef] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeRef> {
        self.parent
    }

    pub fn metadata(&self) -> &NodeMetadata {
        &self.metadata
    }

    pub fn summary(&self) -> Option<&str> {
        self.metadata.summary.as_deref()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.metadata.duration
    }

    /// Error text of a failed node.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Mark the node completed. Empty summaries are not recorded.
    pub fn complete(
        &mut self,
        summary: Option<String>,
        duration: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_in_progress()?;
        self.status = Status::Completed;
        self.ended_at = Some(now);
        if let Some(summary) = summary.filter(|s| !s.is_empty()) {
            self.metadata.summary = Some(summary);
        }
        if duration.is_some() {
            self.metadata.duration = duration;
        }
        Ok(())
    }

    /// Mark the node failed.
    pub fn fail(
        &mut self,
        message: impl Into<String>,
        duration: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_in_progress()?;
        self.status = Status::Error;
        self.ended_at = Some(now);
        self.error = Some(message.into());
        if duration.is_some() {
            self.metadata.duration = duration;
        }
        Ok(())
    }

    /// Append a subprocess output line, keeping at most `limit` lines.
    pub fn push_output(&mut self, line: impl Into<String>, limit: usize) {
        let lines = &mut self.metadata.output_lines;
        lines.push_back(line.into());
        while lines.len() > limit {
            lines.pop_front();
        }
    }

    fn ensure_in_progress(&self) -> Result<()> {
        if self.status.is_terminal() {
            return Err(Error::invalid_transition(self.id.as_str(), self.status));
        }
        Ok(())
    }
}
