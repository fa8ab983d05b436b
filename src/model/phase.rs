//! Reasoning phases: one model request plus the tool calls it triggered.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::node::{NodeRef, Status};
use super::tree::ExecutionTree;

/// A reasoning phase.
#[derive(Debug, Clone)]
pub struct Phase {
    pub(crate) number: u32,
    pub(crate) model_node: Option<NodeRef>,
    pub(crate) tool_nodes: Vec<NodeRef>,
    pub(crate) status: Status,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) ended_at: Option<DateTime<Utc>>,
}

impl Phase {
    /// Create an open phase.
    pub fn new(number: u32, now: DateTime<Utc>) -> Self {
        Self {
            number,
            model_node: None,
            tool_nodes: Vec::new(),
            status: Status::InProgress,
            started_at: now,
            ended_at: None,
        }
    }

    /// Sequence number, starting at 1.
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn model_node(&self) -> Option<NodeRef> {
        self.model_node
    }

    /// Tool nodes in arrival order.
    pub fn tool_nodes(&self) -> &[NodeRef] {
        &self.tool_nodes
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status == Status::InProgress
    }

    pub fn has_nodes(&self) -> bool {
        self.model_node.is_some() || !self.tool_nodes.is_empty()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Wall time from start to close, or to `now` while open.
    pub fn duration(&self, now: DateTime<Utc>) -> Duration {
        let end = self.ended_at.unwrap_or(now);
        (end - self.started_at).to_std().unwrap_or_default()
    }

    /// Message count declared by the phase's model request.
    pub fn message_count(&self, tree: &ExecutionTree) -> u32 {
        self.model_node
            .and_then(|node| tree.node(node).metadata().message_count)
            .unwrap_or(0)
    }

    /// Condensed header for the phase in progress.
    pub fn summary(&self, tree: &ExecutionTree) -> String {
        format!(
            "working... (Tools:{} Messages:{})",
            self.tool_nodes.len(),
            self.message_count(tree)
        )
    }

    /// Descriptive title naming what the phase did.
    pub fn title(&self, tree: &ExecutionTree) -> String {
        match self.tool_nodes.as_slice() {
            [] => format!("Phase {}: Thinking", self.number),
            [only] => format!("Phase {}: {}", self.number, tree.node(*only).name()),
            many => format!("Phase {}: {} tool calls", self.number, many.len()),
        }
    }

    pub(crate) fn attach_model(&mut self, node: NodeRef) {
        self.model_node = Some(node);
    }

    pub(crate) fn push_tool(&mut self, node: NodeRef) {
        self.tool_nodes.push(node);
    }

    /// Close the phase. Returns false if it was already closed.
    pub(crate) fn close(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_open() {
            return false;
        }
        self.status = Status::Completed;
        self.ended_at = Some(now);
        true
    }
}
