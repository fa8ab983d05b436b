//! Event ingestion into the execution forest.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::debug;

use super::node::{Node, NodeKind, NodeRef, Status};
use super::phase::Phase;
use crate::error::{Error, Result};
use crate::event::{EventId, ExecutionEvent, StepStatus};

/// Default number of subprocess output lines retained per node.
pub const DEFAULT_MAX_OUTPUT_LINES: usize = 200;

/// Tool arguments worth showing next to the tool name, in priority order.
const KEY_ARGUMENTS: [&str; 3] = ["repo", "repository", "service"];

/// Label for a failed workflow step with no error metadata.
const DEFAULT_STEP_ERROR: &str = "Failed";

/// Summary recorded on a model request once its response arrives.
const MODEL_RESPONSE_SUMMARY: &str = "Response received";

/// Nodes, roots and phases of one display session.
#[derive(Debug, Clone)]
pub struct ExecutionTree {
    nodes: Vec<Node>,
    index: HashMap<EventId, NodeRef>,
    roots: Vec<NodeRef>,
    phases: Vec<Phase>,
    current_phase: Option<usize>,
    session_started_at: DateTime<Utc>,
    max_output_lines: usize,
}

impl Default for ExecutionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::with_output_limit(DEFAULT_MAX_OUTPUT_LINES)
    }

    /// Create an empty tree retaining at most `max_output_lines` per
    /// subprocess node.
    pub fn with_output_limit(max_output_lines: usize) -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            roots: Vec::new(),
            phases: Vec::new(),
            current_phase: None,
            session_started_at: Utc::now(),
            max_output_lines: max_output_lines.max(1),
        }
    }

    /// Apply one event at the current time.
    pub fn apply(&mut self, event: &ExecutionEvent) -> Result<()> {
        self.apply_at(event, Utc::now())
    }

    /// Apply one event as if it arrived at `now`.
    ///
    /// Updates naming unknown identities are dropped. A start event reusing a
    /// known identity is rejected with [`Error::DuplicateNode`] and a second
    /// terminal transition with [`Error::InvalidTransition`]; in both cases
    /// the tree is left untouched.
    pub fn apply_at(&mut self, event: &ExecutionEvent, now: DateTime<Utc>) -> Result<()> {
        match event {
            ExecutionEvent::ToolStarted {
                id,
                parent_id,
                tool_name,
                arguments,
            } => {
                let label = tool_label(tool_name, arguments);
                let node = self.insert(
                    id,
                    parent_id.as_ref(),
                    NodeKind::ToolCall,
                    tool_name,
                    label,
                    now,
                )?;
                if let Some(phase) = self.open_phase_mut() {
                    phase.push_tool(node);
                }
                Ok(())
            }
            ExecutionEvent::ToolCompleted {
                id,
                result_summary,
                duration,
            } => match self.lookup_mut(id) {
                Some(node) => node.complete(result_summary.clone(), *duration, now),
                None => Ok(()),
            },
            ExecutionEvent::ToolErrored {
                id,
                error_message,
                duration,
            } => match self.lookup_mut(id) {
                Some(node) => node.fail(error_message.clone(), *duration, now),
                None => Ok(()),
            },
            ExecutionEvent::WorkflowStep {
                id,
                parent_id,
                step_name,
                status,
                metadata,
            } => self.apply_step(id, parent_id.as_ref(), step_name, *status, metadata, now),
            ExecutionEvent::SubprocessOutput {
                id,
                parent_id,
                command,
                output_line,
            } => {
                let node = match self.index.get(id).copied() {
                    Some(node) => node,
                    None => self.insert(
                        id,
                        parent_id.as_ref(),
                        NodeKind::SubprocessOutput,
                        command,
                        command.clone(),
                        now,
                    )?,
                };
                let limit = self.max_output_lines;
                self.nodes[node.0].push_output(output_line.clone(), limit);
                Ok(())
            }
            ExecutionEvent::ModelRequest {
                id,
                parent_id,
                message_count,
            } => self.apply_model_request(id, parent_id.as_ref(), *message_count, now),
            ExecutionEvent::ModelResponse { id, duration } => match self.lookup_mut(id) {
                Some(node) => {
                    node.complete(Some(MODEL_RESPONSE_SUMMARY.to_string()), *duration, now)
                }
                None => Ok(()),
            },
            ExecutionEvent::Unknown => Ok(()),
        }
    }

    fn apply_step(
        &mut self,
        id: &EventId,
        parent_id: Option<&EventId>,
        step_name: &str,
        status: StepStatus,
        metadata: &Map<String, Value>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        match status {
            StepStatus::Started => {
                let node = self.insert(
                    id,
                    parent_id,
                    NodeKind::WorkflowStep,
                    step_name,
                    step_name.to_string(),
                    now,
                )?;
                self.nodes[node.0].metadata.extra = metadata.clone();
                Ok(())
            }
            StepStatus::Completed => {
                let summary = metadata.get("summary").map(value_text);
                match self.lookup_mut(id) {
                    Some(node) => node.complete(summary, None, now),
                    None => Ok(()),
                }
            }
            StepStatus::Failed => {
                let message = metadata
                    .get("error")
                    .map(value_text)
                    .unwrap_or_else(|| DEFAULT_STEP_ERROR.to_string());
                match self.lookup_mut(id) {
                    Some(node) => node.fail(message, None, now),
                    None => Ok(()),
                }
            }
        }
    }

    fn apply_model_request(
        &mut self,
        id: &EventId,
        parent_id: Option<&EventId>,
        message_count: u32,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if self.index.contains_key(id) {
            return Err(Error::duplicate_node(id.as_str()));
        }
        self.close_current_phase_at(now);

        let node = self.insert(
            id,
            parent_id,
            NodeKind::ModelRequest,
            "thinking",
            format!("Thinking ({message_count} messages)"),
            now,
        )?;
        self.nodes[node.0].metadata.message_count = Some(message_count);

        let mut phase = Phase::new(self.phases.len() as u32 + 1, now);
        phase.attach_model(node);
        self.phases.push(phase);
        self.current_phase = Some(self.phases.len() - 1);
        debug!(phase = self.phases.len(), message_count, "Opened reasoning phase");
        Ok(())
    }

    fn insert(
        &mut self,
        id: &EventId,
        parent_id: Option<&EventId>,
        kind: NodeKind,
        name: &str,
        label: String,
        now: DateTime<Utc>,
    ) -> Result<NodeRef> {
        if self.index.contains_key(id) {
            return Err(Error::duplicate_node(id.as_str()));
        }

        let node_ref = NodeRef(self.nodes.len());
        // A parent that has not arrived yet leaves the node at the root.
        let parent = parent_id.and_then(|parent| self.index.get(parent).copied());

        let mut node = Node::new(id.clone(), kind, name, label, now);
        node.parent = parent;
        self.nodes.push(node);
        self.index.insert(id.clone(), node_ref);

        match parent {
            Some(parent) => self.nodes[parent.0].children.push(node_ref),
            None => self.roots.push(node_ref),
        }
        Ok(node_ref)
    }

    fn lookup_mut(&mut self, id: &EventId) -> Option<&mut Node> {
        match self.index.get(id).copied() {
            Some(node) => Some(&mut self.nodes[node.0]),
            None => {
                debug!(id = %id, "Dropping update for unknown node");
                None
            }
        }
    }

    fn open_phase_mut(&mut self) -> Option<&mut Phase> {
        let index = self.current_phase?;
        self.phases.get_mut(index).filter(|phase| phase.is_open())
    }

    /// Close the current phase if it is still open.
    pub fn close_current_phase(&mut self) -> bool {
        self.close_current_phase_at(Utc::now())
    }

    /// Close the current phase at `now`. Returns whether a phase was closed.
    pub fn close_current_phase_at(&mut self, now: DateTime<Utc>) -> bool {
        self.open_phase_mut()
            .map(|phase| phase.close(now))
            .unwrap_or(false)
    }

    /// Reset to an empty tree and restart the session clock.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.index.clear();
        self.roots.clear();
        self.phases.clear();
        self.current_phase = None;
        self.session_started_at = Utc::now();
    }

    /// Restart the session clock without touching content.
    pub fn mark_session_start(&mut self, now: DateTime<Utc>) {
        self.session_started_at = now;
    }

    pub fn session_started_at(&self) -> DateTime<Utc> {
        self.session_started_at
    }

    /// Resolve a node handle.
    ///
    /// Handles are only produced by this tree, so they always resolve until
    /// the next [`clear`](Self::clear).
    pub fn node(&self, node: NodeRef) -> &Node {
        &self.nodes[node.0]
    }

    /// Look up a node by event identity.
    pub fn get(&self, id: &EventId) -> Option<&Node> {
        self.index.get(id).map(|node| &self.nodes[node.0])
    }

    /// Look up a node handle by event identity.
    pub fn find(&self, id: &EventId) -> Option<NodeRef> {
        self.index.get(id).copied()
    }

    /// Root nodes in arrival order.
    pub fn roots(&self) -> &[NodeRef] {
        &self.roots
    }

    /// All phases in order.
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// The most recently opened phase, open or not.
    pub fn current_phase(&self) -> Option<&Phase> {
        self.current_phase.and_then(|index| self.phases.get(index))
    }

    /// Phases that have been closed, in order.
    pub fn closed_phases(&self) -> impl Iterator<Item = &Phase> {
        self.phases.iter().filter(|phase| !phase.is_open())
    }

    /// Tool calls registered across all phases.
    pub fn total_tool_calls(&self) -> usize {
        self.phases.iter().map(|phase| phase.tool_nodes().len()).sum()
    }

    /// Number of nodes in progress.
    pub fn active_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| node.status() == Status::InProgress)
            .count()
    }

    pub fn max_output_lines(&self) -> usize {
        self.max_output_lines
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn tool_label(tool_name: &str, arguments: &Map<String, Value>) -> String {
    KEY_ARGUMENTS
        .iter()
        .find_map(|key| arguments.get(*key))
        .map(|value| format!("{tool_name} ({})", value_text(value)))
        .unwrap_or_else(|| tool_name.to_string())
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
