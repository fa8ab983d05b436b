//! Execution event contract consumed by the live display.
//!
//! Producers (tool runners, model clients, workflow steps) describe what they
//! are doing with [`ExecutionEvent`]s. Every event carries an identity; the
//! completion and error variants reference the identity of the start event
//! they close. Events travel as plain Rust values through the
//! [`EventEmitter`](crate::emitter::EventEmitter), or as JSON when they cross a
//! process boundary:
//!
//! ```json
//! {"type": "tool_started", "id": "t-1", "tool_name": "scan", "arguments": {"repo": "os-core"}}
//! {"type": "tool_completed", "id": "t-1", "result_summary": "3 findings", "duration": 1.25}
//! ```
//!
//! Unrecognized `type` tags decode as [`ExecutionEvent::Unknown`] so newer
//! producers can talk to older displays.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::Result;

/// Identity of an event lineage (a start event and whatever closes it).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Generate a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EventId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Status carried by a workflow step event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Started,
    Completed,
    Failed,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Started => write!(f, "started"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A progress event emitted by the task being visualized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionEvent {
    /// A tool invocation began
    ToolStarted {
        id: EventId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_id: Option<EventId>,
        tool_name: String,
        /// Sanitized tool arguments (no secrets)
        #[serde(default, skip_serializing_if = "Map::is_empty")]
        arguments: Map<String, Value>,
    },
    /// A tool invocation finished successfully
    ToolCompleted {
        id: EventId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result_summary: Option<String>,
        #[serde(default, with = "duration_secs", skip_serializing_if = "Option::is_none")]
        duration: Option<Duration>,
    },
    /// A tool invocation failed
    ToolErrored {
        id: EventId,
        error_message: String,
        #[serde(default, with = "duration_secs", skip_serializing_if = "Option::is_none")]
        duration: Option<Duration>,
    },
    /// A workflow step started or changed state
    WorkflowStep {
        id: EventId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_id: Option<EventId>,
        #[serde(default)]
        step_name: String,
        status: StepStatus,
        #[serde(default, skip_serializing_if = "Map::is_empty")]
        metadata: Map<String, Value>,
    },
    /// One line of output from a subprocess
    SubprocessOutput {
        id: EventId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_id: Option<EventId>,
        command: String,
        output_line: String,
    },
    /// A model request was issued; opens a new reasoning phase
    ModelRequest {
        id: EventId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_id: Option<EventId>,
        message_count: u32,
    },
    /// The model answered the request with the same identity
    ModelResponse {
        id: EventId,
        #[serde(default, with = "duration_secs", skip_serializing_if = "Option::is_none")]
        duration: Option<Duration>,
    },
    /// Any variant this build does not know about
    #[serde(other)]
    Unknown,
}

impl ExecutionEvent {
    // Convenience constructors, one per variant

    /// Create a tool start event.
    pub fn tool_started(id: impl Into<EventId>, tool_name: impl Into<String>) -> Self {
        Self::ToolStarted {
            id: id.into(),
            parent_id: None,
            tool_name: tool_name.into(),
            arguments: Map::new(),
        }
    }

    /// Create a tool completion event.
    pub fn tool_completed(id: impl Into<EventId>) -> Self {
        Self::ToolCompleted {
            id: id.into(),
            result_summary: None,
            duration: None,
        }
    }

    /// Create a tool error event.
    pub fn tool_errored(id: impl Into<EventId>, error_message: impl Into<String>) -> Self {
        Self::ToolErrored {
            id: id.into(),
            error_message: error_message.into(),
            duration: None,
        }
    }

    /// Create a workflow step event.
    pub fn workflow_step(
        id: impl Into<EventId>,
        step_name: impl Into<String>,
        status: StepStatus,
    ) -> Self {
        Self::WorkflowStep {
            id: id.into(),
            parent_id: None,
            step_name: step_name.into(),
            status,
            metadata: Map::new(),
        }
    }

    /// Create a subprocess output event.
    pub fn subprocess_output(
        id: impl Into<EventId>,
        command: impl Into<String>,
        output_line: impl Into<String>,
    ) -> Self {
        Self::SubprocessOutput {
            id: id.into(),
            parent_id: None,
            command: command.into(),
            output_line: output_line.into(),
        }
    }

    /// Create a model request event.
    pub fn model_request(id: impl Into<EventId>, message_count: u32) -> Self {
        Self::ModelRequest {
            id: id.into(),
            parent_id: None,
            message_count,
        }
    }

    /// Create a model response event.
    pub fn model_response(id: impl Into<EventId>) -> Self {
        Self::ModelResponse {
            id: id.into(),
            duration: None,
        }
    }

    /// Set the parent identity. Variants without a parent are unchanged.
    pub fn with_parent(mut self, parent: impl Into<EventId>) -> Self {
        match &mut self {
            Self::ToolStarted { parent_id, .. }
            | Self::WorkflowStep { parent_id, .. }
            | Self::SubprocessOutput { parent_id, .. }
            | Self::ModelRequest { parent_id, .. } => *parent_id = Some(parent.into()),
            _ => {}
        }
        self
    }

    /// Add a tool argument (tool start only).
    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Self::ToolStarted { arguments, .. } = &mut self {
            arguments.insert(key.into(), value.into());
        }
        self
    }

    /// Add step metadata (workflow step only).
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Self::WorkflowStep { metadata, .. } = &mut self {
            metadata.insert(key.into(), value.into());
        }
        self
    }

    /// Set the result summary (tool completion only).
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        if let Self::ToolCompleted { result_summary, .. } = &mut self {
            *result_summary = Some(summary.into());
        }
        self
    }

    /// Set the measured duration on completion, error and response events.
    pub fn with_duration(mut self, elapsed: Duration) -> Self {
        match &mut self {
            Self::ToolCompleted { duration, .. }
            | Self::ToolErrored { duration, .. }
            | Self::ModelResponse { duration, .. } => *duration = Some(elapsed),
            _ => {}
        }
        self
    }

    /// Identity of the lineage this event belongs to.
    pub fn id(&self) -> Option<&EventId> {
        match self {
            Self::ToolStarted { id, .. }
            | Self::ToolCompleted { id, .. }
            | Self::ToolErrored { id, .. }
            | Self::WorkflowStep { id, .. }
            | Self::SubprocessOutput { id, .. }
            | Self::ModelRequest { id, .. }
            | Self::ModelResponse { id, .. } => Some(id),
            Self::Unknown => None,
        }
    }

    /// Parent identity, for variants that carry one.
    pub fn parent_id(&self) -> Option<&EventId> {
        match self {
            Self::ToolStarted { parent_id, .. }
            | Self::WorkflowStep { parent_id, .. }
            | Self::SubprocessOutput { parent_id, .. }
            | Self::ModelRequest { parent_id, .. } => parent_id.as_ref(),
            _ => None,
        }
    }

    /// Wire name of the variant.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::ToolStarted { .. } => "tool_started",
            Self::ToolCompleted { .. } => "tool_completed",
            Self::ToolErrored { .. } => "tool_errored",
            Self::WorkflowStep { .. } => "workflow_step",
            Self::SubprocessOutput { .. } => "subprocess_output",
            Self::ModelRequest { .. } => "model_request",
            Self::ModelResponse { .. } => "model_response",
            Self::Unknown => "unknown",
        }
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Optional durations travel as fractional seconds.
mod duration_secs {
    use std::time::Duration;

    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => s.serialize_some(&duration.as_secs_f64()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Option::<f64>::deserialize(d)?
            .map(|secs| Duration::try_from_secs_f64(secs).map_err(de::Error::custom))
            .transpose()
    }
}
