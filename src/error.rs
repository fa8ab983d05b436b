//! Error types for livetree.

use thiserror::Error;

use crate::model::Status;

/// Result type alias using livetree's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while ingesting events or driving the display.
///
/// None of these ever reach the task being visualized: the consumption loop
/// logs them and moves on. Only the driver's lifecycle calls and
/// configuration parsing hand them back to the host.
#[derive(Error, Debug)]
pub enum Error {
    /// A start-type event reused an identity already present in the model
    #[error("Duplicate event id: {0}")]
    DuplicateNode(String),

    /// A node that already left in-progress was asked to transition again
    #[error("Node {id} already finished with status {status}")]
    InvalidTransition { id: String, status: Status },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Terminal I/O error
    #[error("Terminal I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The event queue is no longer owned by the display
    #[error("Event queue unavailable: {0}")]
    QueueUnavailable(String),

    /// The background consumption task failed
    #[error("Display worker failed: {0}")]
    Worker(String),
}

impl Error {
    /// Create a duplicate node error.
    pub fn duplicate_node(id: impl Into<String>) -> Self {
        Self::DuplicateNode(id.into())
    }

    /// Create an invalid transition error.
    pub fn invalid_transition(id: impl Into<String>, status: Status) -> Self {
        Self::InvalidTransition {
            id: id.into(),
            status,
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a worker failure error.
    pub fn worker(message: impl Into<String>) -> Self {
        Self::Worker(message.into())
    }
}
