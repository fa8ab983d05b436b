//! In-memory execution model built from the event stream.
//!
//! The model is a forest of [`Node`]s (one per event lineage) plus an
//! ordered list of [`Phase`]s grouping each model request with the tool calls
//! it triggered. Both live in an [`ExecutionTree`], which is only ever
//! mutated by applying events in queue arrival order:
//!
//! ```text
//! ModelRequest ──► Phase 1 ── Thinking (3 messages)
//!                     ├── → scan (os-core)
//!                     └── → read_file
//! ModelRequest ──► Phase 2 ── Thinking (5 messages)
//! ```
//!
//! Nodes are stored in an arena and refer to each other through [`NodeRef`]
//! handles; parents own the ordering of their children, children keep a
//! non-owning back reference.

mod node;
mod phase;
mod proptest;
mod tree;

pub use node::{Node, NodeKind, NodeMetadata, NodeRef, Status};
pub use phase::Phase;
pub use tree::{ExecutionTree, DEFAULT_MAX_OUTPUT_LINES};
