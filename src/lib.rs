//! # livetree
//!
//! A live, hierarchical terminal display of what an agent is doing while it
//! runs: model requests, the tool calls each one triggered, workflow steps
//! and subprocess output.
//!
//! ## Core Components
//!
//! - **Event**: the closed set of execution events producers emit
//! - **Emitter**: cloneable producer handle and the queue it feeds
//! - **Model**: node forest and reasoning phases built from events
//! - **Render**: pure rendering of the model into frames
//! - **Display**: surfaces and the live driver with its redraw loop
//!
//! ## Example
//!
//! ```rust,no_run
//! use livetree::{DisplayConfig, DisplayMode, EventEmitter, EventSink, ExecutionEvent, LiveDisplay};
//!
//! # async fn demo() -> livetree::Result<()> {
//! let (emitter, queue) = EventEmitter::channel();
//! let mut display = LiveDisplay::new(queue, DisplayConfig::new().mode(DisplayMode::Default));
//!
//! let answer = display
//!     .run(async {
//!         emitter.emit(ExecutionEvent::model_request("m-1", 4));
//!         emitter.emit(ExecutionEvent::tool_started("t-1", "scan").with_argument("repo", "os-core"));
//!         emitter.emit(ExecutionEvent::tool_completed("t-1").with_summary("3 findings"));
//!         "done"
//!     })
//!     .await?;
//! assert_eq!(answer, "done");
//! # Ok(())
//! # }
//! ```

pub mod display;
pub mod emitter;
pub mod error;
pub mod event;
pub mod model;
pub mod render;

// Re-exports for convenience
pub use display::{
    BufferSurface, DisplayConfig, DisplayMode, LiveDisplay, OutputTarget, Surface, TermSurface,
};
pub use emitter::{CollectingEmitter, EventEmitter, EventQueue, EventSink, NullEmitter, Polled};
pub use error::{Error, Result};
pub use event::{EventId, ExecutionEvent, StepStatus};
pub use model::{ExecutionTree, Node, NodeKind, NodeMetadata, NodeRef, Phase, Status};
pub use render::{Frame, Renderer, Span, Tone, TreeItem};
