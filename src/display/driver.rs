//! Live display driver.
//!
//! [`LiveDisplay`] owns the [`EventQueue`] of a session and, while running, a
//! background task that applies queued events to the [`ExecutionTree`] and
//! redraws the [`Surface`] on a fixed-rate timer:
//!
//! ```text
//! producers ──emit──► EventQueue ──► consume loop ──► ExecutionTree
//!                                         │ tick (10/s)
//!                                         ▼
//!                                Renderer ──► Surface
//! ```
//!
//! Stopping cancels the loop, takes the queue back, drains what is already
//! queued, closes the open phase and then either persists or erases the
//! final frame.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::config::{DisplayConfig, MIN_INTERVAL};
use super::surface::{Surface, TermSurface};
use crate::emitter::{EventQueue, Polled};
use crate::error::{Error, Result};
use crate::event::ExecutionEvent;
use crate::model::ExecutionTree;
use crate::render::{Frame, Renderer};

// =============================================================================
// Shared State
// =============================================================================

/// Model and output shared between the host and the consumption loop.
struct DisplayState {
    tree: ExecutionTree,
    surface: Box<dyn Surface>,
}

impl DisplayState {
    fn apply(&mut self, event: &ExecutionEvent) {
        debug!(
            event_type = event.type_name(),
            id = event.id().map(|id| id.as_str()).unwrap_or_default(),
            "Applying execution event"
        );
        if let Err(error) = self.tree.apply(event) {
            warn!(%error, event_type = event.type_name(), "Failed to apply execution event");
        }
    }

    /// Frame for the current target: the full tree view when the surface
    /// redraws in place, the flat forest otherwise.
    fn frame(&self, renderer: &Renderer, now: DateTime<Utc>) -> Frame {
        if self.surface.is_interactive() {
            renderer.render(&self.tree, now)
        } else {
            renderer.render_plain(&self.tree)
        }
    }

    fn redraw(&mut self, renderer: &Renderer, now: DateTime<Utc>) {
        if !self.surface.is_interactive() {
            return;
        }
        let frame = renderer.render(&self.tree, now);
        if let Err(error) = self.surface.draw(&frame) {
            warn!(%error, "Redraw failed, retrying on next tick");
        }
    }
}

struct Worker {
    cancel: CancellationToken,
    handle: JoinHandle<EventQueue>,
}

// =============================================================================
// Live Display
// =============================================================================

/// Real-time tree display of execution events.
///
/// ```no_run
/// # async fn demo() -> livetree::Result<()> {
/// use livetree::{DisplayConfig, EventEmitter, EventSink, ExecutionEvent, LiveDisplay};
///
/// let (emitter, queue) = EventEmitter::channel();
/// let mut display = LiveDisplay::new(queue, DisplayConfig::default());
///
/// display.start().await?;
/// emitter.emit(ExecutionEvent::model_request("m-1", 3));
/// emitter.emit(ExecutionEvent::tool_started("t-1", "scan"));
/// emitter.emit(ExecutionEvent::tool_completed("t-1"));
/// display.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct LiveDisplay {
    config: DisplayConfig,
    renderer: Renderer,
    state: Arc<Mutex<DisplayState>>,
    queue: Option<EventQueue>,
    worker: Option<Worker>,
}

impl std::fmt::Debug for LiveDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveDisplay")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl LiveDisplay {
    /// Create a display drawing on the configured terminal stream.
    pub fn new(queue: EventQueue, config: DisplayConfig) -> Self {
        let surface = TermSurface::for_target(config.target);
        Self::with_surface(queue, config, surface)
    }

    /// Create a display drawing on a custom surface.
    pub fn with_surface(
        queue: EventQueue,
        config: DisplayConfig,
        surface: impl Surface + 'static,
    ) -> Self {
        let state = DisplayState {
            tree: ExecutionTree::with_output_limit(config.max_output_lines),
            surface: Box::new(surface),
        };
        Self {
            renderer: Renderer::from_config(&config),
            config,
            state: Arc::new(Mutex::new(state)),
            queue: Some(queue),
            worker: None,
        }
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    /// Check if the consumption loop is running.
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Start consuming events and drawing. No-op while running.
    ///
    /// Each start begins a new session: the model from the previous one is
    /// discarded, so identities may be reused.
    #[instrument(skip(self), fields(mode = %self.config.mode))]
    pub async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }
        let queue = self.queue.take().ok_or_else(|| {
            Error::QueueUnavailable("lost when a previous session failed".to_string())
        })?;

        {
            let mut state = self.state.lock().await;
            let now = Utc::now();
            state.tree.clear();
            state.tree.mark_session_start(now);
            state.redraw(&self.renderer, now);
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(consume(
            queue,
            Arc::clone(&self.state),
            self.renderer.clone(),
            cancel.clone(),
            self.config.refresh_interval.max(MIN_INTERVAL),
            self.config.poll_interval.max(MIN_INTERVAL),
        ));
        self.worker = Some(Worker { cancel, handle });

        info!("Live display started");
        Ok(())
    }

    /// Stop the display. No-op while stopped.
    ///
    /// Every event queued before this call is applied before the final frame
    /// is produced.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        worker.cancel.cancel();
        let joined = worker.handle.await;
        let mut state = self.state.lock().await;

        let mut queue = match joined {
            Ok(queue) => queue,
            Err(error) => {
                if let Err(error) = state.surface.finish(None) {
                    warn!(%error, "Failed to release surface");
                }
                return Err(Error::worker(error.to_string()));
            }
        };

        let mut drained = 0usize;
        while let Some(event) = queue.try_next() {
            state.apply(&event);
            drained += 1;
        }

        let now = Utc::now();
        state.tree.close_current_phase_at(now);

        let last = self.config.persist.then(|| state.frame(&self.renderer, now));
        if let Err(error) = state.surface.finish(last.as_ref()) {
            warn!(%error, "Failed to write final frame");
        }
        drop(state);

        self.queue = Some(queue);
        info!(drained, "Live display stopped");
        Ok(())
    }

    /// Redraw immediately. No-op while stopped.
    pub async fn update(&self) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }
        self.state.lock().await.redraw(&self.renderer, Utc::now());
        Ok(())
    }

    /// Discard every node and phase. Running state is unaffected.
    pub async fn clear(&self) {
        self.state.lock().await.tree.clear();
    }

    /// Read the current model.
    pub async fn inspect<R>(&self, f: impl FnOnce(&ExecutionTree) -> R) -> R {
        let state = self.state.lock().await;
        f(&state.tree)
    }

    /// Start, run `task` to completion, then stop.
    ///
    /// The display is stopped before the task's output is returned.
    pub async fn run<F: Future>(&mut self, task: F) -> Result<F::Output> {
        self.start().await?;
        let output = task.await;
        self.stop().await?;
        Ok(output)
    }
}

impl Drop for LiveDisplay {
    fn drop(&mut self) {
        if let Some(worker) = &self.worker {
            worker.cancel.cancel();
        }
    }
}

/// Background consumption loop. Returns the queue once cancelled.
async fn consume(
    mut queue: EventQueue,
    state: Arc<Mutex<DisplayState>>,
    renderer: Renderer,
    cancel: CancellationToken,
    refresh: Duration,
    poll: Duration,
) -> EventQueue {
    let mut ticker = tokio::time::interval(refresh);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut closed = false;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                state.lock().await.redraw(&renderer, Utc::now());
            }
            polled = queue.recv_timeout(poll), if !closed => match polled {
                Polled::Event(event) => state.lock().await.apply(&event),
                Polled::Idle => {}
                Polled::Closed => {
                    debug!("All emitters dropped, waiting for stop");
                    closed = true;
                }
            },
        }
    }
    queue
}
