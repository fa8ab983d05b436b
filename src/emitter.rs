//! Event emission from producers to the display.
//!
//! An [`EventEmitter`] is created once per display session together with its
//! [`EventQueue`]. The emitter is cheap to clone and is handed to every
//! producer; the queue is handed to the
//! [`LiveDisplay`](crate::display::LiveDisplay). Emitting never blocks and
//! never fails from the producer's point of view.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, warn};

use crate::event::ExecutionEvent;

/// Anything producers can push execution events into.
pub trait EventSink: Send + Sync {
    /// Emit an execution event.
    fn emit(&self, event: ExecutionEvent);
}

#[derive(Debug)]
struct EmitterFlags {
    enabled: AtomicBool,
    interactive: AtomicBool,
    show_visualization: AtomicBool,
}

impl Default for EmitterFlags {
    fn default() -> Self {
        Self {
            enabled: AtomicBool::new(true),
            interactive: AtomicBool::new(false),
            show_visualization: AtomicBool::new(false),
        }
    }
}

/// Queue-backed emitter shared by all producers of one session.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    sender: mpsc::UnboundedSender<ExecutionEvent>,
    flags: Arc<EmitterFlags>,
}

impl EventEmitter {
    /// Create an emitter and the queue that receives its events.
    pub fn channel() -> (Self, EventQueue) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let emitter = Self {
            sender,
            flags: Arc::new(EmitterFlags::default()),
        };
        (emitter, EventQueue { receiver })
    }

    /// Decode a JSON event and emit it. Malformed payloads are logged and
    /// dropped.
    pub fn emit_json(&self, payload: &str) {
        match ExecutionEvent::from_json(payload) {
            Ok(event) => self.emit(event),
            Err(error) => warn!(%error, "Dropping malformed execution event payload"),
        }
    }

    /// Resume emission.
    pub fn enable(&self) {
        self.flags.enabled.store(true, Ordering::Relaxed);
    }

    /// Silently drop every event emitted until [`enable`](Self::enable).
    pub fn disable(&self) {
        self.flags.enabled.store(false, Ordering::Relaxed);
    }

    /// Check if emission is enabled.
    pub fn is_enabled(&self) -> bool {
        self.flags.enabled.load(Ordering::Relaxed)
    }

    /// Record whether the host runs interactively and wants the live view.
    ///
    /// The flags live on the emitter so every producer task sees the same
    /// answer without any ambient context.
    pub fn set_interactive_mode(&self, interactive: bool, show_visualization: bool) {
        self.flags.interactive.store(interactive, Ordering::Relaxed);
        self.flags
            .show_visualization
            .store(show_visualization, Ordering::Relaxed);
    }

    /// True only when running interactively with visualization enabled.
    pub fn is_interactive_mode(&self) -> bool {
        self.flags.interactive.load(Ordering::Relaxed)
            && self.flags.show_visualization.load(Ordering::Relaxed)
    }

    /// Check whether the receiving queue has been dropped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl EventSink for EventEmitter {
    fn emit(&self, event: ExecutionEvent) {
        if !self.is_enabled() {
            return;
        }
        if self.sender.send(event).is_err() {
            debug!("Execution event dropped, display queue is gone");
        }
    }
}

/// Outcome of a bounded wait on the queue.
#[derive(Debug, PartialEq)]
pub enum Polled {
    /// The next event in arrival order
    Event(ExecutionEvent),
    /// Nothing arrived within the wait
    Idle,
    /// Every emitter has been dropped and the queue is empty
    Closed,
}

/// Receiving side of an [`EventEmitter`]; single consumer.
#[derive(Debug)]
pub struct EventQueue {
    receiver: mpsc::UnboundedReceiver<ExecutionEvent>,
}

impl EventQueue {
    /// Wait at most `wait` for the next event.
    ///
    /// Cancel safe: dropping the future never loses an event.
    pub async fn recv_timeout(&mut self, wait: Duration) -> Polled {
        match tokio::time::timeout(wait, self.receiver.recv()).await {
            Ok(Some(event)) => Polled::Event(event),
            Ok(None) => Polled::Closed,
            Err(_) => Polled::Idle,
        }
    }

    /// Pop an already-queued event without waiting.
    pub fn try_next(&mut self) -> Option<ExecutionEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Discard all pending events, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let mut dropped = 0;
        while self.try_next().is_some() {
            dropped += 1;
        }
        dropped
    }

    /// Number of events waiting.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Check if no events are waiting.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

/// Collecting sink that stores events in a Vec.
#[derive(Debug, Default, Clone)]
pub struct CollectingEmitter {
    events: Arc<Mutex<Vec<ExecutionEvent>>>,
}

impl CollectingEmitter {
    /// Create new collecting emitter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get collected events.
    pub fn events(&self) -> Vec<ExecutionEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Clear collected events.
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Replay everything collected so far into another sink.
    pub fn replay_into(&self, sink: &dyn EventSink) {
        for event in self.events() {
            sink.emit(event);
        }
    }
}

impl EventSink for CollectingEmitter {
    fn emit(&self, event: ExecutionEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// Null sink that discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEmitter;

impl EventSink for NullEmitter {
    fn emit(&self, _event: ExecutionEvent) {}
}
