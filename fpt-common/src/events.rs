//! Change notification for the matrix and saved features
//!
//! Whoever holds the table publishes here after every change; interested
//! parts of the process subscribe instead of polling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::store::SourceKind;

/// FPT event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MatrixEvent {
    /// A new table was accepted by `replace`
    TableReplaced {
        row_count: usize,
        /// Sink that holds the authoritative copy
        source: SourceKind,
        last_modified: DateTime<Utc>,
        /// Set when one sink failed
        warning: Option<String>,
    },

    /// Resolution ran again and the in-memory table was swapped
    TableRefreshed {
        row_count: usize,
        source: SourceKind,
        last_modified: Option<DateTime<Utc>>,
    },

    /// The saved feature set was replaced
    FeaturesReplaced { count: usize },
}

/// Broadcast channel for `MatrixEvent`s
///
/// Slow subscribers lose the oldest events once `capacity` is exceeded.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MatrixEvent>,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<MatrixEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: MatrixEvent,
    ) -> Result<usize, broadcast::error::SendError<MatrixEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: MatrixEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}
