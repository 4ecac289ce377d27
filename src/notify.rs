//! Observer fan-out for status and device events.
//!
//! The connection state machine and the message router both publish events
//! to whoever is listening (typically the UI layer). Delivery must never
//! block a state transition, so each observer gets its own unbounded channel
//! and consumes at its own pace. Zero observers is fine; dead observers are
//! pruned on the next notify.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;

use crate::device::Topic;
use crate::state::DeviceState;

// ============================================================================
// Events
// ============================================================================

/// Connection-status transition, in the order generated.
///
/// The UI renders only the latest one.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusEvent {
    /// Whether the broker connection is up.
    pub connected: bool,
    /// Human-readable detail ("connected", "connection lost: ...", ...).
    pub detail: String,
}

impl StatusEvent {
    /// Build a status event.
    pub fn new(connected: bool, detail: impl Into<String>) -> Self {
        Self {
            connected,
            detail: detail.into(),
        }
    }
}

/// Something arrived on a device's channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceEvent {
    /// A decoded toggle confirmation was merged into the store.
    StateUpdated {
        /// Topic the message arrived on.
        topic: Topic,
        /// Snapshot after the merge.
        state: DeviceState,
    },
    /// Readable text outside the command table, passed through untouched.
    Raw {
        /// Topic the message arrived on.
        topic: Topic,
        /// The payload text.
        text: String,
    },
}

// ============================================================================
// Fan-out
// ============================================================================

/// Multi-observer fan-out over per-observer handoff queues.
///
/// `notify` clones the event into every live observer's channel and returns
/// immediately; it never blocks and never fails. Observer order is
/// unspecified, but each observer sees events in generation order.
#[derive(Debug, Default)]
pub struct FanOut<T> {
    observers: Mutex<Vec<Sender<T>>>,
}

impl<T: Clone> FanOut<T> {
    /// Create a fan-out with no observers.
    pub fn new() -> Self {
        Self {
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Register an observer; events are consumed from the returned receiver.
    pub fn subscribe(&self) -> Receiver<T> {
        let (tx, rx) = mpsc::channel();
        self.observers.lock().unwrap().push(tx);
        rx
    }

    /// Deliver an event to every live observer.
    pub fn notify(&self, event: T) {
        let mut observers = self.observers.lock().unwrap();
        observers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Number of live observers (as of the last notify).
    pub fn observer_count(&self) -> usize {
        self.observers.lock().unwrap().len()
    }
}

// ============================================================================
// Tests
// ============================================================================
