//! Broker connection lifecycle state machine.
//!
//! [`ConnectionManager`] is the single owner of the connection state and the
//! bound topic. Everything that can change either — connect, loss detection,
//! the deferred reconnect, disconnect — goes through `&mut self` here, so a
//! loss signal and a user-initiated disconnect can never interleave into an
//! inconsistent state.
//!
//! # Lifecycle
//!
//! ```text
//! Disconnected ──connect──▶ Connecting ──ok──▶ Connected
//!       ▲                        │                 │ loss
//!       │                        ▼ err             ▼
//!       └──────disconnect─── (notify)         Reconnecting ──5s──▶ Connecting ...
//! ```
//!
//! A failed initial connect stays `Disconnected` — no retry is scheduled.
//! A lost connection retries forever on a fixed 5-second delay with no
//! backoff growth; that matches the deployed starters' expectations.
//!
//! The delay is a stored deadline, not a sleep: callers pump [`tick`] with a
//! monotonic `now_ms` and the reconnect fires on the first tick at or past
//! the deadline. `disconnect()` clears the deadline, so no timer can
//! reconnect a session the user closed.
//!
//! [`tick`]: ConnectionManager::tick

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::codec::Command;
use crate::config::BrokerConfig;
use crate::device::Topic;
use crate::notify::{FanOut, StatusEvent};
use crate::traits::CommandLink;

// ============================================================================
// State
// ============================================================================

/// Where the connection lifecycle currently stands.
///
/// Owned exclusively by [`ConnectionManager`]; observers learn about
/// transitions through [`StatusEvent`]s.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session, none pending. Initial state, and terminal after an
    /// explicit `disconnect()`.
    #[default]
    Disconnected,
    /// A transport connect is in flight.
    Connecting,
    /// Session up, bound topic subscribed.
    Connected,
    /// Session lost; a reconnect is scheduled.
    Reconnecting,
}

/// What `publish` did with the command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Handed to the transport.
    Sent,
    /// Dropped because no session is up. A live control command has no
    /// meaning once disconnected, so this is a no-op, not an error.
    Skipped,
}

/// The transport accepted a session but rejected the send.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("publish failed: {0}")]
pub struct PublishError(
    /// Transport-reported reason.
    pub String,
);

// ============================================================================
// Connection Manager
// ============================================================================

/// Owns the transport link, the connection state, and the bound topic.
pub struct ConnectionManager<L: CommandLink> {
    link: L,
    config: BrokerConfig,
    state: ConnectionState,
    bound_topic: Option<Topic>,
    reconnect_due_ms: Option<u64>,
    status: FanOut<StatusEvent>,
}

impl<L: CommandLink> ConnectionManager<L> {
    /// Create a manager around a transport link, starting `Disconnected`.
    pub fn new(link: L, config: BrokerConfig) -> Self {
        Self {
            link,
            config,
            state: ConnectionState::Disconnected,
            bound_topic: None,
            reconnect_due_ms: None,
            status: FanOut::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether a session is up.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Topic bound to the active session, if any.
    pub fn bound_topic(&self) -> Option<&Topic> {
        self.bound_topic.as_ref()
    }

    /// Register a status observer.
    pub fn status_events(&self) -> std::sync::mpsc::Receiver<StatusEvent> {
        self.status.subscribe()
    }

    /// Access the transport (for draining inbound messages).
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Open a session and bind `topic` to it.
    ///
    /// Valid from `Disconnected` or `Reconnecting`; anywhere else the call
    /// is ignored. Outcomes surface as status events, never as errors: on
    /// success the state is `Connected` with the topic subscribed; an
    /// initial-connect failure stays `Disconnected` with no retry, while a
    /// failed reconnect attempt re-arms the fixed delay and tries again.
    pub fn connect(&mut self, topic: &Topic, now_ms: u64) {
        match self.state {
            ConnectionState::Disconnected | ConnectionState::Reconnecting => {}
            other => {
                debug!(state = ?other, "connect ignored");
                return;
            }
        }

        let retrying = self.state == ConnectionState::Reconnecting;
        self.state = ConnectionState::Connecting;

        match self.link.connect(&self.config) {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                self.bound_topic = Some(topic.clone());
                self.reconnect_due_ms = None;
                info!(%topic, "connected");
                self.status.notify(StatusEvent::new(true, "connected"));

                // Clean session: nothing survives on the broker side, so
                // every session subscribes from scratch.
                if let Err(e) = self.link.subscribe(topic.as_str()) {
                    warn!(%topic, error = %e, "subscribe failed");
                    self.status
                        .notify(StatusEvent::new(true, format!("subscribe failed: {e}")));
                }
            }
            Err(e) => {
                warn!(error = %e, retrying, "connect failed");
                self.status
                    .notify(StatusEvent::new(false, format!("connection failed: {e}")));
                if retrying {
                    self.state = ConnectionState::Reconnecting;
                    self.reconnect_due_ms = Some(now_ms + self.config.reconnect_delay_ms);
                } else {
                    self.state = ConnectionState::Disconnected;
                }
            }
        }
    }

    /// Transport-level lost-connection signal.
    ///
    /// Only meaningful while `Connected`: transitions to `Reconnecting`,
    /// emits one status notification, and arms the fixed reconnect delay.
    pub fn connection_lost(&mut self, cause: &str, now_ms: u64) {
        if self.state != ConnectionState::Connected {
            debug!(state = ?self.state, cause, "loss signal ignored");
            return;
        }

        warn!(cause, "connection lost");
        self.state = ConnectionState::Reconnecting;
        self.reconnect_due_ms = Some(now_ms + self.config.reconnect_delay_ms);
        self.status
            .notify(StatusEvent::new(false, format!("connection lost: {cause}")));
    }

    /// Fire the pending reconnect once its deadline has elapsed.
    ///
    /// Call regularly with a monotonic timestamp; does nothing while no
    /// reconnect is due.
    pub fn tick(&mut self, now_ms: u64) {
        if self.state != ConnectionState::Reconnecting {
            return;
        }
        let Some(due) = self.reconnect_due_ms else {
            return;
        };
        if now_ms < due {
            return;
        }

        self.reconnect_due_ms = None;
        let Some(topic) = self.bound_topic.clone() else {
            // Lost the binding somehow; nothing to reconnect to.
            self.state = ConnectionState::Disconnected;
            return;
        };
        debug!(%topic, "reconnect deadline elapsed");
        self.connect(&topic, now_ms);
    }

    /// Publish a command to the bound topic.
    ///
    /// A no-op when no session is up. Transport rejections come back as an
    /// error the caller may retry; the core will not.
    pub fn publish(&mut self, command: &Command) -> Result<PublishOutcome, PublishError> {
        if self.state != ConnectionState::Connected {
            debug!(code = command.code, "publish skipped while not connected");
            return Ok(PublishOutcome::Skipped);
        }
        let Some(topic) = self.bound_topic.clone() else {
            return Ok(PublishOutcome::Skipped);
        };

        match self.link.publish(topic.as_str(), command.code.as_bytes()) {
            Ok(()) => {
                debug!(%topic, code = command.code, "published");
                Ok(PublishOutcome::Sent)
            }
            Err(e) => {
                warn!(%topic, code = command.code, error = %e, "publish failed");
                Err(PublishError(e.to_string()))
            }
        }
    }

    /// Tear down the session from any state.
    ///
    /// Cancels a pending reconnect, so no stale timer can reopen a session
    /// the user closed. Idempotent: a second call changes nothing and emits
    /// nothing.
    pub fn disconnect(&mut self) {
        if self.state == ConnectionState::Disconnected {
            return;
        }

        self.reconnect_due_ms = None;
        if let Err(e) = self.link.disconnect() {
            debug!(error = %e, "transport disconnect reported an error");
        }
        self.state = ConnectionState::Disconnected;
        info!("disconnected");
        self.status.notify(StatusEvent::new(false, "disconnected"));
    }
}

// ============================================================================
// Tests
// ============================================================================
