//! Broker transport abstraction.
//!
//! [`CommandLink`] models the slice of a pub/sub client the protocol core
//! actually needs: open and close a session, subscribe one topic, publish
//! raw command bytes, poll for inbound messages, and report a lost
//! connection. Delivery is at-least-once in both directions — a message may
//! arrive more than once but the transport never silently drops one.
//!
//! # Implementation Notes
//!
//! - `connect` must be bounded by [`BrokerConfig::connect_timeout_secs`];
//!   a hung broker surfaces as an error, not a stuck caller.
//! - `try_recv` and `take_lost` never block; they are polled from the
//!   controller's pump.
//! - Sessions are clean: a reconnect starts with no subscriptions, so the
//!   state machine resubscribes explicitly every time.

use crate::config::BrokerConfig;

/// Transport client for the command channel.
pub trait CommandLink {
    /// Error type for transport operations.
    type Error: core::fmt::Display;

    /// Open a session to the broker described by `config` (blocking,
    /// bounded by the configured connect timeout).
    fn connect(&mut self, config: &BrokerConfig) -> Result<(), Self::Error>;

    /// Tear down the session. Safe to call when already closed.
    fn disconnect(&mut self) -> Result<(), Self::Error>;

    /// Subscribe to a topic at at-least-once delivery.
    fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error>;

    /// Publish raw payload bytes to a topic at at-least-once delivery.
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), Self::Error>;

    /// Next inbound message, if one is queued (never blocks).
    fn try_recv(&mut self) -> Option<LinkMessage>;

    /// Take a pending lost-connection signal, if the transport noticed one
    /// since the last call (never blocks).
    fn take_lost(&mut self) -> Option<String> {
        None
    }

    /// Whether the session is currently up.
    fn is_connected(&self) -> bool;
}

/// An inbound message from a subscription.
///
/// Topic and payload arrive separately; the core never sees transport
/// framing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkMessage {
    /// Topic the message was published to.
    pub topic: String,
    /// Message payload as raw bytes.
    pub payload: Vec<u8>,
}

impl LinkMessage {
    /// Create a new link message.
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Returns the payload as a UTF-8 string, if valid.
    pub fn payload_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.payload).ok()
    }
}
