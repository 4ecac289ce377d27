//! Mock transport for testing without a broker.
//!
//! [`MockLink`] records every transport operation and lets tests inject
//! inbound messages, connect/subscribe/publish failures, and lost-connection
//! signals. All fields are public for direct inspection.
//!
//! # Example
//!
//! ```rust
//! use fieldlink::config::BrokerConfig;
//! use fieldlink::hal::MockLink;
//! use fieldlink::traits::CommandLink;
//!
//! let mut link = MockLink::new();
//! link.connect(&BrokerConfig::default()).unwrap();
//! link.subscribe("9876543210_TTMA3R3P").unwrap();
//! link.publish("9876543210_TTMA3R3P", b"101").unwrap();
//!
//! assert!(link.is_subscribed("9876543210_TTMA3R3P"));
//! assert_eq!(link.published.len(), 1);
//! ```

use crate::config::BrokerConfig;
use crate::traits::{CommandLink, LinkMessage};

/// Mock transport that captures operations and injects faults.
#[derive(Debug, Default)]
pub struct MockLink {
    /// Whether the session is up.
    pub connected: bool,
    /// Number of sessions successfully opened.
    pub connect_calls: usize,
    /// Number of transport disconnects performed.
    pub disconnect_calls: usize,
    /// Fail the next N connect attempts.
    pub fail_connects: usize,
    /// Fail the next N subscribe attempts.
    pub fail_subscribes: usize,
    /// Fail the next N publish attempts.
    pub fail_publishes: usize,
    /// Messages that have been published (topic, payload).
    pub published: Vec<(String, Vec<u8>)>,
    /// Topics subscribed, one entry per subscribe call.
    pub subscriptions: Vec<String>,
    /// Queue of inbound messages returned by `try_recv`.
    pub incoming: Vec<LinkMessage>,
    /// Pending lost-connection cause, taken by `take_lost`.
    pub pending_loss: Option<String>,
    /// Last config passed to `connect`.
    pub last_config: Option<BrokerConfig>,
}

impl MockLink {
    /// Create a disconnected mock link.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an inbound message.
    pub fn queue_message(&mut self, topic: impl Into<String>, payload: impl Into<Vec<u8>>) {
        self.incoming.push(LinkMessage {
            topic: topic.into(),
            payload: payload.into(),
        });
    }

    /// Simulate the transport noticing a lost connection.
    pub fn inject_loss(&mut self, cause: impl Into<String>) {
        self.connected = false;
        self.pending_loss = Some(cause.into());
    }

    /// Check if a topic was subscribed to.
    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.subscriptions.iter().any(|t| t == topic)
    }

    /// Published payloads for a topic.
    pub fn published_to(&self, topic: &str) -> Vec<&[u8]> {
        self.published
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.as_slice())
            .collect()
    }
}

impl CommandLink for MockLink {
    type Error = String;

    fn connect(&mut self, config: &BrokerConfig) -> Result<(), String> {
        if self.fail_connects > 0 {
            self.fail_connects -= 1;
            return Err("broker unreachable".to_owned());
        }
        self.connected = true;
        self.connect_calls += 1;
        self.last_config = Some(config.clone());
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), String> {
        self.connected = false;
        self.disconnect_calls += 1;
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), String> {
        if self.fail_subscribes > 0 {
            self.fail_subscribes -= 1;
            return Err("subscribe rejected".to_owned());
        }
        self.subscriptions.push(topic.into());
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), String> {
        if self.fail_publishes > 0 {
            self.fail_publishes -= 1;
            return Err("send buffer closed".to_owned());
        }
        self.published.push((topic.into(), payload.to_vec()));
        Ok(())
    }

    fn try_recv(&mut self) -> Option<LinkMessage> {
        if self.incoming.is_empty() {
            None
        } else {
            Some(self.incoming.remove(0))
        }
    }

    fn take_lost(&mut self) -> Option<String> {
        self.pending_loss.take()
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

// ============================================================================
// Tests
// ============================================================================
