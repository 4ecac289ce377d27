//! MQTT transport and service runner (feature-gated).
//!
//! The protocol core is transport-agnostic; this module supplies the real
//! thing behind the `mqtt` feature:
//!
//! - [`mqtt::RumqttcLink`]: a [`CommandLink`](crate::traits::CommandLink)
//!   over the synchronous `rumqttc` client, one fresh session per connect.
//! - [`mqtt::LinkService`]: a tokio task that owns the controller and
//!   serializes UI requests into it through a channel, so every state
//!   transition runs on one thread of control.

#[cfg(feature = "mqtt")]
pub mod mqtt;

#[cfg(feature = "mqtt")]
pub use mqtt::*;
