//! # fieldlink
//!
//! Connection and command protocol core for controlling remote field motor
//! starters (irrigation pumps) over an MQTT broker.
//!
//! ## Features
//!
//! - **Fixed-width codec**: every starter action is a 3-digit ASCII command
//!   with an exact on/off pair; inbound payloads decode back into state
//!   deltas without ever panicking on garbage
//! - **Connection state machine**: connect, subscribe, detect loss,
//!   reconnect on a fixed 5-second delay, resubscribe — with a pending
//!   reconnect that an explicit disconnect reliably cancels
//! - **Optimistic state sync**: toggles apply locally first, then publish;
//!   inbound confirmations overwrite field by field, last writer wins
//! - **Observer fan-out**: status and device events go out over per-observer
//!   channels that never block the state machine
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without a broker:
//!
//! - `codec` - Command table, encoding, and payload classification
//! - `device` - Registration validation and topic binding
//! - `state` - Per-device state and the shared store
//! - `connection` - The connection lifecycle state machine
//! - `router` / `notify` - Inbound routing and observer fan-out
//! - `controller` - The surface the UI layer talks to
//! - `traits` / `hal` - Transport seam and its mock
//! - `services` - Real MQTT transport over rumqttc (feature `mqtt`)
//!
//! ## Example
//!
//! ```rust
//! use fieldlink::{
//!     codec::DeviceAction,
//!     config::BrokerConfig,
//!     controller::FieldController,
//!     device::{DeviceRegistration, DeviceType},
//!     hal::MockLink,
//! };
//!
//! let mut controller = FieldController::new(MockLink::new(), BrokerConfig::default());
//!
//! // First registration binds the topic and opens the session
//! let reg = DeviceRegistration::new("9876543210", "Field1", DeviceType::Ttma3r3p).unwrap();
//! let topic = controller.register(reg, 0).unwrap();
//! assert_eq!(topic.as_str(), "9876543210_TTMA3R3P");
//!
//! // Optimistic local flip + published "101"
//! controller.toggle(topic.as_str(), DeviceAction::Motor, true).unwrap();
//!
//! // Pump the core from your loop: reconnect deadlines + inbound messages
//! controller.poll(100);
//! ```

#![warn(missing_docs)]

/// Fixed-width command codec: table, encoding, decoding.
pub mod codec;
/// Broker connection configuration.
pub mod config;
/// Connection lifecycle state machine.
pub mod connection;
/// Controller surface tying registration, state, and connection together.
pub mod controller;
/// Device registration and topic binding.
pub mod device;
/// Mock transport implementation for testing.
pub mod hal;
/// Observer fan-out for status and device events.
pub mod notify;
/// Inbound message routing.
pub mod router;
/// Per-device state and the store that holds it.
pub mod state;
/// Transport abstraction traits.
pub mod traits;

/// MQTT transport and service runner (feature-gated).
#[cfg(feature = "mqtt")]
pub mod services;

// Re-exports for convenience
pub use codec::{decode, encode, Command, CommandMeaning, DecodeError, Decoded, DeviceAction, QueryKind};
pub use config::BrokerConfig;
pub use connection::{ConnectionManager, ConnectionState, PublishError, PublishOutcome};
pub use controller::{ControlError, FieldController};
pub use device::{DeviceRegistration, DeviceType, RegistrationError, Topic};
pub use notify::{DeviceEvent, FanOut, StatusEvent};
pub use router::MessageRouter;
pub use state::{DeviceState, DeviceStateStore, StateDelta};
pub use traits::{CommandLink, LinkMessage};

#[cfg(feature = "mqtt")]
pub use services::{ControlRequest, LinkError, LinkHandle, LinkService, RumqttcLink};
