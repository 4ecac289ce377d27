//! Field controller: ties registration, state, codec, and connection together.
//!
//! This is the surface the (excluded) UI layer talks to. Registration events
//! come in, status and device events go out, and every toggle runs the same
//! two explicit steps the starters expect:
//!
//! 1. apply the optimistic local delta to the state store — works with or
//!    without a live connection, so the UI reflects intent immediately;
//! 2. encode and publish the wire command to the bound topic.
//!
//! The broker carries one session with one bound topic. The first registered
//! device binds it; devices added later share the connection without
//! rebinding it.
//!
//! # Example
//!
//! ```rust
//! use fieldlink::codec::DeviceAction;
//! use fieldlink::config::BrokerConfig;
//! use fieldlink::controller::FieldController;
//! use fieldlink::device::{DeviceRegistration, DeviceType};
//! use fieldlink::hal::MockLink;
//!
//! let mut controller = FieldController::new(MockLink::new(), BrokerConfig::default());
//! let reg = DeviceRegistration::new("9876543210", "Field1", DeviceType::Ttma3r3p).unwrap();
//! let topic = controller.register(reg, 0).unwrap();
//!
//! controller.toggle(topic.as_str(), DeviceAction::Motor, true).unwrap();
//! assert!(controller.state(topic.as_str()).unwrap().motor_on);
//! ```

use std::sync::mpsc::Receiver;
use std::sync::Arc;

use thiserror::Error;

use crate::codec::{encode, Command, DeviceAction, QueryKind};
use crate::config::BrokerConfig;
use crate::connection::{ConnectionManager, ConnectionState, PublishError, PublishOutcome};
use crate::device::{DeviceRegistration, RegistrationError, Topic};
use crate::notify::{DeviceEvent, StatusEvent};
use crate::router::MessageRouter;
use crate::state::{DeviceState, DeviceStateStore, StateDelta};
use crate::traits::CommandLink;

/// A toggle or query was refused before reaching the wire.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ControlError {
    /// No device is registered under the given topic.
    #[error("no device registered for topic {0}")]
    UnknownDevice(String),
    /// The transport rejected the send.
    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Controller-side protocol core for one broker connection.
pub struct FieldController<L: CommandLink> {
    connection: ConnectionManager<L>,
    store: Arc<DeviceStateStore>,
    router: MessageRouter,
    registrations: Vec<DeviceRegistration>,
}

impl<L: CommandLink> FieldController<L> {
    /// Create a controller over a transport link.
    pub fn new(link: L, config: BrokerConfig) -> Self {
        let store = Arc::new(DeviceStateStore::new());
        Self {
            connection: ConnectionManager::new(link, config),
            router: MessageRouter::new(Arc::clone(&store)),
            store,
            registrations: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register a device and, for the first device, bind its topic to a new
    /// broker session.
    ///
    /// Validation failures return before anything is bound. Devices after
    /// the first get state tracking but do not rebind the active connection.
    pub fn register(
        &mut self,
        registration: DeviceRegistration,
        now_ms: u64,
    ) -> Result<Topic, RegistrationError> {
        let topic = registration.topic();
        if !self.store.register(topic.clone()) {
            return Err(RegistrationError::Duplicate);
        }

        let first = self.registrations.is_empty();
        self.registrations.push(registration);

        if first {
            self.connection.connect(&topic, now_ms);
        }
        Ok(topic)
    }

    /// Remove a device's state. The connection, if bound to this topic,
    /// stays up — the session outlives its devices.
    pub fn deregister(&mut self, topic: &str) -> Option<DeviceState> {
        self.registrations.retain(|r| r.topic().as_str() != topic);
        self.store.deregister(topic)
    }

    /// Registered devices, in registration order.
    pub fn registrations(&self) -> &[DeviceRegistration] {
        &self.registrations
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Switch an action on a registered device.
    ///
    /// Step one applies the optimistic local delta; step two publishes the
    /// command. The local step always happens for a known device, even when
    /// the session is down and the publish is skipped.
    pub fn toggle(
        &mut self,
        topic: &str,
        action: DeviceAction,
        on: bool,
    ) -> Result<PublishOutcome, ControlError> {
        let delta = StateDelta::toggle(action, on);
        if self.store.apply(topic, &delta).is_none() {
            return Err(ControlError::UnknownDevice(topic.to_owned()));
        }

        let command = encode(action, on);
        Ok(self.connection.publish(&command)?)
    }

    /// Request a fresh reading. No local state changes until the starter
    /// answers.
    pub fn query(&mut self, kind: QueryKind) -> Result<PublishOutcome, PublishError> {
        self.connection.publish(&Command::query(kind))
    }

    /// Ask the starter to re-report everything.
    pub fn refresh(&mut self) -> Result<PublishOutcome, PublishError> {
        self.query(QueryKind::RefreshAll)
    }

    // ------------------------------------------------------------------
    // Pump
    // ------------------------------------------------------------------

    /// Drive the protocol core: surface a pending transport loss, fire a due
    /// reconnect, and route every queued inbound message.
    ///
    /// Call regularly (the transport service ticks this at 100 ms) with a
    /// monotonic timestamp.
    pub fn poll(&mut self, now_ms: u64) {
        if let Some(cause) = self.connection.link_mut().take_lost() {
            self.connection.connection_lost(&cause, now_ms);
        }

        self.connection.tick(now_ms);

        while let Some(msg) = self.connection.link_mut().try_recv() {
            self.router.route(&msg.topic, &msg.payload);
        }
    }

    /// Transport-level loss signal (for transports that push rather than
    /// queue their loss notification).
    pub fn connection_lost(&mut self, cause: &str, now_ms: u64) {
        self.connection.connection_lost(cause, now_ms);
    }

    /// Tear down the session and cancel any pending reconnect.
    pub fn disconnect(&mut self) {
        self.connection.disconnect();
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    /// Current connection lifecycle state.
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Whether the broker session is up.
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Topic bound to the active session, if any.
    pub fn bound_topic(&self) -> Option<&Topic> {
        self.connection.bound_topic()
    }

    /// Register a connection-status observer.
    pub fn status_events(&self) -> Receiver<StatusEvent> {
        self.connection.status_events()
    }

    /// Register a device-event observer.
    pub fn device_events(&self) -> Receiver<DeviceEvent> {
        self.router.device_events()
    }

    /// Snapshot of one device's state.
    pub fn state(&self, topic: &str) -> Option<DeviceState> {
        self.store.get(topic)
    }

    /// Shared handle to the state store (for UI-side reads).
    pub fn store(&self) -> Arc<DeviceStateStore> {
        Arc::clone(&self.store)
    }

    /// Access the transport link (tests, transport services).
    pub fn link_mut(&mut self) -> &mut L {
        self.connection.link_mut()
    }
}

// ============================================================================
// Tests
// ============================================================================
