//! Inbound message routing.
//!
//! Each message a subscription delivers is decoded and dispatched: toggle
//! confirmations become state-store merges, readable text outside the
//! command table goes to observers untouched, and malformed payloads are
//! logged and dropped without touching any device state. Routing does no
//! blocking work beyond the store's brief lock, so it is safe to call from
//! a transport delivery context.

use std::sync::mpsc::Receiver;
use std::sync::Arc;

use tracing::debug;

use crate::codec::{decode, Decoded};
use crate::device::Topic;
use crate::notify::{DeviceEvent, FanOut};
use crate::state::{DeviceStateStore, StateDelta};

/// Decodes inbound payloads and routes the result.
pub struct MessageRouter {
    store: Arc<DeviceStateStore>,
    events: FanOut<DeviceEvent>,
}

impl MessageRouter {
    /// Create a router over a shared state store.
    pub fn new(store: Arc<DeviceStateStore>) -> Self {
        Self {
            store,
            events: FanOut::new(),
        }
    }

    /// Register a device-event observer.
    pub fn device_events(&self) -> Receiver<DeviceEvent> {
        self.events.subscribe()
    }

    /// The shared store this router merges into.
    pub fn store(&self) -> &Arc<DeviceStateStore> {
        &self.store
    }

    /// Route one inbound message.
    ///
    /// Topic and payload arrive separately; any `"[topic] payload"` framing
    /// is the transport's presentation concern, not handled here.
    pub fn route(&self, topic: &str, payload: &[u8]) {
        match decode(payload) {
            Ok(Decoded::Toggle { action, on }) => {
                let delta = StateDelta::toggle(action, on);
                match self.store.apply(topic, &delta) {
                    Some(state) => {
                        self.events.notify(DeviceEvent::StateUpdated {
                            topic: Topic::from(topic),
                            state,
                        });
                    }
                    None => {
                        debug!(topic, ?action, "toggle for unregistered topic dropped");
                    }
                }
            }
            Ok(Decoded::Query(kind)) => {
                // A query code coming back inbound carries no state; surface
                // it like any other untabled text.
                self.events.notify(DeviceEvent::Raw {
                    topic: Topic::from(topic),
                    text: kind.code().to_owned(),
                });
            }
            Ok(Decoded::Text(text)) => {
                self.events.notify(DeviceEvent::Raw {
                    topic: Topic::from(topic),
                    text: text.to_owned(),
                });
            }
            Err(err) => {
                debug!(topic, %err, "inbound payload dropped");
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DeviceAction;

    const TOPIC: &str = "9876543210_TTMA3R3P";

    fn router_with_device() -> MessageRouter {
        let store = Arc::new(DeviceStateStore::new());
        store.register(Topic::from(TOPIC));
        MessageRouter::new(store)
    }

    #[test]
    fn toggle_confirmation_updates_store_and_notifies() {
        let router = router_with_device();
        let rx = router.device_events();

        router.route(TOPIC, b"101");

        let state = router.store().get(TOPIC).unwrap();
        assert!(state.motor_on);

        match rx.try_recv().unwrap() {
            DeviceEvent::StateUpdated { topic, state } => {
                assert_eq!(topic.as_str(), TOPIC);
                assert!(state.motor_on);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn off_confirmation_overwrites_optimistic_on() {
        let router = router_with_device();
        // UI optimistically flipped motor on
        router
            .store()
            .apply(TOPIC, &StateDelta::toggle(DeviceAction::Motor, true));

        // Starter confirms off
        router.route(TOPIC, b"100");
        assert!(!router.store().get(TOPIC).unwrap().motor_on);
    }

    #[test]
    fn malformed_payload_is_dropped_silently() {
        let router = router_with_device();
        let rx = router.device_events();

        router.route(TOPIC, b"");
        router.route(TOPIC, &[0xFF, 0xFE]);

        assert!(rx.try_recv().is_err());
        assert_eq!(router.store().get(TOPIC).unwrap(), Default::default());
    }

    #[test]
    fn unknown_text_passes_through_without_state_change() {
        let router = router_with_device();
        let rx = router.device_events();

        router.route(TOPIC, b"SIGNAL 080%");

        assert_eq!(router.store().get(TOPIC).unwrap(), Default::default());
        match rx.try_recv().unwrap() {
            DeviceEvent::Raw { topic, text } => {
                assert_eq!(topic.as_str(), TOPIC);
                assert_eq!(text, "SIGNAL 080%");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn toggle_for_unregistered_topic_is_ignored() {
        let router = router_with_device();
        let rx = router.device_events();

        router.route("stranger_TTMA3R3P", b"101");

        assert!(rx.try_recv().is_err());
        assert!(router.store().get("stranger_TTMA3R3P").is_none());
    }

    #[test]
    fn inbound_query_echo_surfaces_as_raw() {
        let router = router_with_device();
        let rx = router.device_events();

        router.route(TOPIC, b"999");

        match rx.try_recv().unwrap() {
            DeviceEvent::Raw { text, .. } => assert_eq!(text, "999"),
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(router.store().get(TOPIC).unwrap(), Default::default());
    }
}
