//! Per-device state and the store that holds it.
//!
//! The store keeps the last known state of every registered starter, keyed
//! by its bound [`Topic`]. State changes arrive from two directions — the
//! UI applying an optimistic toggle before publish, and the message router
//! applying a decoded confirmation — so [`DeviceStateStore::apply`] merges
//! field-by-field under a single lock: last writer wins per field, and a
//! repeated delta is a no-op.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::codec::DeviceAction;
use crate::device::Topic;

// ============================================================================
// Device State
// ============================================================================

/// Last known state of one starter.
///
/// Created with the power-on defaults at registration time and mutated only
/// through codec-validated deltas.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceState {
    /// Main motor contactor position.
    pub motor_on: bool,
    /// Automatic operation mode.
    pub auto_mode_on: bool,
    /// Phase status reading ("OK" until the starter reports otherwise).
    pub phase: String,
    /// Motor current reading, as reported.
    pub current: String,
    /// GSM signal strength, as reported.
    pub signal: String,
    /// Dry-run protection engaged.
    pub dry_run: bool,
    /// Overload protection tripped.
    pub overload: bool,
    /// Panel lock engaged.
    pub locked: bool,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            motor_on: false,
            auto_mode_on: false,
            phase: "OK".to_owned(),
            current: "00".to_owned(),
            signal: "000%".to_owned(),
            dry_run: false,
            overload: false,
            locked: false,
        }
    }
}

// ============================================================================
// State Delta
// ============================================================================

/// Partial update to a [`DeviceState`].
///
/// Every field is optional; [`DeviceState`] fields without a counterpart in
/// the delta are left untouched. Deltas come from the codec (toggle
/// confirmations) or from the UI's optimistic local step.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StateDelta {
    /// New motor position, if changed.
    pub motor_on: Option<bool>,
    /// New auto-mode position, if changed.
    pub auto_mode_on: Option<bool>,
    /// New phase reading, if reported.
    pub phase: Option<String>,
    /// New current reading, if reported.
    pub current: Option<String>,
    /// New signal reading, if reported.
    pub signal: Option<String>,
    /// New dry-run position, if changed.
    pub dry_run: Option<bool>,
    /// New overload position, if changed.
    pub overload: Option<bool>,
    /// New lock position, if changed.
    pub locked: Option<bool>,
}

impl StateDelta {
    /// Delta flipping a single toggle action.
    pub fn toggle(action: DeviceAction, on: bool) -> Self {
        let mut delta = Self::default();
        match action {
            DeviceAction::Motor => delta.motor_on = Some(on),
            DeviceAction::AutoMode => delta.auto_mode_on = Some(on),
            DeviceAction::DryRun => delta.dry_run = Some(on),
            DeviceAction::Overload => delta.overload = Some(on),
            DeviceAction::Lock => delta.locked = Some(on),
        }
        delta
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn apply_to(&self, state: &mut DeviceState) {
        if let Some(v) = self.motor_on {
            state.motor_on = v;
        }
        if let Some(v) = self.auto_mode_on {
            state.auto_mode_on = v;
        }
        if let Some(v) = &self.phase {
            state.phase = v.clone();
        }
        if let Some(v) = &self.current {
            state.current = v.clone();
        }
        if let Some(v) = &self.signal {
            state.signal = v.clone();
        }
        if let Some(v) = self.dry_run {
            state.dry_run = v;
        }
        if let Some(v) = self.overload {
            state.overload = v;
        }
        if let Some(v) = self.locked {
            state.locked = v;
        }
    }
}

// ============================================================================
// Store
// ============================================================================

/// Thread-safe map of bound topic to last known device state.
///
/// Shared between the UI thread (optimistic updates, snapshots) and the
/// message-delivery context (confirmed updates). The lock is held only for
/// the duration of a single merge or snapshot.
#[derive(Debug, Default)]
pub struct DeviceStateStore {
    devices: Mutex<HashMap<Topic, DeviceState>>,
}

impl DeviceStateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh default state for a newly bound topic.
    ///
    /// Returns `false` if the topic is already present (the existing state
    /// is left untouched).
    pub fn register(&self, topic: Topic) -> bool {
        let mut devices = self.devices.lock().unwrap();
        match devices.entry(topic) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(e) => {
                e.insert(DeviceState::default());
                true
            }
        }
    }

    /// Remove a device's state. Returns the final state if it existed.
    pub fn deregister(&self, topic: &str) -> Option<DeviceState> {
        self.devices.lock().unwrap().remove(topic)
    }

    /// Merge a delta into the state for `topic`.
    ///
    /// Returns the merged snapshot, or `None` (and a diagnostic) when the
    /// topic is not registered — messages for unknown topics change nothing.
    pub fn apply(&self, topic: &str, delta: &StateDelta) -> Option<DeviceState> {
        let mut devices = self.devices.lock().unwrap();
        match devices.get_mut(topic) {
            Some(state) => {
                delta.apply_to(state);
                Some(state.clone())
            }
            None => {
                tracing::debug!(topic, "dropping delta for unregistered topic");
                None
            }
        }
    }

    /// Snapshot of one device's state.
    pub fn get(&self, topic: &str) -> Option<DeviceState> {
        self.devices.lock().unwrap().get(topic).cloned()
    }

    /// Number of registered devices.
    pub fn len(&self) -> usize {
        self.devices.lock().unwrap().len()
    }

    /// True when no device is registered.
    pub fn is_empty(&self) -> bool {
        self.devices.lock().unwrap().is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn topic() -> Topic {
        Topic::from("9876543210_TTMA3R3P")
    }

    #[test]
    fn default_state_matches_power_on_values() {
        let state = DeviceState::default();
        assert!(!state.motor_on);
        assert!(!state.auto_mode_on);
        assert_eq!(state.phase, "OK");
        assert_eq!(state.current, "00");
        assert_eq!(state.signal, "000%");
        assert!(!state.dry_run);
        assert!(!state.overload);
        assert!(!state.locked);
    }

    #[test]
    fn register_inserts_defaults_once() {
        let store = DeviceStateStore::new();
        assert!(store.register(topic()));
        assert!(!store.register(topic()));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(topic().as_str()), Some(DeviceState::default()));
    }

    #[test]
    fn apply_merges_single_field() {
        let store = DeviceStateStore::new();
        store.register(topic());

        let merged = store
            .apply(topic().as_str(), &StateDelta::toggle(DeviceAction::Motor, true))
            .unwrap();
        assert!(merged.motor_on);
        // Everything else untouched
        assert!(!merged.auto_mode_on);
        assert_eq!(merged.phase, "OK");
    }

    #[test]
    fn apply_is_idempotent() {
        let store = DeviceStateStore::new();
        store.register(topic());

        let delta = StateDelta::toggle(DeviceAction::Lock, true);
        let once = store.apply(topic().as_str(), &delta).unwrap();
        let twice = store.apply(topic().as_str(), &delta).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn apply_last_writer_wins_per_field() {
        let store = DeviceStateStore::new();
        store.register(topic());

        store.apply(topic().as_str(), &StateDelta::toggle(DeviceAction::Motor, true));
        let merged = store
            .apply(topic().as_str(), &StateDelta::toggle(DeviceAction::Motor, false))
            .unwrap();
        assert!(!merged.motor_on);
    }

    #[test]
    fn apply_unknown_topic_is_ignored() {
        let store = DeviceStateStore::new();
        let result = store.apply("nobody_TTMA3R3P", &StateDelta::toggle(DeviceAction::Motor, true));
        assert!(result.is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn reading_fields_merge() {
        let store = DeviceStateStore::new();
        store.register(topic());

        let delta = StateDelta {
            phase: Some("R-FAIL".into()),
            current: Some("12".into()),
            signal: Some("080%".into()),
            ..Default::default()
        };
        let merged = store.apply(topic().as_str(), &delta).unwrap();
        assert_eq!(merged.phase, "R-FAIL");
        assert_eq!(merged.current, "12");
        assert_eq!(merged.signal, "080%");
        assert!(!merged.motor_on);
    }

    #[test]
    fn deregister_removes_state() {
        let store = DeviceStateStore::new();
        store.register(topic());
        let last = store.deregister(topic().as_str());
        assert_eq!(last, Some(DeviceState::default()));
        assert!(store.get(topic().as_str()).is_none());
        assert!(store.deregister(topic().as_str()).is_none());
    }

    #[test]
    fn empty_delta_changes_nothing() {
        let store = DeviceStateStore::new();
        store.register(topic());
        assert!(StateDelta::default().is_empty());

        let merged = store.apply(topic().as_str(), &StateDelta::default()).unwrap();
        assert_eq!(merged, DeviceState::default());
    }

    #[test]
    fn concurrent_apply_from_two_threads() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(DeviceStateStore::new());
        store.register(topic());

        let a = Arc::clone(&store);
        let b = Arc::clone(&store);

        let h1 = thread::spawn(move || {
            for _ in 0..100 {
                a.apply(
                    "9876543210_TTMA3R3P",
                    &StateDelta::toggle(DeviceAction::Motor, true),
                );
            }
        });
        let h2 = thread::spawn(move || {
            for _ in 0..100 {
                b.apply(
                    "9876543210_TTMA3R3P",
                    &StateDelta::toggle(DeviceAction::AutoMode, true),
                );
            }
        });

        h1.join().unwrap();
        h2.join().unwrap();

        let state = store.get("9876543210_TTMA3R3P").unwrap();
        assert!(state.motor_on);
        assert!(state.auto_mode_on);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn state_serializes_for_ui() {
        let json = serde_json::to_string(&DeviceState::default()).unwrap();
        assert!(json.contains("\"motor_on\":false"));
        assert!(json.contains("\"signal\":\"000%\""));
    }
}
