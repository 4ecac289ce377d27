//! Device registration and topic binding.
//!
//! A controller learns about a field starter through a registration event
//! from the UI layer: the owner's mobile identifier, a free-form field name,
//! and the starter model. The broker-side device subscribes to a topic
//! derived from that registration, so the binding rule here must match the
//! firmware exactly — same casing, same `_` separator.
//!
//! # Example
//!
//! ```rust
//! use fieldlink::device::{DeviceRegistration, DeviceType};
//!
//! let reg = DeviceRegistration::new("9876543210", "Field1", DeviceType::Ttma3r3p).unwrap();
//! assert_eq!(reg.topic().as_str(), "9876543210_TTMA3R3P");
//! ```

use core::borrow::Borrow;
use core::fmt;

use thiserror::Error;

/// Upper bound on `owner_id` and `field_name` length, in characters.
pub const MAX_FIELD_CHARS: usize = 10;

// ============================================================================
// Device Type
// ============================================================================

/// Starter model catalog.
///
/// Matches the broker-side firmware identifiers character for character;
/// the topic bind uses the wire name verbatim.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceType {
    /// Three-phase motor starter, 3 relay outputs.
    #[default]
    Ttma3r3p,
}

impl DeviceType {
    /// Wire name used in topic binding.
    pub const fn as_str(self) -> &'static str {
        match self {
            DeviceType::Ttma3r3p => "TTMA3R3P",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for DeviceType {
    type Err = RegistrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TTMA3R3P" => Ok(DeviceType::Ttma3r3p),
            _ => Err(RegistrationError::UnknownDeviceType),
        }
    }
}

// ============================================================================
// Topic
// ============================================================================

/// Broker topic bound to one device: `"<owner_id>_<device_type>"`.
///
/// Always recomputed from a [`DeviceRegistration`]; never edited after the
/// fact. Broker-side devices match on exact string equality, so the value
/// preserves registration casing verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Topic(String);

impl Topic {
    /// The topic as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Topic {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Topic {
    fn from(s: &str) -> Self {
        Topic(s.to_owned())
    }
}

// ============================================================================
// Registration
// ============================================================================

/// Identifier tuple supplied by the UI when a device is added.
///
/// Immutable once constructed; [`DeviceRegistration::new`] is the only way
/// in and it validates the input, so every live registration can bind a
/// topic.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceRegistration {
    owner_id: String,
    field_name: String,
    device_type: DeviceType,
}

/// Rejected registration input.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    /// `owner_id` was empty.
    #[error("owner id must not be empty")]
    EmptyOwnerId,
    /// `field_name` was empty.
    #[error("field name must not be empty")]
    EmptyFieldName,
    /// `owner_id` exceeded [`MAX_FIELD_CHARS`] characters.
    #[error("owner id longer than {MAX_FIELD_CHARS} characters")]
    OwnerIdTooLong,
    /// `field_name` exceeded [`MAX_FIELD_CHARS`] characters.
    #[error("field name longer than {MAX_FIELD_CHARS} characters")]
    FieldNameTooLong,
    /// Device type string not in the catalog.
    #[error("unknown device type")]
    UnknownDeviceType,
    /// A device with the same topic is already registered.
    #[error("device already registered for this topic")]
    Duplicate,
}

impl DeviceRegistration {
    /// Validate and construct a registration.
    pub fn new(
        owner_id: impl Into<String>,
        field_name: impl Into<String>,
        device_type: DeviceType,
    ) -> Result<Self, RegistrationError> {
        let owner_id = owner_id.into();
        let field_name = field_name.into();

        if owner_id.is_empty() {
            return Err(RegistrationError::EmptyOwnerId);
        }
        if field_name.is_empty() {
            return Err(RegistrationError::EmptyFieldName);
        }
        if owner_id.chars().count() > MAX_FIELD_CHARS {
            return Err(RegistrationError::OwnerIdTooLong);
        }
        if field_name.chars().count() > MAX_FIELD_CHARS {
            return Err(RegistrationError::FieldNameTooLong);
        }

        Ok(Self {
            owner_id,
            field_name,
            device_type,
        })
    }

    /// Owner mobile identifier.
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Human-readable field name (display only, not part of the topic).
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Starter model.
    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    /// Bind the broker topic for this device.
    ///
    /// Pure and total: `"<owner_id>_<device_type>"`, casing preserved.
    pub fn topic(&self) -> Topic {
        Topic(format!("{}_{}", self.owner_id, self.device_type.as_str()))
    }
}

// ============================================================================
// Tests
// ============================================================================
