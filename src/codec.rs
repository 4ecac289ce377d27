//! Fixed-width command codec for the starter control channel.
//!
//! Every action a controller can request from a field starter is a fixed
//! 3-character ASCII code. Toggle actions carry an on/off pair; queries are
//! single codes that request a fresh reading without flipping any state.
//!
//! # Command Table
//!
//! | Action | On | Off |
//! |--------|----|-----|
//! | Motor | `101` | `100` |
//! | Auto mode | `201` | `200` |
//! | Dry run | `301` | `300` |
//! | Overload | `401` | `400` |
//! | Lock | `501` | `500` |
//!
//! Queries: phase/current `111`, signal strength `333`, refresh-all `999`.
//!
//! # Decoding
//!
//! Inbound payloads are opaque byte strings; the transport delivers topic and
//! payload separately and the codec never sees any framing. [`decode`] is
//! total over its input: tabled codes come back as [`Decoded::Toggle`] or
//! [`Decoded::Query`], anything else readable is passed through as
//! [`Decoded::Text`] for observers, and only unreadable input (empty or not
//! UTF-8) is an error.
//!
//! ```rust
//! use fieldlink::codec::{decode, encode, Decoded, DeviceAction};
//!
//! let cmd = encode(DeviceAction::Motor, true);
//! assert_eq!(cmd.code, "101");
//!
//! match decode(cmd.code.as_bytes()).unwrap() {
//!     Decoded::Toggle { action, on } => {
//!         assert_eq!(action, DeviceAction::Motor);
//!         assert!(on);
//!     }
//!     _ => unreachable!(),
//! }
//! ```

use thiserror::Error;

// ============================================================================
// Actions and Queries
// ============================================================================

/// A switchable function of a field starter.
///
/// Each action maps to an on/off code pair in the command table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DeviceAction {
    /// Main motor contactor.
    Motor,
    /// Automatic operation mode.
    AutoMode,
    /// Dry-run protection.
    DryRun,
    /// Overload protection.
    Overload,
    /// Panel lock.
    Lock,
}

impl DeviceAction {
    /// All actions, in command-table order.
    pub const ALL: [DeviceAction; 5] = [
        DeviceAction::Motor,
        DeviceAction::AutoMode,
        DeviceAction::DryRun,
        DeviceAction::Overload,
        DeviceAction::Lock,
    ];

    /// The wire code for this action in the given position.
    pub const fn code(self, on: bool) -> &'static str {
        match (self, on) {
            (DeviceAction::Motor, true) => "101",
            (DeviceAction::Motor, false) => "100",
            (DeviceAction::AutoMode, true) => "201",
            (DeviceAction::AutoMode, false) => "200",
            (DeviceAction::DryRun, true) => "301",
            (DeviceAction::DryRun, false) => "300",
            (DeviceAction::Overload, true) => "401",
            (DeviceAction::Overload, false) => "400",
            (DeviceAction::Lock, true) => "501",
            (DeviceAction::Lock, false) => "500",
        }
    }
}

/// A read-only request for a fresh reading from the starter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum QueryKind {
    /// Phase status and motor current.
    PhaseCurrent,
    /// GSM signal strength.
    Signal,
    /// Re-report everything.
    RefreshAll,
}

impl QueryKind {
    /// The wire code for this query.
    pub const fn code(self) -> &'static str {
        match self {
            QueryKind::PhaseCurrent => "111",
            QueryKind::Signal => "333",
            QueryKind::RefreshAll => "999",
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

/// What a [`Command`] means, beyond its raw code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandMeaning {
    /// Switch an action on or off.
    Toggle {
        /// The action being switched.
        action: DeviceAction,
        /// Desired position.
        on: bool,
    },
    /// Request a reading.
    Query(QueryKind),
}

/// An encoded wire command: a 3-digit ASCII code plus its meaning.
///
/// Commands are immutable values produced by [`encode`] or
/// [`Command::query`] and consumed by the connection manager's publish path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Command {
    /// The 3-character ASCII code sent on the wire.
    pub code: &'static str,
    /// Decoded meaning of the code.
    pub meaning: CommandMeaning,
}

impl Command {
    /// Build the command for a query.
    pub const fn query(kind: QueryKind) -> Self {
        Self {
            code: kind.code(),
            meaning: CommandMeaning::Query(kind),
        }
    }
}

/// Encode a toggle action into its wire command.
pub const fn encode(action: DeviceAction, on: bool) -> Command {
    Command {
        code: action.code(on),
        meaning: CommandMeaning::Toggle { action, on },
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// Classification of an inbound payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decoded<'a> {
    /// A tabled toggle code: the starter confirming (or commanding) a switch.
    Toggle {
        /// The action the code refers to.
        action: DeviceAction,
        /// Position the code encodes.
        on: bool,
    },
    /// A tabled query code echoed back on the channel.
    Query(QueryKind),
    /// Readable text outside the command table (readings, status strings).
    ///
    /// Passed through to observers untouched; never mutates device state.
    Text(&'a str),
}

/// Why an inbound payload could not be decoded.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Payload was empty, whitespace-only, or not valid UTF-8.
    #[error("malformed payload")]
    Malformed,
}

/// Decode an inbound payload.
///
/// Never panics. Malformed input is an error the caller logs and drops;
/// unknown-but-readable text is [`Decoded::Text`], not an error.
pub fn decode(payload: &[u8]) -> Result<Decoded<'_>, DecodeError> {
    let text = core::str::from_utf8(payload).map_err(|_| DecodeError::Malformed)?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(DecodeError::Malformed);
    }

    for action in DeviceAction::ALL {
        for on in [true, false] {
            if trimmed == action.code(on) {
                return Ok(Decoded::Toggle { action, on });
            }
        }
    }

    for kind in [QueryKind::PhaseCurrent, QueryKind::Signal, QueryKind::RefreshAll] {
        if trimmed == kind.code() {
            return Ok(Decoded::Query(kind));
        }
    }

    Ok(Decoded::Text(trimmed))
}

// ============================================================================
// Tests
// ============================================================================
