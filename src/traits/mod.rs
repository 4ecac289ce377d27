//! Trait definitions for the broker transport seam.
//!
//! The connection state machine is written against [`CommandLink`] rather
//! than any concrete MQTT library, which is what lets the whole protocol
//! core run in tests against [`crate::hal::MockLink`] with no broker in
//! sight. The real transport lives in `services` behind the `mqtt` feature.

pub mod network;

pub use network::*;
