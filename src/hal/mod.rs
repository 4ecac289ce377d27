//! Concrete transport implementations.
//!
//! - `mock`: in-memory [`CommandLink`](crate::traits::CommandLink) for
//!   tests and broker-less development. The real MQTT transport lives in
//!   [`crate::services`] behind the `mqtt` feature.

pub mod mock;

pub use mock::*;
