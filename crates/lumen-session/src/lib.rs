//! Per-connection session state machine.
//!
//! A [`Session`] owns one physical GATT link to one specific mesh member:
//! it runs the pairing handshake, holds the resulting session key, encodes
//! and sends commands, and decodes incoming notifications into status
//! events. Reconnection policy lives entirely in the scheduler; a session
//! that loses its link is simply discarded and built again from scratch.

pub mod error;
mod session;

pub use error::SessionError;
pub use session::{connect, Session};
