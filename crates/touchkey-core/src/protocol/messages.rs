//! Protocol message type definitions.
//!
//! The link carries short WebSocket text frames:
//!
//! ```text
//! client → service   "alive?"                liveness probe
//! client → service   "b" + "0101…"           key-state update, one char per kflag
//! service → client   "alive"                 liveness reply
//! ```
//!
//! There is no acknowledgement or error message for key-state updates.

use crate::domain::key_state::KeyStateVector;

/// Literal liveness probe sent by the client.
pub const PROBE: &str = "alive?";

/// Literal liveness reply sent by the service.
pub const REPLY: &str = "alive";

/// Leading character of a key-state update.
pub const KEY_STATE_TAG: char = 'b';

/// Upper bound on the number of keys a key-state update may carry.
pub const MAX_KEY_COUNT: usize = 256;

/// Messages sent from the touch client to the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Liveness probe; the service answers with [`ServiceMessage::Reply`].
    Probe,
    /// The full key-state vector of one touch frame.
    KeyState(KeyStateVector),
}

/// Messages sent from the service to the touch client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceMessage {
    /// Liveness reply to a [`ClientMessage::Probe`].
    Reply,
}

impl ClientMessage {
    /// Short name for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Probe => "Probe",
            ClientMessage::KeyState(_) => "KeyState",
        }
    }
}
