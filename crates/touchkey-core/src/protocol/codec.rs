//! Text codec for the link protocol.
//!
//! Wire format (WebSocket text frames):
//! ```text
//! "alive?"            probe
//! "alive"             reply
//! "b" [01]{N}         key-state update, N = logical key count, kflag order
//! ```

use thiserror::Error;

use crate::domain::key_state::KeyStateVector;
use crate::protocol::messages::{
    ClientMessage, ServiceMessage, KEY_STATE_TAG, MAX_KEY_COUNT, PROBE, REPLY,
};

/// Longest prefix of an unrecognised frame echoed back in an error.
const PREVIEW_LEN: usize = 16;

/// Errors that can occur while decoding a frame.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The frame was empty.
    #[error("empty message")]
    Empty,

    /// The frame is neither a probe, a reply, nor a key-state update.
    #[error("unknown message: {0:?}")]
    UnknownMessage(String),

    /// A key-state update carried no key bits.
    #[error("key-state update carries no keys")]
    EmptyKeyState,

    /// A key-state update carried more bits than any layout may have.
    #[error("key-state update carries {0} keys, more than the supported maximum")]
    TooManyKeys(usize),

    /// A key-state character was neither `'0'` nor `'1'`.
    #[error("invalid key-state character {found:?} at position {position}")]
    InvalidBit { position: usize, found: char },
}

// ── Client → service ──────────────────────────────────────────────────────────

/// Encodes a [`ClientMessage`] into its text frame.
///
/// # Examples
///
/// ```rust
/// use touchkey_core::{encode_client_message, ClientMessage, KeyStateVector};
///
/// let update = ClientMessage::KeyState(KeyStateVector::from_active(4, [1]));
/// assert_eq!(encode_client_message(&update), "b0100");
/// assert_eq!(encode_client_message(&ClientMessage::Probe), "alive?");
/// ```
pub fn encode_client_message(msg: &ClientMessage) -> String {
    match msg {
        ClientMessage::Probe => PROBE.to_string(),
        ClientMessage::KeyState(state) => {
            let mut frame = String::with_capacity(state.len() + 1);
            frame.push(KEY_STATE_TAG);
            frame.push_str(&state.to_string());
            frame
        }
    }
}

/// Decodes a client text frame.
///
/// # Errors
///
/// Returns [`ProtocolError`] if the frame is empty, unrecognised, or carries
/// a malformed key-state vector.
pub fn decode_client_message(frame: &str) -> Result<ClientMessage, ProtocolError> {
    if frame.is_empty() {
        return Err(ProtocolError::Empty);
    }
    if frame == PROBE {
        return Ok(ClientMessage::Probe);
    }
    match frame.strip_prefix(KEY_STATE_TAG) {
        Some(bits) => decode_key_state(bits).map(ClientMessage::KeyState),
        None => Err(unknown(frame)),
    }
}

fn decode_key_state(bits: &str) -> Result<KeyStateVector, ProtocolError> {
    if bits.is_empty() {
        return Err(ProtocolError::EmptyKeyState);
    }
    let count = bits.chars().count();
    if count > MAX_KEY_COUNT {
        return Err(ProtocolError::TooManyKeys(count));
    }
    bits.chars()
        .enumerate()
        .map(|(position, c)| match c {
            '0' => Ok(false),
            '1' => Ok(true),
            found => Err(ProtocolError::InvalidBit { position, found }),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(KeyStateVector::from_bits)
}

// ── Service → client ──────────────────────────────────────────────────────────

/// Encodes a [`ServiceMessage`] into its text frame.
pub fn encode_service_message(msg: &ServiceMessage) -> String {
    match msg {
        ServiceMessage::Reply => REPLY.to_string(),
    }
}

/// Decodes a service text frame.
///
/// # Errors
///
/// Returns [`ProtocolError`] if the frame is empty or unrecognised.
pub fn decode_service_message(frame: &str) -> Result<ServiceMessage, ProtocolError> {
    match frame {
        "" => Err(ProtocolError::Empty),
        REPLY => Ok(ServiceMessage::Reply),
        other => Err(unknown(other)),
    }
}

fn unknown(frame: &str) -> ProtocolError {
    ProtocolError::UnknownMessage(frame.chars().take(PREVIEW_LEN).collect())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
