//! # touchkey-core
//!
//! Shared library for Touchkey: the touch zone resolver, the link protocol
//! engine and its wire codec, and the logical-index to OS key code table.
//!
//! This crate is used by both the service and the client.
//! It has zero dependencies on OS APIs, UI frameworks, or network sockets.
//!
//! # Architecture overview
//!
//! Touchkey turns a touchscreen into a keyboard for another machine.  A touch
//! surface decides which logical keys are under the user's fingers, ships that
//! state over a WebSocket, and a service on the host injects native keyboard
//! events.
//!
//! - **`domain`** – Pure geometry.  [`TouchResolver`] compiles the on-screen key
//!   row into [`LogicalKey`]s and turns every [`TouchFrame`] into a full
//!   [`KeyStateVector`].
//!
//! - **`link`** – The heartbeat/watchdog state machine that decides when the
//!   client connects, probes, and reconnects.  It performs no I/O itself; it
//!   returns [`LinkAction`]s for a driver to carry out.
//!
//! - **`protocol`** – The text messages that travel over the WebSocket:
//!   `"alive?"`, `"alive"`, and `'b'` followed by one `'0'`/`'1'` per key.
//!
//! - **`keymap`** – [`KeyCodeTable`], the explicit table from a received
//!   logical index to the OS virtual key code.

pub mod domain;
pub mod keymap;
pub mod link;
pub mod protocol;

pub use domain::key_state::{KeyChange, KeyStateVector};
pub use domain::layout::{
    FrameResult, KeyElement, KeyRect, Kflag, LayoutError, LogicalKey, TouchFrame, TouchPoint,
    TouchResolver,
};
pub use keymap::{KeyCodeEntry, KeyCodeTable, KeymapError};
pub use link::{ConnectionState, LinkAction, LinkEngine};
pub use protocol::codec::{
    decode_client_message, decode_service_message, encode_client_message,
    encode_service_message, ProtocolError,
};
pub use protocol::messages::{ClientMessage, ServiceMessage};
