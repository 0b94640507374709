//! Infrastructure layer for the client application.
//!
//! **Dependency rule**: this layer may depend on `application`, `domain` and
//! `touchkey_core`, but MUST NOT be imported by them.
//!
//! - **`network`** – WebSocket session that carries out the link engine's
//!   actions and sends key-state vectors.
//! - **`touch_source`** – where touch frames come from (stdin lines or a
//!   scripted channel).

pub mod network;
pub mod touch_source;

pub use network::{ClientNetworkError, ClientSession, ClientSessionConfig, SessionReport};
pub use touch_source::{ScriptedTouchSource, StdinTouchSource, TouchInput, TouchSource};
