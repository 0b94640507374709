//! Application layer for touchkey-service.
//!
//! - [`synthesize`]: the Input Synthesis Engine (key code → OS key event).
//! - [`key_session`]: per-connection frame handling and key-state tracking.
//!
//! Nothing here opens sockets; the OS is reached only through the
//! [`InputBackend`] handle passed in by the infrastructure layer.

pub mod key_session;
pub mod synthesize;

pub use key_session::KeySession;
pub use synthesize::{
    DispatchQueue, Dispatched, InputBackend, KeySynthesizer, PendingDispatch, SynthesisError,
    ToggleOptions,
};
