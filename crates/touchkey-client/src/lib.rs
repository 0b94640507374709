//! touchkey-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does the client do?
//!
//! The client owns the touch surface.  For every touch frame it:
//!
//! 1. Resolves the touch points against the compiled key row
//!    ([`touchkey_core::TouchResolver`]).
//! 2. Updates the on-screen state of keys whose bit flipped.
//! 3. Sends the full key-state vector to the service, provided the link is
//!    up.  Frames produced while disconnected are dropped, not queued.
//!
//! Alongside, a one-second heartbeat probes the service and recycles the
//! connection after two unanswered probes.

/// Domain layer: layout files.
pub mod domain;

/// Application layer: the touch pipeline.
pub mod application;

/// Infrastructure layer: network session and touch sources.
pub mod infrastructure;
