//! Domain entities for Touchkey.
//!
//! Pure geometry and state with no infrastructure dependencies, so it can be
//! unit-tested without a browser, a socket, or an input subsystem.

/// Fixed-width key-state bit vector.
pub mod key_state;

/// Touch zone resolver: key geometry, bias zones, per-column memo.
///
/// See [`layout::TouchResolver`] for the main type.
pub mod layout;
