//! touchkey-service library crate.
//!
//! The host side of Touchkey: a WebSocket endpoint that receives key-state
//! vectors from a touch client and turns them into native keyboard events.
//!
//! # Architecture
//!
//! ```text
//! touch client (key-state frames over WebSocket, port 5732, path /ws)
//!         ↕
//! [touchkey-service]
//!   ├── domain/           ServiceConfig, InputRecord
//!   ├── application/
//!   │     ├── key_session/  frame handling, held-key tracking
//!   │     └── synthesize/   KeySynthesizer, DispatchQueue, InputBackend
//!   └── infrastructure/
//!         ├── ws_server/    axum router: static page + /ws upgrade
//!         └── input_backend/ SendInput (Windows) or recording
//! ```
//!
//! # Layer rules
//!
//! - `domain` does no I/O.
//! - `application` reaches the OS only through the `InputBackend` trait.
//! - `infrastructure` owns sockets, files, and OS calls.

pub mod application;
pub mod domain;
pub mod infrastructure;
