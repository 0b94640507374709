//! Infrastructure layer for touchkey-service.
//!
//! - [`ws_server`]: axum router serving the page and the `/ws` endpoint.
//! - [`input_backend`]: the OS input handle (Windows, or recording).

pub mod input_backend;
pub mod ws_server;

pub use ws_server::{router, run_server, serve};
