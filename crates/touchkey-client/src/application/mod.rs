//! Application layer for touchkey-client.
//!
//! - [`touch_pipeline`]: touch frames → key-state vectors, plus display
//!   feedback for keys whose state changed.

pub mod touch_pipeline;

pub use touch_pipeline::{KeyDisplay, LogDisplay, TouchPipeline};
