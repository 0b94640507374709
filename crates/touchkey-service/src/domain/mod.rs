//! Domain layer for touchkey-service.
//!
//! Plain types with no I/O: the service configuration and the hardware input
//! record the synthesis engine hands to the OS.

pub mod config;
pub mod input_record;

pub use config::{ConfigError, DispatchMode, PressMode, ServiceConfig, ServiceFile};
pub use input_record::{FlagSource, InputRecord, KeyDirection, ScanCode};
