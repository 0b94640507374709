//! Domain layer for touchkey-client: the on-disk layout description.

pub mod layout_file;

pub use layout_file::{KeySpec, LayoutFile, LayoutFileError};
