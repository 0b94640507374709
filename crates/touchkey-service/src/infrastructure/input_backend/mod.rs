//! Concrete [`InputBackend`](crate::application::synthesize::InputBackend)s.
//!
//! | Backend               | Host      | Mechanism                         |
//! |-----------------------|-----------|-----------------------------------|
//! | `WindowsInputBackend` | Windows   | `MapVirtualKeyW` + `SendInput`    |
//! | `RecordingBackend`    | any       | in-memory log (tests, `--dry-run`) |

pub mod recording;
#[cfg(target_os = "windows")]
pub mod windows;

use std::sync::Arc;

use crate::application::synthesize::{InputBackend, SynthesisError};

pub use self::recording::RecordingBackend;
#[cfg(target_os = "windows")]
pub use self::windows::WindowsInputBackend;

/// Opens the host's native input backend.
///
/// # Errors
///
/// [`SynthesisError::Unavailable`] on hosts without a supported input
/// subsystem, or when the subsystem fails its startup checks.
pub fn open_native() -> Result<Arc<dyn InputBackend>, SynthesisError> {
    #[cfg(target_os = "windows")]
    {
        Ok(Arc::new(WindowsInputBackend::new()?))
    }
    #[cfg(not(target_os = "windows"))]
    {
        Err(SynthesisError::Unavailable(format!(
            "no native keyboard injection on {}; use --dry-run",
            std::env::consts::OS
        )))
    }
}
