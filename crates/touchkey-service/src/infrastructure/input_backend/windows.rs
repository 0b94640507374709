//! Windows input backend via `MapVirtualKeyW` and `SendInput`.

#![cfg(target_os = "windows")]

use windows::core::Error as WinError;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    MapVirtualKeyW, SendInput, INPUT, INPUT_0, INPUT_TYPE, KEYBDINPUT, KEYBD_EVENT_FLAGS,
    MAPVK_VK_TO_VSC_EX, VIRTUAL_KEY,
};

use crate::application::synthesize::{InputBackend, SynthesisError};
use crate::domain::input_record::{InputRecord, DISPATCH_SIZE};

/// Injects key events into the interactive desktop session.
pub struct WindowsInputBackend;

impl WindowsInputBackend {
    /// Checks that the native record matches the size the dispatch call is
    /// given.
    pub fn new() -> Result<Self, SynthesisError> {
        let native = std::mem::size_of::<INPUT>();
        if native != DISPATCH_SIZE as usize {
            return Err(SynthesisError::Unavailable(format!(
                "INPUT is {native} bytes, expected {DISPATCH_SIZE}"
            )));
        }
        Ok(Self)
    }
}

impl InputBackend for WindowsInputBackend {
    fn scan_code_for(&self, key_code: u16) -> Result<u32, SynthesisError> {
        // SAFETY: MapVirtualKeyW only reads its scalar arguments.
        let scan = unsafe { MapVirtualKeyW(u32::from(key_code), MAPVK_VK_TO_VSC_EX) };
        if scan == 0 {
            return Err(SynthesisError::Untranslatable(key_code));
        }
        Ok(scan)
    }

    fn dispatch(&self, record: &InputRecord) -> Result<(), SynthesisError> {
        let input = INPUT {
            r#type: INPUT_TYPE(record.kind()),
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: VIRTUAL_KEY(record.virtual_key()),
                    wScan: record.scan_code(),
                    dwFlags: KEYBD_EVENT_FLAGS(record.flags()),
                    time: record.timestamp(),
                    dwExtraInfo: record.extra_info(),
                },
            },
        };
        // SAFETY: input is a fully initialised keyboard INPUT on the stack and
        // the size argument matches the struct (checked in `new`).
        let sent = unsafe { SendInput(&[input], record.dispatch_size()) };
        if sent != 1 {
            return Err(SynthesisError::Dispatch(WinError::from_win32().to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_record_size_matches_dispatch_size() {
        assert!(WindowsInputBackend::new().is_ok());
    }

    #[test]
    fn test_digit_key_translates_to_nonzero_scan_code() {
        let backend = WindowsInputBackend::new().unwrap();
        assert!(backend.scan_code_for(0x34).unwrap() != 0);
    }
}
