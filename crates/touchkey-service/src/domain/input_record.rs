//! Hardware keyboard input records.
//!
//! An [`InputRecord`] describes exactly one key press or release in the shape
//! the OS injection call expects.  Records are plain `Copy` values: one is
//! built per dispatch and never touched again, so concurrent toggles cannot
//! corrupt each other's fields.
//!
//! # Flags
//!
//! | constant                | value    | meaning                                  |
//! |-------------------------|----------|------------------------------------------|
//! | `KEYEVENTF_EXTENDEDKEY` | `0x0001` | scan code carries the `0xE0` prefix      |
//! | `KEYEVENTF_KEYUP`       | `0x0002` | release; absent means press              |
//! | `KEYEVENTF_SCANCODE`    | `0x0008` | identify the key by scan code, not VK    |

use std::fmt;

/// Record kind for keyboard input (`INPUT_KEYBOARD`).
pub const INPUT_KEYBOARD: u32 = 1;

pub const KEYEVENTF_EXTENDEDKEY: u32 = 0x0001;
pub const KEYEVENTF_KEYUP: u32 = 0x0002;
pub const KEYEVENTF_SCANCODE: u32 = 0x0008;

/// High-byte pattern marking an extended scan code, as returned by the
/// virtual-key to scan-code translation (`0xE0xx` / `0xE1xx`).
pub const EXTENDED_SCAN_PREFIX: u32 = 0xE000;

/// Byte size of one record as passed to the OS dispatch call.
///
/// The native `INPUT` struct is 40 bytes on 64-bit hosts and 28 bytes on
/// 32-bit hosts.
#[cfg(target_pointer_width = "64")]
pub const DISPATCH_SIZE: i32 = 40;
#[cfg(not(target_pointer_width = "64"))]
pub const DISPATCH_SIZE: i32 = 28;

/// Press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyDirection {
    Down,
    Up,
}

impl fmt::Display for KeyDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeyDirection::Down => "down",
            KeyDirection::Up => "up",
        })
    }
}

/// Where a record's mode flags came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagSource {
    /// Composed from the scan-code classification.
    Composed,
    /// Supplied verbatim by the caller.
    Raw,
}

/// A scan code split into its low bits and the extended-key marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanCode {
    pub code: u16,
    pub extended: bool,
}

impl ScanCode {
    /// Classifies a raw translated scan code.
    ///
    /// A code whose `0xE000` bits are all set is extended; the marker bits are
    /// stripped from the returned `code`.
    pub fn classify(raw: u32) -> Self {
        let extended = raw & EXTENDED_SCAN_PREFIX == EXTENDED_SCAN_PREFIX;
        let code = if extended {
            raw & !EXTENDED_SCAN_PREFIX
        } else {
            raw
        };
        Self {
            code: (code & 0xFFFF) as u16,
            extended,
        }
    }

    /// Mode flags for a scan-code record of this key.
    pub fn mode_flags(&self) -> u32 {
        if self.extended {
            KEYEVENTF_SCANCODE | KEYEVENTF_EXTENDEDKEY
        } else {
            KEYEVENTF_SCANCODE
        }
    }
}

/// One immutable keyboard event, ready for OS dispatch.
///
/// Layout mirrors the native record: kind, virtual key code, scan code,
/// flags, timestamp, extra info.  Timestamp and extra info are always zero so
/// the OS stamps the event itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputRecord {
    kind: u32,
    virtual_key: u16,
    scan_code: u16,
    flags: u32,
    timestamp: u32,
    extra_info: usize,
    source: FlagSource,
}

impl InputRecord {
    /// Builds a keyboard record.
    ///
    /// `mode_flags` must not carry direction; the key-up bit is set or cleared
    /// from `direction` so the record always has exactly one direction.
    pub fn keyboard(
        virtual_key: u16,
        scan_code: u16,
        mode_flags: u32,
        source: FlagSource,
        direction: KeyDirection,
    ) -> Self {
        let flags = match direction {
            KeyDirection::Down => mode_flags & !KEYEVENTF_KEYUP,
            KeyDirection::Up => mode_flags | KEYEVENTF_KEYUP,
        };
        Self {
            kind: INPUT_KEYBOARD,
            virtual_key,
            scan_code,
            flags,
            timestamp: 0,
            extra_info: 0,
            source,
        }
    }

    pub fn kind(&self) -> u32 {
        self.kind
    }

    pub fn virtual_key(&self) -> u16 {
        self.virtual_key
    }

    pub fn scan_code(&self) -> u16 {
        self.scan_code
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn extra_info(&self) -> usize {
        self.extra_info
    }

    pub fn flag_source(&self) -> FlagSource {
        self.source
    }

    pub fn direction(&self) -> KeyDirection {
        if self.flags & KEYEVENTF_KEYUP != 0 {
            KeyDirection::Up
        } else {
            KeyDirection::Down
        }
    }

    pub fn is_extended(&self) -> bool {
        self.flags & KEYEVENTF_EXTENDEDKEY != 0
    }

    pub fn uses_scan_code(&self) -> bool {
        self.flags & KEYEVENTF_SCANCODE != 0
    }

    /// Byte size passed alongside this record to the OS dispatch call.
    pub fn dispatch_size(&self) -> i32 {
        DISPATCH_SIZE
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_plain_scan_code() {
        let scan = ScanCode::classify(0x1E);
        assert_eq!(scan, ScanCode { code: 0x1E, extended: false });
        assert_eq!(scan.mode_flags(), KEYEVENTF_SCANCODE);
    }

    #[test]
    fn test_classify_extended_scan_code_strips_prefix() {
        // Arrange: right arrow translates to 0xE04D
        let raw = 0xE04D;

        // Act
        let scan = ScanCode::classify(raw);

        // Assert
        assert!(scan.extended);
        assert_eq!(scan.code, 0x4D);
        assert_eq!(
            scan.mode_flags(),
            KEYEVENTF_SCANCODE | KEYEVENTF_EXTENDEDKEY
        );
    }

    #[test]
    fn test_classify_partial_prefix_is_not_extended() {
        // 0xC0xx has only two of the three marker bits
        assert!(!ScanCode::classify(0xC01D).extended);
    }

    #[test]
    fn test_keyboard_record_down_has_no_keyup_bit() {
        let record = InputRecord::keyboard(
            0,
            0x02,
            KEYEVENTF_SCANCODE,
            FlagSource::Composed,
            KeyDirection::Down,
        );
        assert_eq!(record.flags(), KEYEVENTF_SCANCODE);
        assert_eq!(record.direction(), KeyDirection::Down);
        assert_eq!(record.kind(), INPUT_KEYBOARD);
        assert_eq!(record.timestamp(), 0);
        assert_eq!(record.extra_info(), 0);
    }

    #[test]
    fn test_keyboard_record_up_sets_keyup_bit() {
        let record = InputRecord::keyboard(
            0,
            0x02,
            KEYEVENTF_SCANCODE,
            FlagSource::Composed,
            KeyDirection::Up,
        );
        assert_eq!(record.flags(), KEYEVENTF_SCANCODE | KEYEVENTF_KEYUP);
        assert_eq!(record.direction(), KeyDirection::Up);
    }

    #[test]
    fn test_raw_flags_with_stray_keyup_still_yield_a_down_record() {
        let record = InputRecord::keyboard(
            0x41,
            0,
            KEYEVENTF_KEYUP,
            FlagSource::Raw,
            KeyDirection::Down,
        );
        assert_eq!(record.direction(), KeyDirection::Down);
        assert_eq!(record.flags(), 0);
    }

    #[test]
    fn test_dispatch_size_matches_pointer_width() {
        let record = InputRecord::keyboard(0, 1, 0, FlagSource::Raw, KeyDirection::Down);
        let expected = if cfg!(target_pointer_width = "64") { 40 } else { 28 };
        assert_eq!(record.dispatch_size(), expected);
    }
}
