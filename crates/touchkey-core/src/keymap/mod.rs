//! Logical key index → OS virtual key code translation table.
//!
//! The client only knows logical indices (`kflag`s).  The service needs the
//! host's virtual key code for each one.  The mapping is data, not arithmetic:
//! a layout change means a new table (or a `[[keymap]]` section in the service
//! config), never new mapping code.
//!
//! # Default layout
//!
//! The default 16-key row is five digit keys followed by eleven letter keys:
//!
//! | index   | key code (VK)  | key      |
//! |---------|----------------|----------|
//! | 0 – 4   | 0x31 – 0x35    | `1`–`5`  |
//! | 5 – 15  | 0x42 – 0x4C    | `B`–`L`  |

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of keys on the default layout row.
pub const DEFAULT_KEY_COUNT: usize = 16;

/// Virtual key codes of the default layout, indexed by logical key.
const DEFAULT_LAYOUT_CODES: [u16; DEFAULT_KEY_COUNT] = [
    // ── Digit row ─────────────────────────────────────────────────────────────
    0x31, // 0 → '1'
    0x32, // 1 → '2'
    0x33, // 2 → '3'
    0x34, // 3 → '4'
    0x35, // 4 → '5'
    // ── Letter row ────────────────────────────────────────────────────────────
    0x42, // 5 → 'B'
    0x43, // 6 → 'C'
    0x44, // 7 → 'D'
    0x45, // 8 → 'E'
    0x46, // 9 → 'F'
    0x47, // 10 → 'G'
    0x48, // 11 → 'H'
    0x49, // 12 → 'I'
    0x4A, // 13 → 'J'
    0x4B, // 14 → 'K'
    0x4C, // 15 → 'L'
];

/// Errors raised while building a [`KeyCodeTable`].
#[derive(Debug, Error, PartialEq)]
pub enum KeymapError {
    /// The same logical index was mapped twice.
    #[error("logical index {0} is mapped more than once")]
    DuplicateIndex(usize),

    /// The table has no entries.
    #[error("key code table is empty")]
    Empty,
}

/// One row of a key code table, as stored in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCodeEntry {
    /// Logical key index (`kflag`).
    pub index: usize,
    /// OS virtual key code to synthesise for that index.
    pub key_code: u16,
}

/// Explicit lookup table from logical key index to OS virtual key code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCodeTable {
    codes: Vec<Option<u16>>,
}

impl KeyCodeTable {
    /// Builds a table from explicit entries.  Indices need not be contiguous;
    /// gaps map to nothing.
    ///
    /// # Errors
    ///
    /// Returns [`KeymapError::Empty`] for no entries and
    /// [`KeymapError::DuplicateIndex`] if an index appears twice.
    pub fn from_entries<I>(entries: I) -> Result<Self, KeymapError>
    where
        I: IntoIterator<Item = KeyCodeEntry>,
    {
        let mut codes: Vec<Option<u16>> = Vec::new();
        for entry in entries {
            if entry.index >= codes.len() {
                codes.resize(entry.index + 1, None);
            }
            if codes[entry.index].replace(entry.key_code).is_some() {
                return Err(KeymapError::DuplicateIndex(entry.index));
            }
        }
        if codes.is_empty() {
            return Err(KeymapError::Empty);
        }
        Ok(Self { codes })
    }

    /// The table for the default 16-key layout.
    pub fn default_layout() -> Self {
        Self {
            codes: DEFAULT_LAYOUT_CODES.iter().copied().map(Some).collect(),
        }
    }

    /// Returns the OS key code for logical `index`, or `None` if unmapped.
    pub fn key_code(&self, index: usize) -> Option<u16> {
        self.codes.get(index).copied().flatten()
    }

    /// One past the highest mapped index.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// All mapped entries in index order.
    pub fn entries(&self) -> Vec<KeyCodeEntry> {
        self.codes
            .iter()
            .enumerate()
            .filter_map(|(index, code)| code.map(|key_code| KeyCodeEntry { index, key_code }))
            .collect()
    }
}

impl Default for KeyCodeTable {
    fn default() -> Self {
        Self::default_layout()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
