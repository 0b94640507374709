//! Recording input backend.
//!
//! Nothing reaches the OS: every dispatched record is appended to an
//! in-memory log that tests can inspect, and logged at `info!` so `--dry-run`
//! shows what would have been typed.
//!
//! Scan codes come from a small table of the default layout's keys (US
//! set-1 codes).  Other key codes translate to themselves unless overridden
//! with [`RecordingBackend::with_scan_code`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tracing::info;

use crate::application::synthesize::{InputBackend, SynthesisError};
use crate::domain::input_record::InputRecord;

/// Set-1 scan codes for the digit row and the `B`..`L` letters.
const DEFAULT_SCAN_CODES: [(u16, u32); 16] = [
    (0x31, 0x02),
    (0x32, 0x03),
    (0x33, 0x04),
    (0x34, 0x05),
    (0x35, 0x06),
    (0x42, 0x30),
    (0x43, 0x2E),
    (0x44, 0x20),
    (0x45, 0x12),
    (0x46, 0x21),
    (0x47, 0x22),
    (0x48, 0x23),
    (0x49, 0x17),
    (0x4A, 0x24),
    (0x4B, 0x25),
    (0x4C, 0x26),
];

/// Backend that records instead of injecting.
#[derive(Debug)]
pub struct RecordingBackend {
    scan_codes: HashMap<u16, u32>,
    records: Mutex<Vec<InputRecord>>,
    /// Dispatches still to fail before recording resumes.
    failures_left: AtomicUsize,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            scan_codes: DEFAULT_SCAN_CODES.into_iter().collect(),
            records: Mutex::new(Vec::new()),
            failures_left: AtomicUsize::new(0),
        }
    }

    /// Overrides the scan code returned for `key_code`.  Zero makes the key
    /// untranslatable.
    pub fn with_scan_code(mut self, key_code: u16, scan_code: u32) -> Self {
        self.scan_codes.insert(key_code, scan_code);
        self
    }

    /// Makes every dispatch fail.
    pub fn failing(self) -> Self {
        self.failing_first(usize::MAX)
    }

    /// Makes the next `count` dispatches fail; later ones are recorded.
    pub fn failing_first(mut self, count: usize) -> Self {
        self.failures_left = AtomicUsize::new(count);
        self
    }

    /// Copy of everything dispatched so far, in order.
    pub fn records(&self) -> Vec<InputRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InputBackend for RecordingBackend {
    fn scan_code_for(&self, key_code: u16) -> Result<u32, SynthesisError> {
        Ok(self
            .scan_codes
            .get(&key_code)
            .copied()
            .unwrap_or(u32::from(key_code)))
    }

    fn dispatch(&self, record: &InputRecord) -> Result<(), SynthesisError> {
        let failed = self
            .failures_left
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| left.checked_sub(1))
            .is_ok();
        if failed {
            return Err(SynthesisError::Dispatch("recording backend set to fail".into()));
        }
        info!(
            scan_code = record.scan_code(),
            virtual_key = record.virtual_key(),
            flags = record.flags(),
            direction = %record.direction(),
            "dry-run key event"
        );
        self.records
            .lock()
            .map_err(|_| SynthesisError::Dispatch("record log poisoned".into()))?
            .push(*record);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
