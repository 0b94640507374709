//! Per-connection key session.
//!
//! A [`KeySession`] owns everything one client connection needs: its own
//! synthesizer (and therefore its own dispatch queue), the last key-state
//! vector it received, and a session id for log lines.  It is fed decoded
//! text frames and answers with the frames to send back.
//!
//! In hold mode each bit transition is one toggle: 0→1 presses, 1→0 releases.
//! In tap mode a 0→1 transition taps the key and releases are ignored.

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use touchkey_core::{
    decode_client_message, encode_service_message, ClientMessage, KeyCodeTable, KeyStateVector,
    ServiceMessage,
};

use crate::application::synthesize::{
    Dispatched, InputBackend, KeySynthesizer, SynthesisError, ToggleOptions,
};
use crate::domain::config::{DispatchMode, PressMode};
use crate::domain::input_record::KeyDirection;

/// Key-state tracking and synthesis for one connection.
pub struct KeySession {
    id: Uuid,
    synthesizer: KeySynthesizer,
    table: Arc<KeyCodeTable>,
    press_mode: PressMode,
    options: ToggleOptions,
    held: KeyStateVector,
}

impl KeySession {
    /// Opens a session with a fresh dispatch queue on `backend`.
    pub fn new(
        backend: Arc<dyn InputBackend>,
        table: Arc<KeyCodeTable>,
        press_mode: PressMode,
        dispatch: DispatchMode,
    ) -> Result<Self, SynthesisError> {
        Ok(Self {
            id: Uuid::new_v4(),
            synthesizer: KeySynthesizer::new(backend)?,
            table,
            press_mode,
            options: ToggleOptions::default().with_dispatch(dispatch),
            held: KeyStateVector::default(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Keys this session currently holds down (hold mode) or last saw active.
    pub fn held(&self) -> &KeyStateVector {
        &self.held
    }

    /// Handles one inbound text frame and returns the reply frame, if any.
    ///
    /// Malformed frames are logged and dropped; they never end the session.
    pub async fn handle_frame(&mut self, frame: &str) -> Option<String> {
        match decode_client_message(frame) {
            Ok(ClientMessage::Probe) => {
                debug!(session = %self.id, "heartbeat probe");
                Some(encode_service_message(&ServiceMessage::Reply))
            }
            Ok(ClientMessage::KeyState(state)) => {
                self.apply_key_state(state).await;
                None
            }
            Err(e) => {
                warn!(session = %self.id, "dropping malformed frame: {e}");
                None
            }
        }
    }

    /// Converts a new key-state vector into key events.
    pub async fn apply_key_state(&mut self, state: KeyStateVector) {
        if state.len() != self.held.len() {
            if !self.held.is_empty() {
                info!(
                    session = %self.id,
                    from = self.held.len(),
                    to = state.len(),
                    "key count changed; releasing held keys"
                );
                self.release_all().await;
            }
            self.held = KeyStateVector::new(state.len());
        }

        for change in state.changes_from(&self.held) {
            let Some(key_code) = self.table.key_code(change.kflag) else {
                if change.active {
                    warn!(session = %self.id, index = change.kflag, "no key code mapped for index");
                }
                continue;
            };
            match (self.press_mode, change.active) {
                (PressMode::Hold, true) => self.toggle(key_code, KeyDirection::Down).await,
                (PressMode::Hold, false) => self.toggle(key_code, KeyDirection::Up).await,
                (PressMode::Tap, true) => {
                    if let Err(e) = self.synthesizer.tap(key_code, &self.options).await {
                        error!(session = %self.id, key_code, "key tap failed: {e}");
                    }
                }
                (PressMode::Tap, false) => {}
            }
        }
        self.held = state;
    }

    /// Releases every key still held.  Called when the connection ends.
    pub async fn release_all(&mut self) {
        let len = self.held.len();
        let held = std::mem::replace(&mut self.held, KeyStateVector::new(len));
        if self.press_mode != PressMode::Hold {
            return;
        }
        for index in held.active() {
            if let Some(key_code) = self.table.key_code(index) {
                self.toggle(key_code, KeyDirection::Up).await;
            }
        }
    }

    async fn toggle(&self, key_code: u16, direction: KeyDirection) {
        match self.synthesizer.toggle(key_code, direction, &self.options).await {
            // Unawaited: the worker logs any failure.
            Ok(Dispatched::Pending(pending)) => pending.detach(),
            Ok(Dispatched::Done) => {}
            Err(e) => {
                error!(session = %self.id, key_code, %direction, "key event failed: {e}");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
