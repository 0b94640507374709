//! Input Synthesis Engine: logical key code → flagged input record → OS.
//!
//! [`KeySynthesizer`] builds one fresh [`InputRecord`] per toggle and hands it
//! to a per-connection [`DispatchQueue`].  The queue's worker thread injects
//! records strictly in submission order, so a key-down always reaches the OS
//! before its paired key-up, even when the caller does not wait for either.
//!
//! The OS itself sits behind the [`InputBackend`] trait, passed in at
//! construction, so tests and `--dry-run` substitute a recording backend.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

use crate::domain::config::DispatchMode;
use crate::domain::input_record::{FlagSource, InputRecord, KeyDirection, ScanCode};

/// Errors raised while translating or injecting a key event.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SynthesisError {
    /// The OS has no scan code for this virtual key code.
    #[error("no scan code for key code {0:#04x}")]
    Untranslatable(u16),

    /// The OS rejected the record.
    #[error("input injection failed: {0}")]
    Dispatch(String),

    /// The dispatch worker is gone; nothing more can be injected.
    #[error("input dispatch worker has stopped")]
    WorkerGone,

    /// The input subsystem could not be opened.
    #[error("input subsystem unavailable: {0}")]
    Unavailable(String),
}

/// Handle to the host's input subsystem.
#[cfg_attr(test, mockall::automock)]
pub trait InputBackend: Send + Sync {
    /// Translates a virtual key code into a scan code.  Extended keys come
    /// back with the `0xE0` prefix in the high byte.
    fn scan_code_for(&self, key_code: u16) -> Result<u32, SynthesisError>;

    /// Injects exactly one record.
    fn dispatch(&self, record: &InputRecord) -> Result<(), SynthesisError>;
}

/// Per-call knobs for [`KeySynthesizer::toggle`] and [`KeySynthesizer::tap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleOptions {
    /// Identify the key by scan code (`true`) or by virtual key code.
    pub as_scan_code: bool,
    /// The key code passed in already is a scan code; skip OS translation.
    pub key_code_is_scan_code: bool,
    /// Raw mode flags replacing the composed ones.  The key-up bit is always
    /// taken from the direction.
    pub flags: Option<u32>,
    pub dispatch: DispatchMode,
}

impl Default for ToggleOptions {
    fn default() -> Self {
        Self {
            as_scan_code: true,
            key_code_is_scan_code: false,
            flags: None,
            dispatch: DispatchMode::Async,
        }
    }
}

impl ToggleOptions {
    pub fn with_dispatch(mut self, dispatch: DispatchMode) -> Self {
        self.dispatch = dispatch;
        self
    }
}

// ── Dispatch queue ────────────────────────────────────────────────────────────

enum Completion {
    /// The submitter holds the receiving end, awaiting it or not.
    Notify(oneshot::Sender<Result<(), SynthesisError>>),
    /// Nobody is listening; failures are logged only.
    Detached,
}

struct DispatchJob {
    key_code: u16,
    record: InputRecord,
    completion: Completion,
}

/// Serialized, in-order injection of records for one connection.
///
/// A dedicated thread drains an unbounded FIFO so the async event loop never
/// blocks on the OS call.  The worker logs through the subscriber that was
/// current when the queue started.  Dropping the queue closes the channel;
/// the worker finishes what was already submitted and exits.
pub struct DispatchQueue {
    tx: mpsc::UnboundedSender<DispatchJob>,
}

impl DispatchQueue {
    /// Spawns the worker thread for `backend`.
    pub fn start(backend: Arc<dyn InputBackend>) -> Result<Self, SynthesisError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatch = tracing::dispatcher::get_default(|current| current.clone());
        thread::Builder::new()
            .name("input-dispatch".into())
            .spawn(move || {
                tracing::dispatcher::with_default(&dispatch, || run_worker(backend, rx))
            })
            .map_err(|e| SynthesisError::Unavailable(format!("dispatch worker: {e}")))?;
        Ok(Self { tx })
    }

    fn submit(&self, job: DispatchJob) -> Result<(), SynthesisError> {
        self.tx.send(job).map_err(|_| SynthesisError::WorkerGone)
    }
}

fn run_worker(backend: Arc<dyn InputBackend>, mut rx: mpsc::UnboundedReceiver<DispatchJob>) {
    while let Some(job) = rx.blocking_recv() {
        let result = backend.dispatch(&job.record);
        let unobserved = match job.completion {
            Completion::Notify(tx) => tx.send(result).err(),
            Completion::Detached => Some(result),
        };
        if let Some(Err(e)) = unobserved {
            log_failure(job.key_code, &job.record, &e);
        }
    }
    debug!("input dispatch worker stopped");
}

fn log_failure(key_code: u16, record: &InputRecord, err: &SynthesisError) {
    error!(
        key_code,
        scan_code = record.scan_code(),
        direction = %record.direction(),
        "OS input injection failed: {err}"
    );
}

/// Result of an async toggle that the worker has not necessarily finished.
///
/// Await it to observe the outcome.  Dropping it is fine: a failure nobody
/// observed is logged at `error!` either way.
#[must_use = "await the pending dispatch or call detach()"]
pub struct PendingDispatch {
    key_code: u16,
    record: InputRecord,
    rx: Option<oneshot::Receiver<Result<(), SynthesisError>>>,
}

impl PendingDispatch {
    /// The record that was queued.
    pub fn record(&self) -> &InputRecord {
        &self.record
    }

    /// Stops tracking the result.
    pub fn detach(self) {}
}

impl Future for PendingDispatch {
    type Output = Result<(), SynthesisError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Some(rx) = self.rx.as_mut() else {
            return Poll::Ready(Err(SynthesisError::WorkerGone));
        };
        match Pin::new(rx).poll(cx) {
            Poll::Ready(result) => {
                self.rx = None;
                Poll::Ready(result.unwrap_or(Err(SynthesisError::WorkerGone)))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for PendingDispatch {
    fn drop(&mut self) {
        // A result already delivered but never polled would otherwise vanish.
        if let Some(mut rx) = self.rx.take() {
            if let Ok(Err(e)) = rx.try_recv() {
                log_failure(self.key_code, &self.record, &e);
            }
        }
    }
}

/// Outcome of a toggle.
#[must_use]
pub enum Dispatched {
    /// Sync mode: the record has been injected.
    Done,
    /// Async mode: the record is queued.
    Pending(PendingDispatch),
}

// ── Synthesizer ───────────────────────────────────────────────────────────────

/// Turns key codes into OS key events for one connection.
pub struct KeySynthesizer {
    backend: Arc<dyn InputBackend>,
    queue: DispatchQueue,
}

impl KeySynthesizer {
    /// Creates a synthesizer with its own dispatch queue.
    pub fn new(backend: Arc<dyn InputBackend>) -> Result<Self, SynthesisError> {
        let queue = DispatchQueue::start(Arc::clone(&backend))?;
        Ok(Self { backend, queue })
    }

    /// Builds the record for one toggle without dispatching it.
    ///
    /// In scan-code mode the scan code is either translated by the backend or
    /// taken verbatim from `key_code`, then classified as extended or not.
    /// The composed mode flags are `SCANCODE`, plus `EXTENDEDKEY` when
    /// extended, unless `options.flags` replaces them.
    ///
    /// # Errors
    ///
    /// [`SynthesisError::Untranslatable`] if the backend maps the key code to
    /// scan code zero, or any error the backend's translation returns.
    pub fn build_record(
        &self,
        key_code: u16,
        direction: KeyDirection,
        options: &ToggleOptions,
    ) -> Result<InputRecord, SynthesisError> {
        let (virtual_key, scan_code, composed) = if options.as_scan_code {
            let raw = if options.key_code_is_scan_code {
                u32::from(key_code)
            } else {
                self.backend.scan_code_for(key_code)?
            };
            if raw == 0 {
                return Err(SynthesisError::Untranslatable(key_code));
            }
            let scan = ScanCode::classify(raw);
            (0, scan.code, scan.mode_flags())
        } else {
            (key_code, 0, 0)
        };

        let record = match options.flags {
            Some(raw) => {
                InputRecord::keyboard(virtual_key, scan_code, raw, FlagSource::Raw, direction)
            }
            None => InputRecord::keyboard(
                virtual_key,
                scan_code,
                composed,
                FlagSource::Composed,
                direction,
            ),
        };
        Ok(record)
    }

    /// Presses or releases one key.
    ///
    /// Sync mode suspends the calling task until the worker has injected the
    /// record; it never blocks the runtime thread.
    ///
    /// # Errors
    ///
    /// Translation failures are returned before anything is queued.  In sync
    /// mode the injection result is returned as well.
    pub async fn toggle(
        &self,
        key_code: u16,
        direction: KeyDirection,
        options: &ToggleOptions,
    ) -> Result<Dispatched, SynthesisError> {
        let record = self.build_record(key_code, direction, options)?;
        debug!(
            key_code,
            scan_code = record.scan_code(),
            flags = record.flags(),
            %direction,
            "queueing key event"
        );
        self.submit(key_code, record, options.dispatch).await
    }

    /// Presses and releases one key.
    ///
    /// Both records are built before either is queued, so a translation
    /// failure never leaves a press without its release.  In async mode the
    /// release is queued right behind the press without waiting for it.
    pub async fn tap(&self, key_code: u16, options: &ToggleOptions) -> Result<(), SynthesisError> {
        let down = self.build_record(key_code, KeyDirection::Down, options)?;
        let up = self.build_record(key_code, KeyDirection::Up, options)?;
        match options.dispatch {
            DispatchMode::Sync => {
                let _ = self.submit(key_code, down, DispatchMode::Sync).await?;
                let _ = self.submit(key_code, up, DispatchMode::Sync).await?;
            }
            DispatchMode::Async => {
                self.queue.submit(DispatchJob {
                    key_code,
                    record: down,
                    completion: Completion::Detached,
                })?;
                self.queue.submit(DispatchJob {
                    key_code,
                    record: up,
                    completion: Completion::Detached,
                })?;
            }
        }
        Ok(())
    }

    async fn submit(
        &self,
        key_code: u16,
        record: InputRecord,
        mode: DispatchMode,
    ) -> Result<Dispatched, SynthesisError> {
        let (tx, rx) = oneshot::channel();
        self.queue.submit(DispatchJob {
            key_code,
            record,
            completion: Completion::Notify(tx),
        })?;
        let pending = PendingDispatch {
            key_code,
            record,
            rx: Some(rx),
        };
        match mode {
            DispatchMode::Sync => {
                pending.await?;
                Ok(Dispatched::Done)
            }
            DispatchMode::Async => Ok(Dispatched::Pending(pending)),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
