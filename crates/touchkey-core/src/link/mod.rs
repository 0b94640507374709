//! Link protocol engine: connection state and the heartbeat watchdog.
//!
//! The engine is sans-I/O.  Each event from the outside world (the connection
//! opened, a frame arrived, the socket closed, the heartbeat timer fired) is
//! fed in, and the engine answers with the [`LinkAction`]s the driver must
//! perform.  The driver owns the socket; the engine owns the decisions.
//!
//! ```text
//!              start / watchdog
//! Disconnected ───────────────▶ Connecting ──on_open──▶ Connected
//!      ▲                            │                       │
//!      └──── connect failed ────────┘        drop / 2 missed replies
//!                                             (close, reconnect at once)
//! ```
//!
//! Every heartbeat tick counts one missed reply and, while connected, sends a
//! probe.  A reply resets the count.  Once the count has reached the limit,
//! the next tick closes the connection and starts a new one; there is no
//! backoff.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::domain::key_state::KeyStateVector;
use crate::protocol::messages::{ClientMessage, ServiceMessage};

/// Interval between heartbeat ticks.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// Consecutive unanswered ticks tolerated before the link is recycled.
pub const MISSED_HEARTBEAT_LIMIT: u32 = 2;

/// Lifecycle of the client's link to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Side effects the driver must carry out, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAction {
    /// Open a brand-new connection, discarding any previous one.
    Connect,
    /// Send a message on the current connection.
    Send(ClientMessage),
    /// Close the current connection.
    Close,
}

/// Connection state plus heartbeat counters for one client session.
#[derive(Debug)]
pub struct LinkEngine {
    state: ConnectionState,
    missed: u32,
    missed_limit: u32,
    reconnects: u64,
}

impl LinkEngine {
    /// Creates an engine in [`ConnectionState::Disconnected`] with the default
    /// missed-heartbeat limit.
    pub fn new() -> Self {
        Self::with_missed_limit(MISSED_HEARTBEAT_LIMIT)
    }

    /// Creates an engine that tolerates `missed_limit` unanswered ticks.
    pub fn with_missed_limit(missed_limit: u32) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            missed: 0,
            missed_limit,
            reconnects: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Ticks since the last liveness reply.
    pub fn missed_heartbeats(&self) -> u32 {
        self.missed
    }

    /// Number of watchdog- or drop-triggered reconnects so far.
    pub fn reconnects(&self) -> u64 {
        self.reconnects
    }

    /// Begins the first connection attempt.
    pub fn start(&mut self) -> Vec<LinkAction> {
        if self.state != ConnectionState::Disconnected {
            return Vec::new();
        }
        self.transition(ConnectionState::Connecting);
        vec![LinkAction::Connect]
    }

    /// The connection opened: probe immediately.
    pub fn on_open(&mut self) -> Vec<LinkAction> {
        self.transition(ConnectionState::Connected);
        vec![LinkAction::Send(ClientMessage::Probe)]
    }

    /// A frame from the service was decoded.
    pub fn on_message(&mut self, msg: &ServiceMessage) {
        match msg {
            ServiceMessage::Reply => {
                if self.missed > 0 {
                    debug!(missed = self.missed, "heartbeat reply received");
                }
                self.missed = 0;
            }
        }
    }

    /// The connection closed or errored.
    ///
    /// A drop of an established link reconnects at once.  A failed connection
    /// attempt leaves the engine disconnected; the watchdog retries it.
    pub fn on_closed(&mut self) -> Vec<LinkAction> {
        match self.state {
            ConnectionState::Connected => {
                warn!("link dropped; reconnecting");
                self.transition(ConnectionState::Disconnected);
                self.reconnect()
            }
            ConnectionState::Connecting => {
                self.transition(ConnectionState::Disconnected);
                Vec::new()
            }
            ConnectionState::Disconnected => Vec::new(),
        }
    }

    /// The heartbeat timer fired.
    pub fn on_tick(&mut self) -> Vec<LinkAction> {
        if self.missed >= self.missed_limit {
            self.missed = 0;
            let had_connection = self.state != ConnectionState::Disconnected;
            if self.state == ConnectionState::Connected {
                warn!(
                    limit = self.missed_limit,
                    "no heartbeat reply; recycling the link"
                );
            }
            self.transition(ConnectionState::Disconnected);
            let mut actions = Vec::with_capacity(2);
            if had_connection {
                actions.push(LinkAction::Close);
            }
            actions.extend(self.reconnect());
            return actions;
        }

        self.missed += 1;
        if self.state == ConnectionState::Connected {
            vec![LinkAction::Send(ClientMessage::Probe)]
        } else {
            Vec::new()
        }
    }

    /// Wraps a resolver frame for sending.  Frames produced while the link is
    /// not connected are dropped.
    pub fn key_state(&self, state: KeyStateVector) -> Option<LinkAction> {
        (self.state == ConnectionState::Connected)
            .then(|| LinkAction::Send(ClientMessage::KeyState(state)))
    }

    fn reconnect(&mut self) -> Vec<LinkAction> {
        self.reconnects += 1;
        self.transition(ConnectionState::Connecting);
        vec![LinkAction::Connect]
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state != next {
            if next == ConnectionState::Connected {
                info!("link connected");
            }
            debug!(from = ?self.state, to = ?next, "link state change");
            self.state = next;
        }
    }
}

impl Default for LinkEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn connected() -> LinkEngine {
        let mut engine = LinkEngine::new();
        engine.start();
        engine.on_open();
        engine
    }

    #[test]
    fn test_new_engine_is_disconnected() {
        assert_eq!(LinkEngine::new().state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_start_connects_once() {
        // Arrange
        let mut engine = LinkEngine::new();

        // Act
        let first = engine.start();
        let second = engine.start();

        // Assert
        assert_eq!(first, vec![LinkAction::Connect]);
        assert!(second.is_empty());
        assert_eq!(engine.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_on_open_sends_probe_immediately() {
        let mut engine = LinkEngine::new();
        engine.start();
        assert_eq!(
            engine.on_open(),
            vec![LinkAction::Send(ClientMessage::Probe)]
        );
        assert_eq!(engine.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_tick_while_connected_counts_and_probes() {
        let mut engine = connected();
        assert_eq!(
            engine.on_tick(),
            vec![LinkAction::Send(ClientMessage::Probe)]
        );
        assert_eq!(engine.missed_heartbeats(), 1);
    }

    #[test]
    fn test_reply_resets_missed_counter() {
        let mut engine = connected();
        engine.on_tick();
        engine.on_tick();

        engine.on_message(&ServiceMessage::Reply);

        assert_eq!(engine.missed_heartbeats(), 0);
        assert_eq!(engine.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_two_unanswered_ticks_recycle_link_on_next_tick() {
        // Arrange
        let mut engine = connected();
        engine.on_tick();
        engine.on_tick();
        assert_eq!(engine.state(), ConnectionState::Connected);

        // Act
        let actions = engine.on_tick();

        // Assert
        assert_eq!(actions, vec![LinkAction::Close, LinkAction::Connect]);
        assert_eq!(engine.state(), ConnectionState::Connecting);
        assert_eq!(engine.missed_heartbeats(), 0);
        assert_eq!(engine.reconnects(), 1);
    }

    #[test]
    fn test_answered_ticks_never_recycle() {
        let mut engine = connected();
        for _ in 0..10 {
            let actions = engine.on_tick();
            assert_eq!(actions, vec![LinkAction::Send(ClientMessage::Probe)]);
            engine.on_message(&ServiceMessage::Reply);
        }
        assert_eq!(engine.reconnects(), 0);
    }

    #[test]
    fn test_drop_of_connected_link_reconnects_immediately() {
        let mut engine = connected();
        assert_eq!(engine.on_closed(), vec![LinkAction::Connect]);
        assert_eq!(engine.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_failed_connect_waits_for_watchdog() {
        // Arrange
        let mut engine = LinkEngine::new();
        engine.start();

        // Act
        let on_fail = engine.on_closed();

        // Assert: no reconnect storm; the watchdog retries after the limit.
        assert!(on_fail.is_empty());
        assert_eq!(engine.state(), ConnectionState::Disconnected);
        assert!(engine.on_tick().is_empty());
        assert!(engine.on_tick().is_empty());
        assert_eq!(engine.on_tick(), vec![LinkAction::Connect]);
    }

    #[test]
    fn test_key_state_only_sent_while_connected() {
        let mut engine = LinkEngine::new();
        let state = KeyStateVector::from_active(16, [3]);
        assert!(engine.key_state(state.clone()).is_none());

        engine.start();
        engine.on_open();

        assert_eq!(
            engine.key_state(state.clone()),
            Some(LinkAction::Send(ClientMessage::KeyState(state)))
        );
    }
}
