//! Client side of the link: one WebSocket connection driven by a
//! [`LinkEngine`].
//!
//! [`ClientSession::run`] multiplexes three event sources in one loop:
//!
//! - the heartbeat ticker (fixed interval, drives the watchdog),
//! - frames from the current connection,
//! - touch input, which goes through the [`TouchPipeline`] and is sent as a
//!   full key-state vector whenever the link is connected.
//!
//! A connection attempt is one more branch of that loop, so touch frames keep
//! resolving and updating the display while the handshake is in flight.
//! Every `Connect` action throws the old connection object away and opens a
//! brand-new one; nothing is reused across reconnects.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, Error as WsError, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};

use touchkey_core::{
    decode_service_message, encode_client_message, ClientMessage, LinkAction, LinkEngine,
};

use crate::application::touch_pipeline::{KeyDisplay, TouchPipeline};
use crate::infrastructure::touch_source::{TouchInput, TouchSource};

/// Default service endpoint.
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:5732/ws";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

type ConnectAttempt = Pin<Box<dyn Future<Output = Result<WsStream, ClientNetworkError>> + Send>>;

/// Errors that can occur in the client network layer.
#[derive(Debug, Error)]
pub enum ClientNetworkError {
    #[error("invalid server URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: WsError,
    },

    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: WsError,
    },

    #[error("timed out connecting to {0}")]
    ConnectTimeout(String),

    #[error("send failed: {0}")]
    Send(#[source] WsError),
}

/// Settings for one client session.
#[derive(Debug, Clone)]
pub struct ClientSessionConfig {
    pub server_url: String,
    /// Heartbeat tick interval; also bounds each connection attempt.
    pub heartbeat: Duration,
}

impl Default for ClientSessionConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            heartbeat: touchkey_core::link::HEARTBEAT_INTERVAL,
        }
    }
}

/// Counters reported when a session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// Connections successfully opened.
    pub connections: u64,
    /// Key-state frames written to a connection.
    pub frames_sent: u64,
    /// Touch frames dropped because the link was down.
    pub frames_dropped: u64,
}

enum Event {
    Tick,
    Connected(Result<WsStream, ClientNetworkError>),
    Frame(Option<Result<Message, WsError>>),
    Input(Option<TouchInput>),
}

/// One client's link to the service.
pub struct ClientSession<S: TouchSource, D: KeyDisplay> {
    config: ClientSessionConfig,
    engine: LinkEngine,
    pipeline: TouchPipeline<D>,
    source: S,
    conn: Option<WsStream>,
    connecting: Option<ConnectAttempt>,
    report: SessionReport,
}

impl<S: TouchSource, D: KeyDisplay> ClientSession<S, D> {
    pub fn new(config: ClientSessionConfig, pipeline: TouchPipeline<D>, source: S) -> Self {
        Self {
            config,
            engine: LinkEngine::new(),
            pipeline,
            source,
            conn: None,
            connecting: None,
            report: SessionReport::default(),
        }
    }

    /// Runs until the touch source ends or `running` is cleared.
    ///
    /// # Errors
    ///
    /// Only an unusable server URL is fatal.  Connection failures and drops
    /// are logged and handled by the link engine.
    pub async fn run(mut self, running: Arc<AtomicBool>) -> Result<SessionReport, ClientNetworkError> {
        self.config
            .server_url
            .as_str()
            .into_client_request()
            .map_err(|source| ClientNetworkError::InvalidUrl {
                url: self.config.server_url.clone(),
                source,
            })?;

        let mut ticker = interval(self.config.heartbeat);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        let mut actions: VecDeque<LinkAction> = self.engine.start().into();
        loop {
            while let Some(action) = actions.pop_front() {
                let follow_ups = self.perform(action).await;
                actions.extend(follow_ups);
            }

            let event = tokio::select! {
                _ = ticker.tick() => Event::Tick,
                result = next_connect(&mut self.connecting) => Event::Connected(result),
                frame = next_frame(&mut self.conn) => Event::Frame(frame),
                input = self.source.next_input() => Event::Input(input),
            };

            match event {
                Event::Tick => {
                    if !running.load(Ordering::Relaxed) {
                        info!("shutdown flag set; closing link");
                        break;
                    }
                    actions.extend(self.engine.on_tick());
                }
                Event::Connected(result) => {
                    self.connecting = None;
                    match result {
                        Ok(ws) => {
                            info!("connected to {}", self.config.server_url);
                            self.conn = Some(ws);
                            self.report.connections += 1;
                            actions.extend(self.engine.on_open());
                        }
                        Err(e) => {
                            warn!("{e}");
                            actions.extend(self.engine.on_closed());
                        }
                    }
                }
                Event::Frame(Some(Ok(Message::Text(text)))) => {
                    match decode_service_message(&text) {
                        Ok(msg) => self.engine.on_message(&msg),
                        Err(e) => warn!("ignoring frame from service: {e}"),
                    }
                }
                Event::Frame(Some(Ok(Message::Close(_)))) | Event::Frame(None) => {
                    self.conn = None;
                    actions.extend(self.engine.on_closed());
                }
                Event::Frame(Some(Ok(_))) => {}
                Event::Frame(Some(Err(e))) => {
                    debug!("connection error: {e}");
                    self.conn = None;
                    actions.extend(self.engine.on_closed());
                }
                Event::Input(Some(TouchInput::Frame(frame))) => {
                    let state = self.pipeline.on_frame(&frame);
                    match self.engine.key_state(state) {
                        Some(action) => actions.push_back(action),
                        None => self.report.frames_dropped += 1,
                    }
                }
                Event::Input(Some(TouchInput::Resize(width))) => match self.pipeline.resize(width) {
                    Ok(released) => match self.engine.key_state(released) {
                        Some(action) => actions.push_back(action),
                        None => self.report.frames_dropped += 1,
                    },
                    Err(e) => warn!(width, "layout rejected after resize: {e}"),
                },
                Event::Input(None) => {
                    info!("touch input ended; closing link");
                    break;
                }
            }
        }

        if let Some(mut ws) = self.conn.take() {
            let _ = ws.close(None).await;
        }
        Ok(self.report)
    }

    /// Carries out one engine action and returns the engine's follow-ups.
    async fn perform(&mut self, action: LinkAction) -> Vec<LinkAction> {
        match action {
            LinkAction::Connect => {
                if let Some(mut old) = self.conn.take() {
                    let _ = old.close(None).await;
                }
                debug!("connecting to {}", self.config.server_url);
                self.connecting = Some(Box::pin(connect(
                    self.config.server_url.clone(),
                    self.config.heartbeat * 2,
                )));
                Vec::new()
            }
            LinkAction::Send(msg) => {
                let Some(ws) = self.conn.as_mut() else {
                    return Vec::new();
                };
                let is_key_state = matches!(msg, ClientMessage::KeyState(_));
                match ws.send(Message::Text(encode_client_message(&msg))).await {
                    Ok(()) => {
                        if is_key_state {
                            self.report.frames_sent += 1;
                        }
                        Vec::new()
                    }
                    Err(e) => {
                        warn!("{}", ClientNetworkError::Send(e));
                        self.conn = None;
                        self.engine.on_closed()
                    }
                }
            }
            LinkAction::Close => {
                self.connecting = None;
                if let Some(mut ws) = self.conn.take() {
                    let _ = ws.close(None).await;
                }
                Vec::new()
            }
        }
    }
}

/// Opens one WebSocket connection, giving up after `limit`.
async fn connect(url: String, limit: Duration) -> Result<WsStream, ClientNetworkError> {
    match timeout(limit, connect_async(url.as_str())).await {
        Ok(Ok((ws, _response))) => Ok(ws),
        Ok(Err(source)) => Err(ClientNetworkError::Connect { url, source }),
        Err(_) => Err(ClientNetworkError::ConnectTimeout(url)),
    }
}

/// Result of the attempt in flight; never resolves while none is.
async fn next_connect(
    attempt: &mut Option<ConnectAttempt>,
) -> Result<WsStream, ClientNetworkError> {
    match attempt {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

/// Next frame from the connection; never resolves while disconnected.
async fn next_frame(conn: &mut Option<WsStream>) -> Option<Result<Message, WsError>> {
    match conn {
        Some(ws) => ws.next().await,
        None => std::future::pending().await,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::touch_pipeline::LogDisplay;
    use crate::domain::layout_file::LayoutFile;
    use crate::infrastructure::touch_source::ScriptedTouchSource;

    #[test]
    fn test_default_config_targets_local_service() {
        let cfg = ClientSessionConfig::default();
        assert_eq!(cfg.server_url, "ws://127.0.0.1:5732/ws");
        assert_eq!(cfg.heartbeat, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_invalid_url_is_fatal() {
        // Arrange
        let pipeline = TouchPipeline::new(LayoutFile::even_row(4, 400, 0, 100), LogDisplay).unwrap();
        let session = ClientSession::new(
            ClientSessionConfig {
                server_url: "not a url".into(),
                heartbeat: Duration::from_millis(50),
            },
            pipeline,
            ScriptedTouchSource::from_inputs([]),
        );

        // Act
        let result = session.run(Arc::new(AtomicBool::new(true))).await;

        // Assert
        assert!(matches!(result, Err(ClientNetworkError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_frames_while_disconnected_are_dropped() {
        // Arrange: nothing listens on port 1
        let pipeline = TouchPipeline::new(LayoutFile::even_row(4, 400, 0, 100), LogDisplay).unwrap();
        let session = ClientSession::new(
            ClientSessionConfig {
                server_url: "ws://127.0.0.1:1/ws".into(),
                heartbeat: Duration::from_millis(50),
            },
            pipeline,
            ScriptedTouchSource::from_inputs([TouchInput::Frame(
                touchkey_core::TouchFrame::from_points([(150.0, 50.0)]),
            )]),
        );

        // Act
        let report = session.run(Arc::new(AtomicBool::new(true))).await.unwrap();

        // Assert
        assert_eq!(report.connections, 0);
        assert_eq!(report.frames_sent, 0);
        assert_eq!(report.frames_dropped, 1);
    }
}
