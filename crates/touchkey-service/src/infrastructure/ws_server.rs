//! HTTP server: the touch page and the `/ws` key-state endpoint on one port.
//!
//! An axum [`Router`] sends `GET /ws` through the WebSocket upgrade, where each
//! socket becomes a [`KeySession`]; every other path falls through to a
//! static file service over the configured www directory.
//!
//! Each socket runs in its own task and owns its own session, so nothing but
//! the input backend handle is shared between connections.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    http::{header::USER_AGENT, HeaderMap},
    response::IntoResponse,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};

use touchkey_core::KeyCodeTable;

use crate::application::key_session::KeySession;
use crate::application::synthesize::InputBackend;
use crate::domain::config::{DispatchMode, PressMode, ServiceConfig};

/// Request path of the WebSocket endpoint.
pub const WS_PATH: &str = "/ws";

/// How often the shutdown flag is checked.
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

/// Settings every socket task needs.
#[derive(Clone)]
struct ServerState {
    backend: Arc<dyn InputBackend>,
    table: Arc<KeyCodeTable>,
    press_mode: PressMode,
    dispatch: DispatchMode,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds `config.bind_addr` and serves until `running` is cleared.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound.
pub async fn run_server(
    config: ServiceConfig,
    backend: Arc<dyn InputBackend>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind listener on {}", config.bind_addr))?;
    info!("touchkey service listening on {}", config.bind_addr);
    serve(listener, config, backend, running).await
}

/// Serves on an already bound listener until `running` is cleared.
pub async fn serve(
    listener: TcpListener,
    config: ServiceConfig,
    backend: Arc<dyn InputBackend>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let app = router(config, backend);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_requested(running))
    .await
    .context("HTTP server failed")
}

/// Builds the page + WebSocket router for `config`.
pub fn router(config: ServiceConfig, backend: Arc<dyn InputBackend>) -> Router {
    let state = ServerState {
        backend,
        table: Arc::new(config.key_table),
        press_mode: config.press_mode,
        dispatch: config.dispatch,
    };
    Router::new()
        .route(WS_PATH, get(ws_handler))
        .fallback_service(ServeDir::new(config.www_dir).append_index_html_on_directories(true))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_requested(running: Arc<AtomicBool>) {
    let mut poll = tokio::time::interval(SHUTDOWN_POLL);
    while running.load(Ordering::Relaxed) {
        poll.tick().await;
    }
    info!("shutdown flag set; stopping server");
}

// ── WebSocket sessions ────────────────────────────────────────────────────────

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<ServerState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown client")
        .to_owned();
    info!(%peer, %user_agent, "WebSocket upgrade");

    ws.on_upgrade(move |socket| async move {
        if let Err(e) = run_key_session(socket, peer, state).await {
            warn!("session {peer} closed with error: {e:#}");
        }
    })
}

async fn run_key_session(
    mut socket: WebSocket,
    peer: SocketAddr,
    state: ServerState,
) -> anyhow::Result<()> {
    let mut session = KeySession::new(
        Arc::clone(&state.backend),
        Arc::clone(&state.table),
        state.press_mode,
        state.dispatch,
    )
    .context("failed to open key session")?;
    let id = session.id();
    info!(session = %id, %peer, "key session opened");

    let result = async {
        while let Some(msg) = socket.recv().await {
            match msg? {
                Message::Text(text) => {
                    if let Some(reply) = session.handle_frame(&text).await {
                        socket.send(Message::Text(reply)).await?;
                    }
                }
                Message::Binary(_) => {
                    warn!(session = %id, "unexpected binary frame (ignored)");
                }
                Message::Close(_) => break,
                Message::Ping(_) | Message::Pong(_) => {}
            }
        }
        Ok::<(), axum::Error>(())
    }
    .await;

    session.release_all().await;
    info!(session = %id, %peer, "key session closed");
    result.with_context(|| format!("session {id} transport error"))
}
