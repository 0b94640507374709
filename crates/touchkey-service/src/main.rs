//! Touchkey service: entry point.
//!
//! Serves the touch page and the `/ws` key-state endpoint on one port, and
//! turns each connection's key-state vectors into native key events.
//!
//! # Usage
//!
//! ```text
//! touchkey-service [OPTIONS]
//!
//! Options:
//!   --bind       <IP>         Address to listen on          [default: 0.0.0.0]
//!   --port       <PORT>       Port to listen on             [default: 5732]
//!   --www-dir    <DIR>        Directory holding the page    [default: www]
//!   --config     <FILE>       TOML config file
//!   --press-mode <hold|tap>   Bit transitions → key events  [default: hold]
//!   --dispatch   <sync|async> Wait for each OS injection    [default: async]
//!   --dry-run                 Log key events instead of injecting them
//! ```
//!
//! Every option can also be set through a `TOUCHKEY_*` environment variable
//! (`TOUCHKEY_PORT`, `TOUCHKEY_PRESS_MODE`, ...).  Precedence, highest first:
//! command line, environment, config file, built-in default.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use touchkey_service::application::InputBackend;
use touchkey_service::domain::config::{bind_address, DEFAULT_PORT};
use touchkey_service::domain::{DispatchMode, PressMode, ServiceConfig, ServiceFile};
use touchkey_service::infrastructure::input_backend::{open_native, RecordingBackend};
use touchkey_service::infrastructure::run_server;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Touchkey host service.
///
/// Options left unset fall back to the config file, then to built-in defaults.
#[derive(Debug, Parser)]
#[command(
    name = "touchkey-service",
    about = "Turns touch key-state updates into native keyboard events",
    version
)]
struct Cli {
    /// IP address to listen on (`0.0.0.0` for all interfaces).
    #[arg(long, env = "TOUCHKEY_BIND")]
    bind: Option<String>,

    /// TCP port for both the page and the WebSocket endpoint.
    #[arg(long, env = "TOUCHKEY_PORT")]
    port: Option<u16>,

    /// Directory the touch page is served from.
    #[arg(long, env = "TOUCHKEY_WWW_DIR")]
    www_dir: Option<PathBuf>,

    /// TOML config file with a `[service]` table and optional `[[keymap]]`.
    #[arg(long, env = "TOUCHKEY_CONFIG")]
    config: Option<PathBuf>,

    /// `hold` presses on 0→1 and releases on 1→0; `tap` taps on 0→1.
    #[arg(long, env = "TOUCHKEY_PRESS_MODE")]
    press_mode: Option<PressMode>,

    /// `async` queues key events; `sync` waits for each injection.
    #[arg(long, env = "TOUCHKEY_DISPATCH")]
    dispatch: Option<DispatchMode>,

    /// Record key events in the log instead of injecting them.
    #[arg(long, env = "TOUCHKEY_DRY_RUN")]
    dry_run: bool,
}

impl Cli {
    /// Layers the CLI over the config file (if any) over the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, its
    /// keymap is invalid, or the bind address is not an IP address.
    fn into_service_config(self) -> anyhow::Result<ServiceConfig> {
        let file = match &self.config {
            Some(path) => ServiceFile::load(path)?,
            None => ServiceFile::default(),
        };
        let defaults = ServiceConfig::default();

        let host = self
            .bind
            .or(file.service.bind.clone())
            .unwrap_or_else(|| defaults.bind_addr.ip().to_string());
        let port = self.port.or(file.service.port).unwrap_or(DEFAULT_PORT);

        Ok(ServiceConfig {
            bind_addr: bind_address(&host, port)?,
            www_dir: self
                .www_dir
                .or(file.service.www_dir.clone())
                .unwrap_or(defaults.www_dir),
            press_mode: self
                .press_mode
                .or(file.service.press_mode)
                .unwrap_or(defaults.press_mode),
            dispatch: self
                .dispatch
                .or(file.service.dispatch)
                .unwrap_or(defaults.dispatch),
            key_table: file.key_table()?.unwrap_or(defaults.key_table),
        })
    }
}

/// Picks the recording backend for dry runs, the OS backend otherwise.
fn open_backend(dry_run: bool) -> anyhow::Result<Arc<dyn InputBackend>> {
    if dry_run {
        info!("dry run: key events are logged, not injected");
        return Ok(Arc::new(RecordingBackend::new()));
    }
    open_native().context("cannot open the OS input subsystem")
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let dry_run = cli.dry_run;
    let config = cli.into_service_config()?;
    let backend = open_backend(dry_run)?;

    info!(
        "touchkey service starting: addr={}, www={}, press={}, dispatch={}, keys={}",
        config.bind_addr,
        config.www_dir.display(),
        config.press_mode,
        config.dispatch,
        config.key_table.len()
    );

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_server(config, backend, running).await?;

    info!("touchkey service stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
