//! Touchkey client: entry point.
//!
//! Reads touch frames from standard input, one per line, and keeps the
//! service informed of the resulting key state.
//!
//! # Input format
//!
//! ```text
//! 150,50;620,40     two touch points (CSS pixels)
//!                   empty line: no touches
//! resize 1280       viewport width changed
//! # comment         ignored
//! ```
//!
//! # Usage
//!
//! ```text
//! touchkey-client [OPTIONS]
//!
//!   --server         <URL>   Service endpoint      [default: ws://127.0.0.1:5732/ws]
//!   --layout         <FILE>  TOML layout file      [default: even 16-key row]
//!   --heartbeat-ms   <MS>    Heartbeat interval    [default: 1000]
//!   --viewport-width <PX>    Width of the default row  [default: 1600]
//! ```

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use touchkey_client::application::{LogDisplay, TouchPipeline};
use touchkey_client::domain::layout_file::{LayoutFile, DEFAULT_VIEWPORT_WIDTH};
use touchkey_client::infrastructure::network::DEFAULT_SERVER_URL;
use touchkey_client::infrastructure::{ClientSession, ClientSessionConfig, StdinTouchSource};
use touchkey_core::keymap::DEFAULT_KEY_COUNT;

/// Height of each key in the default row.
const DEFAULT_ROW_HEIGHT: u32 = 200;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Touchkey touch client.
#[derive(Debug, Parser)]
#[command(
    name = "touchkey-client",
    about = "Resolves touch frames into key state and sends it to the service",
    version
)]
struct Cli {
    /// WebSocket endpoint of the service.
    #[arg(long, env = "TOUCHKEY_SERVER", default_value = DEFAULT_SERVER_URL)]
    server: String,

    /// Layout file with `[[key]]` entries.  Without one, an even row of
    /// sixteen keys is used.
    #[arg(long, env = "TOUCHKEY_LAYOUT")]
    layout: Option<PathBuf>,

    /// Heartbeat interval in milliseconds.
    #[arg(
        long,
        env = "TOUCHKEY_HEARTBEAT_MS",
        default_value_t = 1000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    heartbeat_ms: u64,

    /// Viewport width for the default row.
    #[arg(long, env = "TOUCHKEY_VIEWPORT_WIDTH", default_value_t = DEFAULT_VIEWPORT_WIDTH)]
    viewport_width: u32,
}

impl Cli {
    fn layout(&self) -> anyhow::Result<LayoutFile> {
        match &self.layout {
            Some(path) => LayoutFile::load(path)
                .with_context(|| format!("cannot load layout {}", path.display())),
            None => Ok(LayoutFile::even_row(
                DEFAULT_KEY_COUNT,
                self.viewport_width,
                0,
                DEFAULT_ROW_HEIGHT,
            )),
        }
    }

    fn session_config(&self) -> ClientSessionConfig {
        ClientSessionConfig {
            server_url: self.server.clone(),
            heartbeat: Duration::from_millis(self.heartbeat_ms),
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let pipeline =
        TouchPipeline::new(cli.layout()?, LogDisplay).context("layout cannot be compiled")?;
    let config = cli.session_config();

    info!(
        "touchkey client starting: server={}, keys={}, heartbeat={:?}",
        config.server_url,
        pipeline.key_count(),
        config.heartbeat
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

    let session = ClientSession::new(config, pipeline, StdinTouchSource::new());
    let report = session.run(running).await?;

    info!(
        connections = report.connections,
        frames_sent = report.frames_sent,
        frames_dropped = report.frames_dropped,
        "touchkey client stopped"
    );
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
