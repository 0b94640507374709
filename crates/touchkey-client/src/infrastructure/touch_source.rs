//! Sources of touch input.
//!
//! The driver pulls [`TouchInput`]s from a [`TouchSource`] until it returns
//! `None`.  [`StdinTouchSource`] reads one line per input:
//!
//! ```text
//! 150,50;420.5,60     two contact points
//!                     empty line: every finger lifted
//! resize 1200         viewport is now 1200 px wide
//! # comment           ignored
//! ```

use std::collections::VecDeque;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tracing::warn;
use touchkey_core::TouchFrame;

/// One event from the touch surface.
#[derive(Debug, Clone, PartialEq)]
pub enum TouchInput {
    Frame(TouchFrame),
    Resize(u32),
}

/// Errors in a touch script line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TouchParseError {
    #[error("touch point '{0}' is not 'x,y'")]
    BadPoint(String),

    #[error("coordinate '{0}' is not a finite number")]
    BadCoordinate(String),

    #[error("resize width '{0}' is not a positive integer")]
    BadResize(String),
}

/// Something that yields touch input until it runs dry.
#[async_trait]
pub trait TouchSource: Send {
    async fn next_input(&mut self) -> Option<TouchInput>;
}

/// Parses one script line.  Comments yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<TouchInput>, TouchParseError> {
    let line = line.trim();
    if line.starts_with('#') {
        return Ok(None);
    }
    if let Some(width) = line.strip_prefix("resize") {
        let width = width.trim();
        return match width.parse::<u32>() {
            Ok(w) if w > 0 => Ok(Some(TouchInput::Resize(w))),
            _ => Err(TouchParseError::BadResize(width.to_string())),
        };
    }

    let mut points = Vec::new();
    for point in line.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let (x, y) = point
            .split_once(',')
            .ok_or_else(|| TouchParseError::BadPoint(point.to_string()))?;
        points.push((parse_coordinate(x)?, parse_coordinate(y)?));
    }
    Ok(Some(TouchInput::Frame(TouchFrame::from_points(points))))
}

fn parse_coordinate(text: &str) -> Result<f64, TouchParseError> {
    let text = text.trim();
    text.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| TouchParseError::BadCoordinate(text.to_string()))
}

/// Reads touch script lines from standard input.
pub struct StdinTouchSource {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinTouchSource {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdinTouchSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TouchSource for StdinTouchSource {
    async fn next_input(&mut self) -> Option<TouchInput> {
        loop {
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => {
                    warn!("stdin read failed: {e}");
                    return None;
                }
            };
            match parse_line(&line) {
                Ok(Some(input)) => return Some(input),
                Ok(None) => {}
                Err(e) => warn!("skipping touch line: {e}"),
            }
        }
    }
}

/// Touch input fed by the program itself: a fixed script, then whatever is
/// pushed through the paired sender.
pub struct ScriptedTouchSource {
    script: VecDeque<TouchInput>,
    rx: Option<mpsc::UnboundedReceiver<TouchInput>>,
}

impl ScriptedTouchSource {
    /// A source that replays `inputs` and then ends.
    pub fn from_inputs<I>(inputs: I) -> Self
    where
        I: IntoIterator<Item = TouchInput>,
    {
        Self {
            script: inputs.into_iter().collect(),
            rx: None,
        }
    }

    /// A source that yields whatever is sent, ending when the sender drops.
    pub fn channel() -> (mpsc::UnboundedSender<TouchInput>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            tx,
            Self {
                script: VecDeque::new(),
                rx: Some(rx),
            },
        )
    }
}

#[async_trait]
impl TouchSource for ScriptedTouchSource {
    async fn next_input(&mut self) -> Option<TouchInput> {
        if let Some(input) = self.script.pop_front() {
            return Some(input);
        }
        match self.rx.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
