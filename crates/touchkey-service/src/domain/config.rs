//! Service configuration types.
//!
//! [`ServiceConfig`] is the single source of truth for runtime settings.  It is
//! assembled in `main.rs` from CLI flags layered over an optional TOML file
//! ([`ServiceFile`]); nothing in here reads the environment.
//!
//! # File format
//!
//! ```toml
//! [service]
//! bind = "127.0.0.1"
//! port = 5732
//! www_dir = "www"
//! press_mode = "hold"
//! dispatch = "async"
//!
//! [[keymap]]
//! index = 0
//! key_code = 0x31
//! ```
//!
//! A `[[keymap]]` array, when present, replaces the default key table
//! entirely.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use touchkey_core::{KeyCodeEntry, KeyCodeTable, KeymapError};

/// Port the service listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 5732;

/// Directory the page is served from unless configured otherwise.
pub const DEFAULT_WWW_DIR: &str = "www";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid keymap: {0}")]
    Keymap(#[from] KeymapError),

    #[error("invalid bind address '{0}'")]
    BindAddress(String),
}

/// Unknown value for an enum-valued setting.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {setting} '{value}' (expected one of: {expected})")]
pub struct ParseModeError {
    setting: &'static str,
    value: String,
    expected: &'static str,
}

/// How key-state transitions become OS events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PressMode {
    /// A rising bit presses the key; a falling bit releases it.
    #[default]
    Hold,
    /// A rising bit taps the key (down then up); falling bits are ignored.
    Tap,
}

impl FromStr for PressMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hold" => Ok(PressMode::Hold),
            "tap" => Ok(PressMode::Tap),
            _ => Err(ParseModeError {
                setting: "press mode",
                value: s.to_string(),
                expected: "hold, tap",
            }),
        }
    }
}

impl fmt::Display for PressMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PressMode::Hold => "hold",
            PressMode::Tap => "tap",
        })
    }
}

/// Whether a toggle waits for the OS to accept the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Block the caller until the record has been injected.
    Sync,
    /// Queue the record and hand back a pending result.
    #[default]
    Async,
}

impl FromStr for DispatchMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sync" => Ok(DispatchMode::Sync),
            "async" => Ok(DispatchMode::Async),
            _ => Err(ParseModeError {
                setting: "dispatch mode",
                value: s.to_string(),
                expected: "sync, async",
            }),
        }
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DispatchMode::Sync => "sync",
            DispatchMode::Async => "async",
        })
    }
}

/// All runtime configuration for the service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address the listener binds to.  `0.0.0.0` accepts LAN clients.
    pub bind_addr: SocketAddr,
    /// Directory holding the touch page.
    pub www_dir: PathBuf,
    pub press_mode: PressMode,
    pub dispatch: DispatchMode,
    /// Logical index → OS key code.
    pub key_table: KeyCodeTable,
}

impl Default for ServiceConfig {
    /// `0.0.0.0:5732`, `./www`, hold mode, async dispatch, default key table.
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            www_dir: PathBuf::from(DEFAULT_WWW_DIR),
            press_mode: PressMode::default(),
            dispatch: DispatchMode::default(),
            key_table: KeyCodeTable::default_layout(),
        }
    }
}

/// `[service]` table of the config file.  Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceSection {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub www_dir: Option<PathBuf>,
    pub press_mode: Option<PressMode>,
    pub dispatch: Option<DispatchMode>,
}

/// On-disk service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceFile {
    #[serde(default)]
    pub service: ServiceSection,
    #[serde(default)]
    pub keymap: Vec<KeyCodeEntry>,
}

impl ServiceFile {
    /// Parses a config document.
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads and parses the config file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path)
    }

    /// The key table this file describes, or `None` to keep the default.
    pub fn key_table(&self) -> Result<Option<KeyCodeTable>, ConfigError> {
        if self.keymap.is_empty() {
            return Ok(None);
        }
        Ok(Some(KeyCodeTable::from_entries(self.keymap.iter().copied())?))
    }
}

/// Joins a host string and port into a socket address.
pub fn bind_address(host: &str, port: u16) -> Result<SocketAddr, ConfigError> {
    host.parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, port))
        .map_err(|_| ConfigError::BindAddress(host.to_string()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port_is_5732() {
        assert_eq!(ServiceConfig::default().bind_addr.port(), 5732);
    }

    #[test]
    fn test_default_binds_all_interfaces() {
        assert!(ServiceConfig::default().bind_addr.ip().is_unspecified());
    }

    #[test]
    fn test_default_modes_are_hold_and_async() {
        let cfg = ServiceConfig::default();
        assert_eq!(cfg.press_mode, PressMode::Hold);
        assert_eq!(cfg.dispatch, DispatchMode::Async);
    }

    #[test]
    fn test_press_mode_parses_case_insensitively() {
        assert_eq!("TAP".parse::<PressMode>(), Ok(PressMode::Tap));
        assert_eq!("hold".parse::<PressMode>(), Ok(PressMode::Hold));
    }

    #[test]
    fn test_unknown_dispatch_mode_is_rejected() {
        let err = "eventually".parse::<DispatchMode>().unwrap_err();
        assert!(err.to_string().contains("eventually"));
    }

    #[test]
    fn test_empty_file_is_all_defaults() {
        let file = ServiceFile::from_toml("", Path::new("empty.toml")).unwrap();
        assert_eq!(file, ServiceFile::default());
        assert!(file.key_table().unwrap().is_none());
    }

    #[test]
    fn test_file_with_service_section_and_keymap() {
        // Arrange
        let text = r#"
            [service]
            port = 8080
            press_mode = "tap"
            dispatch = "sync"

            [[keymap]]
            index = 0
            key_code = 0x20

            [[keymap]]
            index = 1
            key_code = 0x0D
        "#;

        // Act
        let file = ServiceFile::from_toml(text, Path::new("svc.toml")).unwrap();
        let table = file.key_table().unwrap().unwrap();

        // Assert
        assert_eq!(file.service.port, Some(8080));
        assert_eq!(file.service.press_mode, Some(PressMode::Tap));
        assert_eq!(file.service.dispatch, Some(DispatchMode::Sync));
        assert_eq!(table.key_code(0), Some(0x20));
        assert_eq!(table.key_code(1), Some(0x0D));
        assert_eq!(table.key_code(2), None);
    }

    #[test]
    fn test_file_with_duplicate_keymap_index_is_rejected() {
        let text = "[[keymap]]\nindex = 4\nkey_code = 1\n[[keymap]]\nindex = 4\nkey_code = 2\n";
        let file = ServiceFile::from_toml(text, Path::new("dup.toml")).unwrap();
        assert!(matches!(
            file.key_table(),
            Err(ConfigError::Keymap(KeymapError::DuplicateIndex(4)))
        ));
    }

    #[test]
    fn test_unknown_key_is_a_parse_error() {
        let result = ServiceFile::from_toml("[service]\nprot = 1\n", Path::new("typo.toml"));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let result = ServiceFile::load(Path::new("/nonexistent/touchkey.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_bind_address_joins_host_and_port() {
        assert_eq!(
            bind_address("127.0.0.1", 5732).unwrap().to_string(),
            "127.0.0.1:5732"
        );
    }

    #[test]
    fn test_bind_address_rejects_hostnames() {
        assert!(matches!(
            bind_address("not.an.ip", 5732),
            Err(ConfigError::BindAddress(_))
        ));
    }
}
