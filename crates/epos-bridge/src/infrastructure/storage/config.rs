//! TOML-based configuration for the bridge binary.
//!
//! Default location:
//! - Windows:  `%APPDATA%\EposBridge\config.toml`
//! - Linux:    `~/.config/epos-bridge/config.toml`
//! - macOS:    `~/Library/Application Support/EposBridge/config.toml`
//!
//! Example:
//!
//! ```toml
//! [bridge]
//! log_level = "debug"
//! executor = "remote"
//!
//! [printer]
//! default_target = "TCP:192.168.1.5"
//! default_model = "TM-T88VI"
//!
//! [remote]
//! agent_addr = "127.0.0.1:24900"
//! connect_timeout_ms = 3000
//!
//! [simulator]
//! paper_empty = false
//!
//! [[simulator.devices]]
//! target = "TCP:192.168.1.5"
//! deviceName = "TM-T88VI"
//! ```
//!
//! Every field has a default, so a partial file (or none at all) is valid.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use epos_core::DeviceDescriptor;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::executor::SimulatorOptions;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BridgeConfig {
    #[serde(default)]
    pub bridge: GeneralConfig,
    #[serde(default)]
    pub printer: PrinterConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

/// Which executor the binary drives.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    /// In-process simulated printer.
    #[default]
    Simulated,
    /// JSON-lines relay to a printer agent.
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub executor: ExecutorKind,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PrinterConfig {
    /// Target used when none is given on the command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_target: Option<String>,
    /// Model hint sent with `connectPrinter`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteConfig {
    #[serde(default = "default_agent_addr")]
    pub agent_addr: SocketAddr,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl RemoteConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulatorConfig {
    #[serde(default)]
    pub offline: bool,
    #[serde(default)]
    pub cover_open: bool,
    #[serde(default)]
    pub paper_empty: bool,
    /// Kept last: TOML emits arrays of tables after plain values.
    #[serde(default = "default_devices")]
    pub devices: Vec<DeviceDescriptor>,
}

impl SimulatorConfig {
    pub fn to_options(&self) -> SimulatorOptions {
        SimulatorOptions {
            devices: self.devices.clone(),
            offline: self.offline,
            cover_open: self.cover_open,
            paper_empty: self.paper_empty,
        }
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}

fn default_agent_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 24900))
}

fn default_connect_timeout_ms() -> u64 {
    3000
}

fn default_devices() -> Vec<DeviceDescriptor> {
    SimulatorOptions::default().devices
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            executor: ExecutorKind::default(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            agent_addr: default_agent_addr(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            offline: false,
            cover_open: false,
            paper_empty: false,
            devices: default_devices(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// The platform-appropriate directory for the config file.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads the config from the platform location; defaults if absent.
pub fn load_config() -> Result<BridgeConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads the config from `path`, returning defaults if the file does not
/// exist.
///
/// # Errors
///
/// [`ConfigError::Io`] for file-system errors other than "not found",
/// [`ConfigError::Parse`] for malformed TOML.
pub fn load_config_from(path: &Path) -> Result<BridgeConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BridgeConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `config` to `path`, creating parent directories as needed.
pub fn save_config_to(path: &Path, config: &BridgeConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("EposBridge"))
    }
    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("epos-bridge"))
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("EposBridge")
        })
    }
    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
