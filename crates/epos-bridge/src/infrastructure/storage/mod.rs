//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads the bridge's TOML configuration from the
//! platform config directory (or an explicit path) and falls back to
//! defaults when no file exists yet.

pub mod config;
