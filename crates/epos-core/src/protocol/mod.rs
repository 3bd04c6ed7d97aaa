//! Command protocol: command names, positional argument shapes, and request ids.

pub mod args;
pub mod commands;
pub mod sequence;

pub use commands::Command;
pub use sequence::SequenceCounter;

/// Opaque value exchanged with the executor: command arguments, success
/// results, and failure payloads alike.
pub type Payload = serde_json::Value;

/// Service name under which the executor registers the printer commands.
pub const SERVICE_NAME: &str = "epos2";
