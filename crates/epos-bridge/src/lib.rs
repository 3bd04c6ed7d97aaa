//! epos-bridge library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does the bridge do? (for beginners)
//!
//! A point-of-sale printer is driven through a small command set: discover
//! printers, connect, stage text and images into the printer's job buffer,
//! commit the buffer (print, feed, cut), and query status.  The printer side
//! exposes those commands through a callback-style *executor*: you hand it a
//! command plus a success and an error handler, and it calls one of them
//! later.
//!
//! The bridge wraps that primitive in an async API:
//!
//! 1. Every one-shot command becomes an `async fn` returning `Result`.
//! 2. Legacy success/error callbacks are still honoured, exactly once each call.
//! 3. The connection state is tracked locally, and commands that need a
//!    connection fail fast without touching the executor.
//! 4. Staging calls can chain their own commit (`terminate`), and the legacy
//!    one-call `print` is built on that.
//! 5. Discovery is a subscription that delivers one event per printer until
//!    stopped.

/// Application layer: the bridge operations and the executor seam.
pub mod application;

/// Infrastructure layer: concrete executors and configuration storage.
pub mod infrastructure;

pub use application::{BridgeError, Callbacks, CommandExecutor, ConnectionState, PrinterSession};
