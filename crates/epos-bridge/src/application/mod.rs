//! Application layer: the bridge's use cases.
//!
//! Everything here talks to the printer only through the
//! [`invoke::CommandExecutor`] trait; the concrete executors live in
//! `crate::infrastructure::executor`.

pub mod connection;
pub mod discovery;
pub mod error;
pub mod invoke;
pub mod print_job;
pub mod query;
pub mod session;

pub use connection::{ConnectionManager, ConnectionState};
pub use discovery::DiscoverySession;
pub use error::BridgeError;
pub use invoke::{CallArg, Callback, Callbacks, CommandExecutor, CommandInvoker, Handler};
pub use print_job::{JobBuilder, TextLines};
pub use query::StatusQuery;
pub use session::PrinterSession;
