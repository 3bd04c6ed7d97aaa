//! Concrete [`CommandExecutor`](crate::application::CommandExecutor)
//! implementations.
//!
//! - [`remote::RemoteExecutor`] relays commands to a printer agent over TCP.
//! - [`simulated::SimulatedPrinter`] models a printer in memory; used by the
//!   CLI when no agent is configured and by integration tests.
//! - [`recording::RecordingExecutor`] records calls and replies from a script.

pub mod recording;
pub mod remote;
pub mod simulated;

pub use recording::{RecordedCall, RecordingExecutor, Reply};
pub use remote::{RemoteError, RemoteExecutor};
pub use simulated::{PrintedReceipt, ReceiptLine, SimulatedPrinter, SimulatorOptions};
