//! # epos-core
//!
//! Shared library for the ePOS printer bridge containing the command protocol
//! and the domain types that travel across it.
//!
//! This crate has zero dependencies on async runtimes, sockets, or the
//! executor that ultimately talks to the printer.  It is used by the bridge
//! library, by every executor implementation, and by tests.
//!
//! # Architecture overview (for beginners)
//!
//! A point-of-sale printer is driven through a small set of named commands
//! (`connectPrinter`, `printText`, `sendData`, ...).  Each command carries a
//! *positional* argument list and completes with an opaque result payload.
//! The printer keeps a pending-job buffer on the device side: text and images
//! are *staged* into that buffer one call at a time and the job is finished
//! by an explicit *commit* (`sendData`) that feeds the paper and cuts.
//!
//! This crate defines:
//!
//! - **`protocol`** – The nine command names, the exact shape of each
//!   command's positional argument list, and a request-id counter for
//!   executors that correlate replies.
//!
//! - **`domain`** – Device descriptors and addresses, text and image
//!   formatting parameters, the client-side record of a print job, and the
//!   pass-through printer status payload.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `epos_core::Device` instead of `epos_core::domain::device::Device`.
pub use domain::device::{Device, DeviceDescriptor, DeviceError, Transport};
pub use domain::format::{Alignment, Font, FormatError, HalfTone, ImageStyle, PrintMode, TextSize, TextStyle};
pub use domain::job::{JobId, PrintJob, StagedOp};
pub use domain::status::PrinterStatus;
pub use protocol::commands::{Command, UnknownCommand};
pub use protocol::Payload;
