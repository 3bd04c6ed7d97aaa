//! Domain entities for the ePOS printer bridge.
//!
//! This module contains pure data types with no infrastructure dependencies.
//! Nothing in here performs I/O or knows how a command reaches the printer.
//!
//! # Sub-modules
//!
//! - **`device`** – What discovery produces and what connecting consumes: a
//!   [`device::DeviceDescriptor`] or a raw `"<TRANSPORT>:<ADDRESS>"` string,
//!   unified as the [`device::Device`] tagged union.
//!
//! - **`format`** – Per-call text formatting (font, size, alignment) and image
//!   parameters (print mode, halftone), with their integer wire encodings.
//!
//! - **`job`** – The client-side record of what has been staged into the
//!   device's pending-job buffer since the last commit.
//!
//! - **`status`** – The printer status payload, passed through verbatim.

pub mod device;
pub mod format;
pub mod job;
pub mod status;
