//! Printer status payload.
//!
//! The status fields are defined by the executor, not by the bridge.  A
//! [`PrinterStatus`] wraps the payload exactly as received and only offers
//! read helpers; it never renames, drops, or reinterprets a field.  Typical
//! executors report a mapping like:
//!
//! ```json
//! { "online": 1, "connection": 1, "coverOpen": 0, "paper": 0,
//!   "paperFeed": 0, "errorStatus": 0, "isPrintable": true }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Well-known field names reported by Epson-style executors.
pub mod fields {
    pub const ONLINE: &str = "online";
    pub const CONNECTION: &str = "connection";
    pub const COVER_OPEN: &str = "coverOpen";
    pub const PAPER: &str = "paper";
    pub const PAPER_FEED: &str = "paperFeed";
    pub const ERROR_STATUS: &str = "errorStatus";
    pub const IS_PRINTABLE: &str = "isPrintable";
}

/// Opaque printer status, passed through verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrinterStatus(Value);

impl PrinterStatus {
    pub fn new(payload: Value) -> Self {
        Self(payload)
    }

    /// Returns the payload as a field mapping, if it is one.
    pub fn as_map(&self) -> Option<&Map<String, Value>> {
        self.0.as_object()
    }

    /// Looks up a named status flag.
    pub fn flag(&self, name: &str) -> Option<&Value> {
        self.as_map()?.get(name)
    }

    /// The executor's own verdict on whether a job can be printed, if reported.
    pub fn is_printable(&self) -> Option<bool> {
        self.flag(fields::IS_PRINTABLE)?.as_bool()
    }

    pub fn payload(&self) -> &Value {
        &self.0
    }

    pub fn into_payload(self) -> Value {
        self.0
    }
}

impl From<Value> for PrinterStatus {
    fn from(payload: Value) -> Self {
        Self(payload)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
