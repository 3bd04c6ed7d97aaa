//! Printer identification: discovered device descriptors and raw addresses.
//!
//! Every printer is addressed by a *target* string of the form
//! `"<TRANSPORT>:<ADDRESS>"`, for example `"BT:00:11:22:33:44:55"` or
//! `"TCP:192.168.1.5"`.  Discovery produces a [`DeviceDescriptor`] that
//! carries the target plus optional human-readable metadata; applications
//! that already know the address can skip discovery and pass the raw string.
//!
//! Both inputs are accepted by the connection manager through the
//! [`Device`] tagged union, which is resolved to a target exactly once at the
//! boundary via [`Device::target`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Error type for device address parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeviceError {
    /// The target has no `':'` separating the transport from the address.
    #[error("device target {0:?} is not of the form <TRANSPORT>:<ADDRESS>")]
    MissingSeparator(String),
    /// The transport prefix is empty (e.g. `":1.2.3.4"`).
    #[error("device target {0:?} has an empty transport prefix")]
    EmptyTransport(String),
    /// Nothing follows the separator (e.g. `"TCP:"`).
    #[error("device target {0:?} has an empty address")]
    EmptyAddress(String),
}

// ── Transport ─────────────────────────────────────────────────────────────────

/// The transport prefix of a device target.
///
/// The bridge never opens a transport itself; this is informational, used for
/// logging and for the CLI's device listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Transport {
    Bluetooth,
    Tcp,
    Usb,
    /// Any other prefix the executor understands, stored verbatim.
    Other(String),
}

impl Transport {
    fn from_prefix(prefix: &str) -> Self {
        match prefix {
            "BT" => Transport::Bluetooth,
            "TCP" => Transport::Tcp,
            "USB" => Transport::Usb,
            other => Transport::Other(other.to_string()),
        }
    }

    /// Returns the prefix as it appears in a target string.
    pub fn as_prefix(&self) -> &str {
        match self {
            Transport::Bluetooth => "BT",
            Transport::Tcp => "TCP",
            Transport::Usb => "USB",
            Transport::Other(s) => s,
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_prefix())
    }
}

/// Splits a target string into its transport and address parts.
///
/// Only the first `':'` separates the two, so Bluetooth MAC addresses such as
/// `"BT:00:11:22:33:44:55"` keep their colons in the address part.
///
/// # Errors
///
/// Returns a [`DeviceError`] when the separator, the transport, or the address
/// is missing.
///
/// # Example
///
/// ```rust
/// use epos_core::domain::device::{parse_target, Transport};
///
/// let (transport, address) = parse_target("BT:00:11:22:33:44:55").unwrap();
/// assert_eq!(transport, Transport::Bluetooth);
/// assert_eq!(address, "00:11:22:33:44:55");
/// ```
pub fn parse_target(target: &str) -> Result<(Transport, &str), DeviceError> {
    let (prefix, address) = target
        .split_once(':')
        .ok_or_else(|| DeviceError::MissingSeparator(target.to_string()))?;
    if prefix.is_empty() {
        return Err(DeviceError::EmptyTransport(target.to_string()));
    }
    if address.is_empty() {
        return Err(DeviceError::EmptyAddress(target.to_string()));
    }
    Ok((Transport::from_prefix(prefix), address))
}

// ── Device descriptor ─────────────────────────────────────────────────────────

/// Keys of the metadata executors usually report alongside the target.
pub mod info {
    pub const DEVICE_NAME: &str = "deviceName";
    pub const IP_ADDRESS: &str = "ipAddress";
    pub const MAC_ADDRESS: &str = "macAddress";
    pub const BD_ADDRESS: &str = "bdAddress";
    pub const DEVICE_TYPE: &str = "deviceType";
}

/// A printer found by discovery.
///
/// Only `target` has a fixed shape: it must be a string.  Everything else the
/// executor reports is kept verbatim in `info`, whatever its keys and types,
/// and serializes back out unchanged.  The accessors below read the usual
/// metadata fields when they hold the expected type.
///
/// Descriptors are immutable once produced: the bridge hands them to the
/// application by value and never mutates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Address string, `"<TRANSPORT>:<ADDRESS>"`.
    pub target: String,
    #[serde(flatten)]
    pub info: Map<String, Value>,
}

impl DeviceDescriptor {
    /// Creates a descriptor carrying only a target.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            info: Map::new(),
        }
    }

    /// Builder-style setter for the human-readable name.
    pub fn with_name(self, name: impl Into<String>) -> Self {
        let name: String = name.into();
        self.with_info(info::DEVICE_NAME, name)
    }

    /// Builder-style setter for any metadata field.
    pub fn with_info(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.info.insert(key.to_string(), value.into());
        self
    }

    /// Raw metadata field, as reported.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.info.get(key)
    }

    pub fn device_name(&self) -> Option<&str> {
        self.get_str(info::DEVICE_NAME)
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.get_str(info::IP_ADDRESS)
    }

    pub fn mac_address(&self) -> Option<&str> {
        self.get_str(info::MAC_ADDRESS)
    }

    pub fn bd_address(&self) -> Option<&str> {
        self.get_str(info::BD_ADDRESS)
    }

    /// Device type code or name; executors disagree on which.
    pub fn device_type(&self) -> Option<&Value> {
        self.get(info::DEVICE_TYPE)
    }

    /// Returns the transport part of the target, if the target is well formed.
    pub fn transport(&self) -> Option<Transport> {
        parse_target(&self.target).ok().map(|(t, _)| t)
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }
}

// ── Device (tagged union) ─────────────────────────────────────────────────────

/// What the caller passes to `connect`: a discovered descriptor or a raw
/// address string.
///
/// `From` impls let callers write `session.connect("TCP:10.0.0.5", None)` or
/// `session.connect(descriptor, Some("TM-T88VI"))` interchangeably.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Device {
    Descriptor(DeviceDescriptor),
    Address(String),
}

impl Device {
    /// Resolves the device to the target string sent to the executor.
    pub fn target(&self) -> &str {
        match self {
            Device::Descriptor(d) => &d.target,
            Device::Address(a) => a,
        }
    }

    /// Consumes the device, returning its target string.
    pub fn into_target(self) -> String {
        match self {
            Device::Descriptor(d) => d.target,
            Device::Address(a) => a,
        }
    }
}

impl From<DeviceDescriptor> for Device {
    fn from(d: DeviceDescriptor) -> Self {
        Device::Descriptor(d)
    }
}

impl From<&DeviceDescriptor> for Device {
    fn from(d: &DeviceDescriptor) -> Self {
        Device::Descriptor(d.clone())
    }
}

impl From<String> for Device {
    fn from(a: String) -> Self {
        Device::Address(a)
    }
}

impl From<&str> for Device {
    fn from(a: &str) -> Self {
        Device::Address(a.to_string())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
