//! Connection lifecycle for the single logical printer link.
//!
//! ```text
//!                connect()
//!  Disconnected ───────────► Connecting ──ok──► Connected
//!       ▲                        │                  │
//!       └──────────err───────────┘                  │
//!       └──────────────────disconnect() ok──────────┘
//! ```
//!
//! The state is tracked locally from the outcomes of `connectPrinter` and
//! `disconnectPrinter`; the bridge never polls the device.  It gates the
//! commands that need a live link (see [`Command::requires_connection`]):
//! those fail locally, without an executor call, unless the state is
//! [`ConnectionState::Connected`].
//!
//! `connect` and `disconnect` themselves are never gated.  A disconnect with
//! nothing connected is forwarded and whatever the executor reports is
//! passed on.  A connect whose future is dropped before the reply arrives
//! leaves the state `Disconnected`, never stuck in `Connecting`.

use std::fmt;

use epos_core::domain::device::parse_target;
use epos_core::protocol::args;
use epos_core::{Command, Device, Payload};
use tracing::{info, warn};

use crate::application::error::BridgeError;
use crate::application::invoke::{Callbacks, CommandInvoker};

/// Where the link stands, as far as the bridge knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        })
    }
}

/// Tracks the connection state and issues connect/disconnect.
#[derive(Debug)]
pub struct ConnectionManager {
    invoker: CommandInvoker,
    state: ConnectionState,
    target: Option<String>,
    model: Option<String>,
}

impl ConnectionManager {
    pub fn new(invoker: CommandInvoker) -> Self {
        Self {
            invoker,
            state: ConnectionState::Disconnected,
            target: None,
            model: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Target of the current connection, if connected.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Model hint given on the current connection, if any.
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Fails with [`BridgeError::NotConnected`] unless connected.
    pub fn require_connected(&self, command: Command) -> Result<(), BridgeError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(BridgeError::NotConnected {
                command,
                state: self.state,
            })
        }
    }

    /// Opens the link to `device`.
    ///
    /// The target string is passed through unvalidated; a malformed address
    /// is only logged, and it is up to the executor to reject it.
    pub async fn connect(
        &mut self,
        device: impl Into<Device>,
        model: Option<&str>,
        callbacks: Callbacks,
    ) -> Result<Payload, BridgeError> {
        let target = device.into().into_target();
        if let Err(e) = parse_target(&target) {
            warn!(%target, error = %e, "target does not look like TRANSPORT:ADDRESS; passing it through");
        }

        info!(%target, model = model.unwrap_or("-"), from = %self.state, "connecting to printer");
        let invoker = self.invoker.clone();
        let attempt = ConnectAttempt::begin(self);

        let outcome = invoker
            .call(Command::ConnectPrinter, args::connect(&target, model))
            .await;

        match &outcome {
            Ok(_) => {
                info!(%target, "printer connected");
                attempt.connected(target, model.filter(|m| !m.is_empty()).map(str::to_string));
            }
            Err(e) => {
                warn!(%target, error = %e, "printer connection failed");
                attempt.failed();
            }
        }

        callbacks.settle(outcome.as_ref());
        outcome
    }

    /// Closes the link.
    ///
    /// Success always leaves the state `Disconnected`.  On failure the state
    /// is left as it was.
    pub async fn disconnect(&mut self, callbacks: Callbacks) -> Result<Payload, BridgeError> {
        info!(target = self.target.as_deref().unwrap_or("-"), state = %self.state, "disconnecting printer");

        let outcome = self
            .invoker
            .call(Command::DisconnectPrinter, args::none())
            .await;

        match &outcome {
            Ok(_) => {
                self.reset();
                info!("printer disconnected");
            }
            Err(e) => warn!(error = %e, state = %self.state, "disconnect failed; state unchanged"),
        }

        callbacks.settle(outcome.as_ref());
        outcome
    }

    fn reset(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.target = None;
        self.model = None;
    }
}

/// Holds the manager in `Connecting` while `connectPrinter` is outstanding.
///
/// Dropped unsettled (the connect future was cancelled), it falls back to
/// `Disconnected`: the outcome on the device is unknown.
struct ConnectAttempt<'a> {
    manager: &'a mut ConnectionManager,
    settled: bool,
}

impl<'a> ConnectAttempt<'a> {
    fn begin(manager: &'a mut ConnectionManager) -> Self {
        manager.state = ConnectionState::Connecting;
        Self {
            manager,
            settled: false,
        }
    }

    fn connected(mut self, target: String, model: Option<String>) {
        self.settled = true;
        self.manager.state = ConnectionState::Connected;
        self.manager.target = Some(target);
        self.manager.model = model;
    }

    fn failed(mut self) {
        self.settled = true;
        self.manager.reset();
    }
}

impl Drop for ConnectAttempt<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("connect dropped before the printer replied; treating link as disconnected");
            self.manager.reset();
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
