//! `PrinterSession`: the application-facing bridge surface.
//!
//! One session owns one logical printer link and wires the components
//! together around a single executor:
//!
//! ```text
//!  PrinterSession
//!   ├─ DiscoverySession   startDiscover / stopDiscover
//!   ├─ ConnectionManager  connectPrinter / disconnectPrinter, state
//!   ├─ JobBuilder         printText / printImage / sendData
//!   └─ StatusQuery        getPrinterStatus / getSupportedModels
//!           │
//!           ▼
//!     CommandInvoker ──► dyn CommandExecutor
//! ```
//!
//! Methods that change the link or the job take `&mut self`, so calls on one
//! session are sequential by construction.  Every async method also accepts
//! [`Callbacks`]; pass [`Callbacks::none()`] when awaiting is enough.

use std::sync::Arc;

use epos_core::{Device, DeviceDescriptor, ImageStyle, Payload, PrintJob, PrinterStatus, TextStyle};

use crate::application::connection::{ConnectionManager, ConnectionState};
use crate::application::discovery::DiscoverySession;
use crate::application::error::BridgeError;
use crate::application::invoke::{Callbacks, CommandExecutor, CommandInvoker};
use crate::application::print_job::{JobBuilder, TextLines};
use crate::application::query::StatusQuery;

#[derive(Debug)]
pub struct PrinterSession {
    discovery: DiscoverySession,
    connection: ConnectionManager,
    jobs: JobBuilder,
    query: StatusQuery,
}

impl PrinterSession {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        let invoker = CommandInvoker::new(executor);
        Self {
            discovery: DiscoverySession::new(invoker.clone()),
            connection: ConnectionManager::new(invoker.clone()),
            jobs: JobBuilder::new(invoker.clone()),
            query: StatusQuery::new(invoker),
        }
    }

    // ── Discovery ─────────────────────────────────────────────────────────────

    pub fn start_discovery<F, E>(&mut self, on_found: F, on_error: E) -> Result<(), BridgeError>
    where
        F: FnMut(DeviceDescriptor) + Send + 'static,
        E: FnMut(Payload) + Send + 'static,
    {
        self.discovery.start(on_found, on_error)
    }

    pub async fn stop_discovery(&mut self, callbacks: Callbacks) -> Result<Payload, BridgeError> {
        self.discovery.stop(callbacks).await
    }

    pub fn is_discovering(&self) -> bool {
        self.discovery.is_active()
    }

    // ── Connection ────────────────────────────────────────────────────────────

    /// Opens the link.  A job staged before this call is abandoned whatever
    /// the outcome: a job never spans two connections.
    pub async fn connect(
        &mut self,
        device: impl Into<Device>,
        model: Option<&str>,
        callbacks: Callbacks,
    ) -> Result<Payload, BridgeError> {
        self.jobs.abandon();
        self.connection.connect(device, model, callbacks).await
    }

    /// Closes the link.  A successful disconnect also abandons any job staged
    /// but not committed.
    pub async fn disconnect(&mut self, callbacks: Callbacks) -> Result<Payload, BridgeError> {
        let outcome = self.connection.disconnect(callbacks).await;
        if outcome.is_ok() {
            self.jobs.abandon();
        }
        outcome
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn connected_target(&self) -> Option<&str> {
        self.connection.target()
    }

    // ── Printing ──────────────────────────────────────────────────────────────

    pub async fn print_text(
        &mut self,
        lines: impl Into<TextLines>,
        style: TextStyle,
        terminate: bool,
        callbacks: Callbacks,
    ) -> Result<Payload, BridgeError> {
        self.jobs
            .stage_text(&self.connection, lines, style, terminate, callbacks)
            .await
    }

    pub async fn print_image(
        &mut self,
        data_url: &str,
        style: ImageStyle,
        terminate: bool,
        callbacks: Callbacks,
    ) -> Result<Payload, BridgeError> {
        self.jobs
            .stage_image(&self.connection, data_url, style, terminate, callbacks)
            .await
    }

    /// Commits the staged job: print, feed, cut.
    pub async fn send_data(&mut self, callbacks: Callbacks) -> Result<Payload, BridgeError> {
        self.jobs.commit(&self.connection, callbacks).await
    }

    /// Legacy single-call print of `lines` with the default style.
    pub async fn print(
        &mut self,
        lines: impl Into<TextLines>,
        callbacks: Callbacks,
    ) -> Result<Payload, BridgeError> {
        self.jobs
            .submit_legacy(&self.connection, lines, callbacks)
            .await
    }

    pub fn current_job(&self) -> Option<&PrintJob> {
        self.jobs.current()
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub async fn printer_status(&self, callbacks: Callbacks) -> Result<PrinterStatus, BridgeError> {
        self.query.printer_status(&self.connection, callbacks).await
    }

    pub async fn supported_models(&self, callbacks: Callbacks) -> Result<Vec<String>, BridgeError> {
        self.query.supported_models(callbacks).await
    }
}
