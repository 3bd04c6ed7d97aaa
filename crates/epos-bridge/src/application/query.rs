//! Printer status and capability queries.

use epos_core::protocol::args;
use epos_core::{Command, Payload, PrinterStatus};
use tracing::{debug, warn};

use crate::application::connection::ConnectionManager;
use crate::application::error::BridgeError;
use crate::application::invoke::{Callbacks, CommandInvoker};

#[derive(Debug, Clone)]
pub struct StatusQuery {
    invoker: CommandInvoker,
}

impl StatusQuery {
    pub fn new(invoker: CommandInvoker) -> Self {
        Self { invoker }
    }

    /// Reads the printer's current status.  Requires a connected printer.
    ///
    /// The status record is passed through as reported; see
    /// [`epos_core::domain::status::fields`] for the usual field names.
    pub async fn printer_status(
        &self,
        connection: &ConnectionManager,
        callbacks: Callbacks,
    ) -> Result<PrinterStatus, BridgeError> {
        let outcome = match connection.require_connected(Command::GetPrinterStatus) {
            Ok(()) => {
                self.invoker
                    .call(Command::GetPrinterStatus, args::none())
                    .await
            }
            Err(e) => Err(e),
        };
        callbacks.settle(outcome.as_ref());

        let status = PrinterStatus::new(outcome?);
        debug!(printable = ?status.is_printable(), "printer status read");
        Ok(status)
    }

    /// Lists the printer model names the executor supports.
    ///
    /// Works without a connection.
    ///
    /// # Errors
    ///
    /// [`BridgeError::UnexpectedPayload`] if the executor succeeds with
    /// anything other than a list of strings.
    pub async fn supported_models(&self, callbacks: Callbacks) -> Result<Vec<String>, BridgeError> {
        let outcome = self
            .invoker
            .call(Command::GetSupportedModels, args::none())
            .await
            .and_then(|payload| {
                let models = model_names(&payload).ok_or_else(|| {
                    warn!(%payload, "supported model list is not a list of strings");
                    BridgeError::UnexpectedPayload {
                        command: Command::GetSupportedModels,
                        payload: payload.clone(),
                    }
                })?;
                Ok((payload, models))
            });

        callbacks.settle(outcome.as_ref().map(|(payload, _)| payload));
        outcome.map(|(_, models)| models)
    }
}

fn model_names(payload: &Payload) -> Option<Vec<String>> {
    payload
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
