//! The bridge's error taxonomy.
//!
//! Three kinds of failure reach the caller:
//!
//! - **Precondition** ([`BridgeError::NotConnected`], [`BridgeError::JobTerminated`],
//!   [`BridgeError::DiscoveryActive`]): raised locally, the executor is never called.
//! - **Executor** ([`BridgeError::Executor`]): the remote command failed; its
//!   payload is carried through unmodified.
//! - **Partial completion** ([`BridgeError::PartialCompletion`]): a
//!   terminate-chained staging call whose stage step succeeded but whose commit
//!   failed.  The primitive is already in the device buffer even though the
//!   call as a whole failed; nothing is rolled back.

use epos_core::domain::job::JobTerminated;
use epos_core::{Command, Payload};
use thiserror::Error;

use crate::application::connection::ConnectionState;

/// Error type for every bridge operation.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The operation needs a connected printer.
    #[error("{command} requires a connected printer (connection is {state})")]
    NotConnected {
        command: Command,
        state: ConnectionState,
    },

    /// A commit has been issued for the current job and not yet succeeded.
    #[error(transparent)]
    JobTerminated(#[from] JobTerminated),

    /// `startDiscover` while a scan from this session is still running.
    #[error("a discovery scan is already running; stop it first")]
    DiscoveryActive,

    /// The executor reported a failure.
    #[error("{command} failed: {message}")]
    Executor {
        command: Command,
        /// Human-readable rendering of `payload`.
        message: String,
        /// The failure payload exactly as the executor reported it.
        payload: Payload,
    },

    /// The stage step of a terminate-chained call succeeded, the commit did not.
    #[error("{staged} was staged on the device but the commit failed: {source}")]
    PartialCompletion {
        staged: Command,
        /// What the stage step resolved with.
        staged_result: Payload,
        #[source]
        source: Box<BridgeError>,
    },

    /// The executor succeeded with a payload of the wrong shape.
    #[error("{command} returned an unexpected payload: {payload}")]
    UnexpectedPayload { command: Command, payload: Payload },

    /// The executor released both completion handlers without calling either.
    #[error("executor dropped {command} without completing it")]
    ExecutorDropped { command: Command },
}

impl BridgeError {
    /// Builds an executor error from a raw failure payload.
    pub fn executor(command: Command, payload: Payload) -> Self {
        let message = match &payload {
            Payload::String(s) => s.clone(),
            other => other.to_string(),
        };
        BridgeError::Executor {
            command,
            message,
            payload,
        }
    }

    /// The payload handed to a legacy error callback for this failure.
    ///
    /// Executor failures (including the commit step of a partial completion)
    /// yield the executor's own payload; locally raised errors yield their
    /// message as a string.
    pub fn payload(&self) -> Payload {
        match self {
            BridgeError::Executor { payload, .. } => payload.clone(),
            BridgeError::PartialCompletion { source, .. } => source.payload(),
            other => Payload::String(other.to_string()),
        }
    }

    /// `true` when the failure was detected locally, before any executor call.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            BridgeError::NotConnected { .. }
                | BridgeError::JobTerminated(_)
                | BridgeError::DiscoveryActive
        )
    }

    pub fn is_partial_completion(&self) -> bool {
        matches!(self, BridgeError::PartialCompletion { .. })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_executor_error_uses_string_payload_as_message() {
        let err = BridgeError::executor(Command::SendData, json!("Error 0x00051: Failed to send print job"));
        assert_eq!(
            err.to_string(),
            "sendData failed: Error 0x00051: Failed to send print job"
        );
        assert_eq!(err.payload(), json!("Error 0x00051: Failed to send print job"));
    }

    #[test]
    fn test_executor_error_renders_structured_payload_as_json() {
        let err = BridgeError::executor(Command::PrintText, json!({ "code": 48 }));
        assert_eq!(err.to_string(), r#"printText failed: {"code":48}"#);
        assert_eq!(err.payload(), json!({ "code": 48 }));
    }

    #[test]
    fn test_partial_completion_payload_is_the_commit_failure() {
        // Arrange
        let commit = BridgeError::executor(Command::SendData, json!("paper out"));

        // Act
        let err = BridgeError::PartialCompletion {
            staged: Command::PrintText,
            staged_result: json!(true),
            source: Box::new(commit),
        };

        // Assert
        assert!(err.is_partial_completion());
        assert!(!err.is_precondition());
        assert_eq!(err.payload(), json!("paper out"));
    }

    #[test]
    fn test_not_connected_is_a_precondition_with_message_payload() {
        let err = BridgeError::NotConnected {
            command: Command::GetPrinterStatus,
            state: ConnectionState::Disconnected,
        };
        assert!(err.is_precondition());
        assert_eq!(
            err.payload(),
            json!("getPrinterStatus requires a connected printer (connection is disconnected)")
        );
    }
}
