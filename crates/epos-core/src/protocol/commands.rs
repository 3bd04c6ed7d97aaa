//! The printer command set.
//!
//! Each command is sent to the executor by its camelCase wire name together
//! with a positional argument list (see [`crate::protocol::args`]).
//!
//! | Command              | Arguments                          | Mode          |
//! |----------------------|------------------------------------|---------------|
//! | `startDiscover`      | `[]`                               | subscription  |
//! | `stopDiscover`       | `[]`                               | request/reply |
//! | `connectPrinter`     | `[target]` or `[target, model]`    | request/reply |
//! | `disconnectPrinter`  | `[]`                               | request/reply |
//! | `printText`          | `[lines, font, size, align]`       | request/reply |
//! | `printImage`         | `[dataUrl, printMode, halfTone]`   | request/reply |
//! | `sendData`           | `[]`                               | request/reply |
//! | `getPrinterStatus`   | `[]`                               | request/reply |
//! | `getSupportedModels` | `[]`                               | request/reply |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when parsing a wire name that is not part of the command set.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown printer command: {0:?}")]
pub struct UnknownCommand(pub String);

/// One of the nine commands understood by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Command {
    StartDiscover,
    StopDiscover,
    ConnectPrinter,
    DisconnectPrinter,
    PrintText,
    PrintImage,
    /// Commit: flush the pending job, feed, and cut.
    SendData,
    GetPrinterStatus,
    GetSupportedModels,
}

impl Command {
    /// Every command, in protocol table order.
    pub const ALL: [Command; 9] = [
        Command::StartDiscover,
        Command::StopDiscover,
        Command::ConnectPrinter,
        Command::DisconnectPrinter,
        Command::PrintText,
        Command::PrintImage,
        Command::SendData,
        Command::GetPrinterStatus,
        Command::GetSupportedModels,
    ];

    /// The wire name sent to the executor.
    pub fn as_str(self) -> &'static str {
        match self {
            Command::StartDiscover => "startDiscover",
            Command::StopDiscover => "stopDiscover",
            Command::ConnectPrinter => "connectPrinter",
            Command::DisconnectPrinter => "disconnectPrinter",
            Command::PrintText => "printText",
            Command::PrintImage => "printImage",
            Command::SendData => "sendData",
            Command::GetPrinterStatus => "getPrinterStatus",
            Command::GetSupportedModels => "getSupportedModels",
        }
    }

    /// `true` for the one command whose success handler stays registered and
    /// fires once per event instead of exactly once.
    pub fn is_subscription(self) -> bool {
        matches!(self, Command::StartDiscover)
    }

    /// `true` for commands that are only meaningful on a connected printer.
    pub fn requires_connection(self) -> bool {
        matches!(
            self,
            Command::PrintText | Command::PrintImage | Command::SendData | Command::GetPrinterStatus
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCommand(s.to_string()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
