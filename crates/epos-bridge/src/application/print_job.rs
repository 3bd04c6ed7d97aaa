//! Print job builder.
//!
//! A receipt is built by *staging* primitives (text blocks and images) into
//! the device's pending-job buffer and then *committing* the buffer with
//! `sendData`, which prints, feeds, and cuts.
//!
//! Every staging call may set `terminate`; the bridge then issues the commit
//! right after the stage step, as one logical operation.  The legacy
//! [`JobBuilder::submit_legacy`] is simply "stage these lines with the default
//! style and terminate".
//!
//! # Job lifecycle
//!
//! ```text
//!  (none) ──stage──► Open ──commit issued──► Terminated ──commit ok──► (none)
//!                     ▲                          │
//!                     └────── commit failed ─────┘
//! ```
//!
//! The bridge keeps a local ledger ([`PrintJob`]) of what it has staged since
//! the last commit.  Staging into a terminated job fails locally; a failed
//! commit reopens the job, since the device still holds the content.  So does
//! a commit whose future is dropped before the printer replies.
//!
//! # Partial completion
//!
//! When the stage step of a terminate-chained call succeeds and the commit
//! fails, the call fails with [`BridgeError::PartialCompletion`].  The staged
//! content stays in the device buffer and in the ledger; nothing is rolled
//! back.

use epos_core::protocol::args;
use epos_core::{Command, ImageStyle, Payload, PrintJob, StagedOp, TextStyle};
use tracing::{debug, info, warn};

use crate::application::connection::ConnectionManager;
use crate::application::error::BridgeError;
use crate::application::invoke::{Callbacks, CommandInvoker};

// ── TextLines ─────────────────────────────────────────────────────────────────

/// Text data for a staging call, normalized to an ordered list of lines.
///
/// A single string becomes a one-element list.  A line consisting of `"\n"`
/// is a blank line on paper.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextLines(Vec<String>);

impl TextLines {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<&str> for TextLines {
    fn from(line: &str) -> Self {
        TextLines(vec![line.to_string()])
    }
}

impl From<String> for TextLines {
    fn from(line: String) -> Self {
        TextLines(vec![line])
    }
}

impl From<Vec<String>> for TextLines {
    fn from(lines: Vec<String>) -> Self {
        TextLines(lines)
    }
}

impl From<Vec<&str>> for TextLines {
    fn from(lines: Vec<&str>) -> Self {
        TextLines(lines.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for TextLines {
    fn from(lines: &[&str]) -> Self {
        TextLines(lines.iter().map(|l| l.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for TextLines {
    fn from(lines: [&str; N]) -> Self {
        TextLines(lines.iter().map(|l| l.to_string()).collect())
    }
}

// ── JobBuilder ────────────────────────────────────────────────────────────────

/// Stages primitives and commits them.
///
/// Every operation requires a connected printer, checked against the
/// [`ConnectionManager`] passed in; the check happens before any command is
/// issued.
#[derive(Debug)]
pub struct JobBuilder {
    invoker: CommandInvoker,
    job: Option<PrintJob>,
}

impl JobBuilder {
    pub fn new(invoker: CommandInvoker) -> Self {
        Self { invoker, job: None }
    }

    /// The ledger of the job staged since the last commit, if any.
    pub fn current(&self) -> Option<&PrintJob> {
        self.job.as_ref()
    }

    /// Stages a block of text, optionally committing immediately.
    pub async fn stage_text(
        &mut self,
        connection: &ConnectionManager,
        lines: impl Into<TextLines>,
        style: TextStyle,
        terminate: bool,
        callbacks: Callbacks,
    ) -> Result<Payload, BridgeError> {
        let lines = lines.into().into_vec();
        let command_args = args::print_text(&lines, style);
        let op = StagedOp::Text { lines, style };
        let outcome = self
            .stage(connection, Command::PrintText, command_args, op, terminate)
            .await;
        callbacks.settle(outcome.as_ref());
        outcome
    }

    /// Stages an image given as a data URL, optionally committing immediately.
    ///
    /// The URL is forwarded uninterpreted.
    pub async fn stage_image(
        &mut self,
        connection: &ConnectionManager,
        data_url: &str,
        style: ImageStyle,
        terminate: bool,
        callbacks: Callbacks,
    ) -> Result<Payload, BridgeError> {
        let command_args = args::print_image(data_url, style);
        let op = StagedOp::image(data_url, style);
        let outcome = self
            .stage(connection, Command::PrintImage, command_args, op, terminate)
            .await;
        callbacks.settle(outcome.as_ref());
        outcome
    }

    /// Commits whatever is staged.
    ///
    /// Allowed with nothing staged; the printer then just feeds and cuts.
    pub async fn commit(
        &mut self,
        connection: &ConnectionManager,
        callbacks: Callbacks,
    ) -> Result<Payload, BridgeError> {
        let outcome = self.commit_staged(connection).await;
        callbacks.settle(outcome.as_ref());
        outcome
    }

    /// Legacy one-call print: stage `lines` with the default style and commit.
    pub async fn submit_legacy(
        &mut self,
        connection: &ConnectionManager,
        lines: impl Into<TextLines>,
        callbacks: Callbacks,
    ) -> Result<Payload, BridgeError> {
        self.stage_text(connection, lines, TextStyle::default(), true, callbacks)
            .await
    }

    /// Forgets the current job.  Called when the link goes away.
    pub fn abandon(&mut self) -> Option<PrintJob> {
        let job = self.job.take();
        if let Some(job) = &job {
            if !job.is_empty() {
                warn!(job = %job.id(), ops = job.ops().len(), "abandoning uncommitted print job");
            }
        }
        job
    }

    async fn stage(
        &mut self,
        connection: &ConnectionManager,
        command: Command,
        command_args: Vec<Payload>,
        op: StagedOp,
        terminate: bool,
    ) -> Result<Payload, BridgeError> {
        connection.require_connected(command)?;
        if let Some(job) = &self.job {
            job.ensure_open()?;
        }

        let staged = self.invoker.call(command, command_args).await?;

        let job = self.job.get_or_insert_with(|| {
            let job = PrintJob::new();
            info!(job = %job.id(), "print job opened");
            job
        });
        job.record(op)?;
        debug!(job = %job.id(), %command, ops = job.ops().len(), terminate, "primitive staged");

        if !terminate {
            return Ok(staged);
        }

        self.commit_staged(connection)
            .await
            .map_err(|source| BridgeError::PartialCompletion {
                staged: command,
                staged_result: staged,
                source: Box::new(source),
            })
    }

    async fn commit_staged(&mut self, connection: &ConnectionManager) -> Result<Payload, BridgeError> {
        connection.require_connected(Command::SendData)?;
        let commit = CommitInFlight::begin(&mut self.job);

        match self.invoker.call(Command::SendData, args::none()).await {
            Ok(payload) => {
                match commit.committed() {
                    Some(job) => info!(job = %job.id(), ops = job.ops().len(), "print job committed"),
                    None => debug!("committed with nothing staged"),
                }
                Ok(payload)
            }
            Err(e) => {
                commit.failed(&e);
                Err(e)
            }
        }
    }
}

// ── CommitInFlight ────────────────────────────────────────────────────────────

/// Keeps the job terminated while `sendData` is outstanding.
///
/// If the commit future is dropped before the executor replies, the job is
/// reopened so that later staging calls are not locked out.
struct CommitInFlight<'a> {
    job: &'a mut Option<PrintJob>,
    settled: bool,
}

impl<'a> CommitInFlight<'a> {
    fn begin(job: &'a mut Option<PrintJob>) -> Self {
        if let Some(job) = job.as_mut() {
            job.terminate();
        }
        Self { job, settled: false }
    }

    fn committed(mut self) -> Option<PrintJob> {
        self.settled = true;
        self.job.take()
    }

    fn failed(mut self, error: &BridgeError) {
        self.settled = true;
        if let Some(job) = self.job.as_mut() {
            job.reopen();
            warn!(job = %job.id(), %error, "commit failed; staged content kept");
        }
    }
}

impl Drop for CommitInFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Some(job) = self.job.as_mut() {
            job.reopen();
            warn!(job = %job.id(), "commit dropped before the printer replied; staged content kept");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
