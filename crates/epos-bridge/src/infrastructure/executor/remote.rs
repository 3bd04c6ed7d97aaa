//! Relay executor: forwards commands to a printer agent over TCP.
//!
//! The agent is a separate process that owns the vendor printer SDK.  The
//! bridge does not speak any printer transport itself; it forwards opaque
//! commands and routes the replies back to the right handlers.
//!
//! # Wire format
//!
//! Newline-delimited JSON, one frame per line.
//!
//! ```text
//! bridge → agent   {"id":7,"service":"epos2","action":"printText","args":[["hi"],0,1,0]}
//! agent  → bridge  {"id":7,"status":"ok","payload":true,"keep":false}
//! ```
//!
//! `keep: true` leaves the handlers registered after dispatch; the agent uses
//! it for discovery, where one request gets one reply per device.
//!
//! # Architecture
//!
//! - `exec` registers the handlers under a fresh id and queues the frame on
//!   an `mpsc` channel.
//! - A writer task drains the channel into the socket.
//! - A reader task parses replies and dispatches them to the pending table.
//! - When the link drops, every pending handler receives an error payload,
//!   and commands issued afterwards fail immediately.
//!
//! `exec` itself is synchronous and never blocks.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use epos_core::protocol::{SequenceCounter, SERVICE_NAME};
use epos_core::{Command, Payload};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::application::invoke::{CommandExecutor, Handler};

const LINK_DOWN: &str = "printer agent link is down";

/// Errors establishing the agent link.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("failed to connect to printer agent at {addr}: {source}")]
    ConnectFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("timed out after {after:?} connecting to printer agent at {addr}")]
    Timeout { addr: SocketAddr, after: Duration },
}

// ── Frames ────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct RequestFrame<'a> {
    id: u64,
    service: &'a str,
    action: Command,
    args: &'a [Payload],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ReplyStatus {
    Ok,
    Error,
}

#[derive(Debug, Deserialize)]
struct ReplyFrame {
    id: u64,
    status: ReplyStatus,
    #[serde(default)]
    payload: Payload,
    #[serde(default)]
    keep: bool,
}

// ── Pending table ─────────────────────────────────────────────────────────────

struct Pending {
    command: Command,
    on_success: Handler,
    on_error: Handler,
}

type PendingTable = Arc<Mutex<HashMap<u64, Pending>>>;

fn lock(table: &PendingTable) -> std::sync::MutexGuard<'_, HashMap<u64, Pending>> {
    table.lock().unwrap_or_else(|p| p.into_inner())
}

// ── RemoteExecutor ────────────────────────────────────────────────────────────

/// A [`CommandExecutor`] backed by a printer agent process.
pub struct RemoteExecutor {
    addr: SocketAddr,
    ids: SequenceCounter,
    pending: PendingTable,
    link_up: Arc<AtomicBool>,
    outbound: mpsc::UnboundedSender<String>,
    reader: JoinHandle<()>,
}

impl RemoteExecutor {
    /// Connects to the agent and starts the reader and writer tasks.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn connect(addr: SocketAddr, connect_timeout: Duration) -> Result<Self, RemoteError> {
        let stream = time::timeout(connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| RemoteError::Timeout {
                addr,
                after: connect_timeout,
            })?
            .map_err(|source| RemoteError::ConnectFailed { addr, source })?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "could not disable Nagle on agent link");
        }
        info!(%addr, "connected to printer agent");

        let (read_half, write_half) = stream.into_split();
        let pending: PendingTable = Arc::new(Mutex::new(HashMap::new()));
        let link_up = Arc::new(AtomicBool::new(true));
        let (outbound, rx) = mpsc::unbounded_channel();

        tokio::spawn(write_loop(write_half, rx, Arc::clone(&link_up), Arc::clone(&pending)));
        let reader = tokio::spawn(read_loop(read_half, Arc::clone(&link_up), Arc::clone(&pending)));

        Ok(Self {
            addr,
            ids: SequenceCounter::new(),
            pending,
            link_up,
            outbound,
            reader,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn is_link_up(&self) -> bool {
        self.link_up.load(Ordering::Acquire)
    }

    /// Number of requests waiting for a reply (including open subscriptions).
    pub fn pending(&self) -> usize {
        lock(&self.pending).len()
    }
}

impl CommandExecutor for RemoteExecutor {
    fn exec(&self, command: Command, args: Vec<Payload>, on_success: Handler, mut on_error: Handler) {
        if !self.is_link_up() {
            debug!(%command, "agent link down; failing command");
            on_error(json!(LINK_DOWN));
            return;
        }

        let id = self.ids.next();
        let frame = RequestFrame {
            id,
            service: SERVICE_NAME,
            action: command,
            args: &args,
        };
        let line = match serde_json::to_string(&frame) {
            Ok(line) => line,
            Err(e) => {
                error!(%command, error = %e, "failed to encode request frame");
                on_error(json!(format!("failed to encode {command} request: {e}")));
                return;
            }
        };

        lock(&self.pending).insert(
            id,
            Pending {
                command,
                on_success,
                on_error,
            },
        );
        debug!(id, %command, "request queued");

        // The link may have dropped after the first check; the entry must not
        // outlive the drain in `link_lost`.
        if !self.is_link_up() || self.outbound.send(line).is_err() {
            if let Some(mut p) = lock(&self.pending).remove(&id) {
                (p.on_error)(json!(LINK_DOWN));
            }
        }
    }
}

impl Drop for RemoteExecutor {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

// ── Tasks ─────────────────────────────────────────────────────────────────────

async fn write_loop(
    mut socket: OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<String>,
    link_up: Arc<AtomicBool>,
    pending: PendingTable,
) {
    while let Some(mut line) = rx.recv().await {
        line.push('\n');
        if let Err(e) = socket.write_all(line.as_bytes()).await {
            warn!(error = %e, "agent link write failed");
            link_lost(&link_up, &pending);
            return;
        }
    }
    let _ = socket.shutdown().await;
}

async fn read_loop(socket: OwnedReadHalf, link_up: Arc<AtomicBool>, pending: PendingTable) {
    let mut lines = BufReader::new(socket).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => continue,
            Ok(Some(line)) => dispatch(&pending, &link_up, &line),
            Ok(None) => {
                info!("printer agent closed the link");
                break;
            }
            Err(e) => {
                warn!(error = %e, "agent link read failed");
                break;
            }
        }
    }
    link_lost(&link_up, &pending);
}

fn dispatch(pending: &PendingTable, link_up: &AtomicBool, line: &str) {
    let frame: ReplyFrame = match serde_json::from_str(line) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(error = %e, "ignoring malformed reply from agent");
            return;
        }
    };

    // Handlers run without the table locked.
    let Some(mut entry) = lock(pending).remove(&frame.id) else {
        warn!(id = frame.id, "reply for unknown request");
        return;
    };
    debug!(id = frame.id, command = %entry.command, status = ?frame.status, keep = frame.keep, "reply received");

    // A stopped scan gets no final frame from the agent; its entry goes here.
    if entry.command == Command::StopDiscover && frame.status == ReplyStatus::Ok {
        let closed = close_subscriptions(pending);
        if closed > 0 {
            debug!(closed, "discovery subscriptions closed");
        }
    }

    match frame.status {
        ReplyStatus::Ok => (entry.on_success)(frame.payload),
        ReplyStatus::Error => (entry.on_error)(frame.payload),
    }

    if frame.keep {
        // Checked under the table lock so a concurrent `link_lost` either
        // drains this entry or leaves it to us to fail.
        let mut table = lock(pending);
        if link_up.load(Ordering::Acquire) {
            table.insert(frame.id, entry);
        } else {
            drop(table);
            (entry.on_error)(json!(LINK_DOWN));
        }
    }
}

/// Drops every open `startDiscover` entry.  Returns how many were dropped.
fn close_subscriptions(pending: &PendingTable) -> usize {
    let closed: Vec<Pending> = {
        let mut table = lock(pending);
        let ids: Vec<u64> = table
            .iter()
            .filter(|(_, p)| p.command.is_subscription())
            .map(|(id, _)| *id)
            .collect();
        ids.iter().filter_map(|id| table.remove(id)).collect()
    };
    // Handlers are dropped outside the lock.
    closed.len()
}

fn link_lost(link_up: &AtomicBool, pending: &PendingTable) {
    if !link_up.swap(false, Ordering::AcqRel) {
        return;
    }
    let orphaned: Vec<(u64, Pending)> = lock(pending).drain().collect();
    if !orphaned.is_empty() {
        warn!(count = orphaned.len(), "failing requests pending on lost agent link");
    }
    for (_, mut p) in orphaned {
        (p.on_error)(json!(LINK_DOWN));
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
