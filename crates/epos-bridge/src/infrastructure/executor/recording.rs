//! Recording executor for tests.
//!
//! # Why a recording executor?
//!
//! Most bridge guarantees are about *which* commands reach the executor and
//! *how often*: a precondition failure must issue nothing, a terminate-chained
//! stage must issue exactly two commands, discovery events must stop after
//! `stop`.  `RecordingExecutor` records every `exec` call in order so tests
//! can assert on that directly.
//!
//! # Replies
//!
//! One-shot commands complete inline.  By default they succeed with `true`;
//! [`RecordingExecutor::respond`] queues a specific [`Reply`] for the next
//! call of a given command.
//!
//! `startDiscover` never completes on its own.  Its handlers are kept, and
//! tests drive the scan with [`RecordingExecutor::emit`] and
//! [`RecordingExecutor::emit_error`].  Handlers stay registered after
//! `stopDiscover`, so tests can check that the bridge itself filters late
//! events.
//!
//! # Usage in tests
//!
//! ```ignore
//! let exec = Arc::new(RecordingExecutor::new());
//! let mut session = PrinterSession::new(exec.clone());
//!
//! exec.respond(Command::SendData, Reply::Failure(json!("paper out")));
//! let err = session.print("hello", Callbacks::none()).await.unwrap_err();
//!
//! assert_eq!(exec.commands(), vec![Command::PrintText, Command::SendData]);
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use epos_core::{Command, Payload};
use serde_json::json;

use crate::application::invoke::{CommandExecutor, Handler};

/// One recorded `exec` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub command: Command,
    pub args: Vec<Payload>,
}

/// How the executor completes a one-shot command.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Success(Payload),
    Failure(Payload),
    /// Drop both handlers without calling either.
    Abandon,
    /// Keep the handlers until [`RecordingExecutor::release`].
    Hold,
}

struct Subscription {
    on_event: Handler,
    on_error: Handler,
}

struct Held {
    on_success: Handler,
    on_error: Handler,
}

/// Records every command and replies from a per-command script.
#[derive(Default)]
pub struct RecordingExecutor {
    calls: Mutex<Vec<RecordedCall>>,
    script: Mutex<HashMap<Command, VecDeque<Reply>>>,
    subscriptions: Mutex<Vec<Subscription>>,
    held: Mutex<VecDeque<Held>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `reply` for the next call of `command`.  Replies queue up in
    /// order; once the queue is empty the default success applies again.
    pub fn respond(&self, command: Command, reply: Reply) {
        self.script
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .entry(command)
            .or_default()
            .push_back(reply);
    }

    /// All calls so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// The command names of all calls so far, in order.
    pub fn commands(&self) -> Vec<Command> {
        self.calls().into_iter().map(|c| c.command).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    /// Calls of one command, in order.
    pub fn calls_for(&self, command: Command) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.command == command)
            .collect()
    }

    /// Forgets recorded calls (not the script or subscriptions).
    pub fn clear(&self) {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).clear();
    }

    /// Delivers a discovery event to every registered subscription.
    /// Returns how many subscriptions received it.
    pub fn emit(&self, device: Payload) -> usize {
        self.each_subscription(|sub| (sub.on_event)(device.clone()))
    }

    /// Delivers a discovery error to every registered subscription.
    pub fn emit_error(&self, payload: Payload) -> usize {
        self.each_subscription(|sub| (sub.on_error)(payload.clone()))
    }

    /// Completes the oldest held command.  Returns `false` if none is held.
    pub fn release(&self, outcome: Result<Payload, Payload>) -> bool {
        let held = self.held.lock().unwrap_or_else(|p| p.into_inner()).pop_front();
        let Some(mut held) = held else {
            return false;
        };
        match outcome {
            Ok(payload) => (held.on_success)(payload),
            Err(payload) => (held.on_error)(payload),
        }
        true
    }

    fn each_subscription(&self, mut f: impl FnMut(&mut Subscription)) -> usize {
        // Handlers run without the lock held.
        let mut subs = std::mem::take(&mut *self.subscriptions.lock().unwrap_or_else(|p| p.into_inner()));
        subs.iter_mut().for_each(&mut f);
        let delivered = subs.len();
        let mut guard = self.subscriptions.lock().unwrap_or_else(|p| p.into_inner());
        subs.append(&mut *guard);
        *guard = subs;
        delivered
    }

    fn next_reply(&self, command: Command) -> Reply {
        self.script
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get_mut(&command)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Reply::Success(json!(true)))
    }
}

impl CommandExecutor for RecordingExecutor {
    fn exec(&self, command: Command, args: Vec<Payload>, mut on_success: Handler, mut on_error: Handler) {
        self.calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(RecordedCall { command, args });

        if command.is_subscription() {
            self.subscriptions
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .push(Subscription {
                    on_event: on_success,
                    on_error,
                });
            return;
        }

        match self.next_reply(command) {
            Reply::Success(payload) => on_success(payload),
            Reply::Failure(payload) => on_error(payload),
            Reply::Abandon => {}
            Reply::Hold => self
                .held
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .push_back(Held {
                    on_success,
                    on_error,
                }),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn capture() -> (Arc<Mutex<Vec<Payload>>>, Handler) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, Box::new(move |p| sink.lock().unwrap().push(p)))
    }

    #[test]
    fn test_default_reply_is_success_true() {
        let exec = RecordingExecutor::new();
        let (ok, on_ok) = capture();
        let (err, on_err) = capture();

        exec.exec(Command::SendData, vec![], on_ok, on_err);

        assert_eq!(*ok.lock().unwrap(), vec![json!(true)]);
        assert!(err.lock().unwrap().is_empty());
    }

    #[test]
    fn test_scripted_replies_are_consumed_in_order() {
        // Arrange
        let exec = RecordingExecutor::new();
        exec.respond(Command::PrintText, Reply::Failure(json!("first")));
        exec.respond(Command::PrintText, Reply::Success(json!("second")));
        let (ok, _) = capture();
        let (err, _) = capture();

        // Act
        for _ in 0..3 {
            let ok = Arc::clone(&ok);
            let err = Arc::clone(&err);
            exec.exec(
                Command::PrintText,
                vec![],
                Box::new(move |p| ok.lock().unwrap().push(p)),
                Box::new(move |p| err.lock().unwrap().push(p)),
            );
        }

        // Assert
        assert_eq!(*err.lock().unwrap(), vec![json!("first")]);
        assert_eq!(*ok.lock().unwrap(), vec![json!("second"), json!(true)]);
        assert_eq!(exec.calls_for(Command::PrintText).len(), 3);
    }

    #[test]
    fn test_subscription_handlers_are_kept_for_emit() {
        let exec = RecordingExecutor::new();
        let (events, on_event) = capture();
        let (_, on_err) = capture();

        exec.exec(Command::StartDiscover, vec![], on_event, on_err);
        let delivered = exec.emit(json!({ "target": "TCP:1.2.3.4" }));

        assert_eq!(delivered, 1);
        assert_eq!(events.lock().unwrap().len(), 1);
    }
}
