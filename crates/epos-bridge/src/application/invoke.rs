//! Command executor adapter.
//!
//! # Purpose
//!
//! The printer is reached through an *executor*: a platform primitive that
//! takes a command name, a positional argument list, and two completion
//! handlers.  It reports back by calling exactly one of the handlers, some
//! time later, possibly on another thread.
//!
//! [`CommandInvoker`] turns that callback primitive into an `async fn` that
//! resolves with the success payload or fails with
//! [`BridgeError::Executor`].  On top of the future it also supports the
//! legacy callback style through [`Callbacks`]: when supplied, exactly one of
//! them fires after the outcome is known, with the same payload.
//!
//! # Why a trait? (for beginners)
//!
//! Putting the executor behind [`CommandExecutor`] lets the application layer
//! stay ignorant of where commands actually go.  Production code plugs in the
//! remote relay or the simulated printer; unit tests plug in a mock and check
//! exactly which commands were issued and with which arguments.
//!
//! # Completion rules
//!
//! - The first handler call wins.  Any later call (a misbehaving executor
//!   calling both handlers, or one handler twice) is logged and ignored.
//! - If the executor drops both handlers without calling either, the call
//!   fails with [`BridgeError::ExecutorDropped`] instead of hanging.
//! - There is no timeout at this layer; an executor that holds a handler
//!   forever keeps the call pending forever.

use std::sync::{Arc, Mutex};

use epos_core::{Command, Payload};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::application::error::BridgeError;

/// Completion handler passed to the executor.
///
/// `FnMut` rather than `FnOnce` because a subscription command (discovery)
/// invokes its success handler once per event.
pub type Handler = Box<dyn FnMut(Payload) + Send + 'static>;

/// A legacy one-shot callback.
pub type Callback = Box<dyn FnOnce(&Payload) + Send + 'static>;

// ── Executor seam ─────────────────────────────────────────────────────────────

/// The platform primitive that actually talks to the printer.
///
/// Implementations must eventually call `on_success` or `on_error` (one of
/// them, once) for every one-shot command.  For [`Command::StartDiscover`]
/// the success handler is kept and called once per discovered device.
///
/// `exec` must not block; it may complete inline or from another thread.
pub trait CommandExecutor: Send + Sync {
    fn exec(&self, command: Command, args: Vec<Payload>, on_success: Handler, on_error: Handler);
}

// ── Legacy callbacks ──────────────────────────────────────────────────────────

/// Optional success/error callbacks accompanying a command.
///
/// Each callback is `FnOnce`, so "at most once" holds by construction; the
/// bridge guarantees "exactly one of the two, after the final outcome".
#[derive(Default)]
pub struct Callbacks {
    on_success: Option<Callback>,
    on_error: Option<Callback>,
}

/// One trailing argument of a legacy call: either a plain value or a handler.
pub enum CallArg {
    Value(Payload),
    Handler(Callback),
}

impl Callbacks {
    /// No callbacks; the caller only awaits the returned future.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new<S, E>(on_success: S, on_error: E) -> Self
    where
        S: FnOnce(&Payload) + Send + 'static,
        E: FnOnce(&Payload) + Send + 'static,
    {
        Self {
            on_success: Some(Box::new(on_success)),
            on_error: Some(Box::new(on_error)),
        }
    }

    pub fn on_success<S>(mut self, f: S) -> Self
    where
        S: FnOnce(&Payload) + Send + 'static,
    {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn on_error<E>(mut self, f: E) -> Self
    where
        E: FnOnce(&Payload) + Send + 'static,
    {
        self.on_error = Some(Box::new(f));
        self
    }

    /// Extracts callbacks from the trailing arguments of a legacy call.
    ///
    /// If the last argument is a handler it becomes the error callback; if
    /// the second-to-last is a handler it becomes the success callback.
    /// Plain values are ignored.
    pub fn from_trailing(args: Vec<CallArg>) -> Self {
        let mut rev = args.into_iter().rev();
        let on_error = match rev.next() {
            Some(CallArg::Handler(f)) => Some(f),
            _ => None,
        };
        let on_success = match rev.next() {
            Some(CallArg::Handler(f)) => Some(f),
            _ => None,
        };
        Self {
            on_success,
            on_error,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.on_success.is_none() && self.on_error.is_none()
    }

    /// Fires the callback matching `outcome`, consuming both.
    pub(crate) fn settle(self, outcome: Result<&Payload, &BridgeError>) {
        match outcome {
            Ok(payload) => {
                if let Some(f) = self.on_success {
                    f(payload);
                }
            }
            Err(err) => {
                if let Some(f) = self.on_error {
                    f(&err.payload());
                }
            }
        }
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

// ── CommandInvoker ────────────────────────────────────────────────────────────

type Completion = Result<Payload, Payload>;
type CompletionSlot = Arc<Mutex<Option<oneshot::Sender<Completion>>>>;

/// Async front of a [`CommandExecutor`].
///
/// Cheap to clone; every bridge component holds its own copy.
#[derive(Clone)]
pub struct CommandInvoker {
    executor: Arc<dyn CommandExecutor>,
}

impl CommandInvoker {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    /// Issues `command` and waits for its outcome, then fires `callbacks`.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Executor`] with the executor's failure payload, or
    /// [`BridgeError::ExecutorDropped`].
    pub async fn invoke(
        &self,
        command: Command,
        args: Vec<Payload>,
        callbacks: Callbacks,
    ) -> Result<Payload, BridgeError> {
        let outcome = self.call(command, args).await;
        callbacks.settle(outcome.as_ref());
        outcome
    }

    /// Issues `command` and waits for its outcome without touching callbacks.
    ///
    /// Components that need to update their own state before the caller's
    /// callbacks run use this and settle the callbacks themselves.
    pub(crate) async fn call(
        &self,
        command: Command,
        args: Vec<Payload>,
    ) -> Result<Payload, BridgeError> {
        debug!(%command, args = args.len(), "issuing command");

        let (tx, rx) = oneshot::channel::<Completion>();
        let slot: CompletionSlot = Arc::new(Mutex::new(Some(tx)));

        let ok_slot = Arc::clone(&slot);
        let on_success: Handler = Box::new(move |payload| complete(&ok_slot, command, Ok(payload)));
        let err_slot = slot;
        let on_error: Handler = Box::new(move |payload| complete(&err_slot, command, Err(payload)));

        self.executor.exec(command, args, on_success, on_error);

        match rx.await {
            Ok(Ok(payload)) => {
                debug!(%command, "command succeeded");
                Ok(payload)
            }
            Ok(Err(payload)) => {
                debug!(%command, %payload, "command failed");
                Err(BridgeError::executor(command, payload))
            }
            Err(_) => {
                warn!(%command, "executor released both handlers without completing");
                Err(BridgeError::ExecutorDropped { command })
            }
        }
    }

    /// Issues a subscription command, handing the handlers straight to the
    /// executor.  Nothing is awaited.
    pub(crate) fn subscribe(
        &self,
        command: Command,
        args: Vec<Payload>,
        on_event: Handler,
        on_error: Handler,
    ) {
        debug!(%command, "opening subscription");
        self.executor.exec(command, args, on_event, on_error);
    }
}

impl std::fmt::Debug for CommandInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandInvoker").finish_non_exhaustive()
    }
}

/// Resolves the pending call from whichever handler fires first.
fn complete(slot: &Mutex<Option<oneshot::Sender<Completion>>>, command: Command, outcome: Completion) {
    let sender = slot
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take();
    match sender {
        // The receiver is gone if the caller stopped waiting; nothing to do.
        Some(tx) => {
            let _ = tx.send(outcome);
        }
        None => warn!(%command, "executor completed a command more than once; ignoring"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use serde_json::json;

    mock! {
        pub Executor {}

        impl CommandExecutor for Executor {
            fn exec(&self, command: Command, args: Vec<Payload>, on_success: Handler, on_error: Handler);
        }
    }

    fn invoker_with(mock: MockExecutor) -> CommandInvoker {
        CommandInvoker::new(Arc::new(mock))
    }

    fn recorder() -> (Arc<Mutex<Vec<Payload>>>, impl FnOnce(&Payload) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |p: &Payload| sink.lock().unwrap().push(p.clone()))
    }

    #[tokio::test]
    async fn test_invoke_resolves_with_success_payload() {
        // Arrange
        let mut mock = MockExecutor::new();
        mock.expect_exec()
            .withf(|cmd, args, _, _| *cmd == Command::GetSupportedModels && args.is_empty())
            .times(1)
            .returning(|_, _, mut ok, _| ok(json!(["TM-T88"])));

        // Act
        let result = invoker_with(mock)
            .invoke(Command::GetSupportedModels, vec![], Callbacks::none())
            .await;

        // Assert
        assert_eq!(result.unwrap(), json!(["TM-T88"]));
    }

    #[tokio::test]
    async fn test_invoke_rejects_with_executor_payload() {
        let mut mock = MockExecutor::new();
        mock.expect_exec()
            .times(1)
            .returning(|_, _, _, mut err| err(json!("Error 0x00013: Printer is not connected")));

        let result = invoker_with(mock)
            .invoke(Command::SendData, vec![], Callbacks::none())
            .await;

        match result {
            Err(BridgeError::Executor { command, payload, .. }) => {
                assert_eq!(command, Command::SendData);
                assert_eq!(payload, json!("Error 0x00013: Printer is not connected"));
            }
            other => panic!("expected executor error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invoke_fires_success_callback_once_and_not_error() {
        // Arrange
        let mut mock = MockExecutor::new();
        mock.expect_exec()
            .returning(|_, _, mut ok, _| ok(json!(true)));
        let (successes, on_success) = recorder();
        let (errors, on_error) = recorder();

        // Act
        let result = invoker_with(mock)
            .invoke(Command::ConnectPrinter, vec![json!("TCP:10.0.0.1")], Callbacks::new(on_success, on_error))
            .await;

        // Assert
        assert!(result.is_ok());
        assert_eq!(*successes.lock().unwrap(), vec![json!(true)]);
        assert!(errors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invoke_fires_error_callback_with_same_payload_as_rejection() {
        let mut mock = MockExecutor::new();
        mock.expect_exec()
            .returning(|_, _, _, mut err| err(json!({ "code": 12 })));
        let (successes, on_success) = recorder();
        let (errors, on_error) = recorder();

        let result = invoker_with(mock)
            .invoke(Command::DisconnectPrinter, vec![], Callbacks::new(on_success, on_error))
            .await;

        let err = result.unwrap_err();
        assert_eq!(*errors.lock().unwrap(), vec![err.payload()]);
        assert!(successes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_first_completion_wins_and_later_ones_are_ignored() {
        // Arrange – executor misbehaves by calling both handlers
        let mut mock = MockExecutor::new();
        mock.expect_exec().returning(|_, _, mut ok, mut err| {
            ok(json!("first"));
            err(json!("second"));
            ok(json!("third"));
        });
        let (successes, on_success) = recorder();
        let (errors, on_error) = recorder();

        // Act
        let result = invoker_with(mock)
            .invoke(Command::SendData, vec![], Callbacks::new(on_success, on_error))
            .await;

        // Assert
        assert_eq!(result.unwrap(), json!("first"));
        assert_eq!(successes.lock().unwrap().len(), 1);
        assert!(errors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_handlers_fail_instead_of_hanging() {
        let mut mock = MockExecutor::new();
        mock.expect_exec().returning(|_, _, _, _| {});

        let result = invoker_with(mock)
            .invoke(Command::GetPrinterStatus, vec![], Callbacks::none())
            .await;

        assert!(matches!(
            result,
            Err(BridgeError::ExecutorDropped { command: Command::GetPrinterStatus })
        ));
    }

    #[tokio::test]
    async fn test_completion_from_another_thread_resolves() {
        let mut mock = MockExecutor::new();
        mock.expect_exec().returning(|_, _, mut ok, _| {
            std::thread::spawn(move || ok(json!(42)));
        });

        let result = invoker_with(mock)
            .invoke(Command::SendData, vec![], Callbacks::none())
            .await;

        assert_eq!(result.unwrap(), json!(42));
    }

    #[tokio::test]
    async fn test_args_are_passed_through_unchanged() {
        let mut mock = MockExecutor::new();
        mock.expect_exec()
            .withf(|cmd, args, _, _| {
                *cmd == Command::PrintText
                    && *args == vec![json!(["a", "b"]), json!(2), json!(3), json!(1)]
            })
            .times(1)
            .returning(|_, _, mut ok, _| ok(json!(true)));

        let result = invoker_with(mock)
            .invoke(
                Command::PrintText,
                vec![json!(["a", "b"]), json!(2), json!(3), json!(1)],
                Callbacks::none(),
            )
            .await;

        assert!(result.is_ok());
    }

    // ── from_trailing ─────────────────────────────────────────────────────────

    fn handler() -> CallArg {
        CallArg::Handler(Box::new(|_: &Payload| {}))
    }

    #[test]
    fn test_from_trailing_two_handlers_gives_both_callbacks() {
        let cbs = Callbacks::from_trailing(vec![CallArg::Value(json!("x")), handler(), handler()]);
        assert!(cbs.on_success.is_some());
        assert!(cbs.on_error.is_some());
    }

    #[test]
    fn test_from_trailing_last_handler_only_is_error_callback() {
        let cbs = Callbacks::from_trailing(vec![CallArg::Value(json!("x")), handler()]);
        assert!(cbs.on_success.is_none());
        assert!(cbs.on_error.is_some());
    }

    #[test]
    fn test_from_trailing_second_to_last_handler_only_is_success_callback() {
        let cbs = Callbacks::from_trailing(vec![handler(), CallArg::Value(json!(0))]);
        assert!(cbs.on_success.is_some());
        assert!(cbs.on_error.is_none());
    }

    #[test]
    fn test_from_trailing_plain_values_give_no_callbacks() {
        let cbs = Callbacks::from_trailing(vec![CallArg::Value(json!(1)), CallArg::Value(json!(2))]);
        assert!(cbs.is_empty());
        assert!(Callbacks::from_trailing(vec![]).is_empty());
    }
}
