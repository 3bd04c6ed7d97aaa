//! Printer discovery.
//!
//! `startDiscover` is the one subscription command: the executor keeps its
//! success handler and calls it once per printer found, for as long as the
//! scan runs.  Starting a scan therefore returns immediately; results arrive
//! through the caller's `on_found` closure.
//!
//! Each scan carries a shared "live" flag behind a mutex.  The handlers given
//! to the executor hold that mutex while they check the flag and forward the
//! event, and a successful [`DiscoverySession::stop`] takes the same mutex to
//! clear it.  Once `stop` resolves, `on_found` is never called again for that
//! scan, even if the executor keeps reporting devices from another thread.
//!
//! Only one scan may run per session.  A second `start` while one is active
//! fails locally with [`BridgeError::DiscoveryActive`].  Nothing stops a scan
//! automatically; dropping the session with a scan running leaves the
//! executor-side scan alive.

use std::sync::{Arc, Mutex, MutexGuard};

use epos_core::protocol::args;
use epos_core::{Command, DeviceDescriptor, Payload};
use tracing::{debug, info, warn};

use crate::application::error::BridgeError;
use crate::application::invoke::{Callbacks, CommandInvoker, Handler};

/// The "scan is live" flag shared with the executor-side handlers.
type LiveFlag = Arc<Mutex<bool>>;

fn lock(flag: &Mutex<bool>) -> MutexGuard<'_, bool> {
    flag.lock().unwrap_or_else(|p| p.into_inner())
}

/// Manages at most one running discovery scan.
#[derive(Debug)]
pub struct DiscoverySession {
    invoker: CommandInvoker,
    live: Option<LiveFlag>,
}

impl DiscoverySession {
    pub fn new(invoker: CommandInvoker) -> Self {
        Self {
            invoker,
            live: None,
        }
    }

    /// `true` between a successful `start` and a successful `stop`.
    pub fn is_active(&self) -> bool {
        self.live
            .as_ref()
            .is_some_and(|flag| *lock(flag))
    }

    /// Begins a scan.
    ///
    /// `on_found` is called once per device event with the decoded
    /// descriptor.  `on_error` is called for executor-reported errors and for
    /// device payloads that are not a valid descriptor; neither ends the scan.
    ///
    /// # Errors
    ///
    /// [`BridgeError::DiscoveryActive`] if a scan is already running.  No
    /// command is issued in that case.
    pub fn start<F, E>(&mut self, on_found: F, on_error: E) -> Result<(), BridgeError>
    where
        F: FnMut(DeviceDescriptor) + Send + 'static,
        E: FnMut(Payload) + Send + 'static,
    {
        if self.is_active() {
            warn!("discovery start requested while a scan is running");
            return Err(BridgeError::DiscoveryActive);
        }

        let live: LiveFlag = Arc::new(Mutex::new(true));
        let on_error = Arc::new(Mutex::new(on_error));

        let event_live = Arc::clone(&live);
        let event_error = Arc::clone(&on_error);
        let mut on_found = on_found;
        let on_event: Handler = Box::new(move |payload| {
            // Held until the event is delivered; `stop` waits on it.
            let live = lock(&event_live);
            if !*live {
                debug!("discarding discovery event after stop");
                return;
            }
            match serde_json::from_value::<DeviceDescriptor>(payload) {
                Ok(device) => {
                    debug!(target = %device.target, name = device.device_name().unwrap_or("-"), "device found");
                    on_found(device);
                }
                Err(e) => {
                    warn!(error = %e, "discovery reported a malformed device");
                    let mut report = event_error.lock().unwrap_or_else(|p| p.into_inner());
                    (*report)(Payload::String(format!("malformed device info: {e}")));
                }
            }
        });

        let failure_live = Arc::clone(&live);
        let on_failure: Handler = Box::new(move |payload| {
            let live = lock(&failure_live);
            if !*live {
                debug!("discarding discovery error after stop");
                return;
            }
            warn!(%payload, "discovery reported an error");
            let mut report = on_error.lock().unwrap_or_else(|p| p.into_inner());
            (*report)(payload);
        });

        info!("starting printer discovery");
        self.live = Some(live);
        self.invoker
            .subscribe(Command::StartDiscover, args::none(), on_event, on_failure);
        Ok(())
    }

    /// Ends the running scan.
    ///
    /// The command is issued even if no scan is running.  On success no
    /// further events from the stopped scan reach the caller; on failure the
    /// scan is still considered active.
    pub async fn stop(&mut self, callbacks: Callbacks) -> Result<Payload, BridgeError> {
        let outcome = self
            .invoker
            .call(Command::StopDiscover, args::none())
            .await;

        match &outcome {
            Ok(_) => {
                if let Some(flag) = self.live.take() {
                    *lock(&flag) = false;
                }
                info!("printer discovery stopped");
            }
            Err(e) => warn!(error = %e, "failed to stop discovery"),
        }

        callbacks.settle(outcome.as_ref());
        outcome
    }
}

impl Drop for DiscoverySession {
    fn drop(&mut self) {
        if self.is_active() {
            warn!("discovery session dropped with a scan still running");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::executor::recording::{RecordingExecutor, Reply};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn session() -> (Arc<RecordingExecutor>, DiscoverySession) {
        let exec = Arc::new(RecordingExecutor::new());
        let session = DiscoverySession::new(CommandInvoker::new(exec.clone()));
        (exec, session)
    }

    fn collectors() -> (
        Arc<Mutex<Vec<DeviceDescriptor>>>,
        Arc<Mutex<Vec<Payload>>>,
        impl FnMut(DeviceDescriptor) + Send + 'static,
        impl FnMut(Payload) + Send + 'static,
    ) {
        let found = Arc::new(Mutex::new(Vec::new()));
        let errors = Arc::new(Mutex::new(Vec::new()));
        let f = Arc::clone(&found);
        let e = Arc::clone(&errors);
        (
            found,
            errors,
            move |d| f.lock().unwrap().push(d),
            move |p| e.lock().unwrap().push(p),
        )
    }

    #[tokio::test]
    async fn test_start_issues_start_discover_and_returns_immediately() {
        let (exec, mut session) = session();
        let (_, _, on_found, on_error) = collectors();

        session.start(on_found, on_error).unwrap();

        assert!(session.is_active());
        assert_eq!(exec.commands(), vec![Command::StartDiscover]);
    }

    #[tokio::test]
    async fn test_each_event_is_delivered_as_a_descriptor() {
        // Arrange
        let (exec, mut session) = session();
        let (found, _, on_found, on_error) = collectors();
        session.start(on_found, on_error).unwrap();

        // Act
        exec.emit(json!({ "target": "TCP:192.168.1.5", "deviceName": "TM-T88VI", "ipAddress": "192.168.1.5" }));
        exec.emit(json!({ "target": "BT:00:01:90:AA:BB:CC" }));

        // Assert
        let found = found.lock().unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].device_name(), Some("TM-T88VI"));
        assert_eq!(found[1].target, "BT:00:01:90:AA:BB:CC");
    }

    #[tokio::test]
    async fn test_second_start_while_active_fails_without_command() {
        let (exec, mut session) = session();
        let (_, _, f1, e1) = collectors();
        let (_, _, f2, e2) = collectors();
        session.start(f1, e1).unwrap();

        let result = session.start(f2, e2);

        assert!(matches!(result, Err(BridgeError::DiscoveryActive)));
        assert_eq!(exec.call_count(), 1);
    }

    #[tokio::test]
    async fn test_no_events_after_stop_resolves() {
        // Arrange
        let (exec, mut session) = session();
        let (found, _, on_found, on_error) = collectors();
        session.start(on_found, on_error).unwrap();
        exec.emit(json!({ "target": "TCP:10.0.0.1" }));

        // Act
        session.stop(Callbacks::none()).await.unwrap();
        exec.emit(json!({ "target": "TCP:10.0.0.2" }));

        // Assert
        assert_eq!(found.lock().unwrap().len(), 1);
        assert!(!session.is_active());
    }

    #[tokio::test]
    async fn test_malformed_device_goes_to_error_callback() {
        let (exec, mut session) = session();
        let (found, errors, on_found, on_error) = collectors();
        session.start(on_found, on_error).unwrap();

        exec.emit(json!({ "deviceName": "no target" }));

        assert!(found.lock().unwrap().is_empty());
        assert_eq!(errors.lock().unwrap().len(), 1);
        assert!(session.is_active());
    }

    #[tokio::test]
    async fn test_executor_error_is_forwarded_and_scan_stays_active() {
        let (exec, mut session) = session();
        let (_, errors, on_found, on_error) = collectors();
        session.start(on_found, on_error).unwrap();

        exec.emit_error(json!("Error 0x00030: discovery failed"));

        assert_eq!(
            *errors.lock().unwrap(),
            vec![json!("Error 0x00030: discovery failed")]
        );
        assert!(session.is_active());
    }

    #[tokio::test]
    async fn test_failed_stop_keeps_scan_active() {
        let (exec, mut session) = session();
        let (found, _, on_found, on_error) = collectors();
        session.start(on_found, on_error).unwrap();
        exec.respond(Command::StopDiscover, Reply::Failure(json!("busy")));

        assert!(session.stop(Callbacks::none()).await.is_err());
        exec.emit(json!({ "target": "TCP:10.0.0.3" }));

        assert!(session.is_active());
        assert_eq!(found.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unexpected_metadata_types_are_passed_through() {
        // Arrange
        let (exec, mut session) = session();
        let (found, errors, on_found, on_error) = collectors();
        session.start(on_found, on_error).unwrap();

        // Act
        exec.emit(json!({ "target": "TCP:1.2.3.4", "deviceType": "TYPE_PRINTER", "rssi": -52 }));

        // Assert
        assert!(errors.lock().unwrap().is_empty());
        let found = found.lock().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].device_type(), Some(&json!("TYPE_PRINTER")));
        assert_eq!(found[0].get("rssi"), Some(&json!(-52)));
    }

    #[tokio::test]
    async fn test_no_events_after_stop_with_concurrent_emitter() {
        // Arrange – a second thread keeps reporting devices throughout
        let (exec, mut session) = session();
        let delivered = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&delivered);
        session
            .start(
                move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                },
                |_| {},
            )
            .unwrap();
        let done = Arc::new(AtomicBool::new(false));
        let emitter = {
            let exec = Arc::clone(&exec);
            let done = Arc::clone(&done);
            std::thread::spawn(move || {
                while !done.load(Ordering::SeqCst) {
                    exec.emit(json!({ "target": "TCP:10.0.0.1" }));
                }
            })
        };
        while delivered.load(Ordering::SeqCst) == 0 {
            std::thread::yield_now();
        }

        // Act
        session.stop(Callbacks::none()).await.unwrap();
        let at_stop = delivered.load(Ordering::SeqCst);
        std::thread::sleep(std::time::Duration::from_millis(20));
        done.store(true, Ordering::SeqCst);
        emitter.join().unwrap();

        // Assert
        assert_eq!(delivered.load(Ordering::SeqCst), at_stop);
    }

    #[tokio::test]
    async fn test_restart_after_stop_is_allowed() {
        let (exec, mut session) = session();
        let (_, _, f1, e1) = collectors();
        let (_, _, f2, e2) = collectors();
        session.start(f1, e1).unwrap();
        session.stop(Callbacks::none()).await.unwrap();

        session.start(f2, e2).unwrap();

        assert_eq!(
            exec.commands(),
            vec![Command::StartDiscover, Command::StopDiscover, Command::StartDiscover]
        );
    }
}
