//! End-to-end tests: `PrinterSession` driving the in-memory simulated printer.

use std::sync::{Arc, Mutex};

use epos_bridge::application::{BridgeError, Callbacks, ConnectionState, PrinterSession};
use epos_bridge::infrastructure::executor::{ReceiptLine, SimulatedPrinter, SimulatorOptions};
use epos_core::domain::status::fields;
use epos_core::{Alignment, DeviceDescriptor, HalfTone, ImageStyle, PrintMode, TextSize, TextStyle};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

fn setup() -> (Arc<SimulatedPrinter>, PrinterSession) {
    let printer = Arc::new(SimulatedPrinter::new(SimulatorOptions::default()));
    let session = PrinterSession::new(printer.clone());
    (printer, session)
}

#[tokio::test]
async fn test_discover_connect_print_receipt() {
    // Arrange
    let (printer, mut session) = setup();
    let found = Arc::new(Mutex::new(Vec::<DeviceDescriptor>::new()));
    let sink = Arc::clone(&found);

    // Act
    assert_ok!(session.start_discovery(move |d| sink.lock().unwrap().push(d), |_| {}));
    assert_ok!(session.stop_discovery(Callbacks::none()).await);
    let device = found.lock().unwrap()[0].clone();
    assert_ok!(session.connect(device, Some("TM-T88VI"), Callbacks::none()).await);

    let heading = TextStyle {
        size: TextSize::new(2).unwrap(),
        align: Alignment::Center,
        ..TextStyle::default()
    };
    assert_ok!(session.print_text("CAFE", heading, false, Callbacks::none()).await);
    assert_ok!(
        session
            .print_text(["1 x espresso   2.50", "\n", "TOTAL          2.50"], TextStyle::default(), true, Callbacks::none())
            .await
    );

    // Assert
    assert_eq!(found.lock().unwrap().len(), 2);
    let receipts = printer.printed();
    assert_eq!(receipts.len(), 1);
    let receipt = &receipts[0];
    assert_eq!(receipt.target, "TCP:192.168.1.5");
    assert_eq!(receipt.series, "TM-T88VI");
    assert_eq!(receipt.text(), vec!["CAFE", "1 x espresso   2.50", "TOTAL          2.50"]);
    assert_eq!(receipt.lines[2], ReceiptLine::Feed(1));
    assert_eq!(&receipt.lines[receipt.lines.len() - 2..], &[ReceiptLine::Feed(3), ReceiptLine::Cut]);
    assert!(session.current_job().is_none());
}

#[tokio::test]
async fn test_image_is_staged_with_its_style() {
    let (printer, mut session) = setup();
    assert_ok!(session.connect("TCP:192.168.1.5", None, Callbacks::none()).await);
    let style = ImageStyle {
        mode: PrintMode::Gradation16,
        halftone: HalfTone::ErrorDiffusion,
    };

    assert_ok!(
        session
            .print_image("data:image/png;base64,iVBORw0KGgo=", style, true, Callbacks::none())
            .await
    );

    assert_eq!(
        printer.printed()[0].lines[0],
        ReceiptLine::Image {
            bytes: 8,
            mode: 1,
            halftone: 1
        }
    );
}

#[tokio::test]
async fn test_invalid_image_payload_is_an_executor_error() {
    let (printer, mut session) = setup();
    assert_ok!(session.connect("TCP:192.168.1.5", None, Callbacks::none()).await);

    let err = assert_err!(
        session
            .print_image("data:image/png;base64,!!not-base64!!", ImageStyle::default(), true, Callbacks::none())
            .await
    );

    assert!(matches!(err, BridgeError::Executor { .. }));
    assert_eq!(err.payload(), json!("Error 0x00040: Failed to convert image data"));
    assert!(printer.printed().is_empty());
}

#[tokio::test]
async fn test_cover_open_commit_is_partial_completion_and_device_drops_link() {
    // Arrange
    let (printer, mut session) = setup();
    assert_ok!(session.connect("TCP:192.168.1.5", None, Callbacks::none()).await);
    printer.set_cover_open(true);

    // Act
    let err = assert_err!(session.print("hello", Callbacks::none()).await);

    // Assert
    assert!(err.is_partial_completion());
    assert_eq!(
        err.payload(),
        json!("Error 0x00050: Printer is not ready. Check device and paper.")
    );
    assert!(!printer.is_connected());
    // The bridge only learns about the link from connect/disconnect outcomes.
    assert_eq!(session.connection_state(), ConnectionState::Connected);
}

#[tokio::test]
async fn test_status_is_passed_through() {
    let (printer, mut session) = setup();
    assert_ok!(session.connect("BT:00:01:90:AA:BB:CC", None, Callbacks::none()).await);
    printer.set_paper_empty(true);

    let status = assert_ok!(session.printer_status(Callbacks::none()).await);

    assert_eq!(status.is_printable(), Some(false));
    assert_eq!(status.flag(fields::PAPER), Some(&json!(2)));
    assert_eq!(status.flag(fields::CONNECTION), Some(&json!(1)));
}

#[tokio::test]
async fn test_supported_models_list_starts_with_m10() {
    let (_, session) = setup();

    let models = assert_ok!(session.supported_models(Callbacks::none()).await);

    assert_eq!(models.len(), 20);
    assert_eq!(models[0], "TM-M10");
    assert!(models.contains(&"TM-H6000".to_string()));
}

#[tokio::test]
async fn test_unknown_target_fails_and_state_returns_to_disconnected() {
    let (_, mut session) = setup();

    let err = assert_err!(session.connect("TCP:10.9.9.9", None, Callbacks::none()).await);

    assert_eq!(
        err.payload(),
        json!("Error 0x00012: Connecting printer failed: ERR_CONNECT")
    );
    assert_eq!(session.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_announced_device_reaches_running_scan() {
    let (printer, mut session) = setup();
    let found = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = Arc::clone(&found);
    assert_ok!(session.start_discovery(move |d| sink.lock().unwrap().push(d.target), |_| {}));

    printer.announce(DeviceDescriptor::new("USB:000000000042").with_name("TM-T20"));
    assert_ok!(session.stop_discovery(Callbacks::none()).await);
    printer.announce(DeviceDescriptor::new("USB:000000000043"));

    assert_eq!(
        *found.lock().unwrap(),
        vec![
            "TCP:192.168.1.5".to_string(),
            "BT:00:01:90:AA:BB:CC".to_string(),
            "USB:000000000042".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_disconnect_clears_device_buffer_and_job() {
    let (printer, mut session) = setup();
    assert_ok!(session.connect("TCP:192.168.1.5", None, Callbacks::none()).await);
    assert_ok!(session.print_text("draft", TextStyle::default(), false, Callbacks::none()).await);
    assert_eq!(printer.buffered(), 1);

    assert_ok!(session.disconnect(Callbacks::none()).await);

    assert_eq!(printer.buffered(), 0);
    assert!(session.current_job().is_none());
}
