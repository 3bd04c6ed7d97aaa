//! In-memory simulated receipt printer.
//!
//! `SimulatedPrinter` implements the executor side of every command the way
//! a real printer SDK behaves, without hardware:
//!
//! - Discovery reports the configured devices immediately, and any device
//!   added later with [`SimulatedPrinter::announce`] while a scan runs.
//!   Starting a new scan replaces the previous one.
//! - Connecting to a second target while connected fails; reconnecting to
//!   the same target succeeds.  If a device list is configured, only listed
//!   targets are reachable.
//! - Text and image staging append to a pending buffer.  A text line that is
//!   exactly `"\n"` becomes a one-line feed.
//! - `sendData` checks the printer is printable, appends a 3-line feed and a
//!   cut, and moves the buffer to the printed-receipt log.  When the printer
//!   is not printable it fails and drops the connection, as the device does.
//! - Conditions (offline, cover open, paper empty) can be flipped at runtime
//!   to exercise failure paths.
//!
//! Every command completes inline, on the calling thread.

use std::fmt::Write as _;
use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use epos_core::domain::device::info;
use epos_core::domain::status::fields;
use epos_core::{Command, DeviceDescriptor, Payload};
use serde_json::{json, Map};
use tracing::{debug, info, warn};

use crate::application::invoke::{CommandExecutor, Handler};

/// Model names accepted by `connectPrinter`, in the order they are reported.
pub const SUPPORTED_MODELS: [&str; 20] = [
    "TM-M10", "TM-M30", "TM-P10", "TM-P60", "TM-P60II", "TM-P80", "TM-T20", "TM-T60", "TM-T70",
    "TM-T81", "TM-T82", "TM-T83", "TM-T88", "TM-T88VI", "TM-T90", "TM-T90KP", "TM-U220",
    "TM-U330", "TM-L90", "TM-H6000",
];

/// Series assumed until a connect names a known model.
pub const DEFAULT_SERIES: &str = "TM-T88";

/// Columns of font A at size 1 on 80 mm paper.
const PAPER_COLUMNS: usize = 42;

const ERR_INVALID_ARGS: &str = "Error 0x00000: Invalid arguments";
const ERR_ALREADY_CONNECTED: &str = "Error 0x00011: Printer already connected";
const ERR_CONNECT: &str = "Error 0x00012: Connecting printer failed: ERR_CONNECT";
const ERR_NOT_CONNECTED: &str = "Error 0x00013: Printer is not connected";
const ERR_IMAGE: &str = "Error 0x00040: Failed to convert image data";
const ERR_NOT_READY: &str = "Error 0x00050: Printer is not ready. Check device and paper.";
const ERR_STATUS_NOT_FOUND: &str = "printer not found";

// ── Receipt model ─────────────────────────────────────────────────────────────

/// One element of the device's job buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptLine {
    Text {
        text: String,
        font: u8,
        size: u8,
        align: u8,
    },
    Feed(u32),
    Image {
        bytes: usize,
        mode: u8,
        halftone: u8,
    },
    Cut,
}

/// A committed job as it came out of the printer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintedReceipt {
    pub target: String,
    pub series: String,
    pub lines: Vec<ReceiptLine>,
}

impl PrintedReceipt {
    /// The text lines only, in print order.
    pub fn text(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                ReceiptLine::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn is_cut(&self) -> bool {
        matches!(self.lines.last(), Some(ReceiptLine::Cut))
    }

    /// Renders the receipt as plain text, roughly as it would look on paper.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                ReceiptLine::Text {
                    text, size, align, ..
                } => {
                    let columns = PAPER_COLUMNS / usize::from((*size).max(1));
                    let width = text.chars().count().min(columns);
                    let pad = match align {
                        1 => (columns - width) / 2,
                        2 => columns - width,
                        _ => 0,
                    };
                    let _ = writeln!(out, "{}{}", " ".repeat(pad), text);
                }
                ReceiptLine::Feed(n) => {
                    for _ in 0..*n {
                        out.push('\n');
                    }
                }
                ReceiptLine::Image { bytes, .. } => {
                    let _ = writeln!(out, "[image: {bytes} bytes]");
                }
                ReceiptLine::Cut => {
                    let _ = writeln!(out, "{}", "-".repeat(PAPER_COLUMNS));
                }
            }
        }
        out
    }
}

// ── Options ───────────────────────────────────────────────────────────────────

/// Initial conditions of a [`SimulatedPrinter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatorOptions {
    /// Devices reported by discovery.  When non-empty, only these targets
    /// accept a connection.
    pub devices: Vec<DeviceDescriptor>,
    pub offline: bool,
    pub cover_open: bool,
    pub paper_empty: bool,
}

impl Default for SimulatorOptions {
    fn default() -> Self {
        let lan = DeviceDescriptor::new("TCP:192.168.1.5")
            .with_name("TM-T88VI")
            .with_info(info::IP_ADDRESS, "192.168.1.5")
            .with_info(info::MAC_ADDRESS, "00:26:AB:12:34:56")
            .with_info(info::DEVICE_TYPE, 1);
        let bluetooth = DeviceDescriptor::new("BT:00:01:90:AA:BB:CC")
            .with_name("TM-P80")
            .with_info(info::BD_ADDRESS, "00:01:90:AA:BB:CC")
            .with_info(info::DEVICE_TYPE, 1);
        Self {
            devices: vec![lan, bluetooth],
            offline: false,
            cover_open: false,
            paper_empty: false,
        }
    }
}

// ── SimulatedPrinter ──────────────────────────────────────────────────────────

struct DeviceState {
    options: SimulatorOptions,
    connected: Option<String>,
    series: String,
    buffer: Vec<ReceiptLine>,
    printed: Vec<PrintedReceipt>,
    scan: Option<Arc<Mutex<Handler>>>,
}

impl DeviceState {
    fn is_printable(&self) -> bool {
        self.connected.is_some()
            && !self.options.offline
            && !self.options.cover_open
            && !self.options.paper_empty
    }
}

/// A printer that lives entirely in memory.
pub struct SimulatedPrinter {
    state: Mutex<DeviceState>,
}

impl SimulatedPrinter {
    pub fn new(options: SimulatorOptions) -> Self {
        Self {
            state: Mutex::new(DeviceState {
                options,
                connected: None,
                series: DEFAULT_SERIES.to_string(),
                buffer: Vec::new(),
                printed: Vec::new(),
                scan: None,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connected.is_some()
    }

    /// Printer series selected by the last connect.
    pub fn series(&self) -> String {
        self.lock().series.clone()
    }

    /// Number of elements waiting in the job buffer.
    pub fn buffered(&self) -> usize {
        self.lock().buffer.len()
    }

    /// Every committed receipt, oldest first.
    pub fn printed(&self) -> Vec<PrintedReceipt> {
        self.lock().printed.clone()
    }

    pub fn set_offline(&self, offline: bool) {
        self.lock().options.offline = offline;
    }

    pub fn set_cover_open(&self, open: bool) {
        self.lock().options.cover_open = open;
    }

    pub fn set_paper_empty(&self, empty: bool) {
        self.lock().options.paper_empty = empty;
    }

    /// Makes a new device reachable and reports it to a running scan.
    pub fn announce(&self, device: DeviceDescriptor) {
        let scan = {
            let mut state = self.lock();
            state.options.devices.push(device.clone());
            state.scan.clone()
        };
        if let Some(scan) = scan {
            deliver(&scan, &device);
        }
    }

    // ── Command handlers ──────────────────────────────────────────────────────

    /// Device-side discovery never fails, so the error handler is not kept.
    fn start_discover(&self, on_event: Handler) {
        let scan = Arc::new(Mutex::new(on_event));
        let devices = {
            let mut state = self.lock();
            if state.scan.replace(Arc::clone(&scan)).is_some() {
                debug!("replacing running discovery scan");
            }
            state.options.devices.clone()
        };
        info!(devices = devices.len(), "simulated discovery started");
        for device in &devices {
            deliver(&scan, device);
        }
    }

    fn stop_discover(&self) -> Result<Payload, Payload> {
        if self.lock().scan.take().is_some() {
            info!("simulated discovery stopped");
        }
        Ok(json!(true))
    }

    fn connect(&self, args: &[Payload]) -> Result<Payload, Payload> {
        let target = args
            .first()
            .and_then(Payload::as_str)
            .ok_or_else(|| json!(format!("{ERR_INVALID_ARGS}: target")))?;
        let model = args.get(1).and_then(Payload::as_str);

        let mut state = self.lock();
        if let Some(current) = &state.connected {
            if current == target {
                debug!(%target, "already connected to this target");
                return Ok(json!(true));
            }
            warn!(%current, requested = %target, "already connected to another printer");
            return Err(json!(ERR_ALREADY_CONNECTED));
        }

        let known = &state.options.devices;
        if !known.is_empty() && !known.iter().any(|d| d.target == target) {
            warn!(%target, "no simulated device at this target");
            return Err(json!(ERR_CONNECT));
        }

        match model {
            Some(model) if SUPPORTED_MODELS.contains(&model) => state.series = model.to_string(),
            Some(model) => warn!(%model, series = %state.series, "unknown model; keeping current series"),
            None => {}
        }
        state.connected = Some(target.to_string());
        state.buffer.clear();
        info!(%target, series = %state.series, "simulated printer connected");
        Ok(json!(true))
    }

    fn disconnect(&self) -> Result<Payload, Payload> {
        let mut state = self.lock();
        if let Some(target) = state.connected.take() {
            state.buffer.clear();
            info!(%target, "simulated printer disconnected");
        }
        Ok(json!(true))
    }

    fn print_text(&self, args: &[Payload]) -> Result<Payload, Payload> {
        let mut state = self.lock();
        if state.connected.is_none() {
            return Err(json!(ERR_NOT_CONNECTED));
        }
        let lines: Vec<String> = args
            .first()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .ok_or_else(|| json!(format!("{ERR_INVALID_ARGS}: lines")))?;
        let font = int_arg(args, 1).unwrap_or(0);
        let size = int_arg(args, 2).unwrap_or(1);
        let align = int_arg(args, 3).unwrap_or(0);

        for text in lines {
            if text == "\n" {
                state.buffer.push(ReceiptLine::Feed(1));
            } else {
                state.buffer.push(ReceiptLine::Text {
                    text,
                    font,
                    size,
                    align,
                });
            }
        }
        debug!(buffered = state.buffer.len(), "text added to job buffer");
        Ok(json!(true))
    }

    fn print_image(&self, args: &[Payload]) -> Result<Payload, Payload> {
        let mut state = self.lock();
        if state.connected.is_none() {
            return Err(json!(ERR_NOT_CONNECTED));
        }
        let data_url = args
            .first()
            .and_then(Payload::as_str)
            .ok_or_else(|| json!(format!("{ERR_INVALID_ARGS}: image")))?;
        let mode = int_arg(args, 1).unwrap_or(0);
        let halftone = int_arg(args, 2).unwrap_or(2);

        let encoded = data_url.split_once(',').map_or(data_url, |(_, data)| data);
        let bytes = match BASE64.decode(encoded) {
            Ok(bytes) if !bytes.is_empty() => bytes,
            Ok(_) => {
                warn!("image data is empty");
                return Err(json!(ERR_IMAGE));
            }
            Err(e) => {
                warn!(error = %e, "image data is not valid base64");
                return Err(json!(ERR_IMAGE));
            }
        };

        state.buffer.push(ReceiptLine::Image {
            bytes: bytes.len(),
            mode,
            halftone,
        });
        debug!(bytes = bytes.len(), "image added to job buffer");
        Ok(json!(true))
    }

    fn send_data(&self) -> Result<Payload, Payload> {
        let mut state = self.lock();
        let Some(target) = state.connected.clone() else {
            return Err(json!(ERR_NOT_CONNECTED));
        };
        if !state.is_printable() {
            warn!(%target, "printer is not printable; dropping connection");
            state.connected = None;
            state.buffer.clear();
            return Err(json!(ERR_NOT_READY));
        }

        let mut lines = std::mem::take(&mut state.buffer);
        lines.push(ReceiptLine::Feed(3));
        lines.push(ReceiptLine::Cut);
        let receipt = PrintedReceipt {
            target,
            series: state.series.clone(),
            lines,
        };
        info!(target = %receipt.target, lines = receipt.lines.len(), "receipt printed");
        state.printed.push(receipt);
        Ok(json!(true))
    }

    fn status(&self) -> Result<Payload, Payload> {
        let state = self.lock();
        if state.connected.is_none() {
            return Err(json!(ERR_STATUS_NOT_FOUND));
        }
        let online = !state.options.offline && !state.options.cover_open && !state.options.paper_empty;
        let mut info = Map::new();
        info.insert(fields::ONLINE.into(), json!(i32::from(online)));
        info.insert(fields::CONNECTION.into(), json!(1));
        info.insert(fields::COVER_OPEN.into(), json!(i32::from(state.options.cover_open)));
        info.insert(fields::PAPER.into(), json!(if state.options.paper_empty { 2 } else { 0 }));
        info.insert(fields::PAPER_FEED.into(), json!(0));
        info.insert(fields::ERROR_STATUS.into(), json!(0));
        info.insert(fields::IS_PRINTABLE.into(), json!(state.is_printable()));
        Ok(Payload::Object(info))
    }
}

impl Default for SimulatedPrinter {
    fn default() -> Self {
        Self::new(SimulatorOptions::default())
    }
}

impl CommandExecutor for SimulatedPrinter {
    fn exec(&self, command: Command, args: Vec<Payload>, mut on_success: Handler, mut on_error: Handler) {
        let outcome = match command {
            Command::StartDiscover => {
                self.start_discover(on_success);
                return;
            }
            Command::StopDiscover => self.stop_discover(),
            Command::ConnectPrinter => self.connect(&args),
            Command::DisconnectPrinter => self.disconnect(),
            Command::PrintText => self.print_text(&args),
            Command::PrintImage => self.print_image(&args),
            Command::SendData => self.send_data(),
            Command::GetPrinterStatus => self.status(),
            Command::GetSupportedModels => Ok(json!(SUPPORTED_MODELS)),
        };
        match outcome {
            Ok(payload) => on_success(payload),
            Err(payload) => {
                debug!(%command, %payload, "simulated command failed");
                on_error(payload)
            }
        }
    }
}

fn deliver(scan: &Mutex<Handler>, device: &DeviceDescriptor) {
    let payload = match serde_json::to_value(device) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "failed to encode device info");
            return;
        }
    };
    let mut on_event = scan.lock().unwrap_or_else(|p| p.into_inner());
    (*on_event)(payload);
}

fn int_arg(args: &[Payload], index: usize) -> Option<u8> {
    args.get(index)
        .and_then(Payload::as_u64)
        .and_then(|v| u8::try_from(v).ok())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
