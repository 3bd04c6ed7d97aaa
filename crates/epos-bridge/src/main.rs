//! ePOS bridge command-line tool: entry point.
//!
//! Drives a receipt printer through the bridge, either via a printer agent
//! process (remote executor) or an in-process simulated printer.
//!
//! # Usage
//!
//! ```text
//! epos-bridge [OPTIONS] <COMMAND>
//!
//! Commands:
//!   discover     Scan for printers for a few seconds
//!   models       List supported printer models
//!   status       Show the printer status record
//!   print-text   Stage lines of text (and commit with --cut)
//!   print-image  Stage an image data URL (and commit with --cut)
//!   cut          Commit whatever is staged: print, feed, cut
//!   disconnect   Close the printer connection
//!
//! Options:
//!   --config <PATH>   Config file [default: platform config dir]
//!   --target <TARGET> Printer address, e.g. TCP:192.168.1.5
//!   --model <MODEL>   Printer model hint, e.g. TM-T88VI
//!   --remote <ADDR>   Use the printer agent at ADDR instead of the simulator
//! ```
//!
//! Commands do not disconnect on exit.  With a printer agent, content staged
//! without `--cut` stays in the printer's buffer until a later `cut`.
//!
//! # Environment variable overrides
//!
//! | Variable             | Description                    |
//! |----------------------|--------------------------------|
//! | `EPOS_BRIDGE_CONFIG` | Config file path               |
//! | `EPOS_TARGET`        | Printer address                |
//! | `EPOS_MODEL`         | Printer model hint             |
//! | `EPOS_AGENT_ADDR`    | Printer agent address          |
//! | `RUST_LOG`           | Log filter (overrides config)  |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use epos_bridge::application::{Callbacks, CommandExecutor, PrinterSession};
use epos_bridge::infrastructure::executor::{RemoteExecutor, SimulatedPrinter};
use epos_bridge::infrastructure::storage::config::{self, BridgeConfig, ExecutorKind};
use epos_core::{ImageStyle, TextStyle};

// ── CLI argument definitions ──────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "epos-bridge", about = "Drive a receipt printer through the ePOS bridge", version)]
struct Cli {
    /// Config file to read instead of the platform default.
    #[arg(long, global = true, env = "EPOS_BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Printer address, `TRANSPORT:ADDRESS`.
    #[arg(long, global = true, env = "EPOS_TARGET")]
    target: Option<String>,

    /// Model hint sent on connect.
    #[arg(long, global = true, env = "EPOS_MODEL")]
    model: Option<String>,

    /// Printer agent address; selects the remote executor.
    #[arg(long, global = true, env = "EPOS_AGENT_ADDR")]
    remote: Option<SocketAddr>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Scan for printers and list what is found.
    Discover {
        #[arg(long, default_value_t = 5)]
        seconds: u64,
    },
    /// List the printer models the executor supports.
    Models,
    /// Show the printer's status record.
    Status,
    /// Stage lines of text.  A line of "\n" feeds one blank line.
    PrintText {
        /// Font code, 0 (A) to 4 (E).
        #[arg(long, default_value_t = 0)]
        font: u8,
        /// Size multiplier, 1 to 8.
        #[arg(long, default_value_t = 1)]
        size: u8,
        /// 0 left, 1 center, 2 right.
        #[arg(long, default_value_t = 0)]
        align: u8,
        /// Commit right after staging.
        #[arg(long)]
        cut: bool,
        #[arg(required = true)]
        lines: Vec<String>,
    },
    /// Stage an image given as a `data:` URL.
    PrintImage {
        #[arg(long)]
        data_url: String,
        /// 0 monochrome, 1 16-level gradation, 2 monochrome double density.
        #[arg(long, default_value_t = 0)]
        mode: u8,
        /// 0 dithering, 1 error diffusion, 2 threshold.
        #[arg(long, default_value_t = 0)]
        halftone: u8,
        /// Commit right after staging.
        #[arg(long)]
        cut: bool,
    },
    /// Commit whatever is staged.
    Cut,
    /// Close the printer connection.
    Disconnect,
}

/// The executor behind the session, kept typed for backend-specific output.
enum Backend {
    Simulated(Arc<SimulatedPrinter>),
    Remote(Arc<RemoteExecutor>),
}

impl Backend {
    async fn open(cli: &Cli, cfg: &BridgeConfig) -> anyhow::Result<Self> {
        let remote_addr = match (cli.remote, cfg.bridge.executor) {
            (Some(addr), _) => Some(addr),
            (None, ExecutorKind::Remote) => Some(cfg.remote.agent_addr),
            (None, ExecutorKind::Simulated) => None,
        };
        match remote_addr {
            Some(addr) => {
                let exec = RemoteExecutor::connect(addr, cfg.remote.connect_timeout())
                    .await
                    .context("printer agent unavailable")?;
                Ok(Backend::Remote(Arc::new(exec)))
            }
            None => Ok(Backend::Simulated(Arc::new(SimulatedPrinter::new(
                cfg.simulator.to_options(),
            )))),
        }
    }

    fn executor(&self) -> Arc<dyn CommandExecutor> {
        match self {
            Backend::Simulated(sim) => Arc::clone(sim) as Arc<dyn CommandExecutor>,
            Backend::Remote(remote) => Arc::clone(remote) as Arc<dyn CommandExecutor>,
        }
    }

    /// Shows simulated receipts on stdout; a real printer speaks for itself.
    fn show_printed(&self) {
        if let Backend::Simulated(sim) = self {
            for receipt in sim.printed() {
                println!("── {} ({}) ──", receipt.target, receipt.series);
                print!("{}", receipt.render());
            }
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    }
    .context("failed to load configuration")?;

    // `RUST_LOG` wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.bridge.log_level)),
        )
        .init();

    let backend = Backend::open(&cli, &cfg).await?;
    let mut session = PrinterSession::new(backend.executor());

    run(&cli, &cfg, &backend, &mut session).await
}

async fn run(
    cli: &Cli,
    cfg: &BridgeConfig,
    backend: &Backend,
    session: &mut PrinterSession,
) -> anyhow::Result<()> {
    match &cli.command {
        CliCommand::Discover { seconds } => {
            session.start_discovery(
                |device| {
                    println!(
                        "{:<28} {}",
                        device.target,
                        device.device_name().unwrap_or("(unnamed)")
                    );
                },
                |payload| warn!(%payload, "discovery error"),
            )?;
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(*seconds)) => {}
                _ = tokio::signal::ctrl_c() => info!("interrupted"),
            }
            session.stop_discovery(Callbacks::none()).await?;
        }
        CliCommand::Models => {
            for model in session.supported_models(Callbacks::none()).await? {
                println!("{model}");
            }
        }
        CliCommand::Status => {
            connect(cli, cfg, session).await?;
            let status = session.printer_status(Callbacks::none()).await?;
            println!("{}", serde_json::to_string_pretty(status.payload())?);
        }
        CliCommand::PrintText {
            font,
            size,
            align,
            cut,
            lines,
        } => {
            let style = TextStyle::from_codes(*font, *size, *align).context("invalid text style")?;
            connect(cli, cfg, session).await?;
            session
                .print_text(lines.clone(), style, *cut, Callbacks::none())
                .await?;
            report_staged(backend, session, *cut);
        }
        CliCommand::PrintImage {
            data_url,
            mode,
            halftone,
            cut,
        } => {
            let style = ImageStyle::from_codes(*mode, *halftone).context("invalid image style")?;
            connect(cli, cfg, session).await?;
            session
                .print_image(data_url, style, *cut, Callbacks::none())
                .await?;
            report_staged(backend, session, *cut);
        }
        CliCommand::Cut => {
            connect(cli, cfg, session).await?;
            session.send_data(Callbacks::none()).await?;
            backend.show_printed();
        }
        CliCommand::Disconnect => {
            session.disconnect(Callbacks::none()).await?;
        }
    }
    Ok(())
}

async fn connect(cli: &Cli, cfg: &BridgeConfig, session: &mut PrinterSession) -> anyhow::Result<()> {
    let Some(target) = cli
        .target
        .clone()
        .or_else(|| cfg.printer.default_target.clone())
        .or_else(|| cfg.simulator.devices.first().map(|d| d.target.clone()))
    else {
        bail!("no printer target; pass --target or set printer.default_target");
    };
    let model = cli.model.as_deref().or(cfg.printer.default_model.as_deref());

    session
        .connect(target.as_str(), model, Callbacks::none())
        .await
        .with_context(|| format!("could not connect to {target}"))?;
    Ok(())
}

fn report_staged(backend: &Backend, session: &PrinterSession, committed: bool) {
    if committed {
        backend.show_printed();
    } else if let Some(job) = session.current_job() {
        info!(job = %job.id(), ops = job.ops().len(), "staged; run `cut` to print");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_text_defaults() {
        // Arrange / Act
        let cli = Cli::parse_from(["epos-bridge", "print-text", "hello"]);

        // Assert
        match cli.command {
            CliCommand::PrintText {
                font,
                size,
                align,
                cut,
                lines,
            } => {
                assert_eq!((font, size, align), (0, 1, 0));
                assert!(!cut);
                assert_eq!(lines, vec!["hello".to_string()]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_global_target_after_subcommand() {
        let cli = Cli::parse_from(["epos-bridge", "status", "--target", "BT:00:01:90:AA:BB:CC"]);
        assert_eq!(cli.target.as_deref(), Some("BT:00:01:90:AA:BB:CC"));
    }

    #[test]
    fn test_print_text_requires_lines() {
        assert!(Cli::try_parse_from(["epos-bridge", "print-text", "--cut"]).is_err());
    }

    #[tokio::test]
    async fn test_simulated_backend_when_no_remote_configured() {
        let cli = Cli::parse_from(["epos-bridge", "models"]);
        let backend = Backend::open(&cli, &BridgeConfig::default()).await.unwrap();
        assert!(matches!(backend, Backend::Simulated(_)));
    }

    #[tokio::test]
    async fn test_print_text_with_cut_prints_on_simulator() {
        // Arrange
        let cli = Cli::parse_from(["epos-bridge", "print-text", "--cut", "--align", "1", "TOTAL 9.99"]);
        let cfg = BridgeConfig::default();
        let backend = Backend::open(&cli, &cfg).await.unwrap();
        let mut session = PrinterSession::new(backend.executor());

        // Act
        run(&cli, &cfg, &backend, &mut session).await.unwrap();

        // Assert
        let Backend::Simulated(sim) = &backend else {
            panic!("expected simulator");
        };
        let printed = sim.printed();
        assert_eq!(printed.len(), 1);
        assert_eq!(printed[0].text(), vec!["TOTAL 9.99"]);
        assert_eq!(printed[0].target, "TCP:192.168.1.5");
    }
}
