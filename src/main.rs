//! # ROV Link
//!
//! Headless ground-control link: joystick in, UDP control out, telemetry
//! logged.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration (first argument, default `config/default.toml`)
//!    - Set up logging (console, plus a daily log file if `log_dir` is set)
//!    - Open the joystick, or fall back to neutral commands
//!    - Load the joystick mapping
//!    - Bind the UDP socket (fatal on failure)
//!
//! 2. **Main Loop**
//!    - Poll joystick, send control, wait briefly for telemetry, every tick
//!    - Log a status line every few seconds
//!
//! 3. **Graceful Shutdown**
//!    - Ctrl+C closes the session, which ends the loop mid-tick if needed
//!    - Final counters are logged
//!
//! # Examples
//!
//! ```bash
//! cargo run --release -- config/default.toml
//! RUST_LOG=rov_link=debug cargo run
//! ```

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rov_link::config::{Config, LoggingConfig};
use rov_link::controller::calibration::MotionShaping;
use rov_link::controller::device::InputDevice;
use rov_link::controller::joystick::Joystick;
use rov_link::controller::mapper::{InputMapper, Setpoints};
use rov_link::controller::mapping::InputMapping;
use rov_link::diagnostics::{DiagnosticsSink, TracingSink};
use rov_link::error::RovLinkError;
use rov_link::link::{ControlLoop, LinkSession, LoopSettings};

/// Configuration file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Rolling log file name prefix
const LOG_FILE_NAME: &str = "rov-link.log";

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let (config, missing_config) = match Config::load(&config_path) {
        Ok(config) => (config, false),
        Err(RovLinkError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            (Config::default(), true)
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to load {}", config_path)),
    };

    let _log_guard = init_logging(&config.logging);

    info!("ROV Link v{} starting...", env!("CARGO_PKG_VERSION"));
    if missing_config {
        warn!("Config file {} not found, using defaults", config_path);
    } else {
        info!("Loaded configuration from {}", config_path);
    }

    let sink: Arc<dyn DiagnosticsSink> = Arc::new(TracingSink);

    // Input
    let device = open_joystick(&config.controller.device_path);
    let mapping = InputMapping::load_or_default(&config.controller.mapping_file, sink.as_ref());
    let mapper = InputMapper::new(
        device,
        mapping,
        MotionShaping::from_config(&config.controller),
        Setpoints::from(&config.control),
        Arc::clone(&sink),
    );

    // Link
    let session = LinkSession::from_config(&config, Arc::clone(&sink))
        .await
        .context("Cannot start link session")?;
    info!(
        "Link session ready: {} → {} ({:?} axes, {} camera axes)",
        session.local_addr()?,
        config.remote_addr()?,
        config.protocol.axis_encoding,
        config.protocol.camera_axes
    );

    let control_loop = ControlLoop::new(session, mapper, LoopSettings::from_config(&config));
    let shutdown = control_loop.shutdown_handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down...");
            shutdown.close();
        }
    });

    info!("Press Ctrl+C to exit");
    let stats = control_loop.run().await;

    info!(
        "Totals: {} commands, {} telemetry, {} hellos, {} timeouts, {} malformed, {} CRC errors, {} unknown headers, {} send failures",
        stats.control_sent,
        stats.telemetry_received,
        stats.hellos_received,
        stats.timeouts,
        stats.malformed,
        stats.crc_mismatches,
        stats.unknown_headers,
        stats.send_failures
    );

    Ok(())
}

/// Console logging plus an optional daily rolling file.
///
/// `RUST_LOG` overrides the configured level. The returned guard flushes the
/// file writer on drop and must live until exit.
fn init_logging(logging: &LoggingConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rov_link={}", logging.level)));

    let (file_layer, guard) = if logging.log_dir.is_empty() {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::daily(Path::new(&logging.log_dir), LOG_FILE_NAME);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (
            Some(fmt::layer().with_writer(writer).with_ansi(false)),
            Some(guard),
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

/// Open the configured joystick, or any joystick if no path is set.
///
/// Absence is not fatal; the mapper reports it and sends neutral commands.
fn open_joystick(device_path: &str) -> Option<Box<dyn InputDevice>> {
    let result = if device_path.is_empty() {
        Joystick::open()
    } else {
        Joystick::open_path(device_path)
    };

    match result {
        Ok(joystick) => {
            info!("Joystick ready: {}", joystick.device_path());
            Some(Box::new(joystick))
        }
        Err(e) => {
            warn!("Joystick unavailable: {}", e);
            None
        }
    }
}
