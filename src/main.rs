//! # Weather Bridge
//!
//! Decode 433 MHz weather station telemetry from a Manchester receiver.
//!
//! The application reads report lines from the receiver's serial port,
//! decodes the base station and outdoor cluster payloads, and stores each
//! composite reading.
//!
//! # Usage
//!
//! ```bash
//! weather-bridge [config.toml]
//! ```
//!
//! Without a config file every setting takes its default. `RUST_LOG`
//! overrides the configured log level.

use anyhow::Result;
use std::future::pending;
use tokio::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use weather_bridge::config::{Config, LoggingConfig};
use weather_bridge::serial::ReceiverSerial;
use weather_bridge::station::{run, LoopTiming, Station};
use weather_bridge::storage::jsonl::JsonlStore;
use weather_bridge::storage::{Collaborators, LogOnly};

/// File name prefix of the daily log files
const LOG_FILE_NAME: &str = "weather-bridge.log";

/// Main entry point for Weather Bridge application
///
/// # Control Flow
///
/// 1. Load configuration from the first argument, or use defaults
/// 2. Set up logging (console, plus daily files when `log_dir` is set)
/// 3. Open the receiver (the only fatal failure)
/// 4. Decode lines until Ctrl+C
///
/// # Errors
///
/// Returns error if the configuration is invalid, the receiver cannot be
/// opened or the data directory cannot be created
#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config(std::env::args().nth(1))?;
    let _log_guard = init_logging(&config.logging);

    info!("Weather Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut serial = ReceiverSerial::open(&config.serial).await?;
    info!("Receiver serial port opened at: {}", serial.device_path());

    let mut collaborators: Box<dyn Collaborators> = if config.storage.enabled {
        Box::new(JsonlStore::open(&config.storage)?)
    } else {
        info!("Storage disabled, readings are only logged");
        Box::new(LogOnly)
    };

    let mut station = Station::new(&config.receiver.banner_prefix);
    let timing = LoopTiming {
        read_timeout: Duration::from_millis(config.serial.timeout_ms),
        retry_delay: Duration::from_millis(config.serial.retry_delay_ms),
    };

    info!("Press Ctrl+C to exit");

    run(
        &mut serial,
        &mut station,
        collaborators.as_mut(),
        timing,
        shutdown_signal(),
    )
    .await?;

    Ok(())
}

/// Load the config file at `path`, or the defaults when no path was given
fn load_config(path: Option<String>) -> Result<Config> {
    match path {
        Some(path) => Ok(Config::load(&path)?),
        None => Ok(Config::default()),
    }
}

/// Install the tracing subscriber
///
/// The returned guard flushes the file writer and must live until exit.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (file_layer, guard) = if config.log_dir.is_empty() {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_NAME);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

/// Completes on Ctrl+C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl+C: {}", e);
        pending::<()>().await;
    }
}
