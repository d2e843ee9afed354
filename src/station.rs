//! # Weather Station Pipeline
//!
//! Ties the decoding stages together:
//!
//! ```text
//! line -> framer -> bit string -> sync -> payloads -> decoder -> merger -> composite reading
//! ```
//!
//! and hands every composite reading to the [`Collaborators`]. Malformed
//! lines are logged as errors, payload checksum failures at debug level, and
//! captures that simply are not one of ours are skipped silently.

use chrono::{SubsecRound, Utc};
use std::future::Future;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, trace, warn};

use crate::error::{Result, WeatherBridgeError};
use crate::merger::ReadingMerger;
use crate::radio::decoder::{decode_payload, Decoded};
use crate::radio::framer::{decode_line, LineFrame, DEFAULT_BANNER_PREFIX};
use crate::radio::protocol::SensorReading;
use crate::radio::sync::synchronize;
use crate::serial::LineSource;
use crate::storage::Collaborators;

/// Decode state for one receiver
#[derive(Debug)]
pub struct Station {
    banner_prefix: String,
    merger: ReadingMerger,
    lines_seen: u64,
    records_emitted: u64,
}

impl Default for Station {
    fn default() -> Self {
        Self::new(DEFAULT_BANNER_PREFIX)
    }
}

impl Station {
    /// Create a station that recognizes `banner_prefix` as the firmware announcement
    pub fn new(banner_prefix: &str) -> Self {
        Self {
            banner_prefix: banner_prefix.to_string(),
            merger: ReadingMerger::new(),
            lines_seen: 0,
            records_emitted: 0,
        }
    }

    /// Indoor snapshot state
    pub fn merger(&self) -> &ReadingMerger {
        &self.merger
    }

    /// Number of lines received so far
    pub fn lines_seen(&self) -> u64 {
        self.lines_seen
    }

    /// Number of composite readings produced so far
    pub fn records_emitted(&self) -> u64 {
        self.records_emitted
    }

    /// Decode one received line
    ///
    /// # Arguments
    ///
    /// * `line` - Received line, or `None` when the read timed out
    ///
    /// # Returns
    ///
    /// * `Option<SensorReading>` - Composite reading if the line completed one
    pub fn process_line(&mut self, line: Option<&str>) -> Option<SensorReading> {
        let line = line?;
        self.lines_seen += 1;

        let bits = match decode_line(line, &self.banner_prefix) {
            Ok(LineFrame::Bits(bits)) => bits,
            Ok(LineFrame::Banner(version)) => {
                info!("Version: {}", version);
                return None;
            }
            Ok(LineFrame::NoMessage) => return None,
            Err(e) => {
                error!("{}", e);
                return None;
            }
        };
        debug!("Capture: {}", bits);

        let mut emitted = None;
        for payload in synchronize(&bits) {
            debug!("{} {}", payload.protocol, hex(&payload.bytes));

            match decode_payload(payload.protocol, &payload.bytes) {
                Ok(decoded) => {
                    log_diagnostics(&decoded);
                    if let Some(reading) = self.merger.accept(&decoded) {
                        emitted = Some(reading);
                    }
                }
                Err(e @ WeatherBridgeError::PayloadChecksum { .. }) => debug!("{}", e),
                Err(
                    e @ (WeatherBridgeError::WrongDevice { .. }
                    | WeatherBridgeError::PayloadLength { .. }),
                ) => trace!("{}", e),
                Err(e) => error!("{}", e),
            }
        }

        if emitted.is_some() {
            self.records_emitted += 1;
        }
        emitted
    }

    /// Read one line from `source`, decode it and publish any composite reading
    ///
    /// # Errors
    ///
    /// Returns error only if reading from `source` fails
    pub async fn poll<L, C>(
        &mut self,
        source: &mut L,
        collaborators: &mut C,
        read_timeout: Duration,
    ) -> Result<Option<SensorReading>>
    where
        L: LineSource + ?Sized,
        C: Collaborators + ?Sized,
    {
        let line = source.read_line(read_timeout).await?;
        let emitted = self.process_line(line.as_deref());

        if let Some(reading) = &emitted {
            publish(reading, collaborators);
        }
        Ok(emitted)
    }
}

/// Hand a composite reading to every collaborator
///
/// Each call is isolated: a failure is logged and the remaining calls still run.
pub fn publish<C>(reading: &SensorReading, collaborators: &mut C)
where
    C: Collaborators + ?Sized,
{
    let timestamp = Utc::now().trunc_subsecs(0);
    info!("Reading {}: {:?}", timestamp.to_rfc3339(), reading);

    if let Err(e) = collaborators.persist(timestamp, reading) {
        error!("Failed to store reading: {}", e);
    }
    if let Err(e) = collaborators.run_scheduled_tasks() {
        error!("Scheduled tasks failed: {}", e);
    }
    if let Err(e) = collaborators.notify_live(reading) {
        error!("Live update failed: {}", e);
    }
}

/// Timing of the receive loop
#[derive(Debug, Clone, Copy)]
pub struct LoopTiming {
    /// Longest wait for one line
    pub read_timeout: Duration,
    /// Pause after a failed read
    pub retry_delay: Duration,
}

/// Receive and decode lines until `shutdown` completes
///
/// Read errors are logged and retried after `retry_delay`; nothing in the
/// loop is fatal. Shutdown also interrupts the pause after a failed read.
pub async fn run<L, C, F>(
    source: &mut L,
    station: &mut Station,
    collaborators: &mut C,
    timing: LoopTiming,
    shutdown: F,
) -> Result<()>
where
    L: LineSource + ?Sized,
    C: Collaborators + ?Sized,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    info!("Listening for weather sensors");

    loop {
        let result = tokio::select! {
            _ = &mut shutdown => break,
            result = station.poll(&mut *source, &mut *collaborators, timing.read_timeout) => result,
        };

        if let Err(e) = result {
            warn!("Receive failed: {}", e);

            tokio::select! {
                _ = &mut shutdown => break,
                _ = sleep(timing.retry_delay) => {}
            }
        }
    }

    info!("Shutting down...");
    info!(
        "Lines received: {}, readings emitted: {}",
        station.lines_seen(),
        station.records_emitted()
    );
    Ok(())
}

fn log_diagnostics(decoded: &Decoded) {
    for diagnostic in &decoded.diagnostics {
        trace!(
            "{} {} = {} ({:?})",
            decoded.protocol,
            diagnostic.name,
            diagnostic.raw,
            diagnostic.value
        );
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{:02x}", byte)).collect()
}
