//! # Reading Merger
//!
//! The outdoor cluster has no indoor sensors and the base station has no
//! working light sensor. The merger keeps the latest base station reading
//! and lends its indoor values to every outdoor cluster reading.
//!
//! The snapshot never expires: a stale base station reading keeps being
//! reused until a newer one replaces it.

use tracing::{debug, info};

use crate::radio::decoder::Decoded;
use crate::radio::protocol::{Protocol, SensorReading};

/// Holds the most recent base station reading
#[derive(Debug, Clone, Default)]
pub struct ReadingMerger {
    snapshot: Option<SensorReading>,
}

impl ReadingMerger {
    /// Create a merger with no indoor snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent base station reading, if any
    pub fn snapshot(&self) -> Option<&SensorReading> {
        self.snapshot.as_ref()
    }

    /// Replace the indoor snapshot
    pub fn update_indoor(&mut self, reading: SensorReading) {
        self.snapshot = Some(reading);
    }

    /// Compose an outdoor cluster reading with the indoor snapshot
    ///
    /// # Returns
    ///
    /// * `Option<SensorReading>` - Composite reading, or `None` while no base
    ///   station reading has been seen
    pub fn merge_outdoor(&self, outdoor: SensorReading) -> Option<SensorReading> {
        let snapshot = self.snapshot.as_ref()?;

        let mut composite = outdoor;
        if snapshot.temp_in.is_some() {
            composite.temp_in = snapshot.temp_in;
        }
        if snapshot.hum_in.is_some() {
            composite.hum_in = snapshot.hum_in;
        }
        if snapshot.abs_pressure.is_some() {
            composite.abs_pressure = snapshot.abs_pressure;
        }
        if snapshot.rain.is_some() {
            composite.rain = snapshot.rain;
        }

        Some(composite)
    }

    /// Feed one decoded payload
    ///
    /// Base station readings only refresh the snapshot and are never
    /// returned. Outdoor cluster readings are returned merged.
    pub fn accept(&mut self, decoded: &Decoded) -> Option<SensorReading> {
        match decoded.protocol {
            Protocol::BaseStation => {
                info!("Base station reading: {:?}", decoded.reading);
                self.update_indoor(decoded.reading);
                None
            }
            Protocol::OutdoorCluster => {
                debug!("Outdoor cluster reading: {:?}", decoded.reading);
                let composite = self.merge_outdoor(decoded.reading);
                if composite.is_none() {
                    debug!("No base station reading yet, outdoor reading dropped");
                }
                composite
            }
        }
    }
}
