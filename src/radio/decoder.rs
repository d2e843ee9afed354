//! # Payload Decoder
//!
//! Turns a synchronized payload into a [`SensorReading`] by walking the
//! protocol's [`Layout`]. Both transmitters go through the same routine;
//! only their layout tables differ.

use super::crc::payload_remainder;
use super::protocol::{Layout, Protocol, SensorReading};
use crate::error::{Result, WeatherBridgeError};

/// A diagnostic field that is not part of the reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diagnostic {
    pub name: &'static str,
    pub raw: u32,
    pub value: Option<f64>,
}

/// A decoded payload
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub protocol: Protocol,
    pub reading: SensorReading,
    pub diagnostics: Vec<Diagnostic>,
}

/// Decode a payload with the given layout
///
/// # Arguments
///
/// * `layout` - Field layout of the protocol
/// * `payload` - Payload bytes, check byte last
///
/// # Returns
///
/// * `Result<Decoded>` - Normalized reading plus diagnostic fields
///
/// # Errors
///
/// Checked in this order:
/// - [`WeatherBridgeError::PayloadLength`] if the buffer has the wrong size
/// - [`WeatherBridgeError::WrongDevice`] if the device code does not match
/// - [`WeatherBridgeError::PayloadChecksum`] if the self-check CRC is not zero
pub fn decode(layout: &Layout, payload: &[u8]) -> Result<Decoded> {
    let protocol = layout.protocol;

    if payload.len() != protocol.payload_size() {
        return Err(WeatherBridgeError::PayloadLength {
            protocol,
            expected: protocol.payload_size(),
            actual: payload.len(),
        });
    }

    if let Some((field, expected)) = layout.device {
        let code = field.extract(payload);
        if code != expected {
            return Err(WeatherBridgeError::WrongDevice { protocol, code });
        }
    }

    let remainder = payload_remainder(payload);
    if remainder != 0 {
        return Err(WeatherBridgeError::PayloadChecksum { protocol, remainder });
    }

    let mut reading = SensorReading::default();
    for (output, channel) in layout.outputs {
        let (_, value) = channel.read(payload);
        reading.set(*output, value);
    }

    let diagnostics = layout
        .diagnostics
        .iter()
        .map(|(name, channel)| {
            let (raw, value) = channel.read(payload);
            Diagnostic { name, raw, value }
        })
        .collect();

    Ok(Decoded {
        protocol,
        reading,
        diagnostics,
    })
}

/// Decode a payload of `protocol` with its built-in layout
pub fn decode_payload(protocol: Protocol, payload: &[u8]) -> Result<Decoded> {
    decode(protocol.layout(), payload)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::radio::encoder::seal_payload;

    /// Base station payload: 21.0 °C / 55 % indoor, 1013.0 hPa
    pub(crate) fn base_station_payload() -> Vec<u8> {
        let mut data = vec![0u8; 36];
        data[0] = 0xE1; // header 0xE, serial high nibble 1
        data[1] = 0x20; // serial low nibble 2, flags 0
        data[2] = 0b0000_0100; // wind direction bit 8
        data[3] = 34; // wind average 3.4
        data[4] = 71; // gust 7.1
        data[5] = 0x0E; // direction 0x10E = 270°
        data[20] = 0x04; // rain total 0x04D2 = 123.4 mm
        data[21] = 0xD2;
        data[24] = 0x45; // indoor high nibble 4, outdoor high nibble 5
        data[25] = 0x46; // outdoor 0x546 = 95.0 °F
        data[26] = 80; // outdoor humidity
        data[27] = 0x4A; // indoor 0x44A = 69.8 °F
        data[28] = 55; // indoor humidity
        data[29] = 0x27; // absolute pressure 10130
        data[30] = 0x92;
        data[31] = 0x27; // relative pressure 10160
        data[32] = 0xB0;
        data[33] = 0xFF; // illuminance sentinel
        data[34] = 0xFA;
        data[35] = 0xFA; // uv sentinel
        seal_payload(&data)
    }

    /// Outdoor cluster payload: 10.0 °C, 70 %, 250 lux
    pub(crate) fn outdoor_cluster_payload() -> Vec<u8> {
        let mut data = vec![0u8; 13];
        data[0] = 0xC5; // device 0xC
        data[1] = 0x01; // flags: wind average bit 8
        data[2] = 0x04; // wind average 0x104 = 26.0
        data[3] = 0x2D; // gust 4.5
        data[4] = 180; // direction 180°
        data[5] = 0x00; // rain 0x0064 = 10.0 mm
        data[6] = 0x64;
        data[7] = 0x03; // second flags 0, temperature high nibble 3
        data[8] = 0x84; // 0x384 = 50.0 °F
        data[9] = 70;
        data[10] = 0x00; // illuminance 250
        data[11] = 0xFA;
        data[12] = 3; // uv
        seal_payload(&data)
    }
}
