//! # CRC-8 Implementation
//!
//! MSB-first, non-reflected CRC-8 with a caller supplied polynomial and
//! initial register value. No final XOR is applied.
//!
//! Two configurations are in use:
//!
//! - **Line integrity**: polynomial 0x8C, initial value 0x00. The receiver
//!   appends this CRC of the payload bytes to every serial line.
//! - **Payload self-check**: polynomial 0x31, initial value 0xC0. The
//!   transmitter ends each payload with a check byte so that the CRC over the
//!   whole buffer, check byte included, is zero.

/// Polynomial for the serial line checksum
pub const LINE_CRC_POLY: u8 = 0x8C;

/// Initial register value for the serial line checksum
pub const LINE_CRC_INIT: u8 = 0x00;

/// Polynomial for the sensor payload self-check
pub const PAYLOAD_CRC_POLY: u8 = 0x31;

/// Initial register value for the sensor payload self-check
pub const PAYLOAD_CRC_INIT: u8 = 0xC0;

/// Calculate a CRC-8 checksum
///
/// # Arguments
///
/// * `data` - Bytes to checksum
/// * `polynomial` - Generator polynomial (without the implicit x^8 term)
/// * `init` - Initial register value
///
/// # Returns
///
/// * `u8` - Final register value
///
/// # Examples
///
/// ```
/// use weather_bridge::radio::crc::crc8;
///
/// assert_eq!(crc8(&[], 0x31, 0xC0), 0xC0);
/// ```
pub fn crc8(data: &[u8], polynomial: u8, init: u8) -> u8 {
    let mut crc = init;

    for &byte in data {
        crc ^= byte;

        for _ in 0..8 {
            if (crc & 0x80) != 0 {
                crc = (crc << 1) ^ polynomial;
            } else {
                crc <<= 1;
            }
        }
    }

    crc
}

/// CRC of a serial line's payload bytes
pub fn line_crc(data: &[u8]) -> u8 {
    crc8(data, LINE_CRC_POLY, LINE_CRC_INIT)
}

/// Self-check remainder of a sensor payload (zero when intact)
pub fn payload_remainder(payload: &[u8]) -> u8 {
    crc8(payload, PAYLOAD_CRC_POLY, PAYLOAD_CRC_INIT)
}
