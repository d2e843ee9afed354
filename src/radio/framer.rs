//! # Serial Line Framer
//!
//! The receiver microcontroller reports every captured burst as one ASCII line:
//!
//! ```text
//! <4 hex: bit count> <hex payload, ceil(bits / 8) bytes> <2 hex: CRC-8 (0x8C, 0x00) of payload>
//! ```
//!
//! A line starting with the firmware banner announces the receiver version
//! instead of carrying data.

use std::fmt;

use super::crc::line_crc;
use crate::error::{Result, WeatherBridgeError};

/// Banner printed by the receiver firmware after reset
pub const DEFAULT_BANNER_PREFIX: &str = "Manchester receiver";

/// Captured bits, MSB first per source byte, as `'0'`/`'1'` characters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitString(String);

impl BitString {
    /// Render `bytes` MSB first and keep the first `bit_count` bits
    pub fn from_bytes(bytes: &[u8], bit_count: usize) -> Self {
        let mut bits: String = bytes.iter().map(|byte| format!("{:08b}", byte)).collect();
        bits.truncate(bit_count);
        Self(bits)
    }

    /// Number of bits
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no bits were captured
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Index of the first occurrence of `pattern`
    pub fn find(&self, pattern: &str) -> Option<usize> {
        self.0.find(pattern)
    }

    /// Bits as a `'0'`/`'1'` string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of framing one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineFrame {
    /// Nothing was received this cycle
    NoMessage,

    /// Firmware identification announcement
    Banner(String),

    /// A validated capture
    Bits(BitString),
}

/// Validate and decode one serial line
///
/// # Arguments
///
/// * `line` - Line text, trailing newline already stripped
/// * `banner_prefix` - Prefix of the firmware version announcement
///
/// # Returns
///
/// * `Result<LineFrame>` - Bits of the capture, a banner, or no message for an empty line
///
/// # Errors
///
/// Returns [`WeatherBridgeError::MalformedLine`] if:
/// - The line does not have exactly three space separated tokens
/// - The bit count is not 4 hex digits or the CRC is not 2 hex digits
/// - The payload length does not match the bit count rounded up to whole bytes
/// - The line CRC does not match the payload
///
/// # Examples
///
/// ```
/// use weather_bridge::radio::framer::{decode_line, LineFrame, DEFAULT_BANNER_PREFIX};
///
/// let frame = decode_line("000C A5F0 3C", DEFAULT_BANNER_PREFIX)?;
/// match frame {
///     LineFrame::Bits(bits) => assert_eq!(bits.as_str(), "101001011111"),
///     other => panic!("unexpected {:?}", other),
/// }
/// # Ok::<(), weather_bridge::error::WeatherBridgeError>(())
/// ```
pub fn decode_line(line: &str, banner_prefix: &str) -> Result<LineFrame> {
    if line.is_empty() {
        return Ok(LineFrame::NoMessage);
    }

    if line.starts_with(banner_prefix) {
        return Ok(LineFrame::Banner(line.to_string()));
    }

    let tokens: Vec<&str> = line.split(' ').collect();
    if tokens.len() != 3 || tokens[0].len() != 4 || tokens[2].len() != 2 {
        return Err(malformed(format!("bad token layout: {:?}", line)));
    }
    if !tokens.iter().all(|token| is_hex(token)) {
        return Err(malformed(format!("non-hex token: {:?}", line)));
    }

    let bit_count = u16::from_str_radix(tokens[0], 16)
        .map_err(|_| malformed(format!("bad bit count {:?}: {:?}", tokens[0], line)))? as usize;

    // Whole bytes needed for bit_count bits
    let padded_bits = (bit_count + 7) & !7;
    if tokens[1].len() * 4 != padded_bits {
        return Err(malformed(format!(
            "length {} does not match bit count {} ({}): {:?}",
            tokens[1].len() * 4,
            bit_count,
            padded_bits,
            line
        )));
    }

    let payload = decode_hex(tokens[1])
        .ok_or_else(|| malformed(format!("bad payload hex: {:?}", line)))?;

    let received_crc = u8::from_str_radix(tokens[2], 16)
        .map_err(|_| malformed(format!("bad crc {:?}: {:?}", tokens[2], line)))?;

    let calculated_crc = line_crc(&payload);
    if calculated_crc != received_crc {
        return Err(malformed(format!(
            "crc mismatch: calculated 0x{:02X}, got 0x{:02X}: {:?}",
            calculated_crc, received_crc, line
        )));
    }

    Ok(LineFrame::Bits(BitString::from_bytes(&payload, bit_count)))
}

fn malformed(detail: String) -> WeatherBridgeError {
    WeatherBridgeError::MalformedLine(detail)
}

fn is_hex(token: &str) -> bool {
    token.bytes().all(|byte| byte.is_ascii_hexdigit())
}

/// Decode an even-length hex string; `None` on any non-hex character
fn decode_hex(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 || !is_hex(text) {
        return None;
    }

    text.as_bytes()
        .chunks(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair).ok()?;
            u8::from_str_radix(pair, 16).ok()
        })
        .collect()
}
