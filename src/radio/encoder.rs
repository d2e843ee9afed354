//! # Capture Encoder
//!
//! Builds serial lines the way the receiver firmware does. Used to replay
//! known payloads through the decoder.

use super::crc::{line_crc, payload_remainder};
use super::protocol::{Protocol, PREAMBLE_SKIP_BITS};
use super::sync::pack_bits;

/// Idle bits placed before the preamble of a generated capture
const LEAD_IN: &str = "0000";

/// Encode a `'0'`/`'1'` bit string as a receiver line
///
/// The bits are padded with zeros to whole bytes.
///
/// # Examples
///
/// ```
/// use weather_bridge::radio::encoder::encode_line;
///
/// assert_eq!(encode_line("101001011111"), "000C A5F0 3C");
/// ```
pub fn encode_line(bits: &str) -> String {
    let payload = pack_bits(bits);
    let hex: String = payload.iter().map(|byte| format!("{:02X}", byte)).collect();

    format!("{:04X} {} {:02X}", bits.len(), hex, line_crc(&payload))
}

/// Append the self-check byte so the payload CRC reduces to zero
pub fn seal_payload(data: &[u8]) -> Vec<u8> {
    let mut sealed = data.to_vec();
    sealed.push(payload_remainder(data));
    sealed
}

/// Bit string of a radio capture carrying `payload` for `protocol`
///
/// Only the first preamble bits are emitted: the remaining ones are the top
/// nibble of the payload's first byte, which must therefore match them.
pub fn capture_bits(protocol: Protocol, payload: &[u8]) -> String {
    let mut bits = String::from(LEAD_IN);
    bits.push_str(&protocol.preamble()[..PREAMBLE_SKIP_BITS]);
    for byte in payload {
        bits.push_str(&format!("{:08b}", byte));
    }
    bits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_line_layout() {
        let line = encode_line("1");
        let tokens: Vec<&str> = line.split(' ').collect();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0], "0001");
        assert_eq!(tokens[1], "80");
        assert_eq!(tokens[2].len(), 2);
    }

    #[test]
    fn test_seal_payload() {
        let sealed = seal_payload(&[0xC1, 0x02, 0x03]);
        assert_eq!(sealed.len(), 4);
        assert_eq!(payload_remainder(&sealed), 0);
    }

    #[test]
    fn test_capture_bits_contains_preamble() {
        let payload = [0xE0, 0x00];
        let bits = capture_bits(Protocol::BaseStation, &payload);
        assert_eq!(bits.len(), 4 + 5 + 16);
        assert_eq!(bits.find(Protocol::BaseStation.preamble()), Some(4));

        let payload = [0xC0, 0x00];
        let bits = capture_bits(Protocol::OutdoorCluster, &payload);
        assert_eq!(bits.find(Protocol::OutdoorCluster.preamble()), Some(4));
    }
}
