//! # Frame Synchronizer
//!
//! Locates protocol payloads inside a captured bit string.
//!
//! Each protocol payload is announced by a 9-bit preamble. Only the first 5
//! preamble bits precede the transmitter's byte grid; the last 4 are the top
//! nibble of the first payload byte. A payload window therefore starts 5 bits
//! after the preamble and spans `8 * N` bits.

use super::framer::BitString;
use super::protocol::{Protocol, PREAMBLE_SKIP_BITS};

/// A protocol payload cut from a capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub protocol: Protocol,
    pub bytes: Vec<u8>,
}

/// Cut the payload for `protocol` out of `bits`
///
/// Uses the first occurrence of the protocol preamble only.
///
/// # Returns
///
/// * `Option<Vec<u8>>` - Packed payload, or `None` if the preamble is absent
///   or fewer than `8 * N` bits follow it
pub fn find_payload(bits: &BitString, protocol: Protocol) -> Option<Vec<u8>> {
    let start = bits.find(protocol.preamble())? + PREAMBLE_SKIP_BITS;
    let end = start + protocol.payload_size() * 8;

    let window = bits.as_str().get(start..end)?;
    Some(pack_bits(window))
}

/// Cut every protocol payload present in `bits`
///
/// Base station and outdoor cluster bursts may share one capture; the base
/// station payload comes first in the result.
pub fn synchronize(bits: &BitString) -> Vec<Payload> {
    Protocol::ALL
        .iter()
        .filter_map(|&protocol| {
            find_payload(bits, protocol).map(|bytes| Payload { protocol, bytes })
        })
        .collect()
}

/// Pack `'0'`/`'1'` characters into big-endian bytes, 8 per byte
///
/// A trailing partial group fills the high bits of the last byte and is
/// padded with zeros, matching how the receiver transmits it.
pub fn pack_bits(bits: &str) -> Vec<u8> {
    bits.as_bytes()
        .chunks(8)
        .map(|group| {
            let byte = group
                .iter()
                .fold(0u8, |byte, &bit| (byte << 1) | u8::from(bit == b'1'));
            byte << (8 - group.len())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::encoder::capture_bits;

    fn bits(text: &str) -> BitString {
        BitString::from_bytes(&pack_bits(text), text.len())
    }

    #[test]
    fn test_pack_bits() {
        assert_eq!(pack_bits("1010010111110000"), vec![0xA5, 0xF0]);
        assert_eq!(pack_bits(""), Vec::<u8>::new());
    }

    #[test]
    fn test_pack_bits_partial_group_is_left_aligned() {
        assert_eq!(pack_bits("1"), vec![0x80]);
        assert_eq!(pack_bits("101"), vec![0xA0]);
        assert_eq!(pack_bits("111111111"), vec![0xFF, 0x80]);
    }

    #[test]
    fn test_pack_then_render_keeps_every_bit() {
        let text = "1010011101";
        assert_eq!(bits(text).as_str(), text);
    }

    #[test]
    fn test_no_preamble() {
        let capture = bits(&"0".repeat(400));
        assert_eq!(find_payload(&capture, Protocol::BaseStation), None);
        assert!(synchronize(&capture).is_empty());
    }

    #[test]
    fn test_outdoor_payload_found() {
        let mut payload = vec![0xC5; 14];
        payload[13] = 0x42;
        let capture = bits(&capture_bits(Protocol::OutdoorCluster, &payload));

        assert_eq!(find_payload(&capture, Protocol::OutdoorCluster), Some(payload));
    }

    #[test]
    fn test_base_station_payload_found() {
        let mut payload = vec![0x00; 37];
        payload[0] = 0xE3;
        payload[36] = 0x99;
        let capture = bits(&capture_bits(Protocol::BaseStation, &payload));

        let found = synchronize(&capture);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].protocol, Protocol::BaseStation);
        assert_eq!(found[0].bytes, payload);
    }

    #[test]
    fn test_one_bit_short_is_skipped() {
        let payload = vec![0xC0; 14];
        let mut text = capture_bits(Protocol::OutdoorCluster, &payload);
        text.pop();
        let capture = bits(&text);

        assert_eq!(find_payload(&capture, Protocol::OutdoorCluster), None);
    }

    #[test]
    fn test_exact_length_with_trailing_bits() {
        let payload = vec![0xC0; 14];
        let mut text = capture_bits(Protocol::OutdoorCluster, &payload);
        text.push_str("111");
        let capture = bits(&text);

        assert_eq!(find_payload(&capture, Protocol::OutdoorCluster), Some(payload));
    }

    #[test]
    fn test_both_protocols_in_one_capture() {
        let mut base = vec![0x00; 37];
        base[0] = 0xE0;
        let outdoor = {
            let mut bytes = vec![0x00; 14];
            bytes[0] = 0xC0;
            bytes
        };

        let mut text = capture_bits(Protocol::BaseStation, &base);
        text.push_str(&capture_bits(Protocol::OutdoorCluster, &outdoor));
        let capture = bits(&text);

        let found = synchronize(&capture);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].protocol, Protocol::BaseStation);
        assert_eq!(found[0].bytes, base);
        assert_eq!(found[1].protocol, Protocol::OutdoorCluster);
        assert_eq!(found[1].bytes, outdoor);
    }
}
