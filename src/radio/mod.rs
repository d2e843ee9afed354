//! # Radio Decoding Module
//!
//! Decoding of the 433 MHz weather sensor bursts reported by the receiver.
//!
//! This module handles:
//! - CRC-8 line and payload checksums
//! - Framing of receiver lines into captured bit strings
//! - Preamble search and payload packing
//! - Field extraction for the base station and outdoor cluster transmitters

pub mod protocol;
pub mod crc;
pub mod framer;
pub mod sync;
pub mod decoder;
pub mod encoder;
