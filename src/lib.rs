//! # Weather Bridge Library
//!
//! Decode 433 MHz weather station telemetry captured by a Manchester receiver.
//!
//! The receiver reports every capture as a checksummed hex line on its serial
//! port. This library turns those lines into bit strings, finds the payloads
//! of the indoor base station and the outdoor sensor cluster, decodes and
//! verifies them, and merges both into one composite reading.

pub mod config;
pub mod error;
pub mod merger;
pub mod radio;
pub mod serial;
pub mod station;
pub mod storage;
