//! # Error Types
//!
//! Custom error types for Weather Bridge using `thiserror`.

use thiserror::Error;

use crate::radio::protocol::Protocol;

/// Main error type for Weather Bridge
#[derive(Debug, Error)]
pub enum WeatherBridgeError {
    /// Transport line failed framing, length or line CRC checks
    #[error("Invalid serial message: {0}")]
    MalformedLine(String),

    /// Payload device code belongs to some other transmitter
    #[error("{protocol} payload has foreign device code 0x{code:X}")]
    WrongDevice { protocol: Protocol, code: u32 },

    /// Payload buffer does not have the protocol's fixed length
    #[error("{protocol} payload must be {expected} bytes, got {actual}")]
    PayloadLength {
        protocol: Protocol,
        expected: usize,
        actual: usize,
    },

    /// Payload self-check CRC did not reduce to zero
    #[error("Invalid {protocol} CRC: remainder 0x{remainder:02X}")]
    PayloadChecksum { protocol: Protocol, remainder: u8 },

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate devices could be opened
    #[error("No receiver found on: {0}")]
    SerialPortNotFound(String),

    /// Collaborator (storage, tasks, live feed) errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Weather Bridge
pub type Result<T> = std::result::Result<T, WeatherBridgeError>;
