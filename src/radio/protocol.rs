//! # Protocol Constants and Types
//!
//! Wire layouts for the two weather transmitters and the normalized
//! [`SensorReading`] they decode into.
//!
//! ## Base station (37 bytes)
//!
//! | Byte(s) | Content |
//! |---------|---------|
//! | 0 | header nibble, serial high nibble |
//! | 1 | serial low nibble, flags |
//! | 2 | MSB extension bits for bytes 3..9 (bit 0 -> byte 3, ...) |
//! | 3, 4, 5 | wind average, gust, direction (9 bit) |
//! | 6..9 | unverified 9-bit fields |
//! | 10..23 | rain rate, 1h, 24h, week, month, total, total (dup), 16 bit each |
//! | 24 | indoor temperature high nibble, outdoor temperature high nibble |
//! | 25, 26 | outdoor temperature low byte, outdoor humidity |
//! | 27, 28 | indoor temperature low byte, indoor humidity |
//! | 29..32 | absolute and relative pressure, 16 bit each |
//! | 33..35 | illuminance (16 bit), uv |
//! | 36 | check byte |
//!
//! ## Outdoor cluster (14 bytes)
//!
//! | Byte(s) | Content |
//! |---------|---------|
//! | 0 | device nibble (0xC), serial high nibble |
//! | 1 | serial low nibble, flags (bits 0..2 are MSB extensions for bytes 2..4) |
//! | 2, 3, 4 | wind average, gust, direction (9 bit) |
//! | 5, 6 | cumulative rain (16 bit) |
//! | 7 | second flags (bit 7 is illuminance bit 16), temperature high nibble |
//! | 8, 9 | temperature low byte, humidity |
//! | 10, 11 | illuminance low 16 bits |
//! | 12 | uv |
//! | 13 | check byte |

use serde::Serialize;
use std::fmt;

/// Sync pattern that precedes a base station payload
pub const BASE_STATION_PREAMBLE: &str = "101001110";

/// Sync pattern that precedes an outdoor cluster payload
pub const OUTDOOR_CLUSTER_PREAMBLE: &str = "101001100";

/// Preamble bits that lie before the transmitter's first payload byte
pub const PREAMBLE_SKIP_BITS: usize = 5;

/// Base station payload size in bytes
pub const BASE_STATION_PAYLOAD_SIZE: usize = 37;

/// Outdoor cluster payload size in bytes
pub const OUTDOOR_CLUSTER_PAYLOAD_SIZE: usize = 14;

/// Device nibble carried by every outdoor cluster payload
pub const OUTDOOR_CLUSTER_DEVICE_CODE: u32 = 0x0C;

/// The two transmitter families understood by the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Indoor base station relaying its own and the outdoor sensors
    BaseStation,
    /// Standalone outdoor sensor cluster
    OutdoorCluster,
}

impl Protocol {
    /// All protocols, in the order a capture is searched
    pub const ALL: [Protocol; 2] = [Protocol::BaseStation, Protocol::OutdoorCluster];

    /// Preamble bit pattern for this protocol
    pub fn preamble(self) -> &'static str {
        match self {
            Protocol::BaseStation => BASE_STATION_PREAMBLE,
            Protocol::OutdoorCluster => OUTDOOR_CLUSTER_PREAMBLE,
        }
    }

    /// Fixed payload length in bytes, check byte included
    pub fn payload_size(self) -> usize {
        match self {
            Protocol::BaseStation => BASE_STATION_PAYLOAD_SIZE,
            Protocol::OutdoorCluster => OUTDOOR_CLUSTER_PAYLOAD_SIZE,
        }
    }

    /// Field layout used to decode this protocol
    pub fn layout(self) -> &'static Layout {
        match self {
            Protocol::BaseStation => &BASE_STATION_LAYOUT,
            Protocol::OutdoorCluster => &OUTDOOR_CLUSTER_LAYOUT,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::BaseStation => f.write_str("base-station"),
            Protocol::OutdoorCluster => f.write_str("outdoor-cluster"),
        }
    }
}

/// Normalized weather reading
///
/// Every value has already been sentinel-checked and scaled; `None` means
/// the sensor reported "no data".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SensorReading {
    /// Indoor relative humidity in %
    pub hum_in: Option<f64>,

    /// Indoor temperature in °C
    pub temp_in: Option<f64>,

    /// Outdoor relative humidity in %
    pub hum_out: Option<f64>,

    /// Outdoor temperature in °C
    pub temp_out: Option<f64>,

    /// Absolute pressure in hPa
    pub abs_pressure: Option<f64>,

    /// Average wind speed in m/s
    pub wind_ave: Option<f64>,

    /// Wind gust in m/s
    pub wind_gust: Option<f64>,

    /// Wind direction as compass sector 0-15 (0 = N, 4 = E, 8 = S)
    pub wind_dir: Option<u8>,

    /// Cumulative rain in mm
    pub rain: Option<f64>,

    /// Illuminance in lux
    pub illuminance: Option<f64>,

    /// UV index
    pub uv: Option<f64>,

    /// Always 0
    pub delay: u8,

    /// Always 0
    pub status: u8,
}

impl SensorReading {
    /// Set the output slot `output` to an already converted value
    pub fn set(&mut self, output: Output, value: Option<f64>) {
        match output {
            Output::HumIn => self.hum_in = value,
            Output::TempIn => self.temp_in = value,
            Output::HumOut => self.hum_out = value,
            Output::TempOut => self.temp_out = value,
            Output::AbsPressure => self.abs_pressure = value,
            Output::WindAve => self.wind_ave = value,
            Output::WindGust => self.wind_gust = value,
            Output::WindDir => self.wind_dir = value.map(|sector| sector as u8),
            Output::Rain => self.rain = value,
            Output::Illuminance => self.illuminance = value,
            Output::Uv => self.uv = value,
        }
    }
}

/// Output slot of a [`SensorReading`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    HumIn,
    TempIn,
    HumOut,
    TempOut,
    AbsPressure,
    WindAve,
    WindGust,
    WindDir,
    Rain,
    Illuminance,
    Uv,
}

/// Where a raw value lives inside a payload
#[derive(Debug, Clone, Copy)]
pub enum Field {
    /// One whole byte
    Byte(usize),

    /// Masked bits of one byte, shifted down by `shift`
    Bits { byte: usize, mask: u8, shift: u8 },

    /// Big-endian 16-bit pair starting at the index
    Word(usize),

    /// 9-bit value: `low` byte plus bit `bit` of the extension byte `ext` as bit 8
    Extended { low: usize, ext: usize, bit: u8 },

    /// 17-bit value: 16-bit `word` plus bit `bit` of byte `ext` as bit 16
    Wide { word: usize, ext: usize, bit: u8 },

    /// 12-bit value: a nibble of byte `nibble` as bits 8..12, then byte `low`
    Split12 { nibble: usize, high: bool, low: usize },

    /// Value computed by a layout specific function
    Derived(fn(&[u8]) -> u32),
}

impl Field {
    /// Read the raw value from `payload`
    ///
    /// The caller guarantees `payload` has the layout's full length.
    pub fn extract(&self, payload: &[u8]) -> u32 {
        let at = |index: usize| payload[index] as u32;

        match *self {
            Field::Byte(index) => at(index),
            Field::Bits { byte, mask, shift } => (at(byte) & mask as u32) >> shift,
            Field::Word(index) => (at(index) << 8) | at(index + 1),
            Field::Extended { low, ext, bit } => at(low) | (((at(ext) >> bit) & 1) << 8),
            Field::Wide { word, ext, bit } => {
                (at(word) << 8) | at(word + 1) | (((at(ext) >> bit) & 1) << 16)
            }
            Field::Split12 { nibble, high, low } => {
                let upper = if high { at(nibble) >> 4 } else { at(nibble) & 0x0F };
                (upper << 8) | at(low)
            }
            Field::Derived(compute) => compute(payload),
        }
    }
}

/// Conversion from a raw code to engineering units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// Raw value as is
    Raw,
    /// Raw value × 0.1
    Tenths,
    /// Tenths of °F offset by 40 °F, converted to °C rounded to 0.1
    Temperature,
    /// Degrees to a 16-point compass sector
    Sector,
}

impl Conversion {
    pub fn apply(self, raw: u32) -> f64 {
        let raw = raw as f64;
        match self {
            Conversion::Raw => raw,
            Conversion::Tenths => raw * 0.1,
            Conversion::Temperature => round_tenths((((raw - 400.0) / 10.0) - 32.0) / 1.8),
            Conversion::Sector => ((raw / 22.5).floor() as u32 % 16) as f64,
        }
    }
}

fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// A raw field together with its "no data" codes and unit conversion
#[derive(Debug, Clone, Copy)]
pub struct Channel {
    pub field: Field,
    pub sentinels: &'static [u32],
    pub conversion: Conversion,
}

impl Channel {
    pub const fn new(field: Field, conversion: Conversion) -> Self {
        Self {
            field,
            sentinels: &[],
            conversion,
        }
    }

    pub const fn with_sentinels(
        field: Field,
        sentinels: &'static [u32],
        conversion: Conversion,
    ) -> Self {
        Self {
            field,
            sentinels,
            conversion,
        }
    }

    /// Extract the raw code and normalize it
    ///
    /// # Returns
    ///
    /// * `(u32, Option<f64>)` - raw code, and the converted value or `None` for a sentinel
    pub fn read(&self, payload: &[u8]) -> (u32, Option<f64>) {
        let raw = self.field.extract(payload);
        if self.sentinels.contains(&raw) {
            (raw, None)
        } else {
            (raw, Some(self.conversion.apply(raw)))
        }
    }
}

/// Decoding description of one protocol
#[derive(Debug)]
pub struct Layout {
    pub protocol: Protocol,

    /// Device code field and the value it must hold, if the protocol has one
    pub device: Option<(Field, u32)>,

    /// Fields that populate the reading; outputs not listed stay absent
    pub outputs: &'static [(Output, Channel)],

    /// Fields extracted only for diagnostics
    pub diagnostics: &'static [(&'static str, Channel)],
}

const HUMIDITY_SENTINELS: &[u32] = &[0xFB];
const RAIN_SENTINELS: &[u32] = &[0xFFFB];
const WIND_SENTINELS: &[u32] = &[0x1FB];

/// Serial id of an outdoor cluster as the observed firmware decoder computes it
///
/// The nibbles are combined with `%` and `&` where a shift and `|` look
/// intended. The value is kept for diagnostics only and is not covered by
/// any check, so it stays a placeholder until verified against hardware.
pub fn outdoor_serial_placeholder(payload: &[u8]) -> u32 {
    let high = ((payload[0] & 0x0F) as u32) << 4;
    let low = ((payload[1] as u32) % 0xF0) >> 4;
    high & low
}

/// Raw diagnostic over masked bits of one byte
const fn bit_field(byte: usize, mask: u8, shift: u8) -> Channel {
    Channel::new(Field::Bits { byte, mask, shift }, Conversion::Raw)
}

fn base_station_serial(payload: &[u8]) -> u32 {
    (((payload[0] & 0x0F) as u32) << 4) | ((payload[1] & 0xF0) as u32 >> 4)
}

#[rustfmt::skip]
pub static BASE_STATION_LAYOUT: Layout = Layout {
    protocol: Protocol::BaseStation,
    device: None,
    outputs: &[
        (Output::HumIn, Channel::new(Field::Byte(28), Conversion::Raw)),
        (
            Output::TempIn,
            Channel::new(
                Field::Split12 { nibble: 24, high: true, low: 27 },
                Conversion::Temperature,
            ),
        ),
        (
            Output::HumOut,
            Channel::with_sentinels(Field::Byte(26), HUMIDITY_SENTINELS, Conversion::Raw),
        ),
        (
            Output::TempOut,
            Channel::with_sentinels(
                Field::Split12 { nibble: 24, high: false, low: 25 },
                &[0x7FB],
                Conversion::Temperature,
            ),
        ),
        (Output::AbsPressure, Channel::new(Field::Word(29), Conversion::Tenths)),
        (
            Output::WindAve,
            Channel::with_sentinels(
                Field::Extended { low: 3, ext: 2, bit: 0 },
                WIND_SENTINELS,
                Conversion::Tenths,
            ),
        ),
        (
            Output::WindGust,
            Channel::new(Field::Extended { low: 4, ext: 2, bit: 1 }, Conversion::Tenths),
        ),
        (
            Output::WindDir,
            Channel::with_sentinels(
                Field::Extended { low: 5, ext: 2, bit: 2 },
                WIND_SENTINELS,
                Conversion::Sector,
            ),
        ),
        (
            Output::Rain,
            Channel::with_sentinels(Field::Word(20), RAIN_SENTINELS, Conversion::Tenths),
        ),
        // Illuminance and uv stay absent: the base station has no working light sensor.
    ],
    diagnostics: &[
        ("header", bit_field(0, 0xF0, 4)),
        ("serial", Channel::new(Field::Derived(base_station_serial), Conversion::Raw)),
        ("flags", bit_field(1, 0x0F, 0)),
        ("battery_low", bit_field(1, 0x08, 3)),
        ("unknown6", Channel::new(Field::Extended { low: 6, ext: 2, bit: 3 }, Conversion::Raw)),
        ("unknown7", Channel::new(Field::Extended { low: 7, ext: 2, bit: 4 }, Conversion::Raw)),
        ("unknown8", Channel::new(Field::Extended { low: 8, ext: 2, bit: 5 }, Conversion::Raw)),
        ("unknown9", Channel::new(Field::Extended { low: 9, ext: 2, bit: 6 }, Conversion::Raw)),
        ("rain_rate", Channel::new(Field::Word(10), Conversion::Tenths)),
        ("rain_1h", Channel::new(Field::Word(12), Conversion::Tenths)),
        ("rain_24h", Channel::new(Field::Word(14), Conversion::Tenths)),
        ("rain_week", Channel::new(Field::Word(16), Conversion::Tenths)),
        ("rain_month", Channel::new(Field::Word(18), Conversion::Tenths)),
        ("rain_total2", Channel::new(Field::Word(22), Conversion::Raw)),
        ("pressure_rel", Channel::new(Field::Word(31), Conversion::Tenths)),
        (
            "illuminance",
            Channel::with_sentinels(Field::Word(33), &[0xFFFB, 0xFFFA], Conversion::Raw),
        ),
        ("uv", Channel::with_sentinels(Field::Byte(35), &[0xFA], Conversion::Raw)),
    ],
};

#[rustfmt::skip]
pub static OUTDOOR_CLUSTER_LAYOUT: Layout = Layout {
    protocol: Protocol::OutdoorCluster,
    device: Some((
        Field::Bits { byte: 0, mask: 0xF0, shift: 4 },
        OUTDOOR_CLUSTER_DEVICE_CODE,
    )),
    outputs: &[
        // No indoor sensors: hum_in, temp_in and abs_pressure stay absent.
        (
            Output::HumOut,
            Channel::with_sentinels(Field::Byte(9), HUMIDITY_SENTINELS, Conversion::Raw),
        ),
        (
            Output::TempOut,
            Channel::new(
                Field::Split12 { nibble: 7, high: false, low: 8 },
                Conversion::Temperature,
            ),
        ),
        (
            Output::WindAve,
            Channel::new(Field::Extended { low: 2, ext: 1, bit: 0 }, Conversion::Tenths),
        ),
        (
            Output::WindGust,
            Channel::new(Field::Extended { low: 3, ext: 1, bit: 1 }, Conversion::Tenths),
        ),
        (
            Output::WindDir,
            Channel::new(Field::Extended { low: 4, ext: 1, bit: 2 }, Conversion::Sector),
        ),
        (
            Output::Rain,
            Channel::with_sentinels(Field::Word(5), RAIN_SENTINELS, Conversion::Tenths),
        ),
        (
            Output::Illuminance,
            Channel::with_sentinels(
                Field::Wide { word: 10, ext: 7, bit: 7 },
                &[0x1FFFB],
                Conversion::Raw,
            ),
        ),
        (Output::Uv, Channel::with_sentinels(Field::Byte(12), &[0xFB], Conversion::Raw)),
    ],
    diagnostics: &[
        (
            "serial",
            Channel::new(Field::Derived(outdoor_serial_placeholder), Conversion::Raw),
        ),
        ("flags", bit_field(1, 0x0F, 0)),
        ("battery_low", bit_field(1, 0x08, 3)),
        ("second_flags", bit_field(7, 0xF0, 4)),
    ],
};
