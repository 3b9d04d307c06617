//! Sensor Records
//!
//! Two message shapes share the `SensorData` schema:
//!
//! - [`LogRecord`]: one retained sample (fields 1-3). This is what the log
//!   window stores and what log packets carry.
//! - [`SensorReading`]: a live sample plus the active sampling interval
//!   (fields 1-4). Sent on the live and config characteristics.
//!
//! ```text
//! message SensorData {
//!     float  temperature = 1;   // °C
//!     float  humidity    = 2;   // %RH
//!     uint64 timestamp   = 3;   // ms since boot
//!     uint64 interval    = 4;   // s, zero in log records
//! }
//! ```
//!
//! Log records also have a fixed 16 byte little-endian layout used only for
//! the persisted window (see `constants::storage`).

use crate::codec::{
    f32_field_len, varint_field_len, WireMessage, WireValue, WireWriter, MAX_VARINT_LEN,
};
use crate::constants::storage::PERSISTED_RECORD_SIZE;
use crate::errors::{BeaconError, BeaconResult};
use crate::time::Timestamp;

const FIELD_TEMPERATURE: u32 = 1;
const FIELD_HUMIDITY: u32 = 2;
const FIELD_TIMESTAMP: u32 = 3;
const FIELD_INTERVAL: u32 = 4;

/// One timestamped temperature/humidity sample
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogRecord {
    /// Temperature in °C
    pub temperature: f32,
    /// Relative humidity in %
    pub humidity: f32,
    /// Milliseconds since boot when the sample was taken
    pub timestamp: Timestamp,
}

impl LogRecord {
    /// All-zero record, used to initialise storage slots
    pub const ZERO: Self = Self { temperature: 0.0, humidity: 0.0, timestamp: 0 };

    /// Create a record
    pub const fn new(temperature: f32, humidity: f32, timestamp: Timestamp) -> Self {
        Self { temperature, humidity, timestamp }
    }

    /// Fixed-width layout for the persisted window
    pub fn to_le_bytes(&self) -> [u8; PERSISTED_RECORD_SIZE] {
        let mut buf = [0u8; PERSISTED_RECORD_SIZE];
        buf[0..4].copy_from_slice(&self.temperature.to_le_bytes());
        buf[4..8].copy_from_slice(&self.humidity.to_le_bytes());
        buf[8..16].copy_from_slice(&self.timestamp.to_le_bytes());
        buf
    }

    /// Inverse of [`to_le_bytes`](Self::to_le_bytes)
    pub fn from_le_bytes(buf: &[u8]) -> BeaconResult<Self> {
        if buf.len() != PERSISTED_RECORD_SIZE {
            return Err(BeaconError::format("persisted record has wrong size"));
        }
        Ok(Self {
            temperature: f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            humidity: f32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            timestamp: u64::from_le_bytes([
                buf[8], buf[9], buf[10], buf[11], buf[12], buf[13], buf[14], buf[15],
            ]),
        })
    }
}

impl WireMessage for LogRecord {
    const MAX_ENCODED_LEN: usize = (1 + 4) * 2 + 1 + MAX_VARINT_LEN;

    fn encoded_len(&self) -> usize {
        f32_field_len(self.temperature)
            + f32_field_len(self.humidity)
            + varint_field_len(self.timestamp)
    }

    fn encode_fields(&self, out: &mut WireWriter<'_>) -> BeaconResult<()> {
        out.f32_field(FIELD_TEMPERATURE, self.temperature)?;
        out.f32_field(FIELD_HUMIDITY, self.humidity)?;
        out.varint_field(FIELD_TIMESTAMP, self.timestamp)
    }

    fn merge_field(&mut self, field: u32, value: WireValue<'_>) -> BeaconResult<()> {
        match field {
            FIELD_TEMPERATURE => self.temperature = value.as_f32()?,
            FIELD_HUMIDITY => self.humidity = value.as_f32()?,
            FIELD_TIMESTAMP => self.timestamp = value.as_u64()?,
            // interval and anything newer
            _ => {}
        }
        Ok(())
    }
}

/// Live sample as published on the live and config characteristics
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorReading {
    /// The sample itself
    pub record: LogRecord,
    /// Active sampling interval in seconds
    pub interval: u64,
}

impl SensorReading {
    /// Pair a sample with the sampling interval it was taken under
    pub const fn new(record: LogRecord, interval: u64) -> Self {
        Self { record, interval }
    }
}

impl WireMessage for SensorReading {
    const MAX_ENCODED_LEN: usize = LogRecord::MAX_ENCODED_LEN + 1 + MAX_VARINT_LEN;

    fn encoded_len(&self) -> usize {
        self.record.encoded_len() + varint_field_len(self.interval)
    }

    fn encode_fields(&self, out: &mut WireWriter<'_>) -> BeaconResult<()> {
        self.record.encode_fields(out)?;
        out.varint_field(FIELD_INTERVAL, self.interval)
    }

    fn merge_field(&mut self, field: u32, value: WireValue<'_>) -> BeaconResult<()> {
        match field {
            FIELD_INTERVAL => self.interval = value.as_u64()?,
            _ => self.record.merge_field(field, value)?,
        }
        Ok(())
    }
}
