//! Configuration
//!
//! Two layers:
//!
//! - [`SensorConfig`]: device settings a client can change over the air and
//!   that survive a reboot (`storage/sensor_cfg`, protobuf encoded).
//! - [`BeaconConfig`]: host-side tuning fixed at start-up (packet size,
//!   pacing, fallback interval). Loadable from JSON on `std` hosts.

use crate::codec::{self, varint_field_len, WireMessage, WireValue, WireWriter};
use crate::constants::storage::{CONFIG_KEY, CONFIG_NAMESPACE};
use crate::constants::time::{DEFAULT_SAMPLE_INTERVAL_SECS, MIN_SAMPLE_INTERVAL_SECS};
use crate::constants::transport::{DEFAULT_PACING_MS, DEFAULT_PACKET_CAPACITY};
use crate::errors::{BeaconError, BeaconResult};
use crate::kv::KeyValueStore;
use crate::record::LogRecord;

const FIELD_INTERVAL: u32 = 1;
const FIELD_LOG_MODE: u32 = 2;
const FIELD_DATE_TIME_INIT: u32 = 3;
const FIELD_DATE_TIME_STOP: u32 = 4;

/// Persisted device configuration
///
/// ```text
/// message SensorConfig {
///     uint64 interval       = 1;   // s
///     uint32 log_mode       = 2;
///     uint32 date_time_init = 3;
///     uint32 date_time_stop = 4;
/// }
/// ```
///
/// `Default` is the all-zero wire default; use [`SensorConfig::load`] or
/// [`SensorConfig::factory`] for a usable configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorConfig {
    /// Sampling interval in seconds; zero means "use the default"
    pub interval: u64,
    /// Logging mode, stored for clients, not interpreted
    pub log_mode: u32,
    /// Logging window start, stored for clients, not interpreted
    pub date_time_init: u32,
    /// Logging window end, stored for clients, not interpreted
    pub date_time_stop: u32,
}

impl SensorConfig {
    /// Configuration of a device that never stored one
    pub const fn factory() -> Self {
        Self {
            interval: DEFAULT_SAMPLE_INTERVAL_SECS,
            log_mode: 0,
            date_time_init: 0,
            date_time_stop: 0,
        }
    }

    /// Read the stored configuration, falling back to [`factory`](Self::factory)
    pub fn load<K: KeyValueStore + ?Sized>(kv: &K) -> Self {
        Self::load_or(kv, Self::factory())
    }

    /// Read the stored configuration, falling back to `fallback`
    pub fn load_or<K: KeyValueStore + ?Sized>(kv: &K, fallback: Self) -> Self {
        match kv.get_blob(CONFIG_NAMESPACE, CONFIG_KEY) {
            Ok(Some(blob)) => match codec::decode::<Self>(&blob) {
                Ok(config) => config,
                Err(e) => {
                    log_warn!("stored config unreadable, using defaults: {}", e);
                    fallback
                }
            },
            Ok(None) => fallback,
            Err(e) => {
                log_warn!("config namespace unreadable, using defaults: {}", e);
                fallback
            }
        }
    }

    /// Persist this configuration
    pub fn save<K: KeyValueStore + ?Sized>(&self, kv: &mut K) -> BeaconResult<()> {
        let blob = codec::encode(self)?;
        kv.set_blob(CONFIG_NAMESPACE, CONFIG_KEY, &blob)?;
        log_debug!("config saved, interval {}s", self.interval);
        Ok(())
    }

    /// Change the sampling interval
    ///
    /// Intervals below one second would stall the sampling timer and are
    /// rejected without changing anything.
    pub fn set_interval(&mut self, interval: u64) -> BeaconResult<()> {
        if interval < MIN_SAMPLE_INTERVAL_SECS {
            return Err(BeaconError::format("sampling interval must be at least 1s"));
        }
        self.interval = interval;
        Ok(())
    }
}

impl WireMessage for SensorConfig {
    const MAX_ENCODED_LEN: usize = (1 + codec::MAX_VARINT_LEN) + 3 * (1 + 5);

    fn encoded_len(&self) -> usize {
        varint_field_len(self.interval)
            + varint_field_len(self.log_mode as u64)
            + varint_field_len(self.date_time_init as u64)
            + varint_field_len(self.date_time_stop as u64)
    }

    fn encode_fields(&self, out: &mut WireWriter<'_>) -> BeaconResult<()> {
        out.varint_field(FIELD_INTERVAL, self.interval)?;
        out.varint_field(FIELD_LOG_MODE, self.log_mode as u64)?;
        out.varint_field(FIELD_DATE_TIME_INIT, self.date_time_init as u64)?;
        out.varint_field(FIELD_DATE_TIME_STOP, self.date_time_stop as u64)
    }

    fn merge_field(&mut self, field: u32, value: WireValue<'_>) -> BeaconResult<()> {
        match field {
            FIELD_INTERVAL => self.interval = value.as_u64()?,
            FIELD_LOG_MODE => self.log_mode = value.as_u32()?,
            FIELD_DATE_TIME_INIT => self.date_time_init = value.as_u32()?,
            FIELD_DATE_TIME_STOP => self.date_time_stop = value.as_u32()?,
            _ => {}
        }
        Ok(())
    }
}

/// Host-side beacon tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BeaconConfig {
    /// Upper bound on one log data notification (bytes)
    pub packet_capacity: usize,
    /// Delay between pushed log packets (milliseconds)
    pub pacing_ms: u32,
    /// Sampling interval when no device configuration is stored (seconds)
    pub default_sample_interval_secs: u64,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            packet_capacity: DEFAULT_PACKET_CAPACITY,
            pacing_ms: DEFAULT_PACING_MS,
            default_sample_interval_secs: DEFAULT_SAMPLE_INTERVAL_SECS,
        }
    }
}

impl BeaconConfig {
    /// Set the packet capacity
    pub fn with_packet_capacity(mut self, bytes: usize) -> Self {
        self.packet_capacity = bytes;
        self
    }

    /// Set the pacing delay
    pub fn with_pacing_ms(mut self, ms: u32) -> Self {
        self.pacing_ms = ms;
        self
    }

    /// Set the fallback sampling interval
    pub fn with_default_sample_interval(mut self, secs: u64) -> Self {
        self.default_sample_interval_secs = secs;
        self
    }

    /// Check the values can drive a beacon
    pub fn validate(&self) -> BeaconResult<()> {
        let smallest_packet = LogRecord::MAX_ENCODED_LEN + 1;
        if self.packet_capacity < smallest_packet {
            return Err(BeaconError::Capacity {
                required: smallest_packet,
                available: self.packet_capacity,
            });
        }
        if self.pacing_ms == 0 {
            return Err(BeaconError::format("pacing must be at least 1ms"));
        }
        if self.default_sample_interval_secs < MIN_SAMPLE_INTERVAL_SECS {
            return Err(BeaconError::format("sampling interval must be at least 1s"));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration; missing fields keep defaults
    #[cfg(feature = "std")]
    pub fn from_json(json: &str) -> BeaconResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            log_error!("invalid beacon config: {}", e);
            BeaconError::format("invalid beacon config json")
        })?;
        config.validate()?;
        Ok(config)
    }
}
