//! Persistent Storage Layout
//!
//! The log window is mirrored to flash as a single blob. The blob length
//! encodes the record count, so there is no separate count key that could
//! disagree with the data:
//!
//! ```text
//! ┌────┬────┬─────────┬─────────────┬──────────────────────────────┐
//! │ 'T'│ 'H'│ version │ record size │ record 0 │ record 1 │ ...    │
//! └────┴────┴─────────┴─────────────┴──────────────────────────────┘
//!   0    1      2           3          4 ..   (count × 16 bytes)
//!
//! count = (blob_len - LOG_HEADER_SIZE) / PERSISTED_RECORD_SIZE
//! ```

// ===== LOG WINDOW =====

/// Default number of records retained by the log window.
///
/// 100 records × 16 bytes = 1.6KB of flash per rewrite, small enough for a
/// single NVS blob page set on ESP32.
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// Namespace holding the log window blob.
pub const LOG_NAMESPACE: &str = "log_data";

/// Key of the log window blob.
pub const LOG_ENTRIES_KEY: &str = "entries";

/// Magic bytes opening a persisted log blob.
pub const LOG_MAGIC: [u8; 2] = *b"TH";

/// Persisted layout version.
pub const LOG_LAYOUT_VERSION: u8 = 1;

/// Size of the blob header.
pub const LOG_HEADER_SIZE: usize = 4;

/// Size of one record in the persisted layout (f32 + f32 + u64, little-endian).
pub const PERSISTED_RECORD_SIZE: usize = 16;

// ===== DEVICE CONFIGURATION =====

/// Namespace holding device configuration.
pub const CONFIG_NAMESPACE: &str = "storage";

/// Key of the encoded `SensorConfig`.
pub const CONFIG_KEY: &str = "sensor_cfg";
