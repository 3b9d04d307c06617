//! Transport Constants
//!
//! GATT identifiers are the 16-bit UUIDs the deployed clients look up. The
//! service reuses the Health Thermometer service number.

// ===== GATT IDENTIFIERS =====

/// Primary service UUID.
pub const SERVICE_UUID: u16 = 0x1809;

/// Live reading characteristic (read, notify).
pub const LIVE_CHAR_UUID: u16 = 0x2A1C;

/// Log data characteristic (notify).
pub const LOG_DATA_CHAR_UUID: u16 = 0x2A1D;

/// Configuration characteristic (read, write, notify).
pub const CONFIG_CHAR_UUID: u16 = 0x2A1E;

/// Log control characteristic (write, notify).
pub const LOG_CONTROL_CHAR_UUID: u16 = 0x2A1F;

/// Advertised device name.
pub const DEVICE_NAME: &str = "Beacon_ESP32";

// ===== PAYLOAD SIZING =====

/// Default payload capacity of one log data notification (bytes).
///
/// Matches a 259 byte ATT MTU minus the 3 byte notification header.
pub const DEFAULT_PACKET_CAPACITY: usize = 256;

/// Largest control or live message the beacon ever sends or accepts (bytes).
pub const MAX_MESSAGE_SIZE: usize = 64;

// ===== FLOW CONTROL =====

/// Delay between pushed log packets (milliseconds).
///
/// Keeps the host stack's outstanding-notification queue from overflowing
/// on slow links; each pacing tick is also where Stop/Clear take effect.
pub const DEFAULT_PACING_MS: u32 = 20;
