//! Constants for the Beacon Log Transfer core
//!
//! Every magic number the beacon shares with its clients or its flash layout
//! lives here. Values that appear on the wire or in persisted blobs are part
//! of the compatibility contract: changing them breaks deployed clients or
//! orphans stored logs.
//!
//! ## Organization
//!
//! - **Storage**: key-value namespaces, keys and the persisted blob layout
//! - **Transport**: GATT UUIDs, payload sizes and pacing
//! - **Time**: unit conversions and sampling defaults

/// Key-value namespaces, keys, and persisted layout.
pub mod storage;

/// GATT identifiers and link sizing.
pub mod transport;

/// Time conversions and sampling defaults.
pub mod time;

// Re-export commonly used constants for convenience
pub use storage::{
    DEFAULT_LOG_CAPACITY, LOG_NAMESPACE, LOG_ENTRIES_KEY,
    CONFIG_NAMESPACE, CONFIG_KEY,
};

pub use transport::{
    DEFAULT_PACKET_CAPACITY, DEFAULT_PACING_MS, DEVICE_NAME, SERVICE_UUID,
};

pub use time::{
    MS_PER_SECOND, DEFAULT_SAMPLE_INTERVAL_SECS,
};
