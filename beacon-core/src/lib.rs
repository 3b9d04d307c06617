//! Log transfer core for a BLE temperature/humidity beacon
//!
//! Keeps the last `N` samples in a bounded, flash-mirrored window and lets a
//! connected client drain it in paced packets over a notify-only channel.
//! Designed for edge devices with limited resources.
//!
//! Key constraints:
//! - Runs on an ESP32-class part next to a BLE stack
//! - Log window lives in a fixed array, no per-sample allocation
//! - Wire format stays compatible with deployed protobuf clients
//!
//! ```
//! use beacon_core::constants::DEFAULT_LOG_CAPACITY;
//! use beacon_core::{
//!     Beacon, BeaconConfig, Channel, ControlMessage, FixedTime, MemoryKvStore,
//!     Notifier, SensorDriver, SensorError, TransportError, codec,
//! };
//!
//! struct Link(Vec<(Channel, Vec<u8>)>);
//! impl Notifier for Link {
//!     fn notify(&mut self, channel: Channel, payload: &[u8]) -> Result<(), TransportError> {
//!         self.0.push((channel, payload.to_vec()));
//!         Ok(())
//!     }
//!     fn is_connected(&self) -> bool { true }
//! }
//!
//! struct Sht;
//! impl SensorDriver for Sht {
//!     fn read_sample(&mut self) -> Result<(f32, f32), SensorError> { Ok((21.5, 48.0)) }
//! }
//!
//! let mut beacon: Beacon<_, DEFAULT_LOG_CAPACITY> =
//!     Beacon::new(MemoryKvStore::new(), BeaconConfig::default()).unwrap();
//! let mut link = Link(Vec::new());
//! let clock = FixedTime::new(0);
//!
//! for _ in 0..3 {
//!     beacon.on_tick(&mut Sht, &clock, &mut link).unwrap();
//!     clock.advance(60_000);
//! }
//!
//! let start = codec::encode(&ControlMessage::Start.to_frame()).unwrap();
//! beacon.on_write(Channel::LogControl, &start, &mut link).unwrap();
//! while beacon.poll_transfer(&mut link).is_ok() && beacon.transfer().is_streaming() {}
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

#[macro_use]
mod logging;

pub mod beacon;
pub mod codec;
pub mod constants;
pub mod control;
pub mod errors;
pub mod kv;
pub mod packetizer;
pub mod record;
pub mod settings;
pub mod sink;
pub mod store;
pub mod time;
pub mod transfer;
pub mod transport;
pub mod window;

// Public API
pub use beacon::{Beacon, ReadPayload};
pub use codec::{DelimitedRecords, WireMessage};
pub use control::{Command, ControlFrame, ControlMessage};
pub use errors::{
    AccessError, BeaconError, BeaconResult, SensorError, StorageError, TransportError,
};
pub use kv::{KeyValueStore, MemoryKvStore};
#[cfg(feature = "std")]
pub use kv::FileKvStore;
pub use packetizer::{fill, fill_until, Fill, RecordSource};
pub use record::{LogRecord, SensorReading};
pub use settings::{BeaconConfig, SensorConfig};
pub use sink::{LiveSampleSink, Sampler};
pub use store::LogStore;
pub use time::{FixedTime, MonotonicClock, TimeSource, Timestamp};
#[cfg(feature = "std")]
pub use time::SystemTime;
pub use transfer::{LogTransfer, TransferProgress, TransferState};
pub use transport::{Channel, Notifier, SensorDriver};
pub use window::RecordWindow;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
