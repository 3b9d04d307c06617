//! Beacon Dispatcher
//!
//! ## Overview
//!
//! [`Beacon`] is the single owner of every piece of mutable state: the log
//! store, the transfer session, the sampler and the device configuration.
//! The platform glue forwards each BLE or timer callback to one method:
//!
//! | Platform callback            | Method                     |
//! |------------------------------|----------------------------|
//! | GAP connect / disconnect     | `on_connect` / `on_disconnect` |
//! | GATT read                    | `on_read`                  |
//! | GATT write                   | `on_write`                 |
//! | sampling timer               | `on_tick`                  |
//! | pacing timer (20 ms)         | `poll_transfer`            |
//!
//! All methods take `&mut self`, so a host that runs callbacks on several
//! threads puts the beacon behind one mutex and the callbacks are serialized.
//!
//! ## Example
//!
//! ```rust
//! use beacon_core::constants::DEFAULT_LOG_CAPACITY;
//! use beacon_core::{Beacon, BeaconConfig, Channel, FixedTime, MemoryKvStore};
//!
//! let beacon: Beacon<_, DEFAULT_LOG_CAPACITY> =
//!     Beacon::new(MemoryKvStore::new(), BeaconConfig::default()).unwrap();
//! assert_eq!(beacon.sample_interval(), 60);
//! assert!(beacon.on_read(Channel::LogData, &FixedTime::new(0)).is_err());
//!
//! // A zero interval would stall the sampling timer
//! let stalled = BeaconConfig::default().with_default_sample_interval(0);
//! assert!(Beacon::<_, 10>::new(MemoryKvStore::new(), stalled).is_err());
//! ```

use heapless::Vec as HVec;

use crate::codec::{self, WireMessage};
use crate::constants::time::MS_PER_SECOND;
use crate::constants::transport::MAX_MESSAGE_SIZE;
use crate::control::ControlMessage;
use crate::errors::{AccessError, BeaconError, BeaconResult};
use crate::kv::KeyValueStore;
use crate::record::{LogRecord, SensorReading};
use crate::settings::{BeaconConfig, SensorConfig};
use crate::sink::{LiveSampleSink, Sampler};
use crate::store::LogStore;
use crate::time::TimeSource;
use crate::transfer::{LogTransfer, TransferProgress};
use crate::transport::{Channel, Notifier, SensorDriver};

/// Payload returned by a characteristic read
pub type ReadPayload = HVec<u8, MAX_MESSAGE_SIZE>;

/// The beacon's log and configuration service
pub struct Beacon<K: KeyValueStore, const N: usize> {
    config: BeaconConfig,
    device: SensorConfig,
    store: LogStore<K, N>,
    transfer: LogTransfer,
    sink: LiveSampleSink,
    sampler: Sampler,
    latest: Option<LogRecord>,
}

impl<K: KeyValueStore, const N: usize> Beacon<K, N> {
    /// Restore the log and device configuration from `kv`
    ///
    /// Fails before reading `kv` when `config` cannot drive a beacon.
    pub fn new(kv: K, config: BeaconConfig) -> BeaconResult<Self> {
        config.validate().map_err(|e| {
            log_error!("beacon config rejected: {}", e);
            e
        })?;
        let store = LogStore::open(kv);
        let fallback = SensorConfig {
            interval: config.default_sample_interval_secs,
            ..SensorConfig::factory()
        };
        let device = SensorConfig::load_or(store.kv(), fallback);
        log_info!(
            "beacon up: {} of {} records, sampling every {}s",
            store.total_count(),
            N,
            device.interval
        );

        Ok(Self {
            transfer: LogTransfer::new(config.packet_capacity),
            config,
            device,
            store,
            sink: LiveSampleSink::new(),
            sampler: Sampler::new(),
            latest: None,
        })
    }

    /// Host tuning
    pub fn config(&self) -> &BeaconConfig {
        &self.config
    }

    /// Device configuration
    pub fn sensor_config(&self) -> &SensorConfig {
        &self.device
    }

    /// The log
    pub fn store(&self) -> &LogStore<K, N> {
        &self.store
    }

    /// The log, mutably
    pub fn store_mut(&mut self) -> &mut LogStore<K, N> {
        &mut self.store
    }

    /// Transfer state machine
    pub fn transfer(&self) -> &LogTransfer {
        &self.transfer
    }

    /// Live sink counters
    pub fn sink(&self) -> &LiveSampleSink {
        &self.sink
    }

    /// Sensor sampler
    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }

    /// Most recent sample
    pub fn latest(&self) -> Option<LogRecord> {
        self.latest
    }

    /// Interval the sampling timer must use, in seconds
    pub fn sample_interval(&self) -> u64 {
        if self.device.interval == 0 {
            self.config.default_sample_interval_secs
        } else {
            self.device.interval
        }
    }

    /// [`sample_interval`](Self::sample_interval) in milliseconds, for timer APIs
    pub fn sample_interval_ms(&self) -> u64 {
        self.sample_interval() * MS_PER_SECOND
    }

    /// Delay between `poll_transfer` calls, in milliseconds
    pub fn pacing_ms(&self) -> u32 {
        self.config.pacing_ms
    }

    /// A client connected; it starts without a transfer
    pub fn on_connect(&mut self) {
        log_info!("client connected");
        self.transfer.reset_session();
    }

    /// The client went away; any transfer is dropped
    pub fn on_disconnect(&mut self) {
        log_info!("client disconnected");
        self.transfer.reset_session();
    }

    /// Serve a characteristic read
    ///
    /// Carries the latest values stamped with the time of the read.
    pub fn on_read<C: TimeSource + ?Sized>(
        &self,
        channel: Channel,
        clock: &C,
    ) -> Result<ReadPayload, AccessError> {
        match channel {
            Channel::Live | Channel::Config => {
                let latest = self.latest.unwrap_or(LogRecord::ZERO);
                let record = LogRecord::new(latest.temperature, latest.humidity, clock.now());
                let reading = SensorReading::new(record, self.sample_interval());
                codec::encode(&reading).map_err(|e| {
                    log_error!("{} read failed: {}", channel.name(), e);
                    AccessError::Unlikely
                })
            }
            Channel::LogData | Channel::LogControl => Err(AccessError::ReadNotPermitted),
        }
    }

    /// Apply a characteristic write
    pub fn on_write<T: Notifier + ?Sized>(
        &mut self,
        channel: Channel,
        payload: &[u8],
        notifier: &mut T,
    ) -> Result<(), AccessError> {
        match channel {
            Channel::Config => self.write_config(payload, notifier),
            Channel::LogControl => self.write_log_control(payload, notifier),
            Channel::Live | Channel::LogData => Err(AccessError::WriteNotPermitted),
        }
    }

    /// One sampling tick: read the sensor, log the sample, offer it live
    ///
    /// A sensor failure skips the tick and is returned; the previous values
    /// stay readable.
    pub fn on_tick<D, C, T>(&mut self, driver: &mut D, clock: &C, notifier: &mut T) -> BeaconResult<()>
    where
        D: SensorDriver + ?Sized,
        C: TimeSource + ?Sized,
        T: Notifier + ?Sized,
    {
        let record = self.sampler.sample(driver, clock.now())?;
        self.latest = Some(record);
        let reading = SensorReading::new(record, self.sample_interval());
        self.sink.on_sample(reading, &mut self.store, notifier)
    }

    /// One pacing step of a running transfer
    pub fn poll_transfer<T: Notifier + ?Sized>(
        &mut self,
        notifier: &mut T,
    ) -> nb::Result<TransferProgress, BeaconError> {
        self.transfer.poll_transmit(&self.store, notifier)
    }

    fn write_config<T: Notifier + ?Sized>(
        &mut self,
        payload: &[u8],
        notifier: &mut T,
    ) -> Result<(), AccessError> {
        if payload.len() > SensorReading::MAX_ENCODED_LEN {
            return Err(AccessError::InvalidAttributeValueLength);
        }
        let reading: SensorReading = codec::decode(payload).map_err(|e| {
            log_warn!("config write rejected: {}", e);
            AccessError::Unlikely
        })?;

        let mut device = self.device;
        device.set_interval(reading.interval).map_err(|e| {
            log_warn!("config write rejected: {}", e);
            AccessError::Unlikely
        })?;
        self.device = device;
        log_info!("sampling interval set to {}s", device.interval);

        if let Err(e) = device.save(self.store.kv_mut()) {
            log_error!("interval applied but not persisted: {}", e);
        }

        let echo = SensorReading::new(self.latest.unwrap_or(LogRecord::ZERO), device.interval);
        if let Ok(bytes) = codec::encode(&echo) {
            if let Err(e) = notifier.notify(Channel::Config, &bytes) {
                log_debug!("interval notify dropped: {}", e);
            }
        }
        Ok(())
    }

    fn write_log_control<T: Notifier + ?Sized>(
        &mut self,
        payload: &[u8],
        notifier: &mut T,
    ) -> Result<(), AccessError> {
        let message = ControlMessage::decode_request(payload).map_err(|e| {
            log_warn!("log control write rejected: {}", e);
            AccessError::InvalidAttributeValueLength
        })?;

        match self.transfer.handle_control(message, &mut self.store, notifier) {
            Ok(()) => Ok(()),
            // Already logged; the write itself was well formed
            Err(BeaconError::Protocol { .. }) | Err(BeaconError::Transport(_)) => Ok(()),
            Err(e) => {
                log_error!("{} failed: {}", message.name(), e);
                Err(AccessError::Unlikely)
            }
        }
    }
}

impl<K: KeyValueStore, const N: usize> core::fmt::Debug for Beacon<K, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Beacon")
            .field("config", &self.config)
            .field("device", &self.device)
            .field("store", &self.store)
            .field("transfer", self.transfer.state())
            .finish()
    }
}
