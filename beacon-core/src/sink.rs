//! Live sample sink and sensor sampler
//!
//! Every sampling tick produces one reading. The sink logs it durably and
//! offers it to a connected client on the live channel. Logging never depends
//! on the link: a failed or impossible notify is dropped, the record is kept.

use crate::codec;
use crate::errors::{BeaconResult, SensorError};
use crate::kv::KeyValueStore;
use crate::record::{LogRecord, SensorReading};
use crate::store::LogStore;
use crate::time::Timestamp;
use crate::transport::{Channel, Notifier, SensorDriver};

/// Counters kept by the sink
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SinkStats {
    /// Samples received
    pub samples: u32,
    /// Samples that reached a client
    pub notified: u32,
    /// Appends whose durable write failed
    pub storage_failures: u32,
}

/// Entry point for fresh samples
#[derive(Debug, Default, Clone)]
pub struct LiveSampleSink {
    stats: SinkStats,
}

impl LiveSampleSink {
    /// Fresh sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters since creation
    pub fn stats(&self) -> SinkStats {
        self.stats
    }

    /// Log a sample and offer it on the live channel
    ///
    /// Returns the append result; the notify outcome is only counted.
    pub fn on_sample<K, const N: usize, T>(
        &mut self,
        reading: SensorReading,
        store: &mut LogStore<K, N>,
        notifier: &mut T,
    ) -> BeaconResult<()>
    where
        K: KeyValueStore,
        T: Notifier + ?Sized,
    {
        self.stats.samples += 1;
        let appended = store.append(reading.record);
        if appended.is_err() {
            self.stats.storage_failures += 1;
        }

        if notifier.is_connected() {
            match codec::encode(&reading) {
                Ok(payload) => match notifier.notify(Channel::Live, &payload) {
                    Ok(()) => self.stats.notified += 1,
                    Err(e) => log_debug!("live notify dropped: {}", e),
                },
                Err(e) => log_error!("live reading not encodable: {}", e),
            }
        }

        appended
    }
}

/// Sensor polling with last-good-value retention
#[derive(Debug, Default, Clone, Copy)]
pub struct Sampler {
    last: Option<(f32, f32)>,
    failures: u32,
}

impl Sampler {
    /// Sampler with no reading yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the sensor and stamp the result
    ///
    /// A driver error is returned and the previous values are kept; no
    /// record is produced for that tick.
    pub fn sample<D: SensorDriver + ?Sized>(
        &mut self,
        driver: &mut D,
        now: Timestamp,
    ) -> Result<LogRecord, SensorError> {
        match driver.read_sample() {
            Ok((temperature, humidity)) => {
                self.last = Some((temperature, humidity));
                Ok(LogRecord::new(temperature, humidity, now))
            }
            Err(e) => {
                self.failures += 1;
                log_warn!("sensor read failed, keeping previous values: {}", e);
                Err(e)
            }
        }
    }

    /// Last successful `(temperature, humidity)`
    pub fn last(&self) -> Option<(f32, f32)> {
        self.last
    }

    /// Failed reads since creation
    pub fn failures(&self) -> u32 {
        self.failures
    }
}
