//! Shared fakes for integration tests
//!
//! - `RecordingNotifier`: captures every notification, can be disconnected or
//!   made to fail
//! - `FlakyKvStore`: in-memory store whose writes can be switched off
//! - `ScriptedSensor`: replays a fixed list of readings

#![allow(dead_code)]

use std::collections::VecDeque;

use beacon_core::{
    Channel, ControlMessage, DelimitedRecords, KeyValueStore, LogRecord, MemoryKvStore,
    Notifier, SensorDriver, SensorError, StorageError, TransportError,
};

/// Notifier that records what was sent
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub sent: Vec<(Channel, Vec<u8>)>,
    pub connected: bool,
    pub fail_with: Option<TransportError>,
    pub max_payload: Option<usize>,
}

impl RecordingNotifier {
    /// Connected notifier accepting everything
    pub fn connected() -> Self {
        Self { connected: true, ..Self::default() }
    }

    /// Payloads sent on `channel`, oldest first
    pub fn payloads(&self, channel: Channel) -> Vec<&[u8]> {
        self.sent
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, p)| p.as_slice())
            .collect()
    }

    /// Control responses, decoded
    pub fn control_responses(&self) -> Vec<ControlMessage> {
        self.payloads(Channel::LogControl)
            .into_iter()
            .map(|p| ControlMessage::decode_response(p).expect("valid response"))
            .collect()
    }

    /// Records per log packet
    pub fn packet_sizes(&self) -> Vec<usize> {
        self.payloads(Channel::LogData)
            .into_iter()
            .map(|p| DelimitedRecords::<LogRecord>::new(p).count())
            .collect()
    }

    /// Every record received on the log data channel
    pub fn received_records(&self) -> Vec<LogRecord> {
        self.payloads(Channel::LogData)
            .into_iter()
            .flat_map(|p| {
                DelimitedRecords::<LogRecord>::new(p)
                    .map(|r| r.expect("valid record"))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, channel: Channel, payload: &[u8]) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        if let Some(err) = self.fail_with {
            return Err(err);
        }
        self.sent.push((channel, payload.to_vec()));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn max_payload(&self) -> usize {
        self.max_payload.unwrap_or(beacon_core::constants::DEFAULT_PACKET_CAPACITY)
    }
}

/// Memory store with switchable write failures
#[derive(Debug, Default)]
pub struct FlakyKvStore {
    pub inner: MemoryKvStore,
    pub fail_writes: bool,
    pub writes: usize,
}

impl KeyValueStore for FlakyKvStore {
    fn get_blob(&self, namespace: &'static str, key: &'static str)
        -> Result<Option<Vec<u8>>, StorageError> {
        self.inner.get_blob(namespace, key)
    }

    fn set_blob(&mut self, namespace: &'static str, key: &'static str, value: &[u8])
        -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::WriteFailed { namespace, key });
        }
        self.writes += 1;
        self.inner.set_blob(namespace, key, value)
    }

    fn erase_namespace(&mut self, namespace: &'static str) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::EraseFailed { namespace });
        }
        self.inner.erase_namespace(namespace)
    }
}

/// Sensor replaying scripted results, then repeating the last one
#[derive(Debug)]
pub struct ScriptedSensor {
    script: VecDeque<Result<(f32, f32), SensorError>>,
    last: Result<(f32, f32), SensorError>,
}

impl ScriptedSensor {
    pub fn new(script: impl IntoIterator<Item = Result<(f32, f32), SensorError>>) -> Self {
        Self { script: script.into_iter().collect(), last: Err(SensorError::Bus) }
    }

    /// Sensor that always reads `(t, h)`
    pub fn steady(t: f32, h: f32) -> Self {
        Self::new([Ok((t, h))])
    }
}

impl SensorDriver for ScriptedSensor {
    fn read_sample(&mut self) -> Result<(f32, f32), SensorError> {
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        self.last
    }
}

/// Record `i` of a synthetic series
pub fn record(i: u64) -> LogRecord {
    LogRecord::new(20.0 + i as f32, 50.0 + i as f32, i + 1)
}
