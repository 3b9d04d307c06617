//! Log packetizer
//!
//! Packs consecutive records into one notify payload as length-delimited
//! `SensorData` messages:
//!
//! ```text
//! ┌─────┬──────────────┬─────┬──────────────┬─────┬──────────────┐
//! │ len │ SensorData 0 │ len │ SensorData 1 │ ... │ SensorData k │   ≤ capacity
//! └─────┴──────────────┴─────┴──────────────┴─────┴──────────────┘
//! ```
//!
//! A record is either written whole or not at all. The packetizer never
//! touches the log; it only reads through [`RecordSource`].

use crate::codec::{encode_delimited_into, WireMessage};
use crate::errors::{BeaconError, BeaconResult};
use crate::kv::KeyValueStore;
use crate::record::LogRecord;
use crate::store::LogStore;
use crate::window::RecordWindow;

/// Indexed, read-only view of retained records
pub trait RecordSource {
    /// Number of records
    fn total_count(&self) -> usize;

    /// Record at logical `index` (0 = oldest)
    fn record(&self, index: usize) -> Option<LogRecord>;
}

impl<K: KeyValueStore, const N: usize> RecordSource for LogStore<K, N> {
    fn total_count(&self) -> usize {
        LogStore::total_count(self)
    }

    fn record(&self, index: usize) -> Option<LogRecord> {
        self.get(index)
    }
}

impl<const N: usize> RecordSource for RecordWindow<N> {
    fn total_count(&self) -> usize {
        self.len()
    }

    fn record(&self, index: usize) -> Option<LogRecord> {
        self.get(index)
    }
}

impl RecordSource for [LogRecord] {
    fn total_count(&self) -> usize {
        self.len()
    }

    fn record(&self, index: usize) -> Option<LogRecord> {
        self.get(index).copied()
    }
}

/// Outcome of one fill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fill {
    /// Bytes written at the front of the buffer
    pub bytes_written: usize,
    /// Index of the first record not written
    pub next_index: usize,
}

impl Fill {
    /// Number of records written when the fill started at `start`
    pub fn records(&self, start: usize) -> usize {
        self.next_index.saturating_sub(start)
    }

    /// True when nothing was written although `start` was before `end`
    pub fn is_stalled(&self, start: usize, end: usize) -> bool {
        self.bytes_written == 0 && self.next_index == start && start < end
    }
}

/// Pack records from `start` to the end of the log into `buf`
///
/// `next_index == source.total_count()` means the log is exhausted.
/// `bytes_written == 0 && next_index == start` with records remaining means
/// no record fits in `buf`.
pub fn fill<S: RecordSource + ?Sized>(source: &S, buf: &mut [u8], start: usize) -> Fill {
    fill_until(source, buf, start, source.total_count())
}

/// Like [`fill`], but never reads at or past `end`
pub fn fill_until<S: RecordSource + ?Sized>(
    source: &S,
    buf: &mut [u8],
    start: usize,
    end: usize,
) -> Fill {
    let end = end.min(source.total_count());
    let mut written = 0;
    let mut index = start;

    while index < end {
        let Some(record) = source.record(index) else { break };
        match encode_delimited_into(&record, &mut buf[written..]) {
            Ok(n) => {
                written += n;
                index += 1;
            }
            // Stop at the first record that does not fit whole
            Err(_) => break,
        }
    }

    Fill { bytes_written: written, next_index: index.max(start) }
}

/// [`fill_until`] for the transfer path: a stalled fill becomes an error
pub fn fill_packet<S: RecordSource + ?Sized>(
    source: &S,
    buf: &mut [u8],
    start: usize,
    end: usize,
) -> BeaconResult<Fill> {
    let result = fill_until(source, buf, start, end);
    if result.is_stalled(start, end.min(source.total_count())) {
        let required = source
            .record(start)
            .map(|r| r.encoded_len_delimited())
            .unwrap_or(LogRecord::MAX_ENCODED_LEN + 1);
        return Err(BeaconError::Capacity { required, available: buf.len() });
    }
    Ok(result)
}
