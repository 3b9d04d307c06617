//! Persistent Log Store
//!
//! ## Overview
//!
//! [`LogStore`] owns the sliding window of the last `N` records and mirrors it
//! to a [`KeyValueStore`] after every mutation. The durable copy is a single
//! blob rewritten in full (see `constants::storage` for the layout): simple,
//! and with a 1.6KB window the write amplification is acceptable.
//!
//! ## Consistency Model
//!
//! ```text
//!   append(r) ──► window.push(r) ──► persist() ──► Ok
//!                       │                 │
//!                       │                 └─ Err: reported, window keeps r,
//!                       │                    store marked unsynced; the next
//!                       │                    successful persist heals it
//!                       └─ RAM ahead of flash by at most this record
//! ```
//!
//! The key-value store has no transactions, so a failed write is not rolled
//! back. A crash between the in-memory push and the persist loses at most the
//! newest record.
//!
//! ## Sequence Numbers and Epochs
//!
//! Records are addressed by logical index (0 = oldest), but an eviction shifts
//! every index by one. A transfer in progress therefore tracks *sequence
//! numbers*: record `i` has sequence `first_sequence() + i`, and every
//! eviction bumps `first_sequence`. `clear()` bumps the `epoch` so a session
//! started before the clear can tell its snapshot is gone.

use alloc::vec::Vec;

use crate::constants::storage::{
    LOG_ENTRIES_KEY, LOG_HEADER_SIZE, LOG_LAYOUT_VERSION, LOG_MAGIC, LOG_NAMESPACE,
    PERSISTED_RECORD_SIZE,
};
use crate::errors::{BeaconResult, StorageError};
use crate::kv::KeyValueStore;
use crate::record::LogRecord;
use crate::window::{RecordWindow, RecordWindowIter};

/// Bounded, durably mirrored log of the last `N` records
pub struct LogStore<K, const N: usize> {
    kv: K,
    window: RecordWindow<N>,
    first_sequence: u64,
    epoch: u32,
    synced: bool,
}

impl<K: KeyValueStore, const N: usize> LogStore<K, N> {
    /// Restore the window persisted in `kv`
    ///
    /// A missing blob opens an empty log. An unreadable or malformed blob is
    /// logged and also opens empty; the next append overwrites it.
    pub fn open(kv: K) -> Self {
        let mut store = Self {
            kv,
            window: RecordWindow::new(),
            first_sequence: 0,
            epoch: 0,
            synced: true,
        };

        match store.kv.get_blob(LOG_NAMESPACE, LOG_ENTRIES_KEY) {
            Ok(Some(blob)) => match Self::decode_blob(&blob) {
                Ok(window) => {
                    log_info!("log restored with {} entries", window.len());
                    store.window = window;
                }
                Err(e) => {
                    log_warn!("discarding persisted log: {}", e);
                    store.synced = false;
                }
            },
            Ok(None) => log_debug!("no persisted log, starting empty"),
            Err(e) => {
                log_warn!("persisted log unreadable, starting empty: {}", e);
                store.synced = false;
            }
        }

        store
    }

    /// Append `record`, evicting the oldest when full, then persist the window
    ///
    /// On a storage error the record stays in RAM and the error is returned.
    pub fn append(&mut self, record: LogRecord) -> BeaconResult<()> {
        if self.window.push(record).is_some() {
            self.first_sequence += 1;
        }
        self.persist()
    }

    /// Copy up to `out.len()` records starting at logical `start`
    ///
    /// Returns the number copied; `start >= total_count()` yields zero.
    pub fn read_range(&self, start: usize, out: &mut [LogRecord]) -> usize {
        self.window.copy_range(start, out)
    }

    /// Record at logical `index`
    pub fn get(&self, index: usize) -> Option<LogRecord> {
        self.window.get(index)
    }

    /// Number of stored records
    pub fn total_count(&self) -> usize {
        self.window.len()
    }

    /// Maximum number of records
    pub const fn capacity(&self) -> usize {
        N
    }

    /// True when no record is stored
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// True when the next append evicts
    pub fn is_full(&self) -> bool {
        self.window.is_full()
    }

    /// Oldest-first iterator over copies of the records
    pub fn iter(&self) -> RecordWindowIter<'_, N> {
        self.window.iter()
    }

    /// Sequence number of the record at index 0
    pub fn first_sequence(&self) -> u64 {
        self.first_sequence
    }

    /// Incremented by every `clear()`
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Whether the durable copy matches the window
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// Drop every record and erase the namespace
    ///
    /// The in-memory window is empty when this returns, whatever the outcome
    /// of the erase.
    pub fn clear(&mut self) -> BeaconResult<()> {
        self.window.clear();
        self.first_sequence = 0;
        self.epoch = self.epoch.wrapping_add(1);

        match self.kv.erase_namespace(LOG_NAMESPACE) {
            Ok(()) => {
                self.synced = true;
                log_info!("log cleared");
                Ok(())
            }
            Err(e) => {
                self.synced = false;
                log_error!("log cleared in RAM but erase failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// Underlying key-value store
    pub fn kv(&self) -> &K {
        &self.kv
    }

    /// Underlying key-value store, for other namespaces
    pub fn kv_mut(&mut self) -> &mut K {
        &mut self.kv
    }

    /// Give back the key-value store
    pub fn into_inner(self) -> K {
        self.kv
    }

    fn persist(&mut self) -> BeaconResult<()> {
        let blob = self.encode_blob();
        match self.kv.set_blob(LOG_NAMESPACE, LOG_ENTRIES_KEY, &blob) {
            Ok(()) => {
                self.synced = true;
                Ok(())
            }
            Err(e) => {
                self.synced = false;
                log_error!("persisting {} log entries failed: {}", self.window.len(), e);
                Err(e.into())
            }
        }
    }

    fn encode_blob(&self) -> Vec<u8> {
        let mut blob = Vec::with_capacity(LOG_HEADER_SIZE + self.window.len() * PERSISTED_RECORD_SIZE);
        blob.extend_from_slice(&LOG_MAGIC);
        blob.push(LOG_LAYOUT_VERSION);
        blob.push(PERSISTED_RECORD_SIZE as u8);
        for record in self.window.iter() {
            blob.extend_from_slice(&record.to_le_bytes());
        }
        blob
    }

    fn decode_blob(blob: &[u8]) -> Result<RecordWindow<N>, StorageError> {
        if blob.len() < LOG_HEADER_SIZE {
            return Err(StorageError::Corrupt { reason: "blob shorter than header" });
        }
        let (header, body) = blob.split_at(LOG_HEADER_SIZE);
        if header[..2] != LOG_MAGIC {
            return Err(StorageError::Corrupt { reason: "bad magic" });
        }
        if header[2] != LOG_LAYOUT_VERSION {
            return Err(StorageError::Corrupt { reason: "unsupported layout version" });
        }
        if header[3] as usize != PERSISTED_RECORD_SIZE || body.len() % PERSISTED_RECORD_SIZE != 0 {
            return Err(StorageError::Corrupt { reason: "partial record" });
        }

        // Pushing everything keeps the newest N if the blob came from a larger build
        let mut window = RecordWindow::new();
        for chunk in body.chunks_exact(PERSISTED_RECORD_SIZE) {
            let record = LogRecord::from_le_bytes(chunk)
                .map_err(|_| StorageError::Corrupt { reason: "partial record" })?;
            window.push(record);
        }
        Ok(window)
    }
}

impl<K, const N: usize> core::fmt::Debug for LogStore<K, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LogStore")
            .field("count", &self.window.len())
            .field("capacity", &N)
            .field("first_sequence", &self.first_sequence)
            .field("epoch", &self.epoch)
            .field("synced", &self.synced)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BeaconError;
    use crate::kv::MemoryKvStore;

    /// Store whose writes can be switched off
    #[derive(Default)]
    struct FlakyKv {
        inner: MemoryKvStore,
        fail_writes: bool,
    }

    impl KeyValueStore for FlakyKv {
        fn get_blob(&self, ns: &'static str, key: &'static str)
            -> Result<Option<Vec<u8>>, StorageError> {
            self.inner.get_blob(ns, key)
        }

        fn set_blob(&mut self, ns: &'static str, key: &'static str, value: &[u8])
            -> Result<(), StorageError> {
            if self.fail_writes {
                return Err(StorageError::WriteFailed { namespace: ns, key });
            }
            self.inner.set_blob(ns, key, value)
        }

        fn erase_namespace(&mut self, ns: &'static str) -> Result<(), StorageError> {
            if self.fail_writes {
                return Err(StorageError::EraseFailed { namespace: ns });
            }
            self.inner.erase_namespace(ns)
        }
    }

    fn sample(t: f32, h: f32, ts: u64) -> LogRecord {
        LogRecord::new(t, h, ts)
    }

    #[test]
    fn sliding_window_scenario() {
        let mut store: LogStore<_, 3> = LogStore::open(MemoryKvStore::new());
        store.append(sample(20.0, 50.0, 1)).unwrap();
        store.append(sample(21.0, 51.0, 2)).unwrap();
        store.append(sample(22.0, 52.0, 3)).unwrap();
        store.append(sample(23.0, 53.0, 4)).unwrap();

        let records: Vec<_> = store.iter().collect();
        assert_eq!(
            records,
            vec![sample(21.0, 51.0, 2), sample(22.0, 52.0, 3), sample(23.0, 53.0, 4)]
        );
        assert_eq!(store.first_sequence(), 1);
    }

    #[test]
    fn reopen_restores_window() {
        let mut store: LogStore<_, 4> = LogStore::open(MemoryKvStore::new());
        for i in 0..6 {
            store.append(sample(i as f32, 40.0, i)).unwrap();
        }

        let reopened: LogStore<_, 4> = LogStore::open(store.into_inner());
        let stamps: Vec<u64> = reopened.iter().map(|r| r.timestamp).collect();
        assert_eq!(stamps, vec![2, 3, 4, 5]);
        assert!(reopened.is_synced());
    }

    #[test]
    fn reopen_with_smaller_capacity_keeps_newest() {
        let mut store: LogStore<_, 5> = LogStore::open(MemoryKvStore::new());
        for i in 0..5 {
            store.append(sample(0.0, 0.0, i)).unwrap();
        }

        let smaller: LogStore<_, 2> = LogStore::open(store.into_inner());
        let stamps: Vec<u64> = smaller.iter().map(|r| r.timestamp).collect();
        assert_eq!(stamps, vec![3, 4]);
    }

    #[test]
    fn blob_length_encodes_count() {
        let mut store: LogStore<_, 10> = LogStore::open(MemoryKvStore::new());
        store.append(sample(1.0, 2.0, 3)).unwrap();
        store.append(sample(4.0, 5.0, 6)).unwrap();

        let blob = store.kv().get_blob(LOG_NAMESPACE, LOG_ENTRIES_KEY).unwrap().unwrap();
        assert_eq!(blob.len(), LOG_HEADER_SIZE + 2 * PERSISTED_RECORD_SIZE);
        assert_eq!(&blob[..4], &[b'T', b'H', 1, 16]);
    }

    #[test]
    fn corrupt_blob_opens_empty() {
        let mut kv = MemoryKvStore::new();
        kv.set_blob(LOG_NAMESPACE, LOG_ENTRIES_KEY, &[b'T', b'H', 1, 16, 0, 0, 0]).unwrap();

        let store: LogStore<_, 10> = LogStore::open(kv);
        assert_eq!(store.total_count(), 0);
        assert!(!store.is_synced());

        let mut kv = MemoryKvStore::new();
        kv.set_blob(LOG_NAMESPACE, LOG_ENTRIES_KEY, &[0xFF; 20]).unwrap();
        let store: LogStore<_, 10> = LogStore::open(kv);
        assert!(store.is_empty());
    }

    #[test]
    fn read_range_past_end_is_empty() {
        let mut store: LogStore<_, 5> = LogStore::open(MemoryKvStore::new());
        store.append(sample(1.0, 1.0, 1)).unwrap();

        let mut out = [LogRecord::ZERO; 4];
        assert_eq!(store.read_range(0, &mut out), 1);
        assert_eq!(store.read_range(1, &mut out), 0);
        assert_eq!(store.read_range(50, &mut out), 0);
    }

    #[test]
    fn failed_persist_keeps_record_in_ram() {
        let mut store: LogStore<_, 5> = LogStore::open(FlakyKv::default());
        store.append(sample(1.0, 1.0, 1)).unwrap();

        store.kv_mut().fail_writes = true;
        let err = store.append(sample(2.0, 2.0, 2)).unwrap_err();
        assert!(matches!(err, BeaconError::Storage(StorageError::WriteFailed { .. })));
        assert_eq!(store.total_count(), 2);
        assert!(!store.is_synced());

        // Next successful write carries both records
        store.kv_mut().fail_writes = false;
        store.append(sample(3.0, 3.0, 3)).unwrap();
        let reopened: LogStore<_, 5> = LogStore::open(store.into_inner());
        assert_eq!(reopened.total_count(), 3);
    }

    #[test]
    fn clear_empties_ram_even_if_erase_fails() {
        let mut store: LogStore<_, 5> = LogStore::open(FlakyKv::default());
        store.append(sample(1.0, 1.0, 1)).unwrap();
        let epoch = store.epoch();

        store.kv_mut().fail_writes = true;
        assert!(store.clear().is_err());
        assert_eq!(store.total_count(), 0);
        assert_ne!(store.epoch(), epoch);
    }

    #[test]
    fn clear_erases_durable_copy() {
        let mut store: LogStore<_, 5> = LogStore::open(MemoryKvStore::new());
        store.append(sample(1.0, 1.0, 1)).unwrap();
        store.clear().unwrap();

        assert!(store.kv().get_blob(LOG_NAMESPACE, LOG_ENTRIES_KEY).unwrap().is_none());
        let reopened: LogStore<_, 5> = LogStore::open(store.into_inner());
        assert!(reopened.is_empty());
    }
}
