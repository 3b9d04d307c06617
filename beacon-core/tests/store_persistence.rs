//! Persistence tests against the directory-backed store
//!
//! Each test works in its own temporary directory and simulates a reboot by
//! dropping the store and opening a new one over the same directory.

#![cfg(feature = "std")]

mod common;

use std::fs;

use beacon_core::constants::{LOG_ENTRIES_KEY, LOG_NAMESPACE};
use beacon_core::{
    codec, Beacon, BeaconConfig, Channel, FileKvStore, KeyValueStore, LogRecord, LogStore,
    SensorReading,
};
use tempfile::TempDir;

use common::{record, RecordingNotifier};

fn open_store<const N: usize>(dir: &TempDir) -> LogStore<FileKvStore, N> {
    LogStore::open(FileKvStore::open(dir.path()).unwrap())
}

#[test]
fn window_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let mut store = open_store::<5>(&dir);
        for i in 0..7 {
            store.append(record(i)).unwrap();
        }
    }

    let store = open_store::<5>(&dir);
    let records: Vec<LogRecord> = store.iter().collect();
    assert_eq!(records, (2..7).map(record).collect::<Vec<_>>());
}

#[test]
fn rewrites_leave_no_temp_files() {
    let dir = TempDir::new().unwrap();
    let mut store = open_store::<5>(&dir);
    for i in 0..20 {
        store.append(record(i)).unwrap();
    }

    let entries: Vec<String> = fs::read_dir(dir.path().join(LOG_NAMESPACE))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(entries, vec![LOG_ENTRIES_KEY.to_string()]);
}

#[test]
fn truncated_blob_opens_empty_and_heals() {
    let dir = TempDir::new().unwrap();
    {
        let mut store = open_store::<5>(&dir);
        store.append(record(0)).unwrap();
        store.append(record(1)).unwrap();
    }

    // Torn write from an older firmware without atomic rename
    let path = dir.path().join(LOG_NAMESPACE).join(LOG_ENTRIES_KEY);
    let blob = fs::read(&path).unwrap();
    fs::write(&path, &blob[..blob.len() - 3]).unwrap();

    let mut store = open_store::<5>(&dir);
    assert!(store.is_empty());

    store.append(record(9)).unwrap();
    let reopened = open_store::<5>(&dir);
    assert_eq!(reopened.iter().collect::<Vec<_>>(), vec![record(9)]);
}

#[test]
fn clear_removes_namespace_only() {
    let dir = TempDir::new().unwrap();
    let mut kv = FileKvStore::open(dir.path()).unwrap();
    kv.set_blob("storage", "sensor_cfg", &[0x08, 0x1E]).unwrap();

    let mut store: LogStore<_, 5> = LogStore::open(kv);
    store.append(record(0)).unwrap();
    store.clear().unwrap();

    assert!(!dir.path().join(LOG_NAMESPACE).exists());
    assert_eq!(
        store.kv().get_blob("storage", "sensor_cfg").unwrap(),
        Some(vec![0x08, 0x1E])
    );
    assert!(open_store::<5>(&dir).is_empty());
}

#[test]
fn beacon_restores_log_and_interval_after_reboot() {
    let dir = TempDir::new().unwrap();
    {
        let kv = FileKvStore::open(dir.path()).unwrap();
        let mut beacon: Beacon<_, 10> = Beacon::new(kv, BeaconConfig::default()).unwrap();
        let mut link = RecordingNotifier::connected();

        let write = codec::encode(&SensorReading::new(LogRecord::ZERO, 120)).unwrap();
        beacon.on_write(Channel::Config, &write, &mut link).unwrap();
        beacon.store_mut().append(record(0)).unwrap();
    }

    let kv = FileKvStore::open(dir.path()).unwrap();
    let beacon: Beacon<_, 10> = Beacon::new(kv, BeaconConfig::default()).unwrap();
    assert_eq!(beacon.sample_interval(), 120);
    assert_eq!(beacon.store().total_count(), 1);
}
