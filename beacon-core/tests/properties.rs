//! Property tests for the window, the codec and the packetizer

use beacon_core::codec::{self, decode, encode, DelimitedRecords};
use beacon_core::packetizer::{fill, Fill};
use beacon_core::{ControlMessage, LogRecord, RecordWindow, SensorReading, WireMessage};
use proptest::prelude::*;

fn finite() -> impl Strategy<Value = f32> {
    prop::num::f32::NORMAL | prop::num::f32::ZERO | prop::num::f32::SUBNORMAL
}

fn any_record() -> impl Strategy<Value = LogRecord> {
    (finite(), finite(), any::<u64>()).prop_map(|(t, h, ts)| LogRecord::new(t, h, ts))
}

/// Records with a timestamp encode to at least three framed bytes
fn stamped_record() -> impl Strategy<Value = LogRecord> {
    (finite(), finite(), 1u64..).prop_map(|(t, h, ts)| LogRecord::new(t, h, ts))
}

proptest! {
    #[test]
    fn window_holds_the_newest_n(stamps in prop::collection::vec(any::<u64>(), 0..40)) {
        let mut window = RecordWindow::<7>::new();
        for ts in &stamps {
            window.push(LogRecord::new(0.0, 0.0, *ts));
        }

        let kept: Vec<u64> = window.iter().map(|r| r.timestamp).collect();
        let expected = &stamps[stamps.len().saturating_sub(7)..];
        prop_assert!(window.len() <= 7);
        prop_assert_eq!(kept.as_slice(), expected);
    }

    #[test]
    fn record_round_trips(record in any_record()) {
        let bytes = encode(&record).unwrap();
        prop_assert!(bytes.len() <= LogRecord::MAX_ENCODED_LEN);
        let back: LogRecord = decode(&bytes).unwrap();
        prop_assert_eq!(back.temperature.to_bits(), record.temperature.to_bits());
        prop_assert_eq!(back.humidity.to_bits(), record.humidity.to_bits());
        prop_assert_eq!(back.timestamp, record.timestamp);
    }

    #[test]
    fn encoding_is_deterministic(record in any_record(), interval in any::<u64>()) {
        let reading = SensorReading::new(record, interval);
        prop_assert_eq!(encode(&reading).unwrap(), encode(&reading).unwrap());
    }

    #[test]
    fn packing_reassembles_the_log(
        log in prop::collection::vec(any_record(), 0..30),
        extra in 0usize..200,
    ) {
        let capacity = LogRecord::MAX_ENCODED_LEN + 1 + extra;
        let mut buf = vec![0u8; capacity];
        let mut received = Vec::new();
        let mut start = 0;

        while start < log.len() {
            let Fill { bytes_written, next_index } = fill(log.as_slice(), &mut buf, start);
            prop_assert!(next_index > start);
            prop_assert!(bytes_written <= capacity);
            for record in DelimitedRecords::<LogRecord>::new(&buf[..bytes_written]) {
                received.push(record.unwrap());
            }
            start = next_index;
        }

        prop_assert_eq!(received, log);
    }

    #[test]
    fn undersized_buffer_writes_nothing(
        log in prop::collection::vec(stamped_record(), 1..10),
        size in 0usize..3,
    ) {
        let mut buf = vec![0xAAu8; size];
        let result = fill(log.as_slice(), &mut buf, 0);
        prop_assert_eq!(result, Fill { bytes_written: 0, next_index: 0 });
        prop_assert!(buf.iter().all(|b| *b == 0xAA));
    }

    #[test]
    fn decoding_arbitrary_bytes_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let _ = decode::<LogRecord>(&bytes);
        let _ = decode::<SensorReading>(&bytes);
        let _ = ControlMessage::decode_request(&bytes);
        let _ = codec::decode_delimited::<LogRecord>(&bytes);
        let _ = DelimitedRecords::<LogRecord>::new(&bytes).count();
    }
}
