//! Log Transfer Example
//!
//! Simulates a beacon that samples for a while with nobody connected, then a
//! client that connects, asks how many records are stored, and drains the
//! log through paced notifications.
//!
//! ## What You'll Learn
//!
//! - Wiring a sensor driver and a notifier into a `Beacon`
//! - The START / StartAck / packets sequence of a transfer
//! - Re-splitting log packets on the client side
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example 01_log_transfer
//! ```

use beacon_core::constants::{DEVICE_NAME, SERVICE_UUID};
use beacon_core::{
    codec, Beacon, BeaconConfig, Channel, ControlMessage, DelimitedRecords, FileKvStore,
    FixedTime, LogRecord, Notifier, SensorDriver, SensorError, TransferProgress,
    TransportError,
};

/// Sensor following a slow daily swing
struct SimulatedSht {
    step: u32,
}

impl SensorDriver for SimulatedSht {
    fn read_sample(&mut self) -> Result<(f32, f32), SensorError> {
        self.step += 1;
        // Every 7th read the bus glitches
        if self.step % 7 == 0 {
            return Err(SensorError::Bus);
        }
        let phase = self.step as f32 / 24.0 * core::f32::consts::TAU;
        Ok((21.0 + 3.0 * phase.sin(), 55.0 - 8.0 * phase.sin()))
    }
}

/// Link that prints traffic and hands log packets to the "client"
struct ConsoleLink {
    connected: bool,
    log_packets: Vec<Vec<u8>>,
}

impl Notifier for ConsoleLink {
    fn notify(&mut self, channel: Channel, payload: &[u8]) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        match channel {
            Channel::LogControl => {
                let response = ControlMessage::decode_response(payload)
                    .map_err(|_| TransportError::Other(-1))?;
                println!("  <- log control: {:?}", response);
            }
            Channel::LogData => {
                println!("  <- log data: {} bytes", payload.len());
                self.log_packets.push(payload.to_vec());
            }
            other => println!("  <- {}: {} bytes", other.name(), payload.len()),
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn max_payload(&self) -> usize {
        // Small MTU to force several packets
        64
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Beacon Log Transfer Example");
    println!("===========================\n");

    let dir = std::env::temp_dir().join("beacon-log-transfer-example");
    let kv = FileKvStore::open(&dir).map_err(|e| format!("{e}"))?;
    let mut beacon: Beacon<_, 20> =
        Beacon::new(kv, BeaconConfig::default()).map_err(|e| format!("{e}"))?;
    println!("{} serving 0x{:04X}", DEVICE_NAME, SERVICE_UUID);
    println!("Storage at {}", dir.display());
    println!("Restored {} records\n", beacon.store().total_count());

    let mut sensor = SimulatedSht { step: 0 };
    let mut link = ConsoleLink { connected: false, log_packets: Vec::new() };
    let clock = FixedTime::new(0);
    let interval_ms = beacon.sample_interval_ms();

    println!("Sampling 30 ticks with no client connected:");
    for _ in 0..30 {
        if let Err(e) = beacon.on_tick(&mut sensor, &clock, &mut link) {
            println!("  tick skipped: {}", e);
        }
        clock.advance(interval_ms);
    }
    println!("Log holds {} of {} records\n", beacon.store().total_count(), beacon.store().capacity());

    println!("Client connects:");
    link.connected = true;
    beacon.on_connect();

    for command in [ControlMessage::GetLength, ControlMessage::Start] {
        println!("  -> {}", command.name());
        let payload = codec::encode(&command.to_frame()).map_err(|e| format!("{e}"))?;
        beacon
            .on_write(Channel::LogControl, &payload, &mut link)
            .map_err(|e| format!("{e}"))?;
    }

    // Host pacing loop
    loop {
        match beacon.poll_transfer(&mut link) {
            Ok(TransferProgress::Packet { .. }) => continue,
            Ok(TransferProgress::Complete { records_sent, total }) => {
                println!("  transfer complete: {records_sent}/{total}");
                break;
            }
            Err(nb::Error::WouldBlock) => break,
            Err(nb::Error::Other(e)) => {
                println!("  transfer failed: {}", e);
                break;
            }
        }
    }

    println!("\nClient decodes:");
    for packet in &link.log_packets {
        for record in DelimitedRecords::<LogRecord>::new(packet) {
            let record = record.map_err(|e| format!("{e}"))?;
            println!(
                "  t={:>8}ms  {:>5.2}°C  {:>5.2}%",
                record.timestamp, record.temperature, record.humidity
            );
        }
    }

    beacon.on_disconnect();
    Ok(())
}
