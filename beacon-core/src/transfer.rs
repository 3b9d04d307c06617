//! Log Transfer State Machine
//!
//! ## Overview
//!
//! A client drains the log by writing `START` to the log control channel. The
//! beacon answers with `StartAck(n)` and then *pushes* the `n` records as log
//! data notifications, one packet per pacing tick:
//!
//! ```text
//!          GetLength ─┐            ┌─ GetLength
//!                     ▼            ▼
//!   ┌──────┐  Start  ┌───────────────┐  poll_transmit
//!   │ Idle │────────►│   Streaming   │◄──────────────┐ packet sent
//!   └──────┘◄────────┴───────────────┴───────────────┘
//!       ▲    Stop / Clear / disconnect /
//!       │    end of snapshot / transport error
//! ```
//!
//! The host owns the pacing timer and calls [`LogTransfer::poll_transmit`]
//! once per tick. Each call sends at most one packet, so a `Stop` or `Clear`
//! written between ticks takes effect before the next packet.
//!
//! ## Snapshot Semantics
//!
//! `Start` snapshots the current record count. Records appended during the
//! transfer are not sent. The session tracks store *sequence numbers* rather
//! than indices: if the window evicts a record that has not been sent yet,
//! the session skips it instead of resending a shifted neighbour. A clear
//! bumps the store epoch and ends the session.
//!
//! ## Pull Mode
//!
//! `NEXT` exists on the wire for pull-mode clients. This beacon only pushes,
//! so `NEXT` is rejected with a protocol error and does not change state.

use alloc::vec;
use alloc::vec::Vec;

use crate::codec;
use crate::constants::transport::DEFAULT_PACKET_CAPACITY;
use crate::control::ControlMessage;
use crate::errors::{BeaconError, BeaconResult};
use crate::kv::KeyValueStore;
use crate::packetizer;
use crate::store::LogStore;
use crate::transport::{Channel, Notifier};

/// One running transfer
#[derive(Debug, Clone)]
pub struct TransferSession {
    next_sequence: u64,
    end_sequence: u64,
    total: u32,
    epoch: u32,
    packets_sent: u32,
    records_sent: u32,
    packet: Vec<u8>,
}

impl TransferSession {
    /// Records announced in `StartAck`
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Packets notified so far
    pub fn packets_sent(&self) -> u32 {
        self.packets_sent
    }

    /// Records notified so far
    pub fn records_sent(&self) -> u32 {
        self.records_sent
    }

    fn step<K: KeyValueStore, const N: usize, T: Notifier + ?Sized>(
        &mut self,
        store: &LogStore<K, N>,
        notifier: &mut T,
    ) -> BeaconResult<TransferProgress> {
        if store.epoch() != self.epoch {
            return Err(BeaconError::Protocol { command: "TRANSFER", state: "log cleared" });
        }

        let first = store.first_sequence();
        if self.next_sequence < first {
            log_warn!(
                "{} unsent records evicted during transfer",
                first - self.next_sequence
            );
        }
        let start = self.next_sequence.saturating_sub(first) as usize;
        let end = self.end_sequence.saturating_sub(first) as usize;

        if start >= end {
            return Ok(TransferProgress::Complete {
                records_sent: self.records_sent,
                total: self.total,
            });
        }

        let capacity = self.packet.len().min(notifier.max_payload());
        let buf = &mut self.packet[..capacity];
        let fill = packetizer::fill_packet(store, buf, start, end)?;
        notifier.notify(Channel::LogData, &buf[..fill.bytes_written])?;

        let records = fill.records(start);
        self.next_sequence = first + fill.next_index as u64;
        self.packets_sent += 1;
        self.records_sent += records as u32;
        Ok(TransferProgress::Packet { records, bytes: fill.bytes_written })
    }
}

/// Transfer state
#[derive(Debug, Clone, Default)]
pub enum TransferState {
    /// No transfer running
    #[default]
    Idle,
    /// Pushing a snapshot
    Streaming(TransferSession),
}

impl TransferState {
    /// Name for logs and protocol errors
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Streaming(_) => "streaming",
        }
    }
}

/// Result of one successful [`LogTransfer::poll_transmit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferProgress {
    /// One packet was notified
    Packet {
        /// Records in the packet
        records: usize,
        /// Payload size
        bytes: usize,
    },
    /// The snapshot is exhausted; the machine is idle again
    Complete {
        /// Records actually sent (fewer than `total` if some were evicted)
        records_sent: u32,
        /// Records announced in `StartAck`
        total: u32,
    },
}

/// Transfer counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransferStats {
    /// Sessions opened by `Start`
    pub sessions_started: u32,
    /// Sessions that reached the end of their snapshot
    pub sessions_completed: u32,
    /// Sessions ended by Stop, Clear, disconnect or an error
    pub sessions_abandoned: u32,
    /// Log packets notified
    pub packets_sent: u32,
    /// Commands rejected in the current state
    pub protocol_errors: u32,
}

/// Connection-scoped transfer state machine
#[derive(Debug, Clone)]
pub struct LogTransfer {
    state: TransferState,
    packet_capacity: usize,
    stats: TransferStats,
}

impl LogTransfer {
    /// Machine whose packets hold at most `packet_capacity` bytes
    pub fn new(packet_capacity: usize) -> Self {
        Self {
            state: TransferState::Idle,
            packet_capacity,
            stats: TransferStats::default(),
        }
    }

    /// Current state
    pub fn state(&self) -> &TransferState {
        &self.state
    }

    /// Whether a session is running
    pub fn is_streaming(&self) -> bool {
        matches!(self.state, TransferState::Streaming(_))
    }

    /// Counters since creation
    pub fn stats(&self) -> TransferStats {
        self.stats
    }

    /// Apply a control command written by the client
    ///
    /// Rejected commands return [`BeaconError::Protocol`] and leave the state
    /// untouched. Responses go out on the log control channel.
    pub fn handle_control<K, const N: usize, T>(
        &mut self,
        message: ControlMessage,
        store: &mut LogStore<K, N>,
        notifier: &mut T,
    ) -> BeaconResult<()>
    where
        K: KeyValueStore,
        T: Notifier + ?Sized,
    {
        log_debug!("log control {} while {}", message.name(), self.state.name());

        match message {
            ControlMessage::GetLength => {
                let count = count_u32(store.total_count());
                Self::respond(notifier, ControlMessage::GetLengthResponse(count))
            }

            ControlMessage::Start => {
                if self.is_streaming() {
                    log_info!("start while streaming, restarting transfer");
                    self.abandon();
                }

                let total = count_u32(store.total_count());
                let first = store.first_sequence();
                let session = TransferSession {
                    next_sequence: first,
                    end_sequence: first + total as u64,
                    total,
                    epoch: store.epoch(),
                    packets_sent: 0,
                    records_sent: 0,
                    packet: vec![0u8; self.packet_capacity],
                };

                Self::respond(notifier, ControlMessage::StartAck(total))?;
                self.state = TransferState::Streaming(session);
                self.stats.sessions_started += 1;
                log_info!("transfer started with {} records", total);
                Ok(())
            }

            ControlMessage::Stop => {
                if !self.is_streaming() {
                    return Err(self.reject(message));
                }
                log_info!("transfer stopped by client");
                self.abandon();
                Ok(())
            }

            ControlMessage::Clear => {
                if self.is_streaming() {
                    self.abandon();
                }
                store.clear()
            }

            ControlMessage::Next
            | ControlMessage::GetLengthResponse(_)
            | ControlMessage::StartAck(_) => Err(self.reject(message)),
        }
    }

    /// Push the next packet of the running session
    ///
    /// `WouldBlock` when idle. Any error ends the session; the client
    /// recovers by sending `Start` again.
    pub fn poll_transmit<K, const N: usize, T>(
        &mut self,
        store: &LogStore<K, N>,
        notifier: &mut T,
    ) -> nb::Result<TransferProgress, BeaconError>
    where
        K: KeyValueStore,
        T: Notifier + ?Sized,
    {
        let TransferState::Streaming(session) = &mut self.state else {
            return Err(nb::Error::WouldBlock);
        };

        match session.step(store, notifier) {
            Ok(progress @ TransferProgress::Packet { .. }) => {
                self.stats.packets_sent += 1;
                Ok(progress)
            }
            Ok(progress @ TransferProgress::Complete { records_sent, total }) => {
                log_info!("transfer complete, {} of {} records sent", records_sent, total);
                self.state = TransferState::Idle;
                self.stats.sessions_completed += 1;
                Ok(progress)
            }
            Err(e) => {
                log_warn!("transfer abandoned: {}", e);
                self.abandon();
                Err(nb::Error::Other(e))
            }
        }
    }

    /// Drop any session and its packet buffer
    ///
    /// Called on connect and disconnect; a session never outlives its link.
    pub fn reset_session(&mut self) {
        if self.is_streaming() {
            log_info!("link changed during transfer");
            self.abandon();
        }
    }

    fn abandon(&mut self) {
        if let TransferState::Streaming(_) = core::mem::take(&mut self.state) {
            self.stats.sessions_abandoned += 1;
        }
    }

    fn reject(&mut self, message: ControlMessage) -> BeaconError {
        self.stats.protocol_errors += 1;
        let err = BeaconError::Protocol { command: message.name(), state: self.state.name() };
        log_warn!("{}", err);
        err
    }

    fn respond<T: Notifier + ?Sized>(notifier: &mut T, message: ControlMessage) -> BeaconResult<()> {
        let payload = codec::encode(&message.to_frame())?;
        notifier.notify(Channel::LogControl, &payload).map_err(|e| {
            log_warn!("{} not delivered: {}", message.name(), e);
            BeaconError::from(e)
        })
    }
}

impl Default for LogTransfer {
    fn default() -> Self {
        Self::new(DEFAULT_PACKET_CAPACITY)
    }
}

fn count_u32(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}
