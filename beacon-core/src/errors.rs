//! Error Types for the Log Transfer Subsystem
//!
//! ## Design Philosophy
//!
//! The beacon keeps sampling and advertising no matter what goes wrong in the
//! log path, so every error here is recoverable. The types follow the same
//! embedded-friendly rules everywhere:
//!
//! 1. **Small Size**: errors are `Copy` and carry only integers and
//!    `&'static str` reasons, never heap data.
//! 2. **Actionable Information**: each variant says which layer failed so the
//!    caller can decide between "skip", "reject" and "report".
//!
//! ## Error Categories
//!
//! | Variant     | Raised by                | Recovery                                  |
//! |-------------|--------------------------|-------------------------------------------|
//! | `Format`    | codec                    | request rejected, no state mutated        |
//! | `Capacity`  | packetizer               | retry with a larger buffer                |
//! | `Storage`   | key-value store          | reads yield no data, writes are reported  |
//! | `Transport` | notifier                 | dropped; the client's next command retries|
//! | `Protocol`  | transfer state machine   | logged and ignored                        |
//! | `Sensor`    | sensor driver            | tick skipped, previous values kept        |
//!
//! ## Handling Example
//!
//! ```rust
//! use beacon_core::{BeaconError, StorageError};
//!
//! fn on_append_result(result: Result<(), BeaconError>) {
//!     match result {
//!         Ok(()) => {}
//!         Err(BeaconError::Storage(StorageError::WriteFailed { .. })) => {
//!             // Record is in RAM but not in flash; the next append retries the write
//!         }
//!         Err(_) => {}
//!     }
//! }
//! ```

use thiserror_no_std::Error;

/// Result type for log transfer operations
pub type BeaconResult<T> = Result<T, BeaconError>;

/// Failures of the durable key-value store
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Namespace could not be opened
    #[error("namespace {namespace} unavailable")]
    Unavailable {
        /// Namespace that failed to open
        namespace: &'static str,
    },

    /// Writing or committing a blob failed
    #[error("write to {namespace}/{key} failed")]
    WriteFailed {
        /// Namespace of the blob
        namespace: &'static str,
        /// Key of the blob
        key: &'static str,
    },

    /// Reading a blob failed
    #[error("read of {namespace}/{key} failed")]
    ReadFailed {
        /// Namespace of the blob
        namespace: &'static str,
        /// Key of the blob
        key: &'static str,
    },

    /// Blob exists but its contents are not a valid layout
    #[error("corrupt blob: {reason}")]
    Corrupt {
        /// What was wrong with the contents
        reason: &'static str,
    },

    /// Erasing the namespace failed
    #[error("erase of {namespace} failed")]
    EraseFailed {
        /// Namespace that could not be erased
        namespace: &'static str,
    },
}

/// Failures reported by the wireless transport
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// No peer is connected
    #[error("not connected")]
    NotConnected,

    /// The outstanding-notification buffer is full
    #[error("link congested")]
    Congested,

    /// Payload larger than the negotiated MTU allows
    #[error("payload of {len} bytes exceeds {max}")]
    PayloadTooLarge {
        /// Attempted payload length
        len: usize,
        /// Largest payload the link accepts
        max: usize,
    },

    /// Stack-specific failure code
    #[error("transport failure code {0}")]
    Other(i32),
}

/// Failures reported by the sensor driver
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// Bus transaction failed (NACK, timeout)
    #[error("sensor bus error")]
    Bus,

    /// Sensor answered but the measurement is unusable
    #[error("invalid measurement: {reason}")]
    InvalidMeasurement {
        /// Why the measurement was rejected
        reason: &'static str,
    },
}

/// Errors of the log transfer subsystem
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum BeaconError {
    /// Malformed or truncated binary payload
    #[error("format error: {reason}")]
    Format {
        /// What the decoder tripped over
        reason: &'static str,
    },

    /// Output buffer cannot hold even a single record
    #[error("buffer of {available} bytes cannot hold a {required} byte record")]
    Capacity {
        /// Encoded size of the record that did not fit
        required: usize,
        /// Buffer capacity offered
        available: usize,
    },

    /// Durable store failure
    #[error("storage error: {0}")]
    Storage(StorageError),

    /// Notify failure
    #[error("transport error: {0}")]
    Transport(TransportError),

    /// Command not accepted in the current state
    #[error("{command} not accepted while {state}")]
    Protocol {
        /// Command that was rejected
        command: &'static str,
        /// State the machine was in
        state: &'static str,
    },

    /// Sensor read failed
    #[error("sensor error: {0}")]
    Sensor(SensorError),
}

impl BeaconError {
    /// Shorthand for a format error
    pub const fn format(reason: &'static str) -> Self {
        Self::Format { reason }
    }
}

impl From<StorageError> for BeaconError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

impl From<TransportError> for BeaconError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

impl From<SensorError> for BeaconError {
    fn from(err: SensorError) -> Self {
        Self::Sensor(err)
    }
}

/// Rejection of a characteristic access, reported to the client as an ATT status
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    /// Payload could not be decoded or has the wrong size
    #[error("invalid attribute value length")]
    InvalidAttributeValueLength,

    /// Characteristic is not readable
    #[error("read not permitted")]
    ReadNotPermitted,

    /// Characteristic is not writable
    #[error("write not permitted")]
    WriteNotPermitted,

    /// Request was valid but could not be served
    #[error("unlikely error")]
    Unlikely,
}

impl AccessError {
    /// ATT protocol error code
    pub const fn att_code(self) -> u8 {
        match self {
            Self::ReadNotPermitted => 0x02,
            Self::WriteNotPermitted => 0x03,
            Self::InvalidAttributeValueLength => 0x0D,
            Self::Unlikely => 0x0E,
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for BeaconError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Format { reason } =>
                defmt::write!(fmt, "Format: {}", reason),
            Self::Capacity { required, available } =>
                defmt::write!(fmt, "Capacity: need {} have {}", required, available),
            Self::Storage(err) =>
                defmt::write!(fmt, "Storage: {}", defmt::Debug2Format(err)),
            Self::Transport(err) =>
                defmt::write!(fmt, "Transport: {}", defmt::Debug2Format(err)),
            Self::Protocol { command, state } =>
                defmt::write!(fmt, "Protocol: {} while {}", command, state),
            Self::Sensor(err) =>
                defmt::write!(fmt, "Sensor: {}", defmt::Debug2Format(err)),
        }
    }
}
