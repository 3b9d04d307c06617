//! Time sources for sample timestamps
//!
//! Log records are stamped in milliseconds since boot, the way the firmware's
//! high resolution timer counts. Hosts that run the core on a PC can use the
//! wall clock instead; clients only ever compare timestamps with each other.

use core::cell::Cell;

/// Timestamp in milliseconds since boot (or since epoch for wall clocks)
pub type Timestamp = u64;

/// Source of time for the beacon
pub trait TimeSource {
    /// Current timestamp in milliseconds
    fn now(&self) -> Timestamp;

    /// Whether this source provides wall clock time (vs monotonic)
    fn is_wall_clock(&self) -> bool {
        false
    }
}

/// Monotonic time since this clock was created
///
/// On `std` hosts this reads `std::time::Instant`. Without `std` the firmware
/// feeds the hardware timer in through [`MonotonicClock::set_micros`].
#[derive(Debug)]
pub struct MonotonicClock {
    #[cfg(feature = "std")]
    origin: std::time::Instant,
    #[cfg(not(feature = "std"))]
    micros: Cell<u64>,
}

impl MonotonicClock {
    /// Start counting from zero
    pub fn new() -> Self {
        Self {
            #[cfg(feature = "std")]
            origin: std::time::Instant::now(),
            #[cfg(not(feature = "std"))]
            micros: Cell::new(0),
        }
    }

    /// Update from a microsecond hardware counter
    #[cfg(not(feature = "std"))]
    pub fn set_micros(&self, micros: u64) {
        self.micros.set(micros);
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicClock {
    #[cfg(feature = "std")]
    fn now(&self) -> Timestamp {
        self.origin.elapsed().as_millis() as Timestamp
    }

    #[cfg(not(feature = "std"))]
    fn now(&self) -> Timestamp {
        self.micros.get() / crate::constants::time::US_PER_MS
    }
}

/// System wall clock (requires std)
#[cfg(feature = "std")]
#[derive(Debug, Clone, Default)]
pub struct SystemTime;

#[cfg(feature = "std")]
impl TimeSource for SystemTime {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime as StdSystemTime, UNIX_EPOCH};

        StdSystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }

    fn is_wall_clock(&self) -> bool {
        true
    }
}

/// Manually driven time source for tests and simulations
#[derive(Debug, Clone, Default)]
pub struct FixedTime {
    timestamp: Cell<Timestamp>,
}

impl FixedTime {
    /// Clock frozen at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp: Cell::new(timestamp) }
    }

    /// Jump to `timestamp`
    pub fn set(&self, timestamp: Timestamp) {
        self.timestamp.set(timestamp);
    }

    /// Move forward by `ms`
    pub fn advance(&self, ms: u64) {
        self.timestamp.set(self.timestamp.get().saturating_add(ms));
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp.get()
    }
}
