//! Time-Related Constants

// ===== TIME UNIT CONVERSIONS =====

/// Milliseconds per second.
pub const MS_PER_SECOND: u64 = 1000;

/// Microseconds per millisecond.
pub const US_PER_MS: u64 = 1000;

// ===== SAMPLING INTERVALS =====

/// Default sampling interval (seconds).
///
/// Used when no configuration is stored or the stored interval is zero.
pub const DEFAULT_SAMPLE_INTERVAL_SECS: u64 = 60;

/// Shortest sampling interval a client may configure (seconds).
pub const MIN_SAMPLE_INTERVAL_SECS: u64 = 1;
