//! Fixed-Capacity Sliding Window of Log Records
//!
//! ## Overview
//!
//! The log keeps the most recent `N` samples. Conceptually it is a sliding
//! window: when full, appending a record shifts the oldest one out. Physically
//! shifting `N - 1` records on every sample would cost a `memmove` of the
//! whole window each tick, so the window is a ring with a logical view on top:
//!
//! ```text
//! Physical array:  [D, E, A, B, C]   head = 2, len = 5
//!                   0  1  2  3  4
//!
//! Logical view:    [A, B, C, D, E]   index 0 = oldest
//!                   0  1  2  3  4
//!
//! logical[i] = physical[(head + i) % N]
//! ```
//!
//! Appending `F` to the full window above overwrites `A` in place and moves
//! `head` to 3; callers still see a window shifted by one.
//!
//! ## Memory Layout
//!
//! ```text
//! RecordWindow<100>:
//! ├── slots: 100 × 16 bytes = 1600 bytes
//! ├── head:  8 bytes
//! └── len:   8 bytes
//! ```
//!
//! No heap, no `Option` per slot: unused slots hold `LogRecord::ZERO` and are
//! never observable through the logical view.

use crate::record::LogRecord;

/// Ring-backed sliding window of at most `N` records
#[derive(Clone)]
pub struct RecordWindow<const N: usize> {
    slots: [LogRecord; N],
    /// Physical index of the oldest record
    head: usize,
    len: usize,
}

impl<const N: usize> RecordWindow<N> {
    const NON_EMPTY: () = assert!(N > 0, "window capacity must be non-zero");

    /// Create an empty window
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NON_EMPTY;
        Self {
            slots: [LogRecord::ZERO; N],
            head: 0,
            len: 0,
        }
    }

    /// Append `record`, evicting and returning the oldest one when full
    pub fn push(&mut self, record: LogRecord) -> Option<LogRecord> {
        if self.len < N {
            let slot = (self.head + self.len) % N;
            self.slots[slot] = record;
            self.len += 1;
            None
        } else {
            let evicted = core::mem::replace(&mut self.slots[self.head], record);
            self.head = (self.head + 1) % N;
            Some(evicted)
        }
    }

    /// Record at logical `index` (0 = oldest)
    pub fn get(&self, index: usize) -> Option<LogRecord> {
        if index >= self.len {
            return None;
        }
        Some(self.slots[(self.head + index) % N])
    }

    /// Copy records starting at logical `start` into `out`
    ///
    /// Returns how many were copied; `start >= len` copies nothing.
    pub fn copy_range(&self, start: usize, out: &mut [LogRecord]) -> usize {
        let available = self.len.saturating_sub(start);
        let count = available.min(out.len());
        for (i, slot) in out.iter_mut().take(count).enumerate() {
            *slot = self.slots[(self.head + start + i) % N];
        }
        count
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no record is stored
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when the next push evicts
    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Maximum number of records
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Oldest-to-newest iterator over copies of the records
    pub fn iter(&self) -> RecordWindowIter<'_, N> {
        RecordWindowIter { window: self, index: 0 }
    }

    /// Forget every record
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

impl<const N: usize> Default for RecordWindow<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> core::fmt::Debug for RecordWindow<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Iterator over a [`RecordWindow`], oldest first
pub struct RecordWindowIter<'a, const N: usize> {
    window: &'a RecordWindow<N>,
    index: usize,
}

impl<'a, const N: usize> Iterator for RecordWindowIter<'a, N> {
    type Item = LogRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.window.get(self.index)?;
        self.index += 1;
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.window.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl<'a, const N: usize> ExactSizeIterator for RecordWindowIter<'a, N> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(i: u64) -> LogRecord {
        LogRecord::new(i as f32, 50.0 + i as f32, i)
    }

    #[test]
    fn empty_window() {
        let window: RecordWindow<5> = RecordWindow::new();
        assert!(window.is_empty());
        assert_eq!(window.len(), 0);
        assert!(window.get(0).is_none());
        assert_eq!(window.capacity(), 5);
    }

    #[test]
    fn push_until_full_evicts_nothing() {
        let mut window = RecordWindow::<3>::new();
        for i in 0..3 {
            assert!(window.push(rec(i)).is_none());
        }
        assert!(window.is_full());
    }

    #[test]
    fn overwrite_keeps_chronological_order() {
        let mut window = RecordWindow::<3>::new();

        for i in 0..5 {
            window.push(rec(i));
        }

        assert_eq!(window.len(), 3);
        let stamps: Vec<u64> = window.iter().map(|r| r.timestamp).collect();
        assert_eq!(stamps, vec![2, 3, 4]);
    }

    #[test]
    fn push_returns_evicted_record() {
        let mut window = RecordWindow::<2>::new();
        window.push(rec(0));
        window.push(rec(1));
        assert_eq!(window.push(rec(2)), Some(rec(0)));
        assert_eq!(window.push(rec(3)), Some(rec(1)));
    }

    #[test]
    fn copy_range_wraps_around_the_ring() {
        let mut window = RecordWindow::<4>::new();
        for i in 0..6 {
            window.push(rec(i));
        }

        let mut out = [LogRecord::ZERO; 3];
        assert_eq!(window.copy_range(1, &mut out), 3);
        assert_eq!(out.map(|r| r.timestamp), [3, 4, 5]);

        assert_eq!(window.copy_range(3, &mut out), 1);
        assert_eq!(out[0].timestamp, 5);

        assert_eq!(window.copy_range(4, &mut out), 0);
        assert_eq!(window.copy_range(99, &mut out), 0);
    }

    #[test]
    fn clear_resets() {
        let mut window = RecordWindow::<3>::new();
        window.push(rec(1));
        window.push(rec(2));
        window.clear();
        assert!(window.is_empty());
        window.push(rec(7));
        assert_eq!(window.get(0), Some(rec(7)));
    }
}
