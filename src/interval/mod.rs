//! Begin/end correlation for in-flight operations.
//!
//! An interval table holds at most one pending start timestamp per key. A
//! completion with no pending start is a no-op, a second start overwrites
//! the first, and a dedicated teardown entry point clears keys whose owning
//! object (task, socket) is destroyed so the table occupancy stays bounded.
//!
//! Timestamp 0 is the vacant sentinel. Kernel monotonic timestamps are
//! nonzero, so no real start is ever confused with an empty slot.
//!
//! [`IntervalTable`] is directly indexed and suits dense identifier spaces
//! (thread ids, CPU ids). [`KeyedIntervalTable`] hashes opaque identities
//! (socket addresses) into a bounded slot array with a bounded probe
//! sequence; when every candidate slot is taken the start is dropped, which
//! reads the same as a missed start.

use core::sync::atomic::{AtomicU64, Ordering};

/// Dense key-indexed interval table. Keys at or above capacity are dropped.
pub struct IntervalTable {
    starts: Box<[AtomicU64]>,
}

impl IntervalTable {
    pub fn new(capacity: usize) -> Self {
        let starts = (0..capacity).map(|_| AtomicU64::new(0)).collect();

        Self { starts }
    }

    /// Record a start, overwriting any pending start for this key.
    pub fn begin(&self, key: usize, ts: u64) {
        if let Some(slot) = self.starts.get(key) {
            slot.store(ts, Ordering::Relaxed);
        }
    }

    /// Consume a pending start and return the elapsed time. Returns `None`
    /// for a missed start; clamps to zero if the clock ran backwards across
    /// a reused key. The entry is cleared unconditionally.
    pub fn end(&self, key: usize, ts: u64) -> Option<u64> {
        let slot = self.starts.get(key)?;
        let start = slot.swap(0, Ordering::Relaxed);

        if start == 0 {
            return None;
        }

        Some(ts.saturating_sub(start))
    }

    /// Clear a pending start without producing a duration.
    pub fn teardown(&self, key: usize) {
        if let Some(slot) = self.starts.get(key) {
            slot.store(0, Ordering::Relaxed);
        }
    }

    pub fn capacity(&self) -> usize {
        self.starts.len()
    }
}

const MAX_PROBE: usize = 8;

/// Open-addressed interval table for opaque nonzero keys.
///
/// Key 0 marks a vacant slot. Slot handoff is best-effort: a completion
/// racing a concurrent start for the same reused key may miss or mispair
/// one observation, which the callers tolerate the same way they tolerate a
/// missed start.
pub struct KeyedIntervalTable {
    keys: Box<[AtomicU64]>,
    starts: Box<[AtomicU64]>,
    mask: usize,
}

impl KeyedIntervalTable {
    /// Create a table holding at least `capacity` slots (rounded up to a
    /// power of two).
    pub fn new(capacity: usize) -> Self {
        let slots = capacity.next_power_of_two().max(MAX_PROBE);

        Self {
            keys: (0..slots).map(|_| AtomicU64::new(0)).collect(),
            starts: (0..slots).map(|_| AtomicU64::new(0)).collect(),
            mask: slots - 1,
        }
    }

    fn slot_base(&self, key: u64) -> usize {
        // Fibonacci hashing spreads pointer-like keys across the table
        (key.wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 32) as usize & self.mask
    }

    /// Record a start, overwriting any pending start for this key. A full
    /// probe sequence drops the start (lossy under pressure). Key 0 is
    /// reserved and dropped.
    pub fn begin(&self, key: u64, ts: u64) {
        self.insert(key, ts, true);
    }

    /// Record a start only if no start is pending for this key, so the
    /// earliest event wins.
    pub fn begin_if_idle(&self, key: u64, ts: u64) {
        self.insert(key, ts, false);
    }

    fn insert(&self, key: u64, ts: u64, overwrite: bool) {
        if key == 0 {
            return;
        }

        let base = self.slot_base(key);

        for probe in 0..MAX_PROBE {
            let index = (base + probe) & self.mask;
            let current = self.keys[index].load(Ordering::Relaxed);

            if current == key {
                if overwrite {
                    self.starts[index].store(ts, Ordering::Relaxed);
                }
                return;
            }

            if current == 0
                && self.keys[index]
                    .compare_exchange(0, key, Ordering::AcqRel, Ordering::Relaxed)
                    .is_ok()
            {
                self.starts[index].store(ts, Ordering::Release);
                return;
            }
        }

        // every candidate slot is occupied: drop this start
    }

    /// Consume a pending start for this key and return the elapsed time,
    /// clamped to zero on clock anomalies. Missing keys are a no-op.
    pub fn end(&self, key: u64, ts: u64) -> Option<u64> {
        let index = self.find(key)?;

        let start = self.starts[index].swap(0, Ordering::Relaxed);
        self.keys[index].store(0, Ordering::Release);

        if start == 0 {
            return None;
        }

        Some(ts.saturating_sub(start))
    }

    /// Clear any pending start for this key without producing a duration.
    pub fn teardown(&self, key: u64) {
        if let Some(index) = self.find(key) {
            self.starts[index].store(0, Ordering::Relaxed);
            self.keys[index].store(0, Ordering::Release);
        }
    }

    fn find(&self, key: u64) -> Option<usize> {
        if key == 0 {
            return None;
        }

        let base = self.slot_base(key);

        // removals punch holes, so the whole probe window is scanned rather
        // than stopping at the first vacant slot
        (0..MAX_PROBE)
            .map(|probe| (base + probe) & self.mask)
            .find(|&index| self.keys[index].load(Ordering::Acquire) == key)
    }

    pub fn capacity(&self) -> usize {
        self.keys.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_end_round_trip() {
        let table = IntervalTable::new(64);

        table.begin(42, 1000);
        assert_eq!(table.end(42, 1600), Some(600));

        // the entry was cleared
        assert_eq!(table.end(42, 1700), None);
    }

    #[test]
    fn test_second_begin_overwrites() {
        let table = IntervalTable::new(64);

        table.begin(42, 1000);
        table.begin(42, 1500);

        assert_eq!(table.end(42, 2000), Some(500));
    }

    #[test]
    fn test_end_without_begin_is_noop() {
        let table = IntervalTable::new(64);
        assert_eq!(table.end(7, 1000), None);
    }

    #[test]
    fn test_clock_anomaly_clamps_to_zero() {
        let table = IntervalTable::new(64);

        table.begin(1, 5000);
        assert_eq!(table.end(1, 4000), Some(0));
    }

    #[test]
    fn test_teardown_then_end_is_noop() {
        let table = IntervalTable::new(64);

        table.begin(3, 1000);
        table.teardown(3);

        assert_eq!(table.end(3, 2000), None);

        // teardown of an idle key is also fine
        table.teardown(3);
        assert_eq!(table.end(3, 3000), None);
    }

    #[test]
    fn test_out_of_capacity_key_is_dropped() {
        let table = IntervalTable::new(8);

        table.begin(8, 1000);
        assert_eq!(table.end(8, 2000), None);
    }

    #[test]
    fn test_keyed_round_trip() {
        let table = KeyedIntervalTable::new(64);

        table.begin(0xffff_8881_0000_1234, 1000);
        assert_eq!(table.end(0xffff_8881_0000_1234, 1250), Some(250));
        assert_eq!(table.end(0xffff_8881_0000_1234, 1300), None);
    }

    #[test]
    fn test_keyed_begin_if_idle_keeps_earliest() {
        let table = KeyedIntervalTable::new(64);

        table.begin_if_idle(99, 1000);
        table.begin_if_idle(99, 1500);

        assert_eq!(table.end(99, 2000), Some(1000));
    }

    #[test]
    fn test_keyed_distinct_keys_do_not_correlate() {
        let table = KeyedIntervalTable::new(64);

        let a = 0x1000;
        let b = a + 64 * 1024;

        table.begin(a, 1000);
        table.begin(b, 2000);

        assert_eq!(table.end(b, 2500), Some(500));
        assert_eq!(table.end(a, 3000), Some(2000));
    }

    #[test]
    fn test_keyed_drops_when_probe_window_full() {
        let table = KeyedIntervalTable::new(8);

        // saturate the table
        for key in 1..=8u64 {
            table.begin(key, 100);
        }

        // this key's entire probe window is occupied
        table.begin(1000, 200);
        assert_eq!(table.end(1000, 300), None);

        // existing entries are unharmed
        let mut found = 0;
        for key in 1..=8u64 {
            if table.end(key, 150).is_some() {
                found += 1;
            }
        }
        assert_eq!(found, 8);
    }

    #[test]
    fn test_keyed_teardown() {
        let table = KeyedIntervalTable::new(64);

        table.begin(7, 1000);
        table.teardown(7);
        assert_eq!(table.end(7, 2000), None);

        table.teardown(7);
        assert_eq!(table.end(7, 2000), None);
    }

    #[test]
    fn test_keyed_zero_key_is_reserved() {
        let table = KeyedIntervalTable::new(64);

        table.begin(0, 1000);
        assert_eq!(table.end(0, 2000), None);
    }
}
