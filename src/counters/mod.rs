//! Fixed-capacity counter banks.
//!
//! A bank holds one group of counters per dimension (typically one bank of
//! group counters per CPU, or one slot per cgroup). Each dimension's bank is
//! padded to a whole number of cachelines so concurrent writers on different
//! dimensions do not false-share. Updates are single relaxed fetch-adds;
//! out-of-range updates are silently dropped because the hook context has no
//! way to surface an error.

use core::sync::atomic::{AtomicU64, Ordering};

use crate::common::{whole_cachelines, COUNTERS_PER_CACHELINE};

/// A dense two-level counter array indexed by `(dimension, group)`.
///
/// The readable layout is `index = dimension * bank_width + group` where
/// `bank_width` is the group width rounded up to a whole cacheline. Readers
/// may observe values that are either pre- or post-increment relative to any
/// concurrent writer, never torn ones.
pub struct CounterBank {
    slots: Box<[AtomicU64]>,
    dimensions: usize,
    groups: usize,
    bank_width: usize,
}

impl CounterBank {
    /// Create a bank with `dimensions` banks of `groups` counters each, all
    /// zero. Capacity is fixed for the life of the bank.
    pub fn new(dimensions: usize, groups: usize) -> Self {
        // each dimension gets the next nearest whole number of cachelines
        let bank_cachelines = whole_cachelines::<u64>(groups);
        let bank_width = bank_cachelines * COUNTERS_PER_CACHELINE;

        let slots = (0..dimensions * bank_width)
            .map(|_| AtomicU64::new(0))
            .collect();

        Self {
            slots,
            dimensions,
            groups,
            bank_width,
        }
    }

    /// Add `delta` to the counter at `(dimension, group)`. Out-of-range
    /// indices are dropped.
    pub fn add(&self, dimension: usize, group: usize, delta: u64) {
        if dimension >= self.dimensions || group >= self.groups {
            return;
        }

        self.slots[dimension * self.bank_width + group].fetch_add(delta, Ordering::Relaxed);
    }

    /// Increment the counter at `(dimension, group)` by one.
    pub fn incr(&self, dimension: usize, group: usize) {
        self.add(dimension, group, 1);
    }

    /// Read one slot. Out-of-range reads return zero.
    pub fn value(&self, dimension: usize, group: usize) -> u64 {
        if dimension >= self.dimensions || group >= self.groups {
            return 0;
        }

        self.slots[dimension * self.bank_width + group].load(Ordering::Relaxed)
    }

    /// Sum one group across every dimension. This is the reader-side
    /// aggregate; it is not synchronized with writers beyond per-slot
    /// atomicity.
    pub fn total(&self, group: usize) -> u64 {
        if group >= self.groups {
            return 0;
        }

        let mut total: u64 = 0;

        for dimension in 0..self.dimensions {
            let value = self.slots[dimension * self.bank_width + group].load(Ordering::Relaxed);
            total = total.wrapping_add(value);
        }

        total
    }

    /// Copy out the raw slot values, `bank_width` apart per dimension.
    pub fn load(&self) -> Vec<u64> {
        self.slots
            .iter()
            .map(|slot| slot.load(Ordering::Relaxed))
            .collect()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn groups(&self) -> usize {
        self.groups
    }

    /// The stride for reading through the raw values.
    pub fn bank_width(&self) -> usize {
        self.bank_width
    }
}

/// Counters scoped to cgroup ids: one slot per id, no grouping. Slots are
/// zeroed, not removed, when an id is observed with a new serial number.
pub struct CgroupCounters {
    slots: Box<[AtomicU64]>,
}

impl CgroupCounters {
    pub fn new(max_cgroups: usize) -> Self {
        let slots = (0..max_cgroups).map(|_| AtomicU64::new(0)).collect();

        Self { slots }
    }

    /// Add `delta` to the slot for `id`. Out-of-range ids are dropped.
    pub fn add(&self, id: u32, delta: u64) {
        if let Some(slot) = self.slots.get(id as usize) {
            slot.fetch_add(delta, Ordering::Relaxed);
        }
    }

    /// Increment the slot for `id` by one.
    pub fn incr(&self, id: u32) {
        self.add(id, 1);
    }

    /// Reset the slot for `id` to zero. Invoked when the id is observed with
    /// a new serial number, so counts never carry across cgroup reuse.
    pub fn zero(&self, id: u32) {
        if let Some(slot) = self.slots.get(id as usize) {
            slot.store(0, Ordering::Relaxed);
        }
    }

    pub fn value(&self, id: u32) -> u64 {
        self.slots
            .get(id as usize)
            .map(|slot| slot.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bank_width_is_cacheline_padded() {
        let bank = CounterBank::new(4, 2);
        assert_eq!(bank.bank_width(), COUNTERS_PER_CACHELINE);

        let bank = CounterBank::new(4, 9);
        assert_eq!(bank.bank_width(), 2 * COUNTERS_PER_CACHELINE);
    }

    #[test]
    fn test_add_and_total() {
        let bank = CounterBank::new(4, 2);

        bank.incr(0, 1);
        bank.add(1, 1, 2);
        bank.add(3, 0, 7);

        assert_eq!(bank.value(0, 1), 1);
        assert_eq!(bank.value(1, 1), 2);
        assert_eq!(bank.total(1), 3);
        assert_eq!(bank.total(0), 7);
    }

    #[test]
    fn test_out_of_range_updates_are_dropped() {
        let bank = CounterBank::new(2, 2);

        bank.incr(2, 0);
        bank.incr(0, 2);
        bank.add(7, 7, 100);

        assert_eq!(bank.total(0), 0);
        assert_eq!(bank.total(1), 0);
        assert_eq!(bank.value(7, 7), 0);
    }

    // 4 CPUs incrementing the same group concurrently: the dimension-summed
    // total must equal the number of increments issued.
    #[test]
    fn test_concurrent_increments_are_conserved() {
        let bank = CounterBank::new(4, 2);

        std::thread::scope(|s| {
            for cpu in 0..4 {
                let bank = &bank;
                s.spawn(move || {
                    for _ in 0..100 {
                        bank.incr(cpu, 1);
                    }
                });
            }
        });

        assert_eq!(bank.total(1), 400);
        assert_eq!(bank.total(0), 0);
    }

    #[test]
    fn test_cgroup_counters_zero() {
        let counters = CgroupCounters::new(16);

        counters.add(7, 42);
        assert_eq!(counters.value(7), 42);

        counters.zero(7);
        assert_eq!(counters.value(7), 0);

        // out of range is dropped
        counters.incr(16);
        assert_eq!(counters.value(16), 0);
    }
}
