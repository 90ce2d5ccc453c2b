use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tracing::warn;

use super::CgroupInfo;

struct Slot {
    seq: AtomicUsize,
    value: UnsafeCell<CgroupInfo>,
}

/// Bounded out-of-band channel carrying cgroup metadata records from the
/// hooks to the external reader.
///
/// Producers are the hooks, running concurrently on every CPU; each send
/// reserves a slot with one atomic RMW, writes the record, and publishes it
/// with one release store. A full channel drops the record and counts the
/// drop - the reader is expected to drain promptly, and a missed record only
/// costs a label, never a counter.
pub struct MetadataChannel {
    slots: Box<[Slot]>,
    mask: usize,
    enqueue_pos: AtomicUsize,
    dequeue_pos: AtomicUsize,
    dropped: AtomicU64,
    reported: AtomicU64,
}

unsafe impl Send for MetadataChannel {}
unsafe impl Sync for MetadataChannel {}

impl MetadataChannel {
    /// Create a channel holding at least `capacity` records (rounded up to a
    /// power of two).
    pub fn new(capacity: usize) -> Self {
        let slots = capacity.next_power_of_two().max(2);

        Self {
            slots: (0..slots)
                .map(|seq| Slot {
                    seq: AtomicUsize::new(seq),
                    value: UnsafeCell::new(CgroupInfo::default()),
                })
                .collect(),
            mask: slots - 1,
            enqueue_pos: AtomicUsize::new(0),
            dequeue_pos: AtomicUsize::new(0),
            dropped: AtomicU64::new(0),
            reported: AtomicU64::new(0),
        }
    }

    /// Append a record. Returns `false` and counts a drop if the channel is
    /// full.
    pub fn send(&self, info: CgroupInfo) -> bool {
        let mut pos = self.enqueue_pos.load(Ordering::Relaxed);

        loop {
            let slot = &self.slots[pos & self.mask];
            let seq = slot.seq.load(Ordering::Acquire);
            let diff = seq as isize - pos as isize;

            if diff == 0 {
                // the slot is free: reserve it
                match self.enqueue_pos.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        unsafe {
                            *slot.value.get() = info;
                        }
                        slot.seq.store(pos.wrapping_add(1), Ordering::Release);
                        return true;
                    }
                    Err(current) => pos = current,
                }
            } else if diff < 0 {
                // the consumer has not freed this slot yet: full
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return false;
            } else {
                // another producer claimed this slot
                pos = self.enqueue_pos.load(Ordering::Relaxed);
            }
        }
    }

    /// Take the oldest published record, if any.
    pub fn recv(&self) -> Option<CgroupInfo> {
        let mut pos = self.dequeue_pos.load(Ordering::Relaxed);

        loop {
            let slot = &self.slots[pos & self.mask];
            let seq = slot.seq.load(Ordering::Acquire);
            let diff = seq as isize - pos.wrapping_add(1) as isize;

            if diff == 0 {
                match self.dequeue_pos.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        let value = unsafe { *slot.value.get() };
                        slot.seq
                            .store(pos.wrapping_add(self.mask + 1), Ordering::Release);
                        return Some(value);
                    }
                    Err(current) => pos = current,
                }
            } else if diff < 0 {
                // nothing published at this position yet
                return None;
            } else {
                pos = self.dequeue_pos.load(Ordering::Relaxed);
            }
        }
    }

    /// Drain every published record into `f`, returning how many were
    /// consumed. Reader-side only.
    pub fn drain(&self, mut f: impl FnMut(CgroupInfo)) -> usize {
        let mut consumed = 0;

        while let Some(info) = self.recv() {
            f(info);
            consumed += 1;
        }

        let dropped = self.dropped.load(Ordering::Relaxed);
        let reported = self.reported.swap(dropped, Ordering::Relaxed);
        if dropped > reported {
            warn!(
                "metadata channel dropped {} records since last drain",
                dropped - reported
            );
        }

        consumed
    }

    /// Total records dropped to date because the channel was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
