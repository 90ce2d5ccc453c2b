//! Softirq counts and time, fed by the softirq entry and exit tracepoints.
//!
//! Softirqs nest below hardirqs but never below each other on one CPU, so
//! the in-flight entry timestamp is keyed by CPU id. Exit folds the vector
//! number through the classification table and accumulates both an event
//! count and the handler duration in nanoseconds.

use crate::classify::{softirq_groups, ClassificationTable, SOFTIRQ_GROUPS};
use crate::config::Config;
use crate::counters::CounterBank;
use crate::interval::IntervalTable;

pub struct SoftirqHooks {
    lut: ClassificationTable,
    counts: CounterBank,
    time: CounterBank,
    start: IntervalTable,
}

impl SoftirqHooks {
    pub fn new(config: &Config) -> Self {
        Self {
            lut: softirq_groups(),
            counts: CounterBank::new(config.max_cpus(), SOFTIRQ_GROUPS),
            time: CounterBank::new(config.max_cpus(), SOFTIRQ_GROUPS),
            start: IntervalTable::new(config.max_cpus()),
        }
    }

    pub fn on_softirq_entry(&self, cpu: usize, ts: u64) {
        self.start.begin(cpu, ts);
    }

    /// Softirq exit. A missed entry contributes nothing.
    pub fn on_softirq_exit(&self, cpu: usize, vec_nr: u32, ts: u64) {
        let Some(duration) = self.start.end(cpu, ts) else {
            return;
        };

        let group = self.lut.classify(vec_nr as usize);

        self.counts.incr(cpu, group);
        self.time.add(cpu, group, duration);
    }

    pub fn counts(&self) -> &CounterBank {
        &self.counts
    }

    /// Cumulative handler time in nanoseconds per `(cpu, group)`.
    pub fn time(&self) -> &CounterBank {
        &self.time
    }
}
