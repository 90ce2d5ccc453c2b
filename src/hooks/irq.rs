//! Hard IRQ counts and time, fed by the irq handler entry and exit
//! tracepoints.
//!
//! Same shape as softirq accounting, but the identifier space is the IRQ
//! number, whose grouping is host-specific: the loader builds the
//! classification table (typically from the interrupt names it discovers)
//! and hands it in at construction.

use crate::classify::ClassificationTable;
use crate::config::Config;
use crate::counters::CounterBank;
use crate::interval::IntervalTable;

pub struct IrqHooks {
    lut: ClassificationTable,
    counts: CounterBank,
    time: CounterBank,
    start: IntervalTable,
}

impl IrqHooks {
    pub fn new(config: &Config, lut: ClassificationTable) -> Self {
        let groups = lut.groups();

        Self {
            lut,
            counts: CounterBank::new(config.max_cpus(), groups),
            time: CounterBank::new(config.max_cpus(), groups),
            start: IntervalTable::new(config.max_cpus()),
        }
    }

    pub fn on_irq_entry(&self, cpu: usize, ts: u64) {
        self.start.begin(cpu, ts);
    }

    /// IRQ handler exit. A missed entry contributes nothing.
    pub fn on_irq_exit(&self, cpu: usize, irq: u32, ts: u64) {
        let Some(duration) = self.start.end(cpu, ts) else {
            return;
        };

        let group = self.lut.classify(irq as usize);

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
