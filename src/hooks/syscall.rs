//! Syscall counts and latency, fed by the raw syscall entry and exit
//! tracepoints.
//!
//! Entry classifies the syscall into a family, bumps the per-CPU family
//! counter and the caller's per-cgroup family counter, and records the
//! start timestamp keyed by thread id. Exit correlates the start, computes
//! the latency, and lands it in the family's histogram.

use crate::cgroup::CgroupAttributor;
use crate::classify::{syscall_groups, ClassificationTable, SYSCALL_GROUPS};
use crate::config::Config;
use crate::counters::{CgroupCounters, CounterBank};
use crate::histogram::{Histogram, HistogramError};
use crate::interval::IntervalTable;
use crate::probe::TaskContext;

pub struct SyscallHooks {
    lut: ClassificationTable,
    counters: CounterBank,
    start: IntervalTable,
    latency: Vec<Histogram>,
    attributor: CgroupAttributor,
    per_cgroup: Vec<CgroupCounters>,
}

impl SyscallHooks {
    pub fn new(config: &Config) -> Result<Self, HistogramError> {
        let latency = (0..SYSCALL_GROUPS)
            .map(|_| {
                Histogram::new(
                    config.histogram_grouping_power(),
                    config.histogram_max_value_power(),
                )
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            lut: syscall_groups(config.max_syscall_id()),
            counters: CounterBank::new(config.max_cpus(), SYSCALL_GROUPS),
            start: IntervalTable::new(config.max_pid()),
            latency,
            attributor: CgroupAttributor::new(config.max_cgroups(), config.channel_capacity()),
            per_cgroup: (0..SYSCALL_GROUPS)
                .map(|_| CgroupCounters::new(config.max_cgroups()))
                .collect(),
        })
    }

    /// Syscall entry. Negative ids (errors and non-syscall traps) are
    /// ignored.
    pub fn on_sys_enter(
        &self,
        cpu: usize,
        tid: u32,
        syscall_id: i64,
        ts: u64,
        task: &dyn TaskContext,
    ) {
        if syscall_id < 0 {
            return;
        }

        self.start.begin(tid as usize, ts);

        let group = self.lut.classify(syscall_id as usize);
        self.counters.incr(cpu, group);

        if let Some(attribution) = self.attributor.attribute(task, &self.per_cgroup) {
            self.per_cgroup[group].incr(attribution.id);
        }
    }

    /// Syscall exit. A missed entry contributes nothing.
    pub fn on_sys_exit(&self, tid: u32, syscall_id: i64, ts: u64) {
        if syscall_id < 0 {
            return;
        }

        let Some(latency) = self.start.end(tid as usize, ts) else {
            return;
        };

        let group = self.lut.classify(syscall_id as usize);
        self.latency[group].observe(latency);
    }

    /// Task teardown: clear any in-flight start for the exiting thread.
    pub fn on_task_exit(&self, tid: u32) {
        self.start.teardown(tid as usize);
    }

    pub fn counters(&self) -> &CounterBank {
        &self.counters
    }

    pub fn latency(&self, group: usize) -> Option<&Histogram> {
        self.latency.get(group)
    }

    pub fn per_cgroup(&self, group: usize) -> Option<&CgroupCounters> {
        self.per_cgroup.get(group)
    }

    pub fn attributor(&self) -> &CgroupAttributor {
        &self.attributor
    }
}
