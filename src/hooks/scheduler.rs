//! Scheduler runqueue and on/off-CPU accounting, fed by the wakeup and
//! switch tracepoints.
//!
//! A wakeup places the thread in the runqueue; the switch-in correlates it
//! into a runqueue wait. Switching also closes the previous thread's
//! running interval and opens its off-CPU interval. A thread switched out
//! while still runnable was preempted: that is an involuntary context
//! switch, and the thread goes straight back to the runqueue. The runnable
//! check reads the task state word through the layout reader resolved at
//! initialization; without one, preemption accounting is skipped for the
//! session.
//!
//! The swapper threads (tid 0) are never tracked.

use crate::cgroup::CgroupAttributor;
use crate::config::Config;
use crate::counters::{CgroupCounters, CounterBank};
use crate::histogram::{Histogram, HistogramError};
use crate::interval::IntervalTable;
use crate::probe::{TaskContext, TaskStateReader, TASK_RUNNING};

const IVCSW: usize = 0;
const RUNQUEUE_WAIT: usize = 1;
const PER_CGROUP_SETS: usize = 2;

pub struct SchedulerHooks {
    runqueue: IntervalTable,
    running: IntervalTable,
    offcpu: IntervalTable,
    runqueue_latency: Histogram,
    running_time: Histogram,
    offcpu_time: Histogram,
    ivcsw: CounterBank,
    state_reader: Option<TaskStateReader>,
    attributor: CgroupAttributor,
    per_cgroup: Vec<CgroupCounters>,
}

impl SchedulerHooks {
    pub fn new(
        config: &Config,
        state_reader: Option<TaskStateReader>,
    ) -> Result<Self, HistogramError> {
        let grouping_power = config.histogram_grouping_power();
        let max_value_power = config.histogram_max_value_power();

        Ok(Self {
            runqueue: IntervalTable::new(config.max_pid()),
            running: IntervalTable::new(config.max_pid()),
            offcpu: IntervalTable::new(config.max_pid()),
            runqueue_latency: Histogram::new(grouping_power, max_value_power)?,
            running_time: Histogram::new(grouping_power, max_value_power)?,
            offcpu_time: Histogram::new(grouping_power, max_value_power)?,
            ivcsw: CounterBank::new(config.max_cpus(), 1),
            state_reader,
            attributor: CgroupAttributor::new(config.max_cgroups(), config.channel_capacity()),
            per_cgroup: (0..PER_CGROUP_SETS)
                .map(|_| CgroupCounters::new(config.max_cgroups()))
                .collect(),
        })
    }

    /// A thread became runnable and entered the runqueue.
    pub fn on_sched_wakeup(&self, tid: u32, ts: u64) {
        if tid == 0 {
            return;
        }

        self.runqueue.begin(tid as usize, ts);
    }

    /// A context switch from `prev` to `next` on `cpu`.
    pub fn on_sched_switch(
        &self,
        cpu: usize,
        prev: &dyn TaskContext,
        prev_tid: u32,
        next: &dyn TaskContext,
        next_tid: u32,
        ts: u64,
    ) {
        if next_tid != 0 {
            // next leaves the runqueue and starts running
            if let Some(wait) = self.runqueue.end(next_tid as usize, ts) {
                self.runqueue_latency.observe(wait);

                if let Some(attribution) = self.attributor.attribute(next, &self.per_cgroup) {
                    self.per_cgroup[RUNQUEUE_WAIT].add(attribution.id, wait);
                }
            }

            if let Some(offcpu) = self.offcpu.end(next_tid as usize, ts) {
                self.offcpu_time.observe(offcpu);
            }

            self.running.begin(next_tid as usize, ts);
        }

        if prev_tid != 0 {
            if let Some(ran) = self.running.end(prev_tid as usize, ts) {
                self.running_time.observe(ran);
            }

            self.offcpu.begin(prev_tid as usize, ts);

            // still runnable at switch-out means preempted
            if let Some(reader) = self.state_reader {
                if reader.read(prev) == Some(TASK_RUNNING) {
                    self.ivcsw.incr(cpu, 0);
                    self.runqueue.begin(prev_tid as usize, ts);

                    if let Some(attribution) = self.attributor.attribute(prev, &self.per_cgroup) {
                        self.per_cgroup[IVCSW].incr(attribution.id);
                    }
                }
            }
        }
    }

    /// Task teardown: clear every in-flight interval for the exiting
    /// thread.
    pub fn on_task_exit(&self, tid: u32) {
        self.runqueue.teardown(tid as usize);
        self.running.teardown(tid as usize);
        self.offcpu.teardown(tid as usize);
    }

    pub fn runqueue_latency(&self) -> &Histogram {
        &self.runqueue_latency
    }

    pub fn running_time(&self) -> &Histogram {
        &self.running_time
    }

    pub fn offcpu_time(&self) -> &Histogram {
        &self.offcpu_time
    }

    pub fn ivcsw(&self) -> &CounterBank {
        &self.ivcsw
    }

    pub fn per_cgroup_ivcsw(&self) -> &CgroupCounters {
        &self.per_cgroup[IVCSW]
    }

    pub fn per_cgroup_runqueue_wait(&self) -> &CgroupCounters {
        &self.per_cgroup[RUNQUEUE_WAIT]
    }

    pub fn attributor(&self) -> &CgroupAttributor {
        &self.attributor
    }
}
