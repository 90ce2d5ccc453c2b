//! TLB flush accounting, fed by the tlb_flush raw tracepoint.
//!
//! Each event carries a flush reason; reasons index the per-CPU counter
//! group directly and reasons beyond the known set fall off the end of the
//! bank. Flushes are also attributed to the current task's cgroup, one
//! counter set per reason.

use crate::cgroup::CgroupAttributor;
use crate::config::Config;
use crate::counters::{CgroupCounters, CounterBank};
use crate::probe::TaskContext;

/// Flush reasons as the kernel reports them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum TlbFlushReason {
    TaskSwitch = 0,
    RemoteShootdown = 1,
    LocalShootdown = 2,
    LocalMmShootdown = 3,
    RemoteSendIpi = 4,
}

pub const TLB_FLUSH_REASONS: usize = 5;

impl TlbFlushReason {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TaskSwitch => "task_switch",
            Self::RemoteShootdown => "remote_shootdown",
            Self::LocalShootdown => "local_shootdown",
            Self::LocalMmShootdown => "local_mm_shootdown",
            Self::RemoteSendIpi => "remote_send_ipi",
        }
    }
}

pub struct TlbFlushHooks {
    events: CounterBank,
    attributor: CgroupAttributor,
    per_cgroup: Vec<CgroupCounters>,
}

impl TlbFlushHooks {
    pub fn new(config: &Config) -> Self {
        Self {
            events: CounterBank::new(config.max_cpus(), TLB_FLUSH_REASONS),
            attributor: CgroupAttributor::new(config.max_cgroups(), config.channel_capacity()),
            per_cgroup: (0..TLB_FLUSH_REASONS)
                .map(|_| CgroupCounters::new(config.max_cgroups()))
                .collect(),
        }
    }

    pub fn on_tlb_flush(&self, cpu: usize, reason: i32, task: &dyn TaskContext) {
        if reason < 0 {
            return;
        }

        let reason = reason as usize;

        // unknown reasons are dropped by the bank's bounds check
        self.events.incr(cpu, reason);

        if let Some(attribution) = self.attributor.attribute(task, &self.per_cgroup) {
            if let Some(counters) = self.per_cgroup.get(reason) {
                counters.incr(attribution.id);
            }
        }
    }

    pub fn events(&self) -> &CounterBank {
        &self.events
    }

    pub fn per_cgroup(&self, reason: TlbFlushReason) -> &CgroupCounters {
        &self.per_cgroup[reason as usize]
    }

    pub fn attributor(&self) -> &CgroupAttributor {
        &self.attributor
    }
}
