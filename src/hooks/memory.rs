//! NUMA allocation accounting, fed by the zone statistics update on the
//! page allocation path.
//!
//! Each allocation resolves three node identities: the node the allocation
//! was intended for, the node whose zone actually served it, and the node
//! the allocating CPU belongs to. Hits and misses are accounted against the
//! serving node; a miss is additionally a foreign allocation from the
//! intended node's point of view. Local/other tracks whether the serving
//! node is the allocating CPU's own.

use crate::config::Config;
use crate::counters::CounterBank;

/// NUMA allocation outcomes, matching the kernel's vmstat NUMA events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum NumaEvent {
    Hit = 0,
    Miss = 1,
    Foreign = 2,
    Interleave = 3,
    Local = 4,
    Other = 5,
}

pub const NUMA_EVENTS: usize = 6;

impl NumaEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Foreign => "foreign",
            Self::Interleave => "interleave",
            Self::Local => "local",
            Self::Other => "other",
        }
    }
}

pub struct NumaHooks {
    events: CounterBank,
}

impl NumaHooks {
    pub fn new(config: &Config) -> Self {
        Self {
            events: CounterBank::new(config.max_numa_nodes(), NUMA_EVENTS),
        }
    }

    /// An allocation of `pages` pages was served by `zone_node`, intended
    /// for `preferred_node`, on a CPU belonging to `local_node`. Negative
    /// node ids (unresolvable zones) are ignored.
    pub fn on_zone_statistics(
        &self,
        preferred_node: i32,
        zone_node: i32,
        local_node: i32,
        pages: u64,
    ) {
        if preferred_node < 0 || zone_node < 0 {
            return;
        }

        let zone_node = zone_node as usize;

        if zone_node == preferred_node as usize {
            self.events.add(zone_node, NumaEvent::Hit as usize, pages);
        } else {
            self.events.add(zone_node, NumaEvent::Miss as usize, pages);
            // the intended node sees the allocation leave
            self.events
                .add(preferred_node as usize, NumaEvent::Foreign as usize, pages);
        }

        if local_node >= 0 && zone_node == local_node as usize {
            self.events.add(zone_node, NumaEvent::Local as usize, pages);
        } else {
            self.events.add(zone_node, NumaEvent::Other as usize, pages);
        }
    }

    /// An interleave-policy allocation landed on its designated node.
    pub fn on_interleave_hit(&self, zone_node: i32, pages: u64) {
        if zone_node < 0 {
            return;
        }

        self.events
            .add(zone_node as usize, NumaEvent::Interleave as usize, pages);
    }

    pub fn events(&self) -> &CounterBank {
        &self.events
    }
}
