use super::ClassificationTable;

/// Softirq vectors, offset by one so group 0 stays "other" for any vector
/// the running kernel defines beyond the ones known here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum SoftirqGroup {
    Other = 0,
    Hi = 1,
    Timer = 2,
    NetTx = 3,
    NetRx = 4,
    Block = 5,
    IrqPoll = 6,
    Tasklet = 7,
    Sched = 8,
    Hrtimer = 9,
    Rcu = 10,
}

pub const SOFTIRQ_GROUPS: usize = 11;

/// The softirq vector count as of every kernel this crate targets.
const NR_SOFTIRQS: usize = 10;

impl SoftirqGroup {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Other => "other",
            Self::Hi => "hi",
            Self::Timer => "timer",
            Self::NetTx => "net_tx",
            Self::NetRx => "net_rx",
            Self::Block => "block",
            Self::IrqPoll => "irq_poll",
            Self::Tasklet => "tasklet",
            Self::Sched => "sched",
            Self::Hrtimer => "hrtimer",
            Self::Rcu => "rcu",
        }
    }
}

/// Build the softirq classification table: vector `n` maps to group `n + 1`.
pub fn softirq_groups() -> ClassificationTable {
    let entries = (0..NR_SOFTIRQS).map(|vec_nr| vec_nr as u32 + 1).collect();

    ClassificationTable::new(SOFTIRQ_GROUPS, entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vectors_map_to_groups() {
        let table = softirq_groups();

        assert_eq!(table.classify(0), SoftirqGroup::Hi as usize);
        assert_eq!(table.classify(3), SoftirqGroup::NetRx as usize);
        assert_eq!(table.classify(9), SoftirqGroup::Rcu as usize);
        // vectors beyond the known set fold into other
        assert_eq!(table.classify(10), SoftirqGroup::Other as usize);
    }
}
