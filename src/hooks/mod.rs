//! Per-event-family hook compositions.
//!
//! Each type here is the body of one family of kernel event handlers,
//! assembled from the core pieces and sized once from [`Config`]. The
//! attach plumbing lives outside this crate: the wiring decodes the raw
//! event and calls the matching `on_*` entry point with plain arguments.
//! Entry points follow the hook contract - bounded work, no allocation, no
//! errors, every failed lookup dropping exactly one observation.
//!
//! [`Config`]: crate::config::Config

mod irq;
mod memory;
mod scheduler;
mod softirq;
mod syscall;
mod tcp;
mod tlb_flush;

pub use irq::IrqHooks;
pub use memory::{NumaEvent, NumaHooks, NUMA_EVENTS};
pub use scheduler::SchedulerHooks;
pub use softirq::SoftirqHooks;
pub use syscall::SyscallHooks;
pub use tcp::PacketLatencyHooks;
pub use tlb_flush::{TlbFlushHooks, TlbFlushReason, TLB_FLUSH_REASONS};
