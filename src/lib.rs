//! Lock-free aggregation core for kernel-resident telemetry hooks.
//!
//! Event hooks run inline on whichever CPU the kernel event fires on. They
//! may not block, may not allocate, and cannot propagate errors, so every
//! structure here is a fixed-capacity arena sized once at load time and
//! mutated only through single-word atomics. A failed bounded lookup drops
//! that one observation; nothing in the hot path retries or escalates.
//!
//! The core pieces, reused by every hook:
//!
//! * [`counters::CounterBank`] - per-CPU-sharded counter slots
//! * [`histogram::Histogram`] - logarithmic distributions with linear
//!   sub-bucket resolution
//! * [`classify::ClassificationTable`] - many-to-few identifier folding
//! * [`cgroup::CgroupAttributor`] - cgroup discovery, metadata emission,
//!   and per-cgroup counter re-basing
//! * [`interval::IntervalTable`] - begin/end correlation for latency
//!   measurement
//!
//! The [`hooks`] module composes these into the per-event-family flows.
//! Attaching them to tracepoints, sizing them from configuration, and
//! polling the resulting state are the loader's job; the loader-facing
//! surface is [`config::Config`] plus the reader accessors on each type.

pub mod cgroup;
pub mod classify;
pub mod common;
pub mod config;
pub mod counters;
pub mod histogram;
pub mod hooks;
pub mod interval;
pub mod probe;

pub use config::Config;
