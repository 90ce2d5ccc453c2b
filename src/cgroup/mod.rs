//! Cgroup discovery and attribution.
//!
//! Cgroup ids are small dense handles the kernel reuses: the object behind
//! an id can be destroyed and replaced while a collection session runs. Each
//! id therefore carries a kernel-assigned serial number, and the attributor
//! caches the last serial seen per id. When an event observes an id under a
//! new serial, the per-cgroup counters owned by that id are zeroed (stale
//! counts must not leak into the successor), the hierarchy metadata is
//! captured and emitted once on the out-of-band channel, and the serial is
//! cached.
//!
//! The check-zero-emit-store sequence is not atomic as a whole. Two CPUs
//! seeing the same transition concurrently may both emit the metadata; the
//! reader treats the duplicate as a harmless re-label. The serial store is
//! deliberately a plain store, not a compare-and-swap.

mod channel;

pub use channel::MetadataChannel;

use core::sync::atomic::{AtomicU64, Ordering};

use crate::counters::CgroupCounters;
use crate::probe::TaskContext;

pub const CGROUP_NAME_LEN: usize = 64;

/// Fixed-size hierarchy metadata record carried on the out-of-band channel.
/// Names are NUL-terminated and truncated to fit.
#[derive(Clone, Copy)]
#[repr(C)]
pub struct CgroupInfo {
    pub id: i32,
    pub level: i32,
    pub name: [u8; CGROUP_NAME_LEN],
    pub pname: [u8; CGROUP_NAME_LEN],
    pub gpname: [u8; CGROUP_NAME_LEN],
}

unsafe impl plain::Plain for CgroupInfo {}

impl Default for CgroupInfo {
    fn default() -> Self {
        Self {
            id: 0,
            level: 0,
            name: [0; CGROUP_NAME_LEN],
            pname: [0; CGROUP_NAME_LEN],
            gpname: [0; CGROUP_NAME_LEN],
        }
    }
}

impl CgroupInfo {
    /// The raw wire form the reader consumes.
    pub fn as_bytes(&self) -> &[u8] {
        unsafe {
            core::slice::from_raw_parts(
                self as *const Self as *const u8,
                core::mem::size_of::<Self>(),
            )
        }
    }

    /// Decode a record from its wire form.
    pub fn decode(data: &[u8]) -> Option<Self> {
        let mut info = Self::default();
        plain::copy_from_bytes(&mut info, data).ok()?;
        Some(info)
    }

    /// Render the hierarchical path for this record. Deeply nested cgroups
    /// keep their last three components behind a `...` prefix.
    pub fn path(&self) -> String {
        let name = name_str(&self.name);
        let pname = name_str(&self.pname);
        let gpname = name_str(&self.gpname);

        if name == "/" {
            "/".to_string()
        } else if !gpname.is_empty() {
            if self.level > 3 {
                format!(".../{gpname}/{pname}/{name}")
            } else {
                format!("/{gpname}/{pname}/{name}")
            }
        } else if !pname.is_empty() {
            format!("/{pname}/{name}")
        } else if !name.is_empty() {
            format!("/{name}")
        } else {
            String::new()
        }
    }
}

fn name_str(raw: &[u8; CGROUP_NAME_LEN]) -> String {
    std::str::from_utf8(raw)
        .unwrap_or("")
        .trim_end_matches(char::from(0))
        .replace("\\x2d", "-")
}

fn write_name(dst: &mut [u8; CGROUP_NAME_LEN], src: &[u8]) {
    // leave at least one trailing NUL
    let len = src.len().min(CGROUP_NAME_LEN - 1);
    dst[..len].copy_from_slice(&src[..len]);
}

/// The result of attributing an event to a cgroup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Attribution {
    pub id: u32,
    /// Whether this event was the first sight of the (id, serial) pair.
    pub new: bool,
}

/// Serial-number cache plus metadata emission for a bounded cgroup id space.
pub struct CgroupAttributor {
    serials: Box<[AtomicU64]>,
    channel: MetadataChannel,
}

impl CgroupAttributor {
    pub fn new(max_cgroups: usize, channel_capacity: usize) -> Self {
        Self {
            serials: (0..max_cgroups).map(|_| AtomicU64::new(0)).collect(),
            channel: MetadataChannel::new(channel_capacity),
        }
    }

    /// Resolve the event's cgroup and handle discovery.
    ///
    /// Returns `None` when no attribution is possible (no cgroup context,
    /// id 0, or id at or beyond capacity); the caller still performs its
    /// system-wide accounting. On a serial change: zero the `owned`
    /// per-cgroup counters for this id, capture up to two ancestor name
    /// levels (each read guarded - a missing parent truncates the walk),
    /// emit the record, then cache the serial. A full channel drops the
    /// record but the serial is still cached, so the record is not retried.
    pub fn attribute(&self, task: &dyn TaskContext, owned: &[CgroupCounters]) -> Option<Attribution> {
        let id = task.cgroup_id()?;
        let serial = task.cgroup_serial()?;

        if id == 0 || id as usize >= self.serials.len() {
            return None;
        }

        let cached = &self.serials[id as usize];
        let new = cached.load(Ordering::Relaxed) != serial;

        if new {
            // zero first: the successor cgroup must never observe the
            // predecessor's counts
            for counters in owned {
                counters.zero(id);
            }

            let mut info = CgroupInfo {
                id: id as i32,
                level: task.cgroup_level().unwrap_or(0),
                ..Default::default()
            };

            if let Some(name) = task.cgroup_name() {
                write_name(&mut info.name, name);

                if let Some(pname) = task.cgroup_parent_name() {
                    write_name(&mut info.pname, pname);

                    if let Some(gpname) = task.cgroup_grandparent_name() {
                        write_name(&mut info.gpname, gpname);
                    }
                }
            }

            self.channel.send(info);

            cached.store(serial, Ordering::Relaxed);
        }

        Some(Attribution { id, new })
    }

    /// The out-of-band channel the reader drains.
    pub fn channel(&self) -> &MetadataChannel {
        &self.channel
    }

    pub fn capacity(&self) -> usize {
        self.serials.len()
    }
}
