//! Capability probing over version-drifted kernel layouts.
//!
//! Kernel struct fields move and get renamed across releases. The hooks
//! never branch on kernel versions per event; instead, a reader is resolved
//! once at initialization against whatever layout information the loader
//! can provide, and every per-event read either succeeds with a value or
//! reports unavailable. An unavailable read costs one dropped observation,
//! never an error.
//!
//! [`TaskContext`] is the narrow view of the current task the hooks consume:
//! the cgroup identity and ancestry (each step guarded, as any link in the
//! chain may be absent on a given kernel) and the raw scheduler state word
//! under either of its historical field names.

/// Task state value meaning "runnable": a task preempted while in this
/// state was context-switched involuntarily.
pub const TASK_RUNNING: u64 = 0;

/// The two names the task state word has had in `task_struct`. The field
/// was renamed from `state` to `__state` in Linux 5.14.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateField {
    State,
    UnderscoreState,
}

/// Layout information provider, backed by whatever type metadata the loader
/// has for the running kernel.
pub trait LayoutProbe {
    fn field_exists(&self, struct_name: &str, field_name: &str) -> bool;
}

/// Reads the task state word through whichever field the running kernel
/// carries. Resolved once at initialization.
#[derive(Clone, Copy, Debug)]
pub struct TaskStateReader {
    field: StateField,
}

impl TaskStateReader {
    /// Resolve the state field against the probed layout. Returns `None` if
    /// neither known field exists; the caller then skips state-dependent
    /// accounting for the whole session.
    pub fn detect(probe: &dyn LayoutProbe) -> Option<Self> {
        if probe.field_exists("task_struct", "__state") {
            Some(Self {
                field: StateField::UnderscoreState,
            })
        } else if probe.field_exists("task_struct", "state") {
            Some(Self {
                field: StateField::State,
            })
        } else {
            None
        }
    }

    pub fn field(&self) -> StateField {
        self.field
    }

    pub fn read(&self, task: &dyn TaskContext) -> Option<u64> {
        task.state_raw(self.field)
    }
}

/// Guarded read access to the scheduling context of a task. Every method
/// may report unavailable: the backing reads traverse kernel pointers that
/// can be absent (no task group, no parent kernfs node) or fields the
/// running layout does not carry.
pub trait TaskContext {
    /// The bounded cgroup id of the task's scheduler cgroup.
    fn cgroup_id(&self) -> Option<u32>;

    /// The kernel-assigned serial number of the cgroup occupying that id.
    fn cgroup_serial(&self) -> Option<u64>;

    /// Depth of the cgroup in the hierarchy.
    fn cgroup_level(&self) -> Option<i32>;

    /// The cgroup's own name.
    fn cgroup_name(&self) -> Option<&[u8]>;

    /// The parent cgroup's name, if a parent exists.
    fn cgroup_parent_name(&self) -> Option<&[u8]>;

    /// The grandparent cgroup's name, if one exists.
    fn cgroup_grandparent_name(&self) -> Option<&[u8]>;

    /// The raw scheduler state word, read through the given field name.
    fn state_raw(&self, field: StateField) -> Option<u64>;
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// A task context with every field settable, standing in for the kernel
    /// reads in tests.
    #[derive(Clone, Default)]
    pub struct FakeTask {
        pub cgroup_id: Option<u32>,
        pub cgroup_serial: Option<u64>,
        pub cgroup_level: Option<i32>,
        pub name: Option<Vec<u8>>,
        pub parent_name: Option<Vec<u8>>,
        pub grandparent_name: Option<Vec<u8>>,
        pub state: Option<u64>,
        pub state_field: Option<StateField>,
    }

    impl FakeTask {
        pub fn in_cgroup(id: u32, serial: u64, name: &str) -> Self {
            Self {
                cgroup_id: Some(id),
                cgroup_serial: Some(serial),
                cgroup_level: Some(1),
                name: Some(name.as_bytes().to_vec()),
                ..Default::default()
            }
        }
    }

    impl TaskContext for FakeTask {
        fn cgroup_id(&self) -> Option<u32> {
            self.cgroup_id
        }

        fn cgroup_serial(&self) -> Option<u64> {
            self.cgroup_serial
        }

        fn cgroup_level(&self) -> Option<i32> {
            self.cgroup_level
        }

        fn cgroup_name(&self) -> Option<&[u8]> {
            self.name.as_deref()
        }

        fn cgroup_parent_name(&self) -> Option<&[u8]> {
            self.parent_name.as_deref()
        }

        fn cgroup_grandparent_name(&self) -> Option<&[u8]> {
            self.grandparent_name.as_deref()
        }

        fn state_raw(&self, field: StateField) -> Option<u64> {
            match self.state_field {
                Some(expected) if expected == field => self.state,
                _ => None,
            }
        }
    }

    /// A layout probe answering from a fixed list of known fields.
    pub struct FakeLayout {
        pub fields: Vec<(&'static str, &'static str)>,
    }

    impl LayoutProbe for FakeLayout {
        fn field_exists(&self, struct_name: &str, field_name: &str) -> bool {
            self.fields
                .iter()
                .any(|(s, f)| *s == struct_name && *f == field_name)
        }
    }
}
