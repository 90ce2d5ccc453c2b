use super::ClassificationTable;

/// Syscall families tracked with their own counter and histogram slots.
/// The discriminants are the group indices the loader writes into the
/// classification table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum SyscallGroup {
    Other = 0,
    Read = 1,
    Write = 2,
    Poll = 3,
    Lock = 4,
    Time = 5,
    Sleep = 6,
    Socket = 7,
    Yield = 8,
    Filesystem = 9,
    Memory = 10,
    Process = 11,
    Query = 12,
    Ipc = 13,
    Timer = 14,
    Event = 15,
}

pub const SYSCALL_GROUPS: usize = 16;

impl SyscallGroup {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Other => "other",
            Self::Read => "read",
            Self::Write => "write",
            Self::Poll => "poll",
            Self::Lock => "lock",
            Self::Time => "time",
            Self::Sleep => "sleep",
            Self::Socket => "socket",
            Self::Yield => "yield",
            Self::Filesystem => "filesystem",
            Self::Memory => "memory",
            Self::Process => "process",
            Self::Query => "query",
            Self::Ipc => "ipc",
            Self::Timer => "timer",
            Self::Event => "event",
        }
    }
}

/// Build the syscall classification table for this architecture. Syscall
/// numbers are resolved to names through the `syscall-numbers` crate, so the
/// same grouping applies regardless of the native numbering.
pub fn syscall_groups(max_syscall_id: usize) -> ClassificationTable {
    let entries = (0..max_syscall_id)
        .map(|id| {
            syscall_numbers::native::sys_call_name(id as i64)
                .map(|name| group_for(name) as u32)
                .unwrap_or(0)
        })
        .collect();

    ClassificationTable::new(SYSCALL_GROUPS, entries)
}

fn group_for(name: &str) -> SyscallGroup {
    match name {
        "pread64" | "preadv" | "preadv2" | "read" | "readv" | "recvfrom" | "recvmmsg"
        | "recvmsg" => SyscallGroup::Read,

        "pwrite64" | "pwritev" | "pwritev2" | "sendmmsg" | "sendmsg" | "sendto" | "write"
        | "writev" => SyscallGroup::Write,

        "epoll_create" | "epoll_create1" | "epoll_ctl" | "epoll_ctl_old" | "epoll_pwait"
        | "epoll_pwait2" | "epoll_wait" | "epoll_wait_old" | "poll" | "ppoll"
        | "ppoll_time64" | "pselect6" | "pselect6_time64" | "select" => SyscallGroup::Poll,

        "futex" => SyscallGroup::Lock,

        "adjtimex" | "clock_adjtime" | "clock_getres" | "clock_gettime" | "clock_settime"
        | "gettimeofday" | "settimeofday" | "time" => SyscallGroup::Time,

        "clock_nanosleep" | "nanosleep" => SyscallGroup::Sleep,

        "accept" | "accept4" | "bind" | "connect" | "getpeername" | "getsockname"
        | "getsockopt" | "listen" | "setsockopt" | "shutdown" | "socket" | "socketpair" => {
            SyscallGroup::Socket
        }

        "sched_yield" => SyscallGroup::Yield,

        "open" | "openat" | "close" | "creat" | "lseek" | "fsync" | "fdatasync" | "sync"
        | "syncfs" | "truncate" | "ftruncate" | "rename" | "renameat" | "link" | "symlink"
        | "unlink" | "readlink" | "stat" | "fstat" | "lstat" | "statx" | "access"
        | "faccessat" | "chmod" | "fchmod" | "chown" | "fchown" | "lchown" | "utime"
        | "utimes" | "utimensat" | "mkdir" | "rmdir" | "chdir" | "fchdir" | "getcwd"
        | "getdents" | "getdents64" | "readdir" => SyscallGroup::Filesystem,

        "mmap" | "munmap" | "mprotect" | "mremap" | "madvise" | "msync" | "mincore"
        | "mlock" | "munlock" | "mlockall" | "munlockall" | "brk" | "sbrk" => {
            SyscallGroup::Memory
        }

        "clone" | "fork" | "vfork" | "execve" | "execveat" | "exit" | "exit_group" | "wait4"
        | "waitid" | "waitpid" | "kill" | "tkill" | "tgkill" | "ptrace" | "prctl"
        | "setpgid" | "getpgid" | "setpriority" | "getpriority" | "sched_setaffinity"
        | "sched_getaffinity" | "sched_setscheduler" | "sched_getscheduler"
        | "sched_setparam" | "sched_getparam" => SyscallGroup::Process,

        "getrusage" | "getrlimit" | "setrlimit" | "prlimit64" | "times" | "getpid"
        | "getppid" | "getuid" | "geteuid" | "getgid" | "getegid" | "gettid" | "uname"
        | "sysinfo" | "getcpu" => SyscallGroup::Query,

        "pipe" | "pipe2" | "msgget" | "msgsnd" | "msgrcv" | "msgctl" | "semget" | "semop"
        | "semctl" | "shmget" | "shmat" | "shmdt" | "shmctl" | "mq_open" | "mq_close"
        | "mq_unlink" | "mq_send" | "mq_receive" | "mq_getsetattr" | "mq_notify"
        | "mq_timedreceive" | "mq_timedsend" => SyscallGroup::Ipc,

        "alarm" | "getitimer" | "setitimer" | "timer_create" | "timer_delete"
        | "timer_getoverrun" | "timer_gettime" | "timer_settime" | "timerfd_create"
        | "timerfd_gettime" | "timerfd_settime" => SyscallGroup::Timer,

        "eventfd" | "eventfd2" | "signalfd" | "signalfd4" | "inotify_init"
        | "inotify_init1" | "inotify_add_watch" | "inotify_rm_watch" | "fanotify_init"
        | "fanotify_mark" | "io_setup" | "io_destroy" | "io_submit" | "io_cancel"
        | "io_getevents" | "io_uring_setup" | "io_uring_enter" | "io_uring_register" => {
            SyscallGroup::Event
        }

        _ => SyscallGroup::Other,
    }
}
