//! Process records and the composite lookup index.

use std::hash::{Hash, Hasher};

use tracing::warn;

use crate::constants::SUBMODE_NONE_ID;
use crate::model::execution::{ExecutionFrame, ExecutionMode, ProcessStatus, SUBMODE_NONE};

/// Cpu value meaning "match any cpu" in process lookups. Because lookups
/// ignore the cpu for non-zero pids, 0 doubles as the wildcard; a pid-0
/// lookup with `ANY_CPU` resolves to cpu 0's idle process.
pub const ANY_CPU: u32 = 0;

/// Default display name for processes whose command is not yet known.
pub const UNNAMED: &str = "UNNAMED";
/// Default brand (no brand).
pub const UNBRANDED: &str = "";

/// Whether a process runs user code or lives entirely in the kernel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProcessKind {
    UserThread,
    KernelThread,
}

impl ProcessKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessKind::UserThread => "USER_THREAD",
            ProcessKind::KernelThread => "KERNEL_THREAD",
        }
    }
}

/// Composite lookup key for process records.
///
/// The matching rule is intentionally asymmetric: pid 0 names the per-cpu
/// idle process, so pid-0 keys match on `(pid, cpu, trace_id)`; any other
/// pid is unique per trace and matches on `(pid, trace_id)` alone, ignoring
/// cpu. The hash therefore covers only pid and trace_id, which keeps the
/// conditional equality consistent with the hash-container contract. Do not
/// "fix" this; lookups with an arbitrary cpu for non-zero pids depend on it.
#[derive(Clone, Copy, Debug)]
pub struct ProcessIndex {
    pub pid: i64,
    pub cpu: u32,
    pub trace_id: u64,
}

impl PartialEq for ProcessIndex {
    fn eq(&self, other: &Self) -> bool {
        self.trace_id == other.trace_id
            && self.pid == other.pid
            && (self.pid != 0 || self.cpu == other.cpu)
    }
}

impl Eq for ProcessIndex {}

impl Hash for ProcessIndex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // cpu is deliberately excluded, see the type-level comment.
        self.pid.hash(state);
        self.trace_id.hash(state);
    }
}

/// Full mutable state of one traced process.
///
/// Created on first observation (fork, state dump, or the synthetic per-cpu
/// idle processes at init) and removed only once both the dead schedule-out
/// and the process-free event have been seen.
#[derive(Clone, Debug)]
pub struct ProcessRecord {
    pub pid: i64,
    pub tgid: i64,
    pub cpu: u32,
    pub ppid: i64,
    pub creation_time: u64,
    pub insertion_time: u64,
    pub name: String,
    pub brand: String,
    pub kind: ProcessKind,
    /// Derived display key, `"pid-creation_time"`; disambiguates pid reuse.
    pub pid_time: String,
    pub trace_id: u64,
    /// Pid addressed by the last lifecycle event that touched this record.
    pub target_pid: i64,
    /// Counts the release events seen (dead schedule-out, process free);
    /// the record is dropped from the store at the second one.
    pub free_events: u32,
    /// Topmost user-space call-site address, 0x0 when unknown.
    pub current_function: u64,
    /// Name of a correlated user-space trace, when one exists.
    pub associated_user_trace: Option<String>,
    exec_stack: Vec<ExecutionFrame>,
    user_stack: Vec<u64>,
}

impl ProcessRecord {
    /// Create a record with the dual-frame convention used at process birth:
    /// a user-mode RUN frame at the bottom and a syscall WAIT_FORK frame on
    /// top (a forked child is inside the fork syscall until scheduled).
    pub fn new(
        cpu: u32,
        pid: i64,
        tgid: i64,
        name: impl Into<String>,
        timestamp: u64,
        trace_id: u64,
    ) -> Self {
        let bottom = ExecutionFrame::new(
            ExecutionMode::UserMode,
            SUBMODE_NONE,
            SUBMODE_NONE_ID,
            ProcessStatus::Run,
            timestamp,
        );
        let top = ExecutionFrame::new(
            ExecutionMode::Syscall,
            SUBMODE_NONE,
            SUBMODE_NONE_ID,
            ProcessStatus::WaitFork,
            timestamp,
        );
        Self {
            pid,
            tgid,
            cpu,
            ppid: 0,
            creation_time: timestamp,
            insertion_time: timestamp,
            name: name.into(),
            brand: UNBRANDED.to_string(),
            kind: ProcessKind::UserThread,
            pid_time: format!("{pid}-{timestamp}"),
            trace_id,
            target_pid: 0,
            free_events: 0,
            current_function: 0,
            associated_user_trace: None,
            exec_stack: vec![bottom, top],
            user_stack: vec![0],
        }
    }

    /// Synthetic record for the process occupying a cpu before the first
    /// scheduling event identifies it: pid 0, one unknown/unnamed frame.
    pub fn idle(cpu: u32, timestamp: u64, trace_id: u64) -> Self {
        let mut process = Self::new(cpu, 0, 0, UNNAMED, timestamp, trace_id);
        process.exec_stack = vec![ExecutionFrame::unknown(timestamp)];
        process
    }

    /// Lookup key for this record.
    pub fn index(&self) -> ProcessIndex {
        ProcessIndex {
            pid: self.pid,
            cpu: self.cpu,
            trace_id: self.trace_id,
        }
    }

    /// The current (top) execution frame. The stack always has at least one.
    pub fn current_state(&self) -> &ExecutionFrame {
        self.exec_stack.last().expect("execution stack invariant violated")
    }

    pub fn current_state_mut(&mut self) -> &mut ExecutionFrame {
        self.exec_stack.last_mut().expect("execution stack invariant violated")
    }

    /// The bottom (base) execution frame.
    pub fn bottom_frame(&self) -> &ExecutionFrame {
        self.exec_stack.first().expect("execution stack invariant violated")
    }

    pub fn bottom_frame_mut(&mut self) -> &mut ExecutionFrame {
        self.exec_stack.first_mut().expect("execution stack invariant violated")
    }

    pub fn frame_count(&self) -> usize {
        self.exec_stack.len()
    }

    /// Push a new execution frame; it becomes the current state.
    pub fn push_frame(&mut self, frame: ExecutionFrame) {
        self.exec_stack.push(frame);
    }

    /// Pop the current frame and stamp `change_time` on the frame below.
    ///
    /// Popping the sole remaining frame is forbidden; the attempt is logged
    /// and ignored so the record keeps a valid current state.
    pub fn pop_frame(&mut self, change_time: u64) -> Option<ExecutionFrame> {
        if self.exec_stack.len() <= 1 {
            warn!(
                pid = self.pid,
                cpu = self.cpu,
                "refusing to pop the last execution frame"
            );
            return None;
        }
        let popped = self.exec_stack.pop();
        self.current_state_mut().change_time = change_time;
        popped
    }

    /// Collapse the execution stack down to its bottom frame.
    pub fn collapse_to_bottom(&mut self) {
        self.exec_stack.truncate(1);
    }

    /// Push a user-space call-site address; it becomes the current function.
    pub fn push_user_address(&mut self, address: u64) {
        self.user_stack.push(address);
        self.current_function = address;
    }

    /// Pop the current user-space address. The bottom sentinel (0x0) is
    /// never removed; an underflow attempt is logged and ignored.
    pub fn pop_user_address(&mut self) {
        if self.user_stack.len() <= 1 {
            warn!(
                pid = self.pid,
                "refusing to pop the last user-stack entry"
            );
            return;
        }
        self.user_stack.pop();
        self.current_function = *self
            .user_stack
            .last()
            .expect("user stack invariant violated");
    }

    pub fn user_stack_depth(&self) -> usize {
        self.user_stack.len()
    }
}
