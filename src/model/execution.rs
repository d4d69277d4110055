//! Execution modes, process statuses and the execution frame itself.

use crate::constants::SUBMODE_UNKNOWN_ID;

/// Submode display name used when an id cannot be resolved to a table entry.
pub const SUBMODE_UNKNOWN: &str = "UNKNOWN";
/// Submode display name for frames that carry no submode (user mode, plain
/// syscall frames created at process birth).
pub const SUBMODE_NONE: &str = "NONE";

/// What a process is executing: user code or one of the nested kernel paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExecutionMode {
    Unknown,
    UserMode,
    Syscall,
    Trap,
    Irq,
    SoftIrq,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Unknown => "MODE_UNKNOWN",
            ExecutionMode::UserMode => "USER_MODE",
            ExecutionMode::Syscall => "SYSCALL",
            ExecutionMode::Trap => "TRAP",
            ExecutionMode::Irq => "IRQ",
            ExecutionMode::SoftIrq => "SOFTIRQ",
        }
    }
}

/// Scheduler-level status of a process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProcessStatus {
    Unnamed,
    WaitFork,
    WaitCpu,
    Exit,
    Zombie,
    Wait,
    Run,
    Dead,
}

impl ProcessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStatus::Unnamed => "UNNAMED",
            ProcessStatus::WaitFork => "WAIT_FORK",
            ProcessStatus::WaitCpu => "WAIT_CPU",
            ProcessStatus::Exit => "EXIT",
            ProcessStatus::Zombie => "ZOMBIE",
            ProcessStatus::Wait => "WAIT",
            ProcessStatus::Run => "RUN",
            ProcessStatus::Dead => "DEAD",
        }
    }
}

/// One frame of a process's execution-mode history.
///
/// The top frame of a process's stack is its current state; entering a
/// syscall/trap/irq pushes a frame, leaving pops it. `cum_cpu_time` is
/// accumulated on-cpu time for statistics consumers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionFrame {
    pub mode: ExecutionMode,
    pub submode: String,
    /// Numeric submode id packed with a category bit, see [`crate::constants`].
    pub submode_id: u32,
    pub status: ProcessStatus,
    pub entry_time: u64,
    pub change_time: u64,
    pub cum_cpu_time: u64,
}

impl ExecutionFrame {
    pub fn new(
        mode: ExecutionMode,
        submode: impl Into<String>,
        submode_id: u32,
        status: ProcessStatus,
        time: u64,
    ) -> Self {
        Self {
            mode,
            submode: submode.into(),
            submode_id,
            status,
            entry_time: time,
            change_time: time,
            cum_cpu_time: 0,
        }
    }

    /// Frame for a process whose state is not yet known (per-cpu processes
    /// created at init, records backfilled from a state dump).
    pub fn unknown(time: u64) -> Self {
        Self::new(
            ExecutionMode::Unknown,
            SUBMODE_UNKNOWN,
            SUBMODE_UNKNOWN_ID,
            ProcessStatus::Unnamed,
            time,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_frame_defaults() {
        let frame = ExecutionFrame::unknown(500);
        assert_eq!(frame.mode, ExecutionMode::Unknown);
        assert_eq!(frame.status, ProcessStatus::Unnamed);
        assert_eq!(frame.submode, SUBMODE_UNKNOWN);
        assert_eq!(frame.entry_time, 500);
        assert_eq!(frame.change_time, 500);
        assert_eq!(frame.cum_cpu_time, 0);
    }
}
