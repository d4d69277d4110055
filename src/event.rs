//! The event abstraction consumed by the engine.
//!
//! The engine never touches a binary trace format; it receives already
//! decoded records carrying a type tag, a timestamp, the source cpu and a
//! small set of named, typed fields. Field lookup is forgiving by design:
//! a missing field or a type mismatch logs and yields `None`, and handlers
//! must tolerate that and continue.

use tracing::debug;

/// Field names used by the kernel trace events the engine understands.
pub mod fields {
    pub const SYSCALL_ID: &str = "syscall_id";
    pub const TRAP_ID: &str = "trap_id";
    pub const IRQ_ID: &str = "irq_id";
    pub const SOFT_IRQ_ID: &str = "softirq_id";
    pub const PREV_PID: &str = "prev_pid";
    pub const NEXT_PID: &str = "next_pid";
    pub const PREV_STATE: &str = "prev_state";
    pub const PARENT_PID: &str = "parent_pid";
    pub const CHILD_PID: &str = "child_pid";
    pub const CHILD_TGID: &str = "child_tgid";
    pub const PID: &str = "pid";
    pub const TGID: &str = "tgid";
    pub const FILENAME: &str = "filename";
    pub const NAME: &str = "name";
    pub const TYPE: &str = "type";
    pub const THIS_FN: &str = "this_fn";
    pub const CALL_SITE: &str = "call_site";
    pub const MAJOR: &str = "major";
    pub const MINOR: &str = "minor";
    pub const OPERATION: &str = "direction";
    pub const ACTION: &str = "action";
    pub const ID: &str = "id";
    pub const ADDRESS: &str = "address";
    pub const SYMBOL: &str = "symbol";
    pub const IP: &str = "ip";
}

/// Category tag for a trace event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventType {
    SyscallEntry,
    SyscallExit,
    TrapEntry,
    TrapExit,
    PageFaultEntry,
    PageFaultExit,
    PageFaultNosemEntry,
    PageFaultNosemExit,
    IrqEntry,
    IrqExit,
    SoftIrqRaise,
    SoftIrqEntry,
    SoftIrqExit,
    SchedSchedule,
    ProcessFork,
    KthreadCreate,
    ProcessExit,
    ProcessFree,
    Exec,
    ThreadBrand,
    ProcessState,
    StatedumpEnd,
    FunctionEntry,
    FunctionExit,
    ListInterrupt,
    SyscallTable,
    SoftIrqVec,
    KprobeTable,
    RequestIssue,
    RequestComplete,
}

impl EventType {
    /// The event name as it appears in the trace metadata.
    pub fn wire_name(&self) -> &'static str {
        match self {
            EventType::SyscallEntry => "syscall_entry",
            EventType::SyscallExit => "syscall_exit",
            EventType::TrapEntry => "trap_entry",
            EventType::TrapExit => "trap_exit",
            EventType::PageFaultEntry => "page_fault_entry",
            EventType::PageFaultExit => "page_fault_exit",
            EventType::PageFaultNosemEntry => "page_fault_nosem_entry",
            EventType::PageFaultNosemExit => "page_fault_nosem_exit",
            EventType::IrqEntry => "irq_entry",
            EventType::IrqExit => "irq_exit",
            EventType::SoftIrqRaise => "softirq_raise",
            EventType::SoftIrqEntry => "softirq_entry",
            EventType::SoftIrqExit => "softirq_exit",
            EventType::SchedSchedule => "sched_schedule",
            EventType::ProcessFork => "process_fork",
            EventType::KthreadCreate => "kthread_create",
            EventType::ProcessExit => "process_exit",
            EventType::ProcessFree => "process_free",
            EventType::Exec => "exec",
            EventType::ThreadBrand => "thread_brand",
            EventType::ProcessState => "process_state",
            EventType::StatedumpEnd => "statedump_end",
            EventType::FunctionEntry => "function_entry",
            EventType::FunctionExit => "function_exit",
            EventType::ListInterrupt => "interrupt",
            EventType::SyscallTable => "sys_call_table",
            EventType::SoftIrqVec => "softirq_vec",
            EventType::KprobeTable => "kprobe_table",
            EventType::RequestIssue => "_blk_request_issue",
            EventType::RequestComplete => "_blk_request_complete",
        }
    }

    /// Resolve an event name from the trace metadata back to its tag.
    pub fn from_wire_name(name: &str) -> Option<Self> {
        let ty = match name {
            "syscall_entry" => EventType::SyscallEntry,
            "syscall_exit" => EventType::SyscallExit,
            "trap_entry" => EventType::TrapEntry,
            "trap_exit" => EventType::TrapExit,
            "page_fault_entry" => EventType::PageFaultEntry,
            "page_fault_exit" => EventType::PageFaultExit,
            "page_fault_nosem_entry" => EventType::PageFaultNosemEntry,
            "page_fault_nosem_exit" => EventType::PageFaultNosemExit,
            "irq_entry" => EventType::IrqEntry,
            "irq_exit" => EventType::IrqExit,
            "softirq_raise" => EventType::SoftIrqRaise,
            "softirq_entry" => EventType::SoftIrqEntry,
            "softirq_exit" => EventType::SoftIrqExit,
            "sched_schedule" => EventType::SchedSchedule,
            "process_fork" => EventType::ProcessFork,
            "kthread_create" => EventType::KthreadCreate,
            "process_exit" => EventType::ProcessExit,
            "process_free" => EventType::ProcessFree,
            "exec" => EventType::Exec,
            "thread_brand" => EventType::ThreadBrand,
            "process_state" => EventType::ProcessState,
            "statedump_end" => EventType::StatedumpEnd,
            "function_entry" => EventType::FunctionEntry,
            "function_exit" => EventType::FunctionExit,
            "interrupt" => EventType::ListInterrupt,
            "sys_call_table" => EventType::SyscallTable,
            "softirq_vec" => EventType::SoftIrqVec,
            "kprobe_table" => EventType::KprobeTable,
            "_blk_request_issue" => EventType::RequestIssue,
            "_blk_request_complete" => EventType::RequestComplete,
            _ => return None,
        };
        Some(ty)
    }
}

/// A decoded event field value.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Long(i64),
    Str(String),
}

/// One decoded trace event.
///
/// Fields are kept as a small ordered list; events carry a handful of fields
/// at most, so a linear scan beats a map allocation per event.
#[derive(Clone, Debug)]
pub struct TraceEvent {
    event_type: EventType,
    timestamp: u64,
    cpu: u32,
    fields: Vec<(String, FieldValue)>,
}

impl TraceEvent {
    pub fn new(event_type: EventType, timestamp: u64, cpu: u32) -> Self {
        Self {
            event_type,
            timestamp,
            cpu,
            fields: Vec::new(),
        }
    }

    /// Attach an integer field (builder style).
    pub fn with_long(mut self, name: &str, value: i64) -> Self {
        self.fields.push((name.to_string(), FieldValue::Long(value)));
        self
    }

    /// Attach a string field (builder style).
    pub fn with_str(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields
            .push((name.to_string(), FieldValue::Str(value.into())));
        self
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn cpu(&self) -> u32 {
        self.cpu
    }

    /// Look up an integer field by name.
    ///
    /// Returns `None` (after logging) when the field is absent or holds a
    /// string; callers substitute a documented default or skip the event.
    pub fn field_long(&self, name: &str) -> Option<i64> {
        for (field_name, value) in &self.fields {
            if field_name == name {
                match value {
                    FieldValue::Long(v) => return Some(*v),
                    FieldValue::Str(_) => {
                        debug!(
                            event = self.event_type.wire_name(),
                            field = name,
                            "expected integer field, found string"
                        );
                        return None;
                    }
                }
            }
        }
        debug!(
            event = self.event_type.wire_name(),
            field = name,
            ts = self.timestamp,
            "field not found"
        );
        None
    }

    /// Look up a string field by name; same contract as [`field_long`].
    ///
    /// [`field_long`]: TraceEvent::field_long
    pub fn field_str(&self, name: &str) -> Option<&str> {
        for (field_name, value) in &self.fields {
            if field_name == name {
                match value {
                    FieldValue::Str(v) => return Some(v.as_str()),
                    FieldValue::Long(_) => {
                        debug!(
                            event = self.event_type.wire_name(),
                            field = name,
                            "expected string field, found integer"
                        );
                        return None;
                    }
                }
            }
        }
        debug!(
            event = self.event_type.wire_name(),
            field = name,
            ts = self.timestamp,
            "field not found"
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_name_roundtrip() {
        for ty in [
            EventType::SyscallEntry,
            EventType::SchedSchedule,
            EventType::RequestIssue,
            EventType::KprobeTable,
        ] {
            assert_eq!(EventType::from_wire_name(ty.wire_name()), Some(ty));
        }
        assert_eq!(EventType::from_wire_name("no_such_event"), None);
    }

    #[test]
    fn test_field_lookup_by_type() {
        let event = TraceEvent::new(EventType::ProcessFork, 100, 0)
            .with_long(fields::CHILD_PID, 42)
            .with_str(fields::NAME, "bash");

        assert_eq!(event.field_long(fields::CHILD_PID), Some(42));
        assert_eq!(event.field_str(fields::NAME), Some("bash"));
        // Type mismatch and absence both resolve to None, never a panic.
        assert_eq!(event.field_str(fields::CHILD_PID), None);
        assert_eq!(event.field_long(fields::NAME), None);
        assert_eq!(event.field_long(fields::TGID), None);
    }
}
