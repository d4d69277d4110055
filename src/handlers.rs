//! Event handlers: one function per kernel event type, plus the dispatcher
//! that routes decoded events to them.
//!
//! Handlers are resilient by contract. A malformed event (missing field,
//! unknown id) is logged and skipped; nothing here returns an error and
//! nothing panics. The only ordering assumption is that events arrive in
//! chronological order, which the trace reader guarantees.

use tracing::{debug, warn};

use crate::constants::{
    CAT_IRQ, CAT_SOFT_IRQ, CAT_SYSCALL, CAT_TRAP, SUBMODE_ID_MASK, SUBMODE_NONE_ID,
    SUBMODE_UNKNOWN_ID,
};
use crate::event::{fields, EventType, TraceEvent};
use crate::model::execution::{
    ExecutionFrame, ExecutionMode, ProcessStatus, SUBMODE_NONE, SUBMODE_UNKNOWN,
};
use crate::model::process::{ProcessKind, ProcessRecord, ANY_CPU, UNBRANDED, UNNAMED};
use crate::model::resource::{BdevMode, BdevTrack, CpuMode, IrqMode};
use crate::store::TraceStateStore;

/// A state-update function. Returns `true` when the event was applied to the
/// store, `false` when it was skipped (malformed or not applicable).
pub type Handler = fn(&TraceEvent, &mut TraceStateStore) -> bool;

/// Routes events to their handler and maintains the processed-event count.
#[derive(Clone, Copy, Debug, Default)]
pub struct EventDispatcher;

impl EventDispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Apply one event to the store. Returns whether the event was applied;
    /// skipped events do not advance the event count.
    pub fn dispatch(&self, event: &TraceEvent, store: &mut TraceStateStore) -> bool {
        let applied = handler_for(event.event_type())(event, store);
        if applied {
            store.increment_nb_events();
        }
        applied
    }
}

/// The handler for a given event type. Page-fault events share the trap
/// handlers; a page fault is a trap with its own wire name.
pub fn handler_for(event_type: EventType) -> Handler {
    match event_type {
        EventType::SyscallEntry => syscall_entry,
        EventType::SyscallExit => syscall_exit,
        EventType::TrapEntry
        | EventType::PageFaultEntry
        | EventType::PageFaultNosemEntry => trap_entry,
        EventType::TrapExit | EventType::PageFaultExit | EventType::PageFaultNosemExit => trap_exit,
        EventType::IrqEntry => irq_entry,
        EventType::IrqExit => irq_exit,
        EventType::SoftIrqRaise => soft_irq_raise,
        EventType::SoftIrqEntry => soft_irq_entry,
        EventType::SoftIrqExit => soft_irq_exit,
        EventType::SchedSchedule => sched_schedule,
        EventType::ProcessFork => process_fork,
        EventType::KthreadCreate => kthread_create,
        EventType::ProcessExit => process_exit,
        EventType::ProcessFree => process_free,
        EventType::Exec => exec,
        EventType::ThreadBrand => thread_brand,
        EventType::ProcessState => process_state,
        EventType::StatedumpEnd => statedump_end,
        EventType::FunctionEntry => function_entry,
        EventType::FunctionExit => function_exit,
        EventType::ListInterrupt => list_interrupt,
        EventType::SyscallTable => syscall_table,
        EventType::SoftIrqVec => soft_irq_vec,
        EventType::KprobeTable => kprobe_table,
        EventType::RequestIssue => request_issue,
        EventType::RequestComplete => request_complete,
    }
}

/// Resolve a numeric id against a name table: the table name with the id
/// packed under `category`, or the UNKNOWN submode when the table has no
/// entry for it.
fn resolve_submode(
    names: &std::collections::HashMap<i64, String>,
    id: i64,
    category: u32,
) -> (String, u32) {
    match names.get(&id) {
        Some(name) => (name.clone(), (id as u32 & SUBMODE_ID_MASK) | category),
        None => (SUBMODE_UNKNOWN.to_string(), SUBMODE_UNKNOWN_ID),
    }
}

/// Push an execution frame onto the process currently running on `cpu`.
/// The new frame inherits the process's scheduler status.
fn push_state(
    store: &mut TraceStateStore,
    cpu: u32,
    mode: ExecutionMode,
    submode: String,
    submode_id: u32,
    timestamp: u64,
) {
    let Some(process) = store.running_process_on_mut(cpu) else {
        warn!(cpu, "no running process registered for cpu");
        return;
    };
    let status = process.current_state().status;
    process.push_frame(ExecutionFrame::new(mode, submode, submode_id, status, timestamp));
}

/// Pop the current execution frame of the process running on `cpu`, but
/// only when it carries the expected mode; an unmatched exit event (lost
/// entry event) is logged and ignored.
fn pop_state(store: &mut TraceStateStore, cpu: u32, expected: ExecutionMode, timestamp: u64) {
    let Some(process) = store.running_process_on_mut(cpu) else {
        warn!(cpu, "no running process registered for cpu");
        return;
    };
    if process.current_state().mode != expected {
        debug!(
            cpu,
            found = process.current_state().mode.as_str(),
            expected = expected.as_str(),
            ts = timestamp,
            "execution mode mismatch on pop, ignoring"
        );
        return;
    }
    process.pop_frame(timestamp);
}

/// Record one release event for `pid`. The record is removed only at the
/// second of the two release events (dead schedule-out, process free), in
/// whichever order they arrive; returns whether the record was removed.
fn exit_process(store: &mut TraceStateStore, pid: i64) -> bool {
    let trace_id = store.trace_id();
    let index = match store.find_process_mut(pid, ANY_CPU, trace_id) {
        Some(process) => {
            process.free_events += 1;
            if process.free_events < 2 {
                return false;
            }
            process.index()
        }
        None => return false,
    };
    store.remove_process_state(&index);
    true
}

fn syscall_entry(event: &TraceEvent, store: &mut TraceStateStore) -> bool {
    let cpu = event.cpu();

    // The per-cpu initialization process never enters syscalls.
    if let Some(process) = store.running_process_on(cpu) {
        if process.pid == 0 {
            return false;
        }
    }

    let (submode, submode_id) = match event.field_long(fields::SYSCALL_ID) {
        Some(syscall) => resolve_submode(store.syscall_names(), syscall, CAT_SYSCALL),
        None => (SUBMODE_UNKNOWN.to_string(), SUBMODE_UNKNOWN_ID),
    };
    push_state(
        store,
        cpu,
        ExecutionMode::Syscall,
        submode,
        submode_id,
        event.timestamp(),
    );
    true
}

fn syscall_exit(event: &TraceEvent, store: &mut TraceStateStore) -> bool {
    let cpu = event.cpu();
    if let Some(process) = store.running_process_on(cpu) {
        if process.pid == 0 {
            return false;
        }
    }
    pop_state(store, cpu, ExecutionMode::Syscall, event.timestamp());
    true
}

fn trap_entry(event: &TraceEvent, store: &mut TraceStateStore) -> bool {
    let cpu = event.cpu();
    let Some(trap) = event.field_long(fields::TRAP_ID) else {
        return false;
    };

    let (submode, submode_id) = resolve_submode(store.trap_names(), trap, CAT_TRAP);
    push_state(
        store,
        cpu,
        ExecutionMode::Trap,
        submode,
        submode_id,
        event.timestamp(),
    );

    if let Some(cpu_state) = store.cpu_state_mut(cpu) {
        cpu_state.push_mode(CpuMode::Trap);
        cpu_state.push_trap(trap);
    }
    store.trap_states_mut().entry(trap).or_default().increment_running();
    true
}

fn trap_exit(event: &TraceEvent, store: &mut TraceStateStore) -> bool {
    let cpu = event.cpu();
    let trap = store.cpu_state_mut(cpu).and_then(|c| c.pop_trap());

    pop_state(store, cpu, ExecutionMode::Trap, event.timestamp());

    if let Some(cpu_state) = store.cpu_state_mut(cpu) {
        cpu_state.pop_mode();
    }
    if let Some(trap) = trap {
        if let Some(track) = store.trap_states_mut().get_mut(&trap) {
            track.decrement_running();
        }
    }
    true
}

fn irq_entry(event: &TraceEvent, store: &mut TraceStateStore) -> bool {
    let cpu = event.cpu();
    let Some(irq) = event.field_long(fields::IRQ_ID) else {
        return false;
    };
    // Only irq lines registered at init (or via an interrupt-list dump) are
    // tracked; an unknown id is dropped without touching any stack.
    if !store.irq_states().contains_key(&irq) {
        debug!(irq, ts = event.timestamp(), "unknown irq id, dropping event");
        return false;
    }

    let (submode, submode_id) = resolve_submode(store.irq_names(), irq, CAT_IRQ);
    push_state(
        store,
        cpu,
        ExecutionMode::Irq,
        submode,
        submode_id,
        event.timestamp(),
    );

    if let Some(cpu_state) = store.cpu_state_mut(cpu) {
        cpu_state.push_mode(CpuMode::Irq);
        cpu_state.push_irq(irq);
    }
    if let Some(track) = store.irq_states_mut().get_mut(&irq) {
        track.push_mode(IrqMode::Busy);
    }
    true
}

fn irq_exit(event: &TraceEvent, store: &mut TraceStateStore) -> bool {
    let cpu = event.cpu();

    pop_state(store, cpu, ExecutionMode::Irq, event.timestamp());

    let last_irq = match store.cpu_state_mut(cpu) {
        Some(cpu_state) => {
            cpu_state.pop_mode();
            cpu_state.pop_irq()
        }
        None => None,
    };
    if let Some(irq) = last_irq {
        if let Some(track) = store.irq_states_mut().get_mut(&irq) {
            track.pop_mode();
        }
    }
    true
}

fn soft_irq_raise(event: &TraceEvent, store: &mut TraceStateStore) -> bool {
    let Some(soft_irq) = event.field_long(fields::SOFT_IRQ_ID) else {
        return false;
    };
    // Raises are not cumulative: pending is set, not incremented.
    store
        .soft_irq_states_mut()
        .entry(soft_irq)
        .or_default()
        .set_pending(1);
    true
}

fn soft_irq_entry(event: &TraceEvent, store: &mut TraceStateStore) -> bool {
    let cpu = event.cpu();
    let Some(soft_irq) = event.field_long(fields::SOFT_IRQ_ID) else {
        return false;
    };

    // Unlike irq lines, unseen soft-irq vectors are registered on the fly
    // with a generic name.
    let submode = match store.soft_irq_names().get(&soft_irq) {
        Some(name) => name.clone(),
        None => {
            let name = format!("softirq {soft_irq}");
            store.soft_irq_names_mut().insert(soft_irq, name.clone());
            name
        }
    };
    let submode_id = (soft_irq as u32 & SUBMODE_ID_MASK) | CAT_SOFT_IRQ;

    {
        let track = store.soft_irq_states_mut().entry(soft_irq).or_default();
        track.decrement_pending();
        track.increment_running();
    }

    if let Some(cpu_state) = store.cpu_state_mut(cpu) {
        cpu_state.push_soft_irq(soft_irq);
        cpu_state.push_mode(CpuMode::SoftIrq);
    }

    push_state(
        store,
        cpu,
        ExecutionMode::SoftIrq,
        submode,
        submode_id,
        event.timestamp(),
    );
    true
}

fn soft_irq_exit(event: &TraceEvent, store: &mut TraceStateStore) -> bool {
    let cpu = event.cpu();
    let soft_irq = store.cpu_state_mut(cpu).and_then(|c| c.pop_soft_irq());

    pop_state(store, cpu, ExecutionMode::SoftIrq, event.timestamp());

    if let Some(soft_irq) = soft_irq {
        if let Some(track) = store.soft_irq_states_mut().get_mut(&soft_irq) {
            track.decrement_running();
        }
    }
    if let Some(cpu_state) = store.cpu_state_mut(cpu) {
        cpu_state.pop_mode();
    }
    true
}

fn sched_schedule(event: &TraceEvent, store: &mut TraceStateStore) -> bool {
    let cpu = event.cpu();
    let timestamp = event.timestamp();

    let Some(pid_in) = event.field_long(fields::NEXT_PID) else {
        return false;
    };
    let pid_out = event.field_long(fields::PREV_PID);
    let state_out = event.field_long(fields::PREV_STATE);

    // Book out the process leaving the cpu.
    let mut dead_pid = None;
    if let Some(process) = store.running_process_on_mut(cpu) {
        if process.pid == 0 && process.current_state().mode == ExecutionMode::Unknown {
            // Scheduling out of pid 0 at the beginning of the trace: it must
            // have been in syscall mode all along.
            if pid_out == Some(0) {
                let frame = process.current_state_mut();
                frame.mode = ExecutionMode::Syscall;
                frame.status = ProcessStatus::Wait;
                frame.entry_time = timestamp;
                frame.change_time = timestamp;
            }
        } else {
            if process.current_state().status == ProcessStatus::Exit {
                let frame = process.current_state_mut();
                frame.status = ProcessStatus::Zombie;
                frame.change_time = timestamp;
            } else {
                let frame = process.current_state_mut();
                frame.status = if state_out == Some(0) {
                    ProcessStatus::WaitCpu
                } else {
                    ProcessStatus::Wait
                };
                frame.change_time = timestamp;
            }
            // prev_state 32 (EXIT_DEAD) or 64 (TASK_DEAD), see sched.h.
            if matches!(state_out, Some(32) | Some(64)) {
                dead_pid = Some(process.pid);
            }
        }
    }
    if let Some(pid) = dead_pid {
        if !exit_process(store, pid) {
            // First of the two release events: the record stays, flagged dead.
            let trace_id = store.trace_id();
            if let Some(process) = store.find_process_mut(pid, ANY_CPU, trace_id) {
                let frame = process.current_state_mut();
                frame.status = ProcessStatus::Dead;
                frame.change_time = timestamp;
            }
        }
    }

    // Book in the incoming process.
    let incoming = store.find_or_create_process(cpu, pid_in, timestamp);
    incoming.cpu = cpu;
    let frame = incoming.current_state_mut();
    frame.status = ProcessStatus::Run;
    frame.change_time = timestamp;
    let in_trap = incoming.current_state().mode == ExecutionMode::Trap;
    let index = incoming.index();
    store.set_running_process(cpu, index);

    if let Some(cpu_state) = store.cpu_state_mut(cpu) {
        if pid_in == 0 {
            cpu_state.set_base_mode(CpuMode::Idle);
        } else {
            cpu_state.set_base_mode(CpuMode::Busy);
            // Scheduling in a process parked inside a trap puts the cpu back
            // in trap mode.
            if in_trap {
                cpu_state.push_mode(CpuMode::Trap);
            }
        }
    }
    true
}

fn process_fork(event: &TraceEvent, store: &mut TraceStateStore) -> bool {
    let cpu = event.cpu();
    let timestamp = event.timestamp();

    // One pid per thread; child_tgid is the POSIX pid of the new thread's
    // group, absent on older kernels.
    let Some(child_pid) = event.field_long(fields::CHILD_PID) else {
        return false;
    };
    let child_tgid = event.field_long(fields::CHILD_TGID).unwrap_or(0);

    let (parent_pid, parent_name, parent_brand) = match store.running_process_on(cpu) {
        Some(parent) => (parent.pid, parent.name.clone(), parent.brand.clone()),
        None => {
            warn!(cpu, "fork without a running process on cpu");
            return false;
        }
    };
    if parent_pid == child_pid {
        debug!(
            child_pid,
            ts = timestamp,
            "unexpected fork with parent pid equal to child pid"
        );
    }

    let trace_id = store.trace_id();
    if let Some(child) = store.find_process_mut(child_pid, ANY_CPU, trace_id) {
        // Scheduled in before its own fork event (clock imprecision across
        // cpus). Repair the record instead of recreating it.
        debug!(
            child_pid,
            created = child.creation_time,
            inserted = child.insertion_time,
            cpu,
            "child existed before fork, repairing parent linkage"
        );
        child.ppid = parent_pid;
        child.tgid = child_tgid;
        if child.name != UNNAMED {
            debug!(child_pid, name = %child.name, "unexpected named child at fork");
        }
        child.name = parent_name;
        child.brand = parent_brand;
        return true;
    }

    let mut child = ProcessRecord::new(cpu, child_pid, child_tgid, UNNAMED, timestamp, trace_id);
    child.ppid = parent_pid;
    child.name = parent_name;
    child.brand = parent_brand;
    store.add_process_state(child);
    true
}

fn kthread_create(event: &TraceEvent, store: &mut TraceStateStore) -> bool {
    let Some(pid) = event.field_long(fields::PID) else {
        return false;
    };

    // The thread is not running yet, so its record may not exist; a record
    // created here carries creation time zero.
    let process = store.find_or_create_process(ANY_CPU, pid, 0);
    if process.current_state().status != ProcessStatus::Dead {
        // Collapse to a single syscall-mode frame: a kernel thread has no
        // user-mode bottom.
        process.collapse_to_bottom();
        process.bottom_frame_mut().mode = ExecutionMode::Syscall;
    }
    process.kind = ProcessKind::KernelThread;
    true
}

fn process_exit(event: &TraceEvent, store: &mut TraceStateStore) -> bool {
    let Some(pid) = event.field_long(fields::PID) else {
        return false;
    };
    let trace_id = store.trace_id();
    if let Some(process) = store.find_process_mut(pid, ANY_CPU, trace_id) {
        process.current_state_mut().status = ProcessStatus::Exit;
    }
    true
}

fn process_free(event: &TraceEvent, store: &mut TraceStateStore) -> bool {
    let Some(release_pid) = event.field_long(fields::PID) else {
        return false;
    };
    if release_pid == 0 {
        debug!(ts = event.timestamp(), "unexpected release of pid 0");
    }
    let trace_id = store.trace_id();
    if store.find_process(release_pid, ANY_CPU, trace_id).is_some() {
        exit_process(store, release_pid);
    }
    true
}

fn exec(event: &TraceEvent, store: &mut TraceStateStore) -> bool {
    let Some(filename) = event.field_str(fields::FILENAME).map(str::to_string) else {
        return false;
    };
    if let Some(process) = store.running_process_on_mut(event.cpu()) {
        process.name = filename;
        process.brand = UNBRANDED.to_string();
    }
    true
}

fn thread_brand(event: &TraceEvent, store: &mut TraceStateStore) -> bool {
    let Some(name) = event.field_str(fields::NAME).map(str::to_string) else {
        return false;
    };
    if let Some(process) = store.running_process_on_mut(event.cpu()) {
        process.brand = name;
    }
    true
}

fn process_state(event: &TraceEvent, store: &mut TraceStateStore) -> bool {
    let cpu = event.cpu();
    let timestamp = event.timestamp();

    let Some(pid) = event.field_long(fields::PID) else {
        return false;
    };
    let parent_pid = event.field_long(fields::PARENT_PID);
    let command = event.field_str(fields::NAME).map(str::to_string);
    let tgid = event.field_long(fields::TGID).unwrap_or(0);
    // type 0 is a user thread, anything else (or absent) a kernel thread.
    let kind = match event.field_long(fields::TYPE) {
        Some(0) => ProcessKind::UserThread,
        _ => ProcessKind::KernelThread,
    };

    let trace_id = store.trace_id();
    if pid == 0 {
        // The dump describes the idle threads: patch each per-cpu record.
        let cpus: Vec<u32> = store.cpu_states().keys().copied().collect();
        for acpu in cpus {
            match store.find_process_mut(0, acpu, trace_id) {
                Some(process) => {
                    if let Some(ppid) = parent_pid {
                        process.ppid = ppid;
                    }
                    process.tgid = tgid;
                    if let Some(command) = &command {
                        process.name = command.clone();
                    }
                    process.kind = ProcessKind::KernelThread;
                }
                None => {
                    debug!(cpu = acpu, ts = timestamp, "no idle process found for cpu");
                }
            }
        }
        return true;
    }

    if let Some(process) = store.find_process_mut(pid, ANY_CPU, trace_id) {
        // Already known: forked during the dump, or scheduled in before it.
        // Patch the identity and leave the stack alone, the statedump end
        // will settle it.
        if let Some(ppid) = parent_pid {
            process.ppid = ppid;
        }
        process.tgid = tgid;
        if let Some(command) = command {
            process.name = command;
        }
        process.kind = kind;
        return true;
    }

    let parent = parent_pid.and_then(|ppid| store.find_process(ppid, ANY_CPU, trace_id));
    let ppid = parent.map(|p| p.pid);
    let mut process = ProcessRecord::new(
        cpu,
        pid,
        tgid,
        command.as_deref().unwrap_or(UNNAMED),
        timestamp,
        trace_id,
    );
    if let Some(ppid) = ppid {
        process.ppid = ppid;
    }
    process.kind = kind;
    // A dumped process gets a single unknown frame; its real mode becomes
    // known at statedump end.
    process.collapse_to_bottom();
    let frame = process.bottom_frame_mut();
    frame.mode = ExecutionMode::Unknown;
    frame.status = ProcessStatus::Unnamed;
    frame.submode = SUBMODE_UNKNOWN.to_string();
    frame.submode_id = SUBMODE_UNKNOWN_ID;
    store.add_process_state(process);
    true
}

/// Settle the bottom frame of a dumped process once the state dump is
/// complete: a kernel thread with an unknown bottom was inside a syscall,
/// a user thread was running user code (plus a syscall wait frame when its
/// stack never grew past the bottom).
fn fix_process(process: &mut ProcessRecord, timestamp: u64) {
    if process.kind == ProcessKind::KernelThread {
        let frame = process.bottom_frame_mut();
        if frame.mode == ExecutionMode::Unknown {
            frame.mode = ExecutionMode::Syscall;
            frame.submode = SUBMODE_NONE.to_string();
            frame.submode_id = SUBMODE_NONE_ID;
            frame.entry_time = timestamp;
            frame.change_time = timestamp;
            frame.cum_cpu_time = 0;
            if frame.status == ProcessStatus::Unnamed {
                frame.status = ProcessStatus::Wait;
            }
        }
    } else {
        let single_frame = process.frame_count() == 1;
        let frame = process.bottom_frame_mut();
        if frame.mode == ExecutionMode::Unknown {
            frame.mode = ExecutionMode::UserMode;
            frame.submode = SUBMODE_NONE.to_string();
            frame.submode_id = SUBMODE_NONE_ID;
            frame.entry_time = timestamp;
            frame.change_time = timestamp;
            frame.cum_cpu_time = 0;
            if frame.status == ProcessStatus::Unnamed {
                frame.status = ProcessStatus::Run;
            }
            if single_frame {
                // Never observed entering a syscall; assume it waits in one.
                process.push_frame(ExecutionFrame::new(
                    ExecutionMode::Syscall,
                    SUBMODE_NONE,
                    SUBMODE_NONE_ID,
                    ProcessStatus::Wait,
                    timestamp,
                ));
            }
        }
    }
}

fn statedump_end(event: &TraceEvent, store: &mut TraceStateStore) -> bool {
    let timestamp = event.timestamp();
    for process in store.processes_mut().values_mut() {
        fix_process(process, timestamp);
    }
    // The process holding the dumping cpu is running by definition.
    if let Some(process) = store.running_process_on_mut(event.cpu()) {
        process.current_state_mut().status = ProcessStatus::Run;
    }
    true
}

fn function_entry(event: &TraceEvent, store: &mut TraceStateStore) -> bool {
    let Some(funcptr) = event.field_long(fields::THIS_FN) else {
        return false;
    };
    if let Some(process) = store.running_process_on_mut(event.cpu()) {
        process.push_user_address(funcptr as u64);
    }
    true
}

fn function_exit(event: &TraceEvent, store: &mut TraceStateStore) -> bool {
    let Some(funcptr) = event.field_long(fields::THIS_FN) else {
        return false;
    };
    if let Some(process) = store.running_process_on_mut(event.cpu()) {
        if process.current_function != funcptr as u64 {
            debug!(
                pid = process.pid,
                current = process.current_function,
                exited = funcptr,
                ts = event.timestamp(),
                "function exit does not match current function, ignoring"
            );
            return true;
        }
        process.pop_user_address();
    }
    true
}

fn list_interrupt(event: &TraceEvent, store: &mut TraceStateStore) -> bool {
    let Some(action) = event.field_str(fields::ACTION).map(str::to_string) else {
        return false;
    };
    let Some(irq) = event.field_long(fields::IRQ_ID) else {
        return false;
    };
    store.irq_names_mut().insert(irq, action);
    true
}

fn syscall_table(event: &TraceEvent, store: &mut TraceStateStore) -> bool {
    let Some(id) = event.field_long(fields::ID) else {
        return false;
    };
    let Some(symbol) = event.field_str(fields::SYMBOL).map(str::to_string) else {
        return false;
    };
    store.syscall_names_mut().insert(id, symbol);
    true
}

fn soft_irq_vec(event: &TraceEvent, store: &mut TraceStateStore) -> bool {
    let Some(id) = event.field_long(fields::ID) else {
        return false;
    };
    let Some(symbol) = event.field_str(fields::SYMBOL).map(str::to_string) else {
        return false;
    };
    store.soft_irq_names_mut().insert(id, symbol);
    true
}

fn kprobe_table(event: &TraceEvent, store: &mut TraceStateStore) -> bool {
    let Some(ip) = event.field_long(fields::IP) else {
        return false;
    };
    let Some(symbol) = event.field_str(fields::SYMBOL).map(str::to_string) else {
        return false;
    };
    store.kprobe_table_mut().insert(ip as u64, symbol);
    true
}

fn request_issue(event: &TraceEvent, store: &mut TraceStateStore) -> bool {
    let (Some(major), Some(minor)) = (
        event.field_long(fields::MAJOR),
        event.field_long(fields::MINOR),
    ) else {
        return false;
    };
    let Some(operation) = event.field_long(fields::OPERATION) else {
        return false;
    };

    let devcode = BdevTrack::device_code(major, minor);
    let mode = if operation == 0 {
        BdevMode::BusyReading
    } else {
        BdevMode::BusyWriting
    };
    store
        .bdev_states_mut()
        .entry(devcode)
        .or_default()
        .push_mode(mode);
    true
}

fn request_complete(event: &TraceEvent, store: &mut TraceStateStore) -> bool {
    let (Some(major), Some(minor)) = (
        event.field_long(fields::MAJOR),
        event.field_long(fields::MINOR),
    ) else {
        return false;
    };

    let devcode = BdevTrack::device_code(major, minor);
    store
        .bdev_states_mut()
        .entry(devcode)
        .or_default()
        .pop_mode();
    true
}
