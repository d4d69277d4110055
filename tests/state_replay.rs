//! End-to-end replay scenarios: whole event sequences against a live store,
//! checking the reconstructed state after each phase.

use std::sync::Arc;

use kstate::event::{fields, EventType, TraceEvent};
use kstate::handlers::EventDispatcher;
use kstate::model::execution::{ExecutionMode, ProcessStatus};
use kstate::model::process::ANY_CPU;
use kstate::model::resource::CpuMode;
use kstate::names::NameRegistry;
use kstate::store::{TimeWindow, TraceContext, TraceStateStore};

const TRACE: u64 = 7;

fn new_store(cpu_count: u32) -> TraceStateStore {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
    TraceStateStore::with_context(
        Arc::new(NameRegistry::default()),
        TraceContext {
            trace_id: TRACE,
            cpu_count,
            time_window: TimeWindow {
                start: 0,
                end: 100_000_000,
            },
        },
    )
}

fn replay(store: &mut TraceStateStore, events: &[TraceEvent]) {
    let dispatcher = EventDispatcher::new();
    for event in events {
        dispatcher.dispatch(event, store);
    }
}

fn schedule(ts: u64, cpu: u32, prev: i64, next: i64, prev_state: i64) -> TraceEvent {
    TraceEvent::new(EventType::SchedSchedule, ts, cpu)
        .with_long(fields::PREV_PID, prev)
        .with_long(fields::NEXT_PID, next)
        .with_long(fields::PREV_STATE, prev_state)
}

#[test]
fn full_process_lifecycle() {
    let mut store = new_store(2);
    let dispatcher = EventDispatcher::new();

    // Parent 100 gets cpu 0 and forks 101.
    replay(
        &mut store,
        &[
            schedule(1_000, 0, 0, 100, 0),
            TraceEvent::new(EventType::Exec, 1_100, 0).with_str(fields::FILENAME, "/bin/sh"),
            TraceEvent::new(EventType::ProcessFork, 2_000, 0)
                .with_long(fields::PARENT_PID, 100)
                .with_long(fields::CHILD_PID, 101)
                .with_long(fields::CHILD_TGID, 101),
        ],
    );

    let child = store.find_process(101, ANY_CPU, TRACE).unwrap();
    assert_eq!(child.ppid, 100);
    assert_eq!(child.creation_time, 2_000);
    assert_eq!(child.name, "/bin/sh");
    assert_eq!(child.current_state().status, ProcessStatus::WaitFork);

    // Child scheduled in on cpu 1, execs, works, exits.
    replay(
        &mut store,
        &[
            schedule(3_000, 1, 0, 101, 0),
            TraceEvent::new(EventType::Exec, 3_100, 1).with_str(fields::FILENAME, "/bin/true"),
            TraceEvent::new(EventType::ProcessExit, 4_000, 1).with_long(fields::PID, 101),
        ],
    );
    let child = store.find_process(101, ANY_CPU, TRACE).unwrap();
    assert_eq!(child.name, "/bin/true");
    assert_eq!(child.cpu, 1);
    assert_eq!(child.current_state().status, ProcessStatus::Exit);

    // Dead schedule-out then free: the record survives the first release
    // event and disappears at the second.
    dispatcher.dispatch(&schedule(5_000, 1, 101, 0, 64), &mut store);
    assert!(store.find_process(101, ANY_CPU, TRACE).is_some());
    dispatcher.dispatch(
        &TraceEvent::new(EventType::ProcessFree, 6_000, 0).with_long(fields::PID, 101),
        &mut store,
    );
    assert!(store.find_process(101, ANY_CPU, TRACE).is_none());

    // The parent is untouched throughout.
    let parent = store.find_process(100, ANY_CPU, TRACE).unwrap();
    assert_eq!(parent.name, "/bin/sh");
    assert_eq!(parent.current_state().status, ProcessStatus::Run);
}

#[test]
fn free_before_dead_schedule_out() {
    let mut store = new_store(1);
    replay(
        &mut store,
        &[
            schedule(1_000, 0, 0, 100, 0),
            TraceEvent::new(EventType::ProcessFree, 2_000, 0).with_long(fields::PID, 100),
        ],
    );
    // One release event seen: still present.
    assert_eq!(store.find_process(100, ANY_CPU, TRACE).unwrap().free_events, 1);

    replay(&mut store, &[schedule(3_000, 0, 100, 0, 32)]);
    assert!(store.find_process(100, ANY_CPU, TRACE).is_none());
}

#[test]
fn nested_kernel_paths_unwind_in_order() {
    let mut store = new_store(1);
    replay(
        &mut store,
        &[
            schedule(1_000, 0, 0, 42, 0),
            TraceEvent::new(EventType::SyscallEntry, 2_000, 0).with_long(fields::SYSCALL_ID, 1),
            TraceEvent::new(EventType::TrapEntry, 3_000, 0).with_long(fields::TRAP_ID, 14),
            TraceEvent::new(EventType::IrqEntry, 4_000, 0).with_long(fields::IRQ_ID, 3),
        ],
    );

    let process = store.running_process_on(0).unwrap();
    assert_eq!(process.frame_count(), 5);
    assert_eq!(process.current_state().mode, ExecutionMode::Irq);
    assert_eq!(store.cpu_states().get(&0).unwrap().mode(), CpuMode::Irq);

    replay(
        &mut store,
        &[
            TraceEvent::new(EventType::IrqExit, 5_000, 0),
            TraceEvent::new(EventType::TrapExit, 6_000, 0),
            TraceEvent::new(EventType::SyscallExit, 7_000, 0),
        ],
    );
    // Back down to the birth frames; the residual frame is the process
    // creation syscall frame.
    let process = store.running_process_on(0).unwrap();
    assert_eq!(process.frame_count(), 2);
    assert_eq!(process.current_state().mode, ExecutionMode::Syscall);
    assert_eq!(process.bottom_frame().mode, ExecutionMode::UserMode);
    assert_eq!(process.current_state().change_time, 7_000);
    assert_eq!(store.cpu_states().get(&0).unwrap().mode(), CpuMode::Busy);
    assert_eq!(store.trap_states().get(&14).unwrap().running(), 0);
}

#[test]
fn unmatched_exits_never_underflow() {
    let mut store = new_store(1);
    replay(&mut store, &[schedule(1_000, 0, 0, 42, 0)]);

    let exits: Vec<TraceEvent> = (0..10)
        .flat_map(|i| {
            let ts = 2_000 + i * 100;
            [
                TraceEvent::new(EventType::SyscallExit, ts, 0),
                TraceEvent::new(EventType::IrqExit, ts + 10, 0),
                TraceEvent::new(EventType::TrapExit, ts + 20, 0),
                TraceEvent::new(EventType::SoftIrqExit, ts + 30, 0),
            ]
        })
        .collect();
    replay(&mut store, &exits);

    let process = store.running_process_on(0).unwrap();
    assert!(process.frame_count() >= 1);
    assert!(store.cpu_states().get(&0).unwrap().mode_stack_depth() >= 1);
    for track in store.irq_states().values() {
        assert!(track.mode_stack_depth() >= 1);
    }
}

#[test]
fn snapshot_resumes_identically() {
    let mut store = new_store(2);
    replay(
        &mut store,
        &[
            schedule(1_000, 0, 0, 100, 0),
            schedule(1_100, 1, 0, 200, 0),
            TraceEvent::new(EventType::SyscallEntry, 2_000, 0).with_long(fields::SYSCALL_ID, 3),
        ],
    );

    let mut checkpoint = store.snapshot();
    assert_eq!(checkpoint.nb_events(), store.nb_events());

    // Apply the same tail to both; they must end up in the same state.
    let tail = [
        TraceEvent::new(EventType::SyscallExit, 3_000, 0),
        schedule(4_000, 0, 100, 0, 1),
        TraceEvent::new(EventType::SoftIrqRaise, 5_000, 1).with_long(fields::SOFT_IRQ_ID, 6),
        TraceEvent::new(EventType::SoftIrqEntry, 5_100, 1).with_long(fields::SOFT_IRQ_ID, 6),
    ];
    replay(&mut store, &tail);
    replay(&mut checkpoint, &tail);

    assert_eq!(store.nb_events(), checkpoint.nb_events());
    assert_eq!(store.processes().len(), checkpoint.processes().len());
    for (index, process) in store.processes() {
        let other = checkpoint.processes().get(index).unwrap();
        assert_eq!(process.pid, other.pid);
        assert_eq!(process.current_state(), other.current_state());
        assert_eq!(process.frame_count(), other.frame_count());
    }
    assert_eq!(
        serde_json::to_string(&store.summary()).unwrap(),
        serde_json::to_string(&checkpoint.summary()).unwrap()
    );
}

#[test]
fn snapshot_unaffected_by_later_events() {
    let mut store = new_store(1);
    replay(&mut store, &[schedule(1_000, 0, 0, 100, 0)]);
    let checkpoint = store.snapshot();

    replay(
        &mut store,
        &[
            TraceEvent::new(EventType::ProcessFork, 2_000, 0)
                .with_long(fields::CHILD_PID, 101)
                .with_long(fields::CHILD_TGID, 101),
            TraceEvent::new(EventType::SyscallEntry, 3_000, 0).with_long(fields::SYSCALL_ID, 1),
        ],
    );

    assert!(store.find_process(101, ANY_CPU, TRACE).is_some());
    assert!(checkpoint.find_process(101, ANY_CPU, TRACE).is_none());
    assert_eq!(
        checkpoint.running_process_on(0).unwrap().frame_count(),
        2
    );
}

#[test]
fn idle_processes_stay_per_cpu() {
    let mut store = new_store(4);
    // Schedule work on cpus 1 and 3; 0 and 2 stay idle.
    replay(
        &mut store,
        &[
            schedule(1_000, 1, 0, 100, 0),
            schedule(1_100, 3, 0, 200, 0),
        ],
    );

    for cpu in [0u32, 2] {
        let idle = store.running_process_on(cpu).unwrap();
        assert_eq!(idle.pid, 0);
        assert_eq!(idle.cpu, cpu);
        assert_eq!(idle.current_state().mode, ExecutionMode::Unknown);
    }
    // The idle records scheduled out got their mode settled.
    for cpu in [1u32, 3] {
        let idle = store.find_process(0, cpu, TRACE).unwrap();
        assert_eq!(idle.current_state().mode, ExecutionMode::Syscall);
        assert_eq!(idle.current_state().status, ProcessStatus::Wait);
    }
}

#[test]
fn statedump_then_schedule() {
    let mut store = new_store(1);
    replay(
        &mut store,
        &[
            TraceEvent::new(EventType::ProcessState, 100, 0)
                .with_long(fields::PID, 500)
                .with_long(fields::PARENT_PID, 1)
                .with_long(fields::TGID, 500)
                .with_long(fields::TYPE, 0)
                .with_str(fields::NAME, "nginx"),
            TraceEvent::new(EventType::StatedumpEnd, 200, 0),
            schedule(1_000, 0, 0, 500, 0),
        ],
    );

    let process = store.running_process_on(0).unwrap();
    assert_eq!(process.pid, 500);
    assert_eq!(process.name, "nginx");
    // Settled by the dump end: user-mode bottom, syscall wait frame on top,
    // now marked running by the schedule.
    assert_eq!(process.bottom_frame().mode, ExecutionMode::UserMode);
    assert_eq!(process.current_state().mode, ExecutionMode::Syscall);
    assert_eq!(process.current_state().status, ProcessStatus::Run);
}

#[test]
fn trap_resumed_process_restores_cpu_trap_mode() {
    let mut store = new_store(2);
    replay(
        &mut store,
        &[
            schedule(1_000, 0, 0, 42, 0),
            TraceEvent::new(EventType::TrapEntry, 2_000, 0).with_long(fields::TRAP_ID, 14),
            // Preempted mid-trap, another process runs.
            schedule(3_000, 0, 42, 77, 0),
        ],
    );
    assert_eq!(store.cpu_states().get(&0).unwrap().mode(), CpuMode::Busy);

    // 42 comes back still inside its trap; the cpu returns to trap mode.
    replay(&mut store, &[schedule(4_000, 0, 77, 42, 0)]);
    assert_eq!(store.cpu_states().get(&0).unwrap().mode(), CpuMode::Trap);
    assert_eq!(
        store.running_process_on(0).unwrap().current_state().mode,
        ExecutionMode::Trap
    );
}

#[test]
fn table_dumps_refine_later_submodes() {
    let mut store = new_store(1);
    replay(
        &mut store,
        &[
            TraceEvent::new(EventType::SyscallTable, 100, 0)
                .with_long(fields::ID, 1)
                .with_str(fields::SYMBOL, "sys_exit"),
            schedule(1_000, 0, 0, 42, 0),
            TraceEvent::new(EventType::SyscallEntry, 2_000, 0).with_long(fields::SYSCALL_ID, 1),
        ],
    );
    assert_eq!(
        store.running_process_on(0).unwrap().current_state().submode,
        "sys_exit"
    );
}
