//! The aggregate root: every process, cpu, interrupt line, soft-irq vector,
//! trap line and block device reconstructed from the event stream so far.
//!
//! The store is single-writer and performs no I/O; a consumer feeds events
//! through the dispatcher and periodically calls [`TraceStateStore::snapshot`]
//! to obtain an independent checkpoint it can keep (or hand to a reader
//! thread) and later reuse as a seek starting point instead of replaying the
//! whole trace.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;

use crate::constants::DEFAULT_SAVE_INTERVAL;
use crate::error::StateError;
use crate::model::process::{ProcessIndex, ProcessRecord, UNNAMED};
use crate::model::resource::{BdevTrack, CpuTrack, IrqTrack, SoftIrqTrack, TrapTrack};
use crate::names::NameRegistry;

/// Trace time window, nanoseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: u64,
    pub end: u64,
}

/// Externally supplied description of the trace being reconstructed.
/// Consumed at `init` only.
#[derive(Clone, Debug, Serialize)]
pub struct TraceContext {
    pub trace_id: u64,
    pub cpu_count: u32,
    pub time_window: TimeWindow,
}

/// Serializable digest of the store, for tooling and diagnostics.
#[derive(Clone, Debug, Serialize)]
pub struct StateSummary {
    pub trace_id: u64,
    pub nb_events: u64,
    pub process_count: usize,
    /// cpu -> (pid, name, status) of the currently running process.
    pub running: BTreeMap<u32, RunningDigest>,
    pub irq_count: usize,
    pub soft_irq_count: usize,
    pub trap_count: usize,
    pub bdev_count: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct RunningDigest {
    pub pid: i64,
    pub name: String,
    pub status: &'static str,
    pub mode: &'static str,
}

/// Reconstructed state of one trace.
#[derive(Clone, Debug)]
pub struct TraceStateStore {
    context: Option<TraceContext>,
    registry: Arc<NameRegistry>,
    processes: HashMap<ProcessIndex, ProcessRecord>,
    /// cpu -> index of the process currently occupying it. Index keys are
    /// resolved through `processes`, which preserves the "same record in
    /// both maps" semantics without shared mutable ownership.
    running_process: HashMap<u32, ProcessIndex>,
    cpu_states: HashMap<u32, CpuTrack>,
    irq_states: HashMap<i64, IrqTrack>,
    soft_irq_states: HashMap<i64, SoftIrqTrack>,
    trap_states: HashMap<i64, TrapTrack>,
    bdev_states: HashMap<i64, BdevTrack>,
    syscall_names: HashMap<i64, String>,
    trap_names: HashMap<i64, String>,
    irq_names: HashMap<i64, String>,
    soft_irq_names: HashMap<i64, String>,
    kprobe_table: HashMap<u64, String>,
    nb_events: u64,
    save_interval: u64,
    max_time_state_recomputed_in_seek: u64,
    has_precomputed_states: bool,
}

impl TraceStateStore {
    /// Empty store; call [`set_context`] then [`init`] before feeding events.
    ///
    /// [`set_context`]: TraceStateStore::set_context
    /// [`init`]: TraceStateStore::init
    pub fn new(registry: Arc<NameRegistry>) -> Self {
        Self {
            context: None,
            registry,
            processes: HashMap::new(),
            running_process: HashMap::new(),
            cpu_states: HashMap::new(),
            irq_states: HashMap::new(),
            soft_irq_states: HashMap::new(),
            trap_states: HashMap::new(),
            bdev_states: HashMap::new(),
            syscall_names: HashMap::new(),
            trap_names: HashMap::new(),
            irq_names: HashMap::new(),
            soft_irq_names: HashMap::new(),
            kprobe_table: HashMap::new(),
            nb_events: 0,
            save_interval: DEFAULT_SAVE_INTERVAL,
            max_time_state_recomputed_in_seek: 0,
            has_precomputed_states: false,
        }
    }

    /// Construct, attach the context and initialize in one step.
    pub fn with_context(registry: Arc<NameRegistry>, context: TraceContext) -> Self {
        let mut store = Self::new(registry);
        store.set_context(context);
        // init cannot fail once a context is attached
        let _ = store.init();
        store
    }

    pub fn set_context(&mut self, context: TraceContext) {
        self.context = Some(context);
    }

    pub fn context(&self) -> Option<&TraceContext> {
        self.context.as_ref()
    }

    /// Trace id from the attached context, 0 before one is attached.
    pub fn trace_id(&self) -> u64 {
        self.context.as_ref().map(|c| c.trace_id).unwrap_or(0)
    }

    /// Reset every map and repopulate the initial state: name tables copied
    /// from the registry, one resource track per known cpu/irq/soft-irq/trap
    /// id, and one synthetic pid-0 process per cpu registered both in the
    /// process map and as that cpu's running process.
    ///
    /// Idempotent; fails only when no trace context has been supplied.
    pub fn init(&mut self) -> Result<(), StateError> {
        let context = self.context.clone().ok_or(StateError::MissingContext)?;

        self.processes.clear();
        self.running_process.clear();
        self.cpu_states.clear();
        self.irq_states.clear();
        self.soft_irq_states.clear();
        self.trap_states.clear();
        self.bdev_states.clear();
        self.kprobe_table.clear();
        self.nb_events = 0;
        self.has_precomputed_states = false;
        self.max_time_state_recomputed_in_seek = 0;

        self.syscall_names = self.registry.syscall_names().clone();
        self.trap_names = self.registry.trap_names().clone();
        self.irq_names = self.registry.irq_names().clone();
        self.soft_irq_names = self.registry.soft_irq_names().clone();

        for &irq in self.irq_names.keys() {
            self.irq_states.insert(irq, IrqTrack::new());
        }
        for &soft_irq in self.soft_irq_names.keys() {
            self.soft_irq_states.insert(soft_irq, SoftIrqTrack::default());
        }
        for &trap in self.trap_names.keys() {
            self.trap_states.insert(trap, TrapTrack::default());
        }

        let start = context.time_window.start;
        for cpu in 0..context.cpu_count {
            self.cpu_states.insert(cpu, CpuTrack::new());
            let idle = ProcessRecord::idle(cpu, start, context.trace_id);
            self.running_process.insert(cpu, idle.index());
            self.processes.insert(idle.index(), idle);
        }

        Ok(())
    }

    /// Checkpoint primitive: a fully independent deep copy of the store.
    ///
    /// Every process record and resource track is cloned with its own
    /// internal stacks; only the immutable name registry is shared. Mutating
    /// the snapshot never affects the original and vice versa, so a snapshot
    /// may be handed to another thread and kept indefinitely.
    pub fn snapshot(&self) -> Self {
        self.clone()
    }

    /// Find a process by the composite-index rule: pid 0 matches per cpu,
    /// any other pid matches on (pid, trace_id) alone.
    pub fn find_process(&self, pid: i64, cpu: u32, trace_id: u64) -> Option<&ProcessRecord> {
        self.processes.get(&ProcessIndex { pid, cpu, trace_id })
    }

    pub fn find_process_mut(
        &mut self,
        pid: i64,
        cpu: u32,
        trace_id: u64,
    ) -> Option<&mut ProcessRecord> {
        self.processes.get_mut(&ProcessIndex { pid, cpu, trace_id })
    }

    /// Find a process or create it with the dual-frame birth convention and
    /// an UNNAMED command.
    pub fn find_or_create_process(
        &mut self,
        cpu: u32,
        pid: i64,
        timestamp: u64,
    ) -> &mut ProcessRecord {
        let trace_id = self.trace_id();
        self.processes
            .entry(ProcessIndex { pid, cpu, trace_id })
            .or_insert_with(|| ProcessRecord::new(cpu, pid, 0, UNNAMED, timestamp, trace_id))
    }

    /// Insert a record under its derived index.
    pub fn add_process_state(&mut self, process: ProcessRecord) {
        self.processes.insert(process.index(), process);
    }

    /// Remove a record by index.
    pub fn remove_process_state(&mut self, index: &ProcessIndex) -> Option<ProcessRecord> {
        self.processes.remove(index)
    }

    pub fn processes(&self) -> &HashMap<ProcessIndex, ProcessRecord> {
        &self.processes
    }

    pub fn processes_mut(&mut self) -> &mut HashMap<ProcessIndex, ProcessRecord> {
        &mut self.processes
    }

    /// The per-cpu running-process map (index keys).
    pub fn running_process(&self) -> &HashMap<u32, ProcessIndex> {
        &self.running_process
    }

    /// Record currently occupying `cpu`, if the cpu is known.
    pub fn running_process_on(&self, cpu: u32) -> Option<&ProcessRecord> {
        let index = self.running_process.get(&cpu)?;
        self.processes.get(index)
    }

    pub fn running_process_on_mut(&mut self, cpu: u32) -> Option<&mut ProcessRecord> {
        let index = *self.running_process.get(&cpu)?;
        self.processes.get_mut(&index)
    }

    pub fn set_running_process(&mut self, cpu: u32, index: ProcessIndex) {
        self.running_process.insert(cpu, index);
    }

    pub fn cpu_states(&self) -> &HashMap<u32, CpuTrack> {
        &self.cpu_states
    }

    pub fn cpu_state_mut(&mut self, cpu: u32) -> Option<&mut CpuTrack> {
        self.cpu_states.get_mut(&cpu)
    }

    pub fn irq_states(&self) -> &HashMap<i64, IrqTrack> {
        &self.irq_states
    }

    pub fn irq_states_mut(&mut self) -> &mut HashMap<i64, IrqTrack> {
        &mut self.irq_states
    }

    pub fn soft_irq_states(&self) -> &HashMap<i64, SoftIrqTrack> {
        &self.soft_irq_states
    }

    pub fn soft_irq_states_mut(&mut self) -> &mut HashMap<i64, SoftIrqTrack> {
        &mut self.soft_irq_states
    }

    pub fn trap_states(&self) -> &HashMap<i64, TrapTrack> {
        &self.trap_states
    }

    pub fn trap_states_mut(&mut self) -> &mut HashMap<i64, TrapTrack> {
        &mut self.trap_states
    }

    pub fn bdev_states(&self) -> &HashMap<i64, BdevTrack> {
        &self.bdev_states
    }

    pub fn bdev_states_mut(&mut self) -> &mut HashMap<i64, BdevTrack> {
        &mut self.bdev_states
    }

    pub fn syscall_names(&self) -> &HashMap<i64, String> {
        &self.syscall_names
    }

    pub fn syscall_names_mut(&mut self) -> &mut HashMap<i64, String> {
        &mut self.syscall_names
    }

    pub fn trap_names(&self) -> &HashMap<i64, String> {
        &self.trap_names
    }

    pub fn irq_names(&self) -> &HashMap<i64, String> {
        &self.irq_names
    }

    pub fn irq_names_mut(&mut self) -> &mut HashMap<i64, String> {
        &mut self.irq_names
    }

    pub fn soft_irq_names(&self) -> &HashMap<i64, String> {
        &self.soft_irq_names
    }

    pub fn soft_irq_names_mut(&mut self) -> &mut HashMap<i64, String> {
        &mut self.soft_irq_names
    }

    pub fn kprobe_table(&self) -> &HashMap<u64, String> {
        &self.kprobe_table
    }

    pub fn kprobe_table_mut(&mut self) -> &mut HashMap<u64, String> {
        &mut self.kprobe_table
    }

    /// Events processed so far (maintained by the dispatcher).
    pub fn nb_events(&self) -> u64 {
        self.nb_events
    }

    pub fn increment_nb_events(&mut self) {
        self.nb_events += 1;
    }

    pub fn save_interval(&self) -> u64 {
        self.save_interval
    }

    pub fn set_save_interval(&mut self, interval: u64) {
        self.save_interval = interval;
    }

    /// Latest timestamp up to which state was rebuilt while answering a
    /// seek; consumers use it to decide between a checkpoint replay and a
    /// full replay.
    pub fn max_time_state_recomputed_in_seek(&self) -> u64 {
        self.max_time_state_recomputed_in_seek
    }

    pub fn set_max_time_state_recomputed_in_seek(&mut self, time: u64) {
        if time > self.max_time_state_recomputed_in_seek {
            self.max_time_state_recomputed_in_seek = time;
        }
    }

    pub fn has_precomputed_states(&self) -> bool {
        self.has_precomputed_states
    }

    pub fn set_has_precomputed_states(&mut self, precomputed: bool) {
        self.has_precomputed_states = precomputed;
    }

    /// Build a serializable digest of the current state.
    pub fn summary(&self) -> StateSummary {
        let running = self
            .running_process
            .iter()
            .filter_map(|(&cpu, index)| {
                self.processes.get(index).map(|process| {
                    (
                        cpu,
                        RunningDigest {
                            pid: process.pid,
                            name: process.name.clone(),
                            status: process.current_state().status.as_str(),
                            mode: process.current_state().mode.as_str(),
                        },
                    )
                })
            })
            .collect();
        StateSummary {
            trace_id: self.trace_id(),
            nb_events: self.nb_events,
            process_count: self.processes.len(),
            running,
            irq_count: self.irq_states.len(),
            soft_irq_count: self.soft_irq_states.len(),
            trap_count: self.trap_states.len(),
            bdev_count: self.bdev_states.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::execution::{ExecutionMode, ProcessStatus};

    fn two_cpu_store() -> TraceStateStore {
        TraceStateStore::with_context(
            Arc::new(NameRegistry::default()),
            TraceContext {
                trace_id: 1,
                cpu_count: 2,
                time_window: TimeWindow { start: 0, end: 1_000_000 },
            },
        )
    }

    #[test]
    fn test_init_requires_context() {
        let mut store = TraceStateStore::new(Arc::new(NameRegistry::default()));
        assert!(matches!(store.init(), Err(StateError::MissingContext)));
    }

    #[test]
    fn test_init_populates_idle_processes_and_tracks() {
        let store = two_cpu_store();
        assert_eq!(store.processes().len(), 2);
        for cpu in 0..2 {
            let process = store.running_process_on(cpu).unwrap();
            assert_eq!(process.pid, 0);
            assert_eq!(process.cpu, cpu);
            assert_eq!(process.frame_count(), 1);
            assert_eq!(process.current_state().mode, ExecutionMode::Unknown);
            assert_eq!(process.current_state().status, ProcessStatus::Unnamed);
        }
        assert_eq!(store.cpu_states().len(), 2);
        assert_eq!(store.irq_states().len(), store.irq_names().len());
        assert_eq!(store.soft_irq_states().len(), store.soft_irq_names().len());
        assert_eq!(store.trap_states().len(), store.trap_names().len());
        assert!(store.bdev_states().is_empty());
    }

    #[test]
    fn test_init_is_idempotent() {
        let mut store = two_cpu_store();
        store.find_or_create_process(0, 77, 10);
        store.increment_nb_events();
        store.init().unwrap();
        assert_eq!(store.processes().len(), 2);
        assert_eq!(store.nb_events(), 0);
        assert!(store.find_process(77, 0, 1).is_none());
    }

    #[test]
    fn test_find_process_pid_zero_is_cpu_sensitive() {
        let store = two_cpu_store();
        let on_cpu0 = store.find_process(0, 0, 1).unwrap();
        let on_cpu1 = store.find_process(0, 1, 1).unwrap();
        assert_eq!(on_cpu0.cpu, 0);
        assert_eq!(on_cpu1.cpu, 1);
        assert!(store.find_process(0, 5, 1).is_none());
    }

    #[test]
    fn test_find_process_nonzero_pid_ignores_cpu() {
        let mut store = two_cpu_store();
        store.find_or_create_process(1, 321, 50);
        let a = store.find_process(321, 0, 1).unwrap();
        assert_eq!(a.cpu, 1);
        assert!(store.find_process(321, 99, 1).is_some());
        assert!(store.find_process(321, 0, 2).is_none());
    }

    #[test]
    fn test_snapshot_is_deeply_independent() {
        let mut store = two_cpu_store();
        store.find_or_create_process(0, 50, 100);
        let snapshot = store.snapshot();

        // Mutate the original in every direction a handler would.
        store.find_or_create_process(0, 60, 200);
        if let Some(p) = store.find_process_mut(50, 0, 1) {
            p.name = "mutated".to_string();
            p.current_state_mut().status = ProcessStatus::Run;
        }
        if let Some(cpu) = store.cpu_state_mut(0) {
            cpu.push_mode(crate::model::resource::CpuMode::Irq);
        }
        store.soft_irq_states_mut().entry(3).or_default().set_pending(1);
        store.increment_nb_events();

        assert!(snapshot.find_process(60, 0, 1).is_none());
        let snap50 = snapshot.find_process(50, 0, 1).unwrap();
        assert_eq!(snap50.name, UNNAMED);
        assert_eq!(snap50.current_state().status, ProcessStatus::WaitFork);
        assert_eq!(
            snapshot.cpu_states().get(&0).unwrap().mode(),
            crate::model::resource::CpuMode::Unknown
        );
        assert_eq!(snapshot.soft_irq_states().get(&3).unwrap().pending(), 0);
        assert_eq!(snapshot.nb_events(), 0);

        // And the other way round: mutating the snapshot leaves the original alone.
        let mut snapshot = snapshot;
        snapshot.find_or_create_process(1, 70, 300);
        assert!(store.find_process(70, 0, 1).is_none());
    }

    #[test]
    fn test_summary_serializes() {
        let store = two_cpu_store();
        let summary = store.summary();
        assert_eq!(summary.process_count, 2);
        assert_eq!(summary.running.len(), 2);
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"nb_events\":0"));
    }
}
