//! Per-resource state tracks: cpus, irq lines, soft-irq vectors, trap lines
//! and block devices.

use crate::stack::ModeStack;

/// What a cpu is doing right now (top of its mode stack).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CpuMode {
    Unknown,
    Idle,
    Busy,
    Irq,
    SoftIrq,
    Trap,
}

impl CpuMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CpuMode::Unknown => "unknown",
            CpuMode::Idle => "idle",
            CpuMode::Busy => "busy",
            CpuMode::Irq => "irq",
            CpuMode::SoftIrq => "softirq",
            CpuMode::Trap => "trap",
        }
    }
}

/// Interrupt line mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IrqMode {
    Unknown,
    Idle,
    Busy,
}

impl IrqMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IrqMode::Unknown => "unknown",
            IrqMode::Idle => "idle",
            IrqMode::Busy => "busy",
        }
    }
}

/// Block device mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BdevMode {
    Unknown,
    Idle,
    BusyReading,
    BusyWriting,
}

impl BdevMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BdevMode::Unknown => "unknown",
            BdevMode::Idle => "idle",
            BdevMode::BusyReading => "busy_reading",
            BdevMode::BusyWriting => "busy_writing",
        }
    }
}

/// Per-cpu track: the mode stack plus the ids of the irq/soft-irq/trap the
/// cpu is currently nested in, so the matching exit event can find them.
#[derive(Clone, Debug)]
pub struct CpuTrack {
    mode_stack: ModeStack<CpuMode>,
    irq_stack: Vec<i64>,
    soft_irq_stack: Vec<i64>,
    trap_stack: Vec<i64>,
}

impl Default for CpuTrack {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuTrack {
    pub fn new() -> Self {
        Self {
            mode_stack: ModeStack::new(CpuMode::Unknown),
            irq_stack: Vec::new(),
            soft_irq_stack: Vec::new(),
            trap_stack: Vec::new(),
        }
    }

    pub fn mode(&self) -> CpuMode {
        *self.mode_stack.top()
    }

    pub fn push_mode(&mut self, mode: CpuMode) {
        self.mode_stack.push(mode);
    }

    /// Pop the current mode; an exhausted stack re-seeds to `Unknown`.
    pub fn pop_mode(&mut self) -> CpuMode {
        self.mode_stack.pop_or_seed(CpuMode::Unknown)
    }

    /// Replace the whole stack with a single base mode (scheduling decisions
    /// reset the cpu to idle/busy regardless of leftover nesting).
    pub fn set_base_mode(&mut self, mode: CpuMode) {
        self.mode_stack.set_base(mode);
    }

    pub fn mode_stack_depth(&self) -> usize {
        self.mode_stack.depth()
    }

    pub fn push_irq(&mut self, irq: i64) {
        self.irq_stack.push(irq);
    }

    /// Id of the irq being left, `None` when no entry was recorded.
    pub fn pop_irq(&mut self) -> Option<i64> {
        self.irq_stack.pop()
    }

    pub fn push_soft_irq(&mut self, soft_irq: i64) {
        self.soft_irq_stack.push(soft_irq);
    }

    pub fn pop_soft_irq(&mut self) -> Option<i64> {
        self.soft_irq_stack.pop()
    }

    pub fn push_trap(&mut self, trap: i64) {
        self.trap_stack.push(trap);
    }

    pub fn pop_trap(&mut self) -> Option<i64> {
        self.trap_stack.pop()
    }
}

/// Interrupt-line track: a mode stack (irq handlers may nest across cpus).
#[derive(Clone, Debug)]
pub struct IrqTrack {
    mode_stack: ModeStack<IrqMode>,
}

impl Default for IrqTrack {
    fn default() -> Self {
        Self::new()
    }
}

impl IrqTrack {
    pub fn new() -> Self {
        Self {
            mode_stack: ModeStack::new(IrqMode::Unknown),
        }
    }

    pub fn mode(&self) -> IrqMode {
        *self.mode_stack.top()
    }

    pub fn push_mode(&mut self, mode: IrqMode) {
        self.mode_stack.push(mode);
    }

    pub fn pop_mode(&mut self) -> IrqMode {
        self.mode_stack.pop_or_seed(IrqMode::Unknown)
    }

    pub fn mode_stack_depth(&self) -> usize {
        self.mode_stack.depth()
    }
}

/// Soft-irq vector track: pending/running counters instead of a stack.
/// Raises are not cumulative, so `pending` is a flag in practice; both
/// counters saturate at zero rather than going negative on unpaired exits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SoftIrqTrack {
    pending: u64,
    running: u64,
}

impl SoftIrqTrack {
    pub fn pending(&self) -> u64 {
        self.pending
    }

    pub fn running(&self) -> u64 {
        self.running
    }

    pub fn set_pending(&mut self, pending: u64) {
        self.pending = pending;
    }

    pub fn decrement_pending(&mut self) {
        self.pending = self.pending.saturating_sub(1);
    }

    pub fn increment_running(&mut self) {
        self.running += 1;
    }

    pub fn decrement_running(&mut self) {
        self.running = self.running.saturating_sub(1);
    }
}

/// Trap-line track: only a running counter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrapTrack {
    running: u64,
}

impl TrapTrack {
    pub fn running(&self) -> u64 {
        self.running
    }

    pub fn increment_running(&mut self) {
        self.running += 1;
    }

    pub fn decrement_running(&mut self) {
        self.running = self.running.saturating_sub(1);
    }
}

/// Block-device track, keyed in the store by [`BdevTrack::device_code`].
#[derive(Clone, Debug)]
pub struct BdevTrack {
    mode_stack: ModeStack<BdevMode>,
}

impl Default for BdevTrack {
    fn default() -> Self {
        Self::new()
    }
}

impl BdevTrack {
    pub fn new() -> Self {
        Self {
            mode_stack: ModeStack::new(BdevMode::Unknown),
        }
    }

    /// Pack (major, minor) into the single device code used as map key.
    pub fn device_code(major: i64, minor: i64) -> i64 {
        (major << 20) | minor
    }

    pub fn mode(&self) -> BdevMode {
        *self.mode_stack.top()
    }

    pub fn push_mode(&mut self, mode: BdevMode) {
        self.mode_stack.push(mode);
    }

    pub fn pop_mode(&mut self) -> BdevMode {
        self.mode_stack.pop_or_seed(BdevMode::Unknown)
    }

    pub fn mode_stack_depth(&self) -> usize {
        self.mode_stack.depth()
    }
}
