//! State model: processes, execution frames and per-resource tracks.

pub mod execution;
pub mod process;
pub mod resource;

pub use execution::{ExecutionFrame, ExecutionMode, ProcessStatus};
pub use process::{ProcessIndex, ProcessKind, ProcessRecord, ANY_CPU};
pub use resource::{BdevMode, BdevTrack, CpuMode, CpuTrack, IrqMode, IrqTrack, SoftIrqTrack, TrapTrack};
