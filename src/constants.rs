//! Shared constants for the state engine.
//!
//! The submode category bits let statistics consumers aggregate execution
//! frames on a single packed integer instead of comparing submode strings:
//! the low bits carry the numeric syscall/trap/irq/softirq id, the high bits
//! tag which name table the id belongs to.

/// Mask covering the numeric id portion of a packed submode id.
pub const SUBMODE_ID_MASK: u32 = 0x00FF_FFFF;

/// Category bit for submodes that carry no table-backed id (UNKNOWN/NONE).
pub const CAT_NONE: u32 = 0x0100_0000;
/// Category bit for syscall submode ids.
pub const CAT_SYSCALL: u32 = 0x0200_0000;
/// Category bit for trap submode ids.
pub const CAT_TRAP: u32 = 0x0400_0000;
/// Category bit for irq submode ids.
pub const CAT_IRQ: u32 = 0x0800_0000;
/// Category bit for soft-irq submode ids.
pub const CAT_SOFT_IRQ: u32 = 0x1000_0000;

/// Packed id for the UNKNOWN submode.
pub const SUBMODE_UNKNOWN_ID: u32 = CAT_NONE;
/// Packed id for the NONE submode.
pub const SUBMODE_NONE_ID: u32 = CAT_NONE | 1;

/// Default number of events between state checkpoints taken by consumers
/// that drive seek support.
pub const DEFAULT_SAVE_INTERVAL: u64 = 50_000;
