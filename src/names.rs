//! Static name tables for syscalls, traps, irqs and soft-irqs.
//!
//! The registry is loaded once at startup and shared by reference with every
//! state store; the store copies the tables into its own mutable maps at
//! `init` so that table-dump events (sys_call_table, softirq_vec, interrupt
//! lists) can refine names per trace without touching the shared registry.

use std::collections::HashMap;

/// Number of generic syscall names seeded by default.
pub const SYSCALL_TABLE_SIZE: i64 = 256;
/// Number of generic trap names seeded by default.
pub const TRAP_TABLE_SIZE: i64 = 256;
/// Number of generic irq names seeded by default.
pub const IRQ_TABLE_SIZE: i64 = 256;
/// Number of generic soft-irq names seeded by default.
pub const SOFT_IRQ_TABLE_SIZE: i64 = 32;

/// Immutable name tables injected into the state store at construction.
#[derive(Clone, Debug)]
pub struct NameRegistry {
    syscall_names: HashMap<i64, String>,
    trap_names: HashMap<i64, String>,
    irq_names: HashMap<i64, String>,
    soft_irq_names: HashMap<i64, String>,
}

fn generic_table(prefix: &str, size: i64) -> HashMap<i64, String> {
    (0..size).map(|id| (id, format!("{prefix} {id}"))).collect()
}

impl Default for NameRegistry {
    fn default() -> Self {
        Self {
            syscall_names: generic_table("syscall", SYSCALL_TABLE_SIZE),
            trap_names: generic_table("trap", TRAP_TABLE_SIZE),
            irq_names: generic_table("irq", IRQ_TABLE_SIZE),
            soft_irq_names: generic_table("softirq", SOFT_IRQ_TABLE_SIZE),
        }
    }
}

impl NameRegistry {
    /// Registry seeded with the generic `"syscall N"` style tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the syscall name table.
    pub fn with_syscall_names(mut self, names: impl IntoIterator<Item = (i64, String)>) -> Self {
        self.syscall_names = names.into_iter().collect();
        self
    }

    /// Replace the trap name table.
    pub fn with_trap_names(mut self, names: impl IntoIterator<Item = (i64, String)>) -> Self {
        self.trap_names = names.into_iter().collect();
        self
    }

    /// Replace the irq name table. The store creates one irq resource track
    /// per entry at `init`, so this also bounds which irq ids are accepted.
    pub fn with_irq_names(mut self, names: impl IntoIterator<Item = (i64, String)>) -> Self {
        self.irq_names = names.into_iter().collect();
        self
    }

    /// Replace the soft-irq name table.
    pub fn with_soft_irq_names(mut self, names: impl IntoIterator<Item = (i64, String)>) -> Self {
        self.soft_irq_names = names.into_iter().collect();
        self
    }

    pub fn syscall_names(&self) -> &HashMap<i64, String> {
        &self.syscall_names
    }

    pub fn trap_names(&self) -> &HashMap<i64, String> {
        &self.trap_names
    }

    pub fn irq_names(&self) -> &HashMap<i64, String> {
        &self.irq_names
    }

    pub fn soft_irq_names(&self) -> &HashMap<i64, String> {
        &self.soft_irq_names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tables_are_fully_seeded() {
        let registry = NameRegistry::default();
        assert_eq!(registry.syscall_names().len(), SYSCALL_TABLE_SIZE as usize);
        assert_eq!(registry.soft_irq_names().len(), SOFT_IRQ_TABLE_SIZE as usize);
        assert_eq!(registry.syscall_names().get(&3).map(String::as_str), Some("syscall 3"));
        assert_eq!(registry.irq_names().get(&0).map(String::as_str), Some("irq 0"));
    }

    #[test]
    fn test_with_irq_names_replaces_table() {
        let registry =
            NameRegistry::new().with_irq_names([(1, "timer".to_string()), (4, "serial".to_string())]);
        assert_eq!(registry.irq_names().len(), 2);
        assert_eq!(registry.irq_names().get(&4).map(String::as_str), Some("serial"));
        assert!(!registry.irq_names().contains_key(&0));
    }
}
