//! Mode stack with a "never below one element" invariant.
//!
//! Resource tracks (CPU, IRQ, block device) keep their current mode as the
//! top of a small stack so that nested transitions (irq inside trap inside
//! syscall) unwind correctly. The bottom element is the base mode and must
//! always exist; popping the sole remaining element returns it to the caller
//! but immediately re-seeds the stack with a sentinel instead of underflowing.

/// Growable stack that always holds at least one element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModeStack<T> {
    items: Vec<T>,
}

impl<T: Clone> ModeStack<T> {
    /// Create a stack seeded with `base` as its only element.
    pub fn new(base: T) -> Self {
        Self { items: vec![base] }
    }

    /// Push a new mode on top.
    pub fn push(&mut self, mode: T) {
        self.items.push(mode);
    }

    /// Pop and return the current top.
    ///
    /// The returned value is always the true previous top. If the pop would
    /// leave the stack empty, `sentinel` is pushed to restore the invariant.
    pub fn pop_or_seed(&mut self, sentinel: T) -> T {
        match self.items.pop() {
            Some(top) => {
                if self.items.is_empty() {
                    self.items.push(sentinel);
                }
                top
            }
            // Unreachable while the invariant holds; keep the contract total.
            None => {
                self.items.push(sentinel.clone());
                sentinel
            }
        }
    }

    /// Clear the stack and seed it with `base` as the new sole element.
    pub fn set_base(&mut self, base: T) {
        self.items.clear();
        self.items.push(base);
    }

    /// Current top of the stack.
    pub fn top(&self) -> &T {
        // The invariant guarantees at least one element.
        self.items.last().expect("mode stack invariant violated")
    }

    /// Number of elements currently on the stack.
    pub fn depth(&self) -> usize {
        self.items.len()
    }

    /// Iterate from bottom (base mode) to top (current mode).
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}
