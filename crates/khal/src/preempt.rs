//! Preemption control.
//!
//! A nesting counter the scheduler consults before switching the current
//! context away on a timer tick. `disable`/`enable` must be balanced 1:1;
//! preemption is allowed only while the count is zero.
//!
//! The counter is system-wide rather than per-core: while any core holds a
//! preempt-disabled region, no core is preempted. This is conservative but
//! needs no per-core storage, which is not yet set up when static
//! constructors run during early boot.

use core::sync::atomic::{AtomicUsize, Ordering};

/// A nesting count of preempt-disabled regions.
pub struct PreemptCounter {
    count: AtomicUsize,
}

impl PreemptCounter {
    pub const fn new() -> Self {
        Self {
            count: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn disable(&self) {
        self.count.fetch_add(1, Ordering::Acquire);
    }

    /// Leaves one region. An unbalanced call asserts in debug builds; in
    /// release it leaves the count at zero rather than wrapping.
    #[inline]
    pub fn enable(&self) {
        let previous = self
            .count
            .fetch_update(Ordering::Release, Ordering::Relaxed, |count| {
                count.checked_sub(1)
            });
        debug_assert!(previous.is_ok(), "preempt enable without disable");
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }
}

impl Default for PreemptCounter {
    fn default() -> Self {
        Self::new()
    }
}

static PREEMPT: PreemptCounter = PreemptCounter::new();

/// Enters a preempt-disabled region. Nestable.
#[inline]
pub fn disable() {
    PREEMPT.disable();
}

/// Leaves a preempt-disabled region.
#[inline]
pub fn enable() {
    PREEMPT.enable();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nests_and_unwinds() {
        let counter = PreemptCounter::new();
        counter.disable();
        counter.disable();
        assert_eq!(counter.depth(), 2);
        counter.enable();
        counter.enable();
        assert_eq!(counter.depth(), 0);
    }

    #[test]
    #[should_panic(expected = "preempt enable without disable")]
    fn unbalanced_enable_asserts() {
        PreemptCounter::new().enable();
    }
}
