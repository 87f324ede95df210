// =============================================================================
// MinimalOS NextGen — One-Time Initialization Guard
// =============================================================================
//
// Every lazily-constructed static gets one machine word of guard state,
// placed by the compiler next to the object. The word packs three flags:
//
//   bit 0  INITIALIZED              construction committed (never cleared)
//   bit 8  LOCKED                   a context is constructing right now
//   bit 9  INTERRUPTS_WERE_ENABLED  IF snapshot taken when LOCKED was set
//
// These positions are a binary contract with the code generator: it tests
// the first byte for "already done" before ever calling into us. Do not
// renumber them.
//
// PROTOCOL:
//   enter()  → NeedsInit           caller constructs, then calls commit()
//            → AlreadyInitialized  caller skips construction
//   commit() publishes the object and releases the lock.
//   abort()  construction failed. Fatal; there is no retry.
//
// PREEMPTION AND INTERRUPTS:
//   The winner holds LOCKED for the whole construction with preemption
//   disabled and interrupts masked. A descheduled holder, or an interrupt
//   handler on the same core entering the same static, would leave the
//   other contenders spinning on a lock whose holder cannot run.
//
//   That does nothing against a second core racing for the same word. Cross-
//   core exclusion comes entirely from the compare-and-swap on LOCKED being
//   a real atomic (LOCK CMPXCHG on x86_64).
//
// LIVENESS:
//   Waiters spin with no timeout and no fairness. A context that keeps
//   losing can starve, and a winner that never commits hangs every waiter.
// =============================================================================

use core::sync::atomic::{AtomicUsize, Ordering};

use bitflags::bitflags;

use crate::halt::{fatal, ContractViolation};
use crate::platform::Platform;

bitflags! {
    /// The flag bits of a guard word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GuardFlags: usize {
        const INITIALIZED = 1 << 0;
        const LOCKED = 1 << 8;
        const INTERRUPTS_WERE_ENABLED = 1 << 9;
    }
}

/// Result of [`Guard::enter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnterOutcome {
    /// The caller won: construct the value, then [`Guard::commit`].
    NeedsInit,
    /// The value exists already; do not construct.
    AlreadyInitialized,
}

/// One-time initialization state for a single static.
///
/// Exactly one machine word, all-zero when fresh, so the compiler can
/// place it in `.bss`.
#[repr(transparent)]
pub struct Guard {
    word: AtomicUsize,
}

const _: () = assert!(core::mem::size_of::<Guard>() == core::mem::size_of::<usize>());

impl Guard {
    pub const fn new() -> Self {
        Self {
            word: AtomicUsize::new(0),
        }
    }

    /// Snapshot of the flags.
    #[inline]
    pub fn flags(&self) -> GuardFlags {
        GuardFlags::from_bits_retain(self.word.load(Ordering::Acquire))
    }

    /// `true` once some context has committed. Acquire ordering: when this
    /// returns `true`, the constructed object is visible to the caller.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.flags().contains(GuardFlags::INITIALIZED)
    }

    /// Asks whether the caller should construct the guarded value.
    ///
    /// On `NeedsInit` the caller leaves here holding the lock with
    /// preemption disabled and interrupts masked, and must call
    /// [`commit`](Self::commit) (or [`abort`](Self::abort)) without
    /// suspending in between. On `AlreadyInitialized` the caller's
    /// preemption and interrupt state are exactly as they were.
    ///
    /// Contenders busy-wait here until the winner commits.
    pub fn enter<P: Platform + ?Sized>(&self, platform: &P) -> EnterOutcome {
        // Generated code normally checks this itself; repeat it so that an
        // initialized guard never costs a CLI/STI pair or a spin.
        if self.is_initialized() {
            return EnterOutcome::AlreadyInitialized;
        }

        platform.preempt_disable();
        let irq_was_enabled = platform.interrupts_enabled();
        if irq_was_enabled {
            platform.disable_interrupts();
        }

        let mut held = GuardFlags::LOCKED;
        held.set(GuardFlags::INTERRUPTS_WERE_ENABLED, irq_was_enabled);

        loop {
            let current = self.flags();

            if current.contains(GuardFlags::INITIALIZED) {
                // Lost the race to a winner that has since committed.
                if irq_was_enabled {
                    platform.enable_interrupts();
                }
                platform.preempt_enable();
                return EnterOutcome::AlreadyInitialized;
            }

            // Test-and-set of LOCKED, recording the IF snapshot in the same
            // transition. LOCKED is never set on an initialized word.
            if !current.contains(GuardFlags::LOCKED)
                && self
                    .word
                    .compare_exchange_weak(
                        current.bits(),
                        ((current - GuardFlags::INTERRUPTS_WERE_ENABLED) | held).bits(),
                        Ordering::Acquire,
                        Ordering::Relaxed,
                    )
                    .is_ok()
            {
                return EnterOutcome::NeedsInit;
            }

            platform.pause();
        }
    }

    /// Publishes the constructed value and releases the guard.
    ///
    /// Restores the interrupt state saved by the winning `enter` and
    /// re-enables preemption. Halts if the guard is already initialized or
    /// not locked.
    pub fn commit<P: Platform + ?Sized>(&self, platform: &P) {
        let current = self.flags();
        if current.contains(GuardFlags::INITIALIZED) {
            fatal(platform, ContractViolation::DoubleCommit);
        }
        if !current.contains(GuardFlags::LOCKED) {
            fatal(platform, ContractViolation::CommitWithoutEnter);
        }

        // Contenders only ever CAS an unlocked word, so while we hold LOCKED
        // the word is ours to overwrite.
        self.word.store(GuardFlags::INITIALIZED.bits(), Ordering::Release);

        if current.contains(GuardFlags::INTERRUPTS_WERE_ENABLED) {
            platform.enable_interrupts();
        }
        platform.preempt_enable();
    }

    /// Construction failed. There is no rollback: halts.
    pub fn abort<P: Platform + ?Sized>(&self, platform: &P) -> ! {
        fatal(platform, ContractViolation::InitializationAborted)
    }
}

impl Default for Guard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::MockCpu;

    #[test]
    fn bit_positions_are_fixed() {
        assert_eq!(GuardFlags::INITIALIZED.bits(), 0x001);
        assert_eq!(GuardFlags::LOCKED.bits(), 0x100);
        assert_eq!(GuardFlags::INTERRUPTS_WERE_ENABLED.bits(), 0x200);
        assert_eq!(core::mem::size_of::<Guard>(), core::mem::size_of::<usize>());
    }

    #[test]
    fn winner_holds_lock_with_context_pinned() {
        let cpu = MockCpu::new(true);
        let guard = Guard::new();

        assert_eq!(guard.enter(&cpu), EnterOutcome::NeedsInit);
        assert_eq!(
            guard.flags(),
            GuardFlags::LOCKED | GuardFlags::INTERRUPTS_WERE_ENABLED
        );
        assert_eq!(cpu.preempt_depth(), 1);
        assert!(!cpu.interrupts_enabled());

        guard.commit(&cpu);
        assert_eq!(guard.flags(), GuardFlags::INITIALIZED);
        assert_eq!(cpu.preempt_depth(), 0);
        assert!(cpu.interrupts_enabled());
    }

    #[test]
    fn commit_keeps_interrupts_masked_if_they_were() {
        let cpu = MockCpu::new(false);
        let guard = Guard::new();

        assert_eq!(guard.enter(&cpu), EnterOutcome::NeedsInit);
        assert!(!guard.flags().contains(GuardFlags::INTERRUPTS_WERE_ENABLED));

        guard.commit(&cpu);
        assert!(!cpu.interrupts_enabled());
        assert_eq!(cpu.preempt_depth(), 0);
    }

    #[test]
    fn initialized_guard_never_spins() {
        let cpu = MockCpu::new(true);
        let guard = Guard::new();
        guard.enter(&cpu);
        guard.commit(&cpu);

        for _ in 0..8 {
            assert_eq!(guard.enter(&cpu), EnterOutcome::AlreadyInitialized);
        }
        assert_eq!(cpu.pauses(), 0);
        assert_eq!(cpu.preempt_depth(), 0);
        assert!(cpu.interrupts_enabled());
        assert!(!guard.flags().contains(GuardFlags::LOCKED));
    }

    #[test]
    fn first_byte_signals_initialized() {
        let cpu = MockCpu::new(true);
        let guard = Guard::new();
        guard.enter(&cpu);
        assert_eq!(guard.word.load(Ordering::Relaxed) & 0xFF, 0);
        guard.commit(&cpu);
        assert_ne!(guard.word.load(Ordering::Relaxed) & 0xFF, 0);
    }

    #[test]
    #[should_panic(expected = "commit without enter")]
    fn commit_on_fresh_guard_halts() {
        let cpu = MockCpu::new(true);
        Guard::new().commit(&cpu);
    }

    #[test]
    #[should_panic(expected = "double commit")]
    fn second_commit_halts() {
        let cpu = MockCpu::new(true);
        let guard = Guard::new();
        guard.enter(&cpu);
        guard.commit(&cpu);
        guard.commit(&cpu);
    }

    #[test]
    #[should_panic(expected = "initialization aborted")]
    fn abort_halts() {
        let cpu = MockCpu::new(true);
        let guard = Guard::new();
        guard.enter(&cpu);
        guard.abort(&cpu);
    }
}
