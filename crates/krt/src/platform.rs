//! CPU collaborators consumed by the runtime.
//!
//! The guard needs to pin the calling context to its core for the duration
//! of a construction: no preemption, no interrupt handler reentering the
//! same static. Those controls (and the final halt) are thin wrappers over
//! single instructions on real hardware, so they sit behind this trait and
//! the runtime logic stays testable on the host.

/// Preemption control, interrupt mask, spin hint and fatal halt for the
/// calling core.
///
/// # Contract
/// - `preempt_disable`/`preempt_enable` are nestable and called 1:1.
/// - The interrupt methods act on the *calling* core only.
/// - `halt` never returns control to its caller.
pub trait Platform {
    /// Stops the scheduler from switching the current context away.
    fn preempt_disable(&self);

    /// Undoes one `preempt_disable`.
    fn preempt_enable(&self);

    /// Whether maskable interrupts are currently delivered on this core.
    fn interrupts_enabled(&self) -> bool;

    /// Masks maskable interrupts on this core.
    fn disable_interrupts(&self);

    /// Unmasks maskable interrupts on this core.
    fn enable_interrupts(&self);

    /// Cheap hint issued between failed lock-acquisition attempts.
    #[inline]
    fn pause(&self) {
        core::hint::spin_loop();
    }

    /// Reports an unrecoverable condition and stops this context for good.
    fn halt(&self, message: &str) -> !;
}

impl<P: Platform + ?Sized> Platform for &P {
    fn preempt_disable(&self) {
        (**self).preempt_disable();
    }

    fn preempt_enable(&self) {
        (**self).preempt_enable();
    }

    fn interrupts_enabled(&self) -> bool {
        (**self).interrupts_enabled()
    }

    fn disable_interrupts(&self) {
        (**self).disable_interrupts();
    }

    fn enable_interrupts(&self) {
        (**self).enable_interrupts();
    }

    fn pause(&self) {
        (**self).pause();
    }

    fn halt(&self, message: &str) -> ! {
        (**self).halt(message)
    }
}
