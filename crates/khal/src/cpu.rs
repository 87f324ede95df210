//! CPU interrupt-flag and halt primitives (x86_64).
//!
//! These are the "bottom" of the abstraction stack: each function executes
//! one privileged instruction (or reads RFLAGS) and returns. Anything that
//! needs to remember the previous interrupt state does so itself (the
//! guard word in `krt` records RFLAGS.IF at lock time).

use x86_64::instructions::{hlt, interrupts};

/// Returns whether maskable interrupts are enabled on this core.
///
/// Reads RFLAGS and tests bit 9 (IF).
#[inline(always)]
pub fn interrupts_enabled() -> bool {
    interrupts::are_enabled()
}

/// Masks maskable interrupts on this core (CLI).
///
/// NMIs and machine checks can still be delivered.
#[inline(always)]
pub fn disable_interrupts() {
    interrupts::disable();
}

/// Unmasks maskable interrupts on this core (STI).
///
/// The instruction after STI always executes before a pending interrupt
/// is delivered.
#[inline(always)]
pub fn enable_interrupts() {
    interrupts::enable();
}

/// Spin-wait hint (PAUSE). Issued between failed lock attempts to reduce
/// bus contention and power draw while busy-waiting.
#[inline(always)]
pub fn pause() {
    core::hint::spin_loop();
}

/// Halts the CPU in an unrecoverable state.
///
/// Masks interrupts and executes HLT in a loop, so not even a spurious
/// wakeup (NMI) lets execution continue. Used by the fatal-halt path.
#[inline(always)]
pub fn halt_forever() -> ! {
    loop {
        interrupts::disable();
        hlt();
    }
}
