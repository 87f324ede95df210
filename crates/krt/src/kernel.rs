//! The bare-metal `Platform`: preemption through `khal::preempt`, the
//! interrupt flag through `khal::cpu`, last words through `klog`.

use crate::platform::Platform;

/// The calling core, as seen by the runtime on real hardware.
#[derive(Debug, Clone, Copy, Default)]
pub struct KernelPlatform;

impl Platform for KernelPlatform {
    #[inline]
    fn preempt_disable(&self) {
        khal::preempt::disable();
    }

    #[inline]
    fn preempt_enable(&self) {
        khal::preempt::enable();
    }

    #[inline]
    fn interrupts_enabled(&self) -> bool {
        khal::cpu::interrupts_enabled()
    }

    #[inline]
    fn disable_interrupts(&self) {
        khal::cpu::disable_interrupts();
    }

    #[inline]
    fn enable_interrupts(&self) {
        khal::cpu::enable_interrupts();
    }

    #[inline]
    fn pause(&self) {
        khal::cpu::pause();
    }

    fn halt(&self, message: &str) -> ! {
        // Mask first: an interrupt handler must not run on top of a runtime
        // whose invariants are already broken.
        khal::cpu::disable_interrupts();
        klog::emergency(format_args!("KERNEL HALT: {}", message));
        khal::cpu::halt_forever()
    }
}
