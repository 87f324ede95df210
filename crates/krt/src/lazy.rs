//! Guarded statics for Rust code.
//!
//! The same protocol the compiler emits around a C++ function-local
//! static, as a type: enter the guard, construct on the winning path,
//! register the destructor, commit.
//!
//! ```ignore
//! static TABLE: GuardedStatic<Table> = GuardedStatic::new();
//!
//! let table = TABLE.get_or_init(&KernelPlatform, &abi::FINALIZERS, Table::build);
//! ```

use core::cell::UnsafeCell;
use core::ffi::c_void;
use core::mem::{self, MaybeUninit};
use core::ptr;

use crate::finalizer::FinalizerRegistry;
use crate::guard::{EnterOutcome, Guard};
use crate::platform::Platform;

/// A static constructed at most once, on first use, and dropped when its
/// finalizer registry is run.
pub struct GuardedStatic<T> {
    guard: Guard,
    value: UnsafeCell<MaybeUninit<T>>,
}

// SAFETY: the value is written once, by the guard's winner, before commit
// publishes it with Release; readers observe INITIALIZED with Acquire.
// Afterwards it is only shared (`&T`), hence `Sync`; the finalizer may drop
// it on another core, hence `Send`.
unsafe impl<T: Send + Sync> Sync for GuardedStatic<T> {}

impl<T> GuardedStatic<T> {
    pub const fn new() -> Self {
        Self {
            guard: Guard::new(),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// The value, if some context has finished constructing it.
    ///
    /// Once the registry this static was registered with has been run the
    /// value is dropped; it must not be reached after teardown.
    pub fn get(&self) -> Option<&T> {
        if self.guard.is_initialized() {
            // SAFETY: INITIALIZED is only set after the value was written.
            Some(unsafe { (*self.value.get()).assume_init_ref() })
        } else {
            None
        }
    }

    /// Returns the value, constructing it with `init` if nobody has.
    ///
    /// Concurrent callers spin until the winner finishes. `init` runs with
    /// preemption disabled and interrupts masked, so it must be short and
    /// must not touch this static again (that would spin forever). If `init`
    /// panics, the guard is aborted, which halts.
    ///
    /// A full `finalizers` table is tolerated: the value is then simply
    /// never dropped.
    pub fn get_or_init<P, F, const N: usize>(
        &'static self,
        platform: &P,
        finalizers: &FinalizerRegistry<N>,
        init: F,
    ) -> &'static T
    where
        P: Platform + ?Sized,
        F: FnOnce() -> T,
    {
        if self.guard.enter(platform) == EnterOutcome::NeedsInit {
            let bomb = AbortOnUnwind {
                guard: &self.guard,
                platform,
            };
            let value = init();
            mem::forget(bomb);

            // SAFETY: we hold the guard, nobody else reads or writes the slot.
            let slot = unsafe { (*self.value.get()).write(value) };

            let mut registered = Ok(());
            if mem::needs_drop::<T>() {
                let owner = ptr::from_mut(slot).cast::<c_void>();
                // SAFETY: `self` is 'static and the value stays in place
                // until this finalizer drops it.
                registered =
                    unsafe { finalizers.register(drop_value::<T>, owner, ptr::null_mut()) };
            }

            self.guard.commit(platform);

            // Only log once the guard is released and interrupts are back.
            if registered.is_err() {
                log::warn!(
                    "no finalizer slot for {}; it will never be dropped",
                    core::any::type_name::<T>()
                );
            }
            log::debug!("constructed {}", core::any::type_name::<T>());
        }

        // SAFETY: both paths end with the guard initialized.
        unsafe { (*self.value.get()).assume_init_ref() }
    }
}

impl<T> Default for GuardedStatic<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Aborts the guard if construction unwinds instead of returning.
struct AbortOnUnwind<'a, P: Platform + ?Sized> {
    guard: &'a Guard,
    platform: &'a P,
}

impl<P: Platform + ?Sized> Drop for AbortOnUnwind<'_, P> {
    fn drop(&mut self) {
        self.guard.abort(self.platform);
    }
}

unsafe extern "C" fn drop_value<T>(owner: *mut c_void) {
    // SAFETY: registered only by `get_or_init`, with a pointer to the
    // initialized value of a 'static `GuardedStatic<T>`.
    unsafe { ptr::drop_in_place(owner.cast::<T>()) }
}
