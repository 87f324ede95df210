//! Itanium C++ ABI runtime entry points.
//!
//! The compiler lowers a function-local static to
//!
//! ```c
//! if (first_byte(guard) == 0 && __cxa_guard_acquire(&guard)) {
//!     construct(&obj);
//!     __cxa_atexit(destroy, &obj, &__dso_handle);
//!     __cxa_guard_release(&guard);
//! }
//! ```
//!
//! with `__cxa_guard_abort` on the exceptional edge, and calls
//! `__cxa_finalize` at teardown. The functions below carry the semantics
//! over a caller-supplied `Platform`; the unmangled symbols themselves are
//! only exported on bare metal with the `cxxabi` feature, bound to
//! `KernelPlatform` and the process-wide [`FINALIZERS`] table.

use core::ffi::{c_int, c_void};

use crate::config::MAX_FINALIZERS;
use crate::finalizer::{Finalizer, FinalizerRegistry};
use crate::guard::{EnterOutcome, Guard};
use crate::halt::{fatal, ContractViolation};
use crate::platform::Platform;

/// The table behind `__cxa_atexit`/`__cxa_finalize`.
pub static FINALIZERS: FinalizerRegistry<MAX_FINALIZERS> = FinalizerRegistry::new();

/// `__cxa_guard_acquire`: 1 if the caller must construct, 0 otherwise.
pub fn guard_acquire<P: Platform + ?Sized>(guard: &Guard, platform: &P) -> c_int {
    match guard.enter(platform) {
        EnterOutcome::NeedsInit => 1,
        EnterOutcome::AlreadyInitialized => 0,
    }
}

/// `__cxa_guard_release`
pub fn guard_release<P: Platform + ?Sized>(guard: &Guard, platform: &P) {
    guard.commit(platform);
}

/// `__cxa_guard_abort`
pub fn guard_abort<P: Platform + ?Sized>(guard: &Guard, platform: &P) -> ! {
    guard.abort(platform)
}

/// `__cxa_atexit`: 0 on success, -1 when `registry` is full.
///
/// # Safety
/// As for [`FinalizerRegistry::register`].
pub unsafe fn atexit<const N: usize>(
    registry: &FinalizerRegistry<N>,
    callback: Finalizer,
    owner: *mut c_void,
    module: *mut c_void,
) -> c_int {
    // SAFETY: forwarded to the caller.
    match unsafe { registry.register(callback, owner, module) } {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

/// `__cxa_finalize`: with no callback, runs everything; otherwise runs
/// every entry registered with that callback.
///
/// # Safety
/// As for [`FinalizerRegistry::run_all`].
pub unsafe fn finalize<const N: usize>(
    registry: &FinalizerRegistry<N>,
    callback: Option<Finalizer>,
) {
    // SAFETY: forwarded to the caller.
    unsafe {
        match callback {
            None => registry.run_all(),
            Some(callback) => registry.run_matching(callback),
        };
    }
}

/// `__cxa_pure_virtual`: a vtable slot that was never overridden.
pub fn pure_virtual<P: Platform + ?Sized>(platform: &P) -> ! {
    fatal(platform, ContractViolation::PureVirtualCall)
}

#[cfg(all(feature = "cxxabi", target_os = "none"))]
mod exports {
    use core::ffi::{c_int, c_void};

    use super::FINALIZERS;
    use crate::finalizer::Finalizer;
    use crate::guard::Guard;
    use crate::kernel::KernelPlatform;

    /// Address used as "this image" in `__cxa_atexit` calls. Only its
    /// address matters.
    #[repr(transparent)]
    pub struct DsoHandle(*const c_void);

    // SAFETY: never read or written, only its address is taken.
    unsafe impl Sync for DsoHandle {}

    #[allow(non_upper_case_globals)]
    #[unsafe(no_mangle)]
    pub static __dso_handle: DsoHandle = DsoHandle(core::ptr::null());

    #[unsafe(no_mangle)]
    pub unsafe extern "C" fn __cxa_guard_acquire(guard: *mut Guard) -> c_int {
        // SAFETY: the compiler passes the guard object of a static.
        super::guard_acquire(unsafe { &*guard }, &KernelPlatform)
    }

    #[unsafe(no_mangle)]
    pub unsafe extern "C" fn __cxa_guard_release(guard: *mut Guard) {
        super::guard_release(unsafe { &*guard }, &KernelPlatform);
    }

    #[unsafe(no_mangle)]
    pub unsafe extern "C" fn __cxa_guard_abort(guard: *mut Guard) {
        super::guard_abort(unsafe { &*guard }, &KernelPlatform)
    }

    #[unsafe(no_mangle)]
    pub unsafe extern "C" fn __cxa_atexit(
        callback: Finalizer,
        owner: *mut c_void,
        dso: *mut c_void,
    ) -> c_int {
        // SAFETY: the compiler registers an object's destructor with that
        // object; both live until __cxa_finalize.
        unsafe { super::atexit(&FINALIZERS, callback, owner, dso) }
    }

    #[unsafe(no_mangle)]
    pub unsafe extern "C" fn __cxa_finalize(callback: Option<Finalizer>) {
        // SAFETY: called once per teardown by the image's exit path.
        unsafe { super::finalize(&FINALIZERS, callback) }
    }

    #[unsafe(no_mangle)]
    pub extern "C" fn __cxa_pure_virtual() {
        super::pure_virtual(&KernelPlatform)
    }
}
