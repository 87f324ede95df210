//! Bounded finalizer registry.
//!
//! A fixed table of `(callback, owner, module)` entries, filled in
//! registration order and run newest-first, which approximates "last
//! constructed, first destroyed" without keeping a separate stack.
//!
//! Slots are never reused. Running an entry nulls its callback and leaves a
//! hole; later scans walk past it and the slot stays consumed for the life
//! of the image. Compacting would reorder entries registered back to back,
//! so capacity is simply sized for every static that will ever register.
//!
//! All mutation goes through one spin lock. Callbacks run with the lock
//! released, so a finalizer may register another one.

use core::ffi::c_void;
use core::fmt;

use spin::Mutex;

/// Teardown callback, called once with the `owner` it was registered with.
pub type Finalizer = unsafe extern "C" fn(*mut c_void);

/// Every slot is taken; the entry was not recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationFull;

impl fmt::Display for RegistrationFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("finalizer table full")
    }
}

#[derive(Clone, Copy)]
struct Slot {
    /// `None` once invoked.
    callback: Option<Finalizer>,
    owner: *mut c_void,
    /// Opaque tag of the registering module. Recorded, never dereferenced.
    module: *mut c_void,
}

impl Slot {
    const EMPTY: Slot = Slot {
        callback: None,
        owner: core::ptr::null_mut(),
        module: core::ptr::null_mut(),
    };
}

// SAFETY: the pointers are opaque cookies handed back to the callback that
// was registered with them; the registry itself never dereferences them.
unsafe impl Send for Slot {}

struct Table<const N: usize> {
    slots: [Slot; N],
    /// Slots consumed so far. Only grows.
    len: usize,
}

/// Fixed-capacity table of teardown callbacks.
pub struct FinalizerRegistry<const N: usize> {
    table: Mutex<Table<N>>,
}

impl<const N: usize> FinalizerRegistry<N> {
    pub const fn new() -> Self {
        Self {
            table: Mutex::new(Table {
                slots: [Slot::EMPTY; N],
                len: 0,
            }),
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Slots consumed, including ones that have already run.
    pub fn len(&self) -> usize {
        self.table.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries registered and not yet run.
    pub fn pending(&self) -> usize {
        let table = self.table.lock();
        table.slots[..table.len]
            .iter()
            .filter(|slot| slot.callback.is_some())
            .count()
    }

    /// Opaque module tag recorded for slot `index`, if that slot was ever
    /// registered.
    pub fn module_of(&self, index: usize) -> Option<*mut c_void> {
        let table = self.table.lock();
        table.slots[..table.len].get(index).map(|slot| slot.module)
    }

    /// Appends an entry after all earlier registrations.
    ///
    /// A full table is not fatal: the caller decides whether running without
    /// this cleanup is acceptable, and reports it.
    ///
    /// Does not log. Generated code registers while holding a guard, with
    /// interrupts masked.
    ///
    /// # Safety
    /// `callback(owner)` must be sound to call at whatever point the table is
    /// run; the registry does not keep `owner` alive.
    pub unsafe fn register(
        &self,
        callback: Finalizer,
        owner: *mut c_void,
        module: *mut c_void,
    ) -> Result<(), RegistrationFull> {
        let mut table = self.table.lock();
        let index = table.len;
        if index == N {
            return Err(RegistrationFull);
        }

        table.slots[index] = Slot {
            callback: Some(callback),
            owner,
            module,
        };
        table.len = index + 1;
        Ok(())
    }

    /// Runs every pending entry, newest first. Returns how many ran; a
    /// second call runs nothing.
    ///
    /// # Safety
    /// Owners are torn down by their callbacks. Nothing may use them after
    /// this call.
    pub unsafe fn run_all(&self) -> usize {
        // SAFETY: forwarded to the caller.
        unsafe { self.run_where(|_| true) }
    }

    /// Runs every pending entry whose callback is `callback`, newest first.
    /// Other entries are left in place. Returns how many ran.
    ///
    /// # Safety
    /// As for [`run_all`](Self::run_all), for the matching owners.
    pub unsafe fn run_matching(&self, callback: Finalizer) -> usize {
        // SAFETY: forwarded to the caller.
        unsafe { self.run_where(|candidate| candidate as usize == callback as usize) }
    }

    /// Scans from the last slot consumed at the start of the scan down to
    /// slot 0. Entries registered while the scan runs are left for the next
    /// one.
    unsafe fn run_where(&self, matches: impl Fn(Finalizer) -> bool) -> usize {
        let mut index = self.len();
        let mut invoked = 0;

        while index > 0 {
            index -= 1;

            // Claim the slot under the lock so concurrent scans run each
            // entry at most once.
            let claimed = {
                let mut table = self.table.lock();
                let slot = &mut table.slots[index];
                match slot.callback {
                    Some(callback) if matches(callback) => {
                        slot.callback = None;
                        Some((callback, slot.owner))
                    }
                    _ => None,
                }
            };

            if let Some((callback, owner)) = claimed {
                // SAFETY: the registrant vouched for `callback(owner)` in
                // `register`; the caller vouches the owner is not used again.
                unsafe { callback(owner) };
                invoked += 1;
            }
        }

        if invoked > 0 {
            log::debug!("ran {} finalizer(s)", invoked);
        }
        invoked
    }
}

impl<const N: usize> Default for FinalizerRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}
