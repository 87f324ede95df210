//! Fatal contract violations.
//!
//! A violation means the runtime's own invariants are broken (a guard
//! committed twice, a pure virtual slot called). There is nothing sane to
//! unwind to, so we diagnose and halt the core.

use crate::platform::Platform;
use core::fmt;

/// Misuse of the runtime that cannot be recovered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractViolation {
    /// `commit` on a guard that is already initialized.
    DoubleCommit,
    /// `commit` on a guard nobody holds (no winning `enter`).
    CommitWithoutEnter,
    /// Construction of a guarded static failed; there is no retry path.
    InitializationAborted,
    /// A call through an unfilled (pure virtual) vtable slot.
    PureVirtualCall,
}

impl ContractViolation {
    pub const fn message(self) -> &'static str {
        match self {
            ContractViolation::DoubleCommit => "guard: double commit",
            ContractViolation::CommitWithoutEnter => "guard: commit without enter",
            ContractViolation::InitializationAborted => "guard: initialization aborted",
            ContractViolation::PureVirtualCall => "pure virtual call",
        }
    }
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Logs `violation` and halts through `platform`. Never returns.
#[cold]
pub fn fatal<P: Platform + ?Sized>(platform: &P, violation: ContractViolation) -> ! {
    log::error!("contract violation: {}", violation);
    platform.halt(violation.message())
}
