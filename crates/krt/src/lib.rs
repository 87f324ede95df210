// =============================================================================
// MinimalOS NextGen — Kernel Runtime Support
// =============================================================================
//
// Lazily-constructed statics need two things from the runtime:
//
//   guard.rs     — a per-static one-time initialization gate. Exactly one
//                  context constructs; everyone else spins until it commits.
//   finalizer.rs — a fixed-capacity table of teardown callbacks, run in
//                  reverse registration order.
//
// Supporting modules:
//
//   platform.rs  — the CPU collaborators consumed above (preemption,
//                  interrupt mask, pause, halt)
//   halt.rs      — contract violations and the diagnose-then-halt path
//   lazy.rs      — `GuardedStatic<T>`, the same protocol for Rust statics
//   abi.rs       — the Itanium C++ ABI entry points (__cxa_*)
//   kernel.rs    — `KernelPlatform`, the bare-metal `Platform` (target_os = "none")
//   config.rs    — build-time limits
//
// The crate is `no_std`; host tests link std to run several simulated cores
// on OS threads.
// =============================================================================

#![cfg_attr(not(test), no_std)]

pub mod abi;
pub mod config;
pub mod finalizer;
pub mod guard;
pub mod halt;
pub mod lazy;
pub mod platform;

#[cfg(target_os = "none")]
pub mod kernel;

pub use finalizer::{Finalizer, FinalizerRegistry, RegistrationFull};
pub use guard::{EnterOutcome, Guard, GuardFlags};
pub use halt::{fatal, ContractViolation};
pub use lazy::GuardedStatic;
pub use platform::Platform;

#[cfg(target_os = "none")]
pub use kernel::KernelPlatform;
