//! Hardware Abstraction Layer.
//!
//! The thin, instruction-level collaborators the kernel runtime consumes:
//! interrupt masking and HLT (`cpu`), the preemption nesting counter
//! (`preempt`) and the COM1 UART used for log output (`serial`).
#![cfg_attr(not(test), no_std)]

pub mod cpu;
pub mod preempt;
pub mod serial;

pub use serial::Serial;
