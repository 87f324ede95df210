//! A simulated core for driving the runtime from host threads.
//!
//! Each test thread owns one `SimCore`, standing in for one CPU: its own
//! preemption depth and interrupt flag. `halt` panics so fatal paths can be
//! asserted with `#[should_panic]`.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicIsize, AtomicUsize, Ordering};

use krt::Platform;

pub struct SimCore {
    preempt_depth: AtomicIsize,
    interrupts: AtomicBool,
    pauses: AtomicUsize,
}

impl SimCore {
    pub fn new() -> Self {
        Self::with_interrupts(true)
    }

    pub fn with_interrupts(enabled: bool) -> Self {
        Self {
            preempt_depth: AtomicIsize::new(0),
            interrupts: AtomicBool::new(enabled),
            pauses: AtomicUsize::new(0),
        }
    }

    pub fn preempt_depth(&self) -> isize {
        self.preempt_depth.load(Ordering::SeqCst)
    }

    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    pub fn irq_enabled(&self) -> bool {
        self.interrupts.load(Ordering::SeqCst)
    }
}

impl Platform for SimCore {
    fn preempt_disable(&self) {
        self.preempt_depth.fetch_add(1, Ordering::SeqCst);
    }

    fn preempt_enable(&self) {
        let previous = self.preempt_depth.fetch_sub(1, Ordering::SeqCst);
        assert!(previous > 0, "unbalanced preempt_enable");
    }

    fn interrupts_enabled(&self) -> bool {
        self.irq_enabled()
    }

    fn disable_interrupts(&self) {
        self.interrupts.store(false, Ordering::SeqCst);
    }

    fn enable_interrupts(&self) {
        self.interrupts.store(true, Ordering::SeqCst);
    }

    fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        std::thread::yield_now();
    }

    fn halt(&self, message: &str) -> ! {
        panic!("halt: {message}");
    }
}
