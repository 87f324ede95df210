//! Nothing may log while a guard is held: on hardware the log backend takes
//! the serial lock, and the holder runs with interrupts masked.
//!
//! A capturing logger tags every record with whether the emitting thread was
//! inside a guard's locked window at the time.

use std::cell::{Cell, RefCell};
use std::ffi::c_void;

use krt::abi;
use krt::{FinalizerRegistry, Guard, GuardedStatic, Platform};
use log::{Level, LevelFilter, Log, Metadata, Record};

thread_local! {
    static PREEMPT_DEPTH: Cell<usize> = const { Cell::new(0) };
    static IRQ_ENABLED: Cell<bool> = const { Cell::new(true) };
    static RECORDS: RefCell<Vec<Captured>> = const { RefCell::new(Vec::new()) };
}

#[derive(Debug)]
struct Captured {
    level: Level,
    locked: bool,
    message: String,
}

/// One simulated core per test thread. The preemption depth is non-zero
/// exactly between the winning `enter` and its `commit`.
struct ThreadCore;

impl Platform for ThreadCore {
    fn preempt_disable(&self) {
        PREEMPT_DEPTH.with(|depth| depth.set(depth.get() + 1));
    }

    fn preempt_enable(&self) {
        PREEMPT_DEPTH.with(|depth| {
            assert!(depth.get() > 0, "unbalanced preempt_enable");
            depth.set(depth.get() - 1);
        });
    }

    fn interrupts_enabled(&self) -> bool {
        IRQ_ENABLED.with(Cell::get)
    }

    fn disable_interrupts(&self) {
        IRQ_ENABLED.with(|irq| irq.set(false));
    }

    fn enable_interrupts(&self) {
        IRQ_ENABLED.with(|irq| irq.set(true));
    }

    fn halt(&self, message: &str) -> ! {
        panic!("halt: {message}");
    }
}

struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        let captured = Captured {
            level: record.level(),
            locked: PREEMPT_DEPTH.with(Cell::get) > 0,
            message: record.args().to_string(),
        };
        RECORDS.with(|records| records.borrow_mut().push(captured));
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;

fn install() {
    // Every test installs the same logger; only the first call succeeds.
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(LevelFilter::Trace);
}

fn logged_while_locked() -> Vec<String> {
    RECORDS.with(|records| {
        records
            .borrow()
            .iter()
            .filter(|record| record.locked)
            .map(|record| format!("[{}] {}", record.level, record.message))
            .collect()
    })
}

fn warnings() -> usize {
    RECORDS.with(|records| {
        records
            .borrow()
            .iter()
            .filter(|record| record.level == Level::Warn)
            .count()
    })
}

struct Buffer {
    _bytes: Vec<u8>,
}

#[test]
fn guarded_static_logs_only_after_commit() {
    static ROOMY: GuardedStatic<Buffer> = GuardedStatic::new();
    static CRAMPED: GuardedStatic<Buffer> = GuardedStatic::new();
    install();

    let registry = FinalizerRegistry::<1>::new();
    ROOMY.get_or_init(&ThreadCore, &registry, || Buffer { _bytes: vec![0; 16] });
    // The table is now full; the missing slot is still reported.
    CRAMPED.get_or_init(&ThreadCore, &registry, || Buffer { _bytes: vec![1; 16] });

    assert_eq!(logged_while_locked(), Vec::<String>::new());
    assert_eq!(warnings(), 1);
    assert_eq!(PREEMPT_DEPTH.with(Cell::get), 0);

    assert_eq!(unsafe { registry.run_all() }, 1);
}

unsafe extern "C" fn forget(_: *mut c_void) {}

#[test]
fn generated_code_is_silent_while_locked() {
    static GUARD: Guard = Guard::new();
    install();

    let registry = FinalizerRegistry::<1>::new();
    let object = 0x40 as *mut c_void;

    assert_eq!(abi::guard_acquire(&GUARD, &ThreadCore), 1);
    unsafe {
        assert_eq!(abi::atexit(&registry, forget, object, std::ptr::null_mut()), 0);
        assert_eq!(abi::atexit(&registry, forget, object, std::ptr::null_mut()), -1);
    }
    abi::guard_release(&GUARD, &ThreadCore);

    assert_eq!(logged_while_locked(), Vec::<String>::new());
    assert!(IRQ_ENABLED.with(Cell::get));
}
