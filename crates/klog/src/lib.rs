//! Kernel logging subsystem.
//!
//! A `log::Log` backend that writes one colored line per record to COM1:
//!
//! ```text
//! [ INFO] krt::finalizer: registered finalizer #3
//! ```
//!
//! Library crates log through the `log` facade and stay silent until the
//! kernel calls [`init`]. `log::set_logger` takes a `&'static` logger, so
//! no heap is needed and this works from the first instruction of kmain().
#![no_std]

use core::fmt;
use log::{Level, LevelFilter, Log, Metadata, Record};

fn label(level: Level) -> &'static str {
    match level {
        Level::Trace => "TRACE",
        Level::Debug => "DEBUG",
        Level::Info => " INFO",
        Level::Warn => " WARN",
        Level::Error => "ERROR",
    }
}

fn color(level: Level) -> &'static str {
    match level {
        Level::Trace => "\x1b[90m", // Gray
        Level::Debug => "\x1b[36m", // Cyan
        Level::Info => "\x1b[32m",  // Green
        Level::Warn => "\x1b[33m",  // Yellow
        Level::Error => "\x1b[31m", // Red
    }
}

/// The serial logger. Each record is written under the serial lock, so
/// lines from different cores never interleave mid-line.
pub struct KernelLogger;

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        khal::serial::write_fmt(format_args!(
            "{}[{}]\x1b[0m {}: {}\n",
            color(record.level()),
            label(record.level()),
            record.target(),
            record.args()
        ));
    }

    fn flush(&self) {}
}

static LOGGER: KernelLogger = KernelLogger;

/// Initialize serial output and install [`KernelLogger`] as the global
/// logger. Calling it again only changes the level.
pub fn init(level: LevelFilter) {
    khal::serial::init();
    // Fails only if a logger is already installed, which is fine.
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}

/// Print a line on the way down, bypassing the serial lock.
///
/// Used by the fatal-halt path where the lock holder may never release it.
pub fn emergency(args: fmt::Arguments) {
    khal::serial::write_fmt_unlocked(format_args!("\x1b[31m{}\x1b[0m\n", args));
}
