//! Serial port (COM1 UART 16550) driver.
//!
//! Polled, transmit-only: it is the sink for kernel log lines and for the
//! last words printed by the fatal-halt path.

use core::fmt;
use spin::Mutex;
use x86_64::instructions::port::Port;

/// COM1 base port address
const COM1_PORT: u16 = 0x3F8;

/// Line status register bit: transmit holding register empty.
const LSR_THR_EMPTY: u8 = 0x20;

/// Serial port driver for COM1
pub struct Serial {
    data: Port<u8>,
    interrupt_enable: Port<u8>,
    fifo_control: Port<u8>,
    line_control: Port<u8>,
    modem_control: Port<u8>,
    line_status: Port<u8>,
    initialized: bool,
}

impl Serial {
    /// Create a new uninitialized Serial port instance
    const fn new(base: u16) -> Self {
        Self {
            data: Port::new(base),
            interrupt_enable: Port::new(base + 1),
            fifo_control: Port::new(base + 2),
            line_control: Port::new(base + 3),
            modem_control: Port::new(base + 4),
            line_status: Port::new(base + 5),
            initialized: false,
        }
    }

    /// Initialize the serial port (115200 baud, 8N1)
    pub fn init(&mut self) {
        unsafe {
            // Disable all interrupts
            self.interrupt_enable.write(0x00);

            // DLAB on, divisor 1 (115200 baud)
            self.line_control.write(0x80);
            self.data.write(0x01);
            self.interrupt_enable.write(0x00);

            // 8 bits, no parity, one stop bit (clear DLAB)
            self.line_control.write(0x03);

            // Enable FIFO, clear them, with 14-byte threshold
            self.fifo_control.write(0xC7);

            // Loopback self-test
            self.modem_control.write(0x1E);
            self.data.write(0xAE);
            if self.data.read() != 0xAE {
                // No working UART: stay uninitialized so writes are dropped
                // instead of polling a line status that never clears.
                return;
            }

            // Normal operation (OUT1, OUT2, RTS, DTR)
            self.modem_control.write(0x0F);

            // We poll; keep UART interrupts off
            self.interrupt_enable.write(0x00);
        }
        self.initialized = true;
    }

    fn is_transmit_empty(&mut self) -> bool {
        unsafe { self.line_status.read() & LSR_THR_EMPTY != 0 }
    }

    /// Write a byte to the serial port
    pub fn write_byte(&mut self, byte: u8) {
        if !self.initialized {
            return;
        }

        while !self.is_transmit_empty() {
            core::hint::spin_loop();
        }

        unsafe {
            self.data.write(byte);
        }
    }
}

impl fmt::Write for Serial {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.write_byte(b'\r');
            }
            self.write_byte(byte);
        }
        Ok(())
    }
}

/// Global serial port instance (COM1)
static SERIAL: Mutex<Serial> = Mutex::new(Serial::new(COM1_PORT));

/// Initialize the global serial port
pub fn init() {
    SERIAL.lock().init();
}

/// Write formatted arguments to the serial port
pub fn write_fmt(args: fmt::Arguments) {
    use fmt::Write;
    let _ = SERIAL.lock().write_fmt(args);
}

/// Write formatted arguments even if the serial lock is held.
///
/// Only for the halt path: the holder may be the very context that is
/// halting (or a core that will never run again), so waiting on the lock
/// could hang silently. Output may interleave with a concurrent writer.
pub fn write_fmt_unlocked(args: fmt::Arguments) {
    use fmt::Write;
    if SERIAL.is_locked() {
        // SAFETY: the system is going down; no further well-formed output is
        // expected from the current holder.
        unsafe { SERIAL.force_unlock() };
    }
    let _ = SERIAL.lock().write_fmt(args);
}
