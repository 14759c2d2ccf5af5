//! MMIO dispatch (C2): a serial write port and a 64-bit timer.

use std::time::Instant;

/// Start of the reserved MMIO window. Disjoint from physical memory.
pub const MMIO_BASE: u32 = 0xA000_0000;
/// End of the reserved MMIO window (inclusive).
pub const MMIO_END: u32 = 0xAFFF_FFFF;
/// Serial data port: write-only, one byte, flushed on every write.
pub const SERIAL_ADDR: u32 = 0xA000_0000;
/// Timer, low 32 bits of the microsecond counter. Read-only.
pub const TIMER_LO_ADDR: u32 = 0xA000_1048;
/// Timer, high 32 bits of the microsecond counter. Read-only.
pub const TIMER_HI_ADDR: u32 = 0xA000_104C;

#[must_use]
pub const fn is_mmio(addr: u32) -> bool {
    addr >= MMIO_BASE && addr <= MMIO_END
}

/// The serial port and timer devices.
///
/// Any address in the reserved window counts as an MMIO access for the
/// skip-ref protocol (see [`crate::bus::Bus`]) even if it hits neither
/// device specifically.
pub struct Mmio {
    epoch: Option<Instant>,
}

impl Default for Mmio {
    fn default() -> Self {
        Self::new()
    }
}

impl Mmio {
    #[must_use]
    pub const fn new() -> Self {
        Self { epoch: None }
    }

    fn micros(&mut self) -> u64 {
        let epoch = *self.epoch.get_or_insert_with(Instant::now);
        epoch.elapsed().as_micros() as u64
    }

    /// Reads unspecified for the serial port; only the timer halves are
    /// meaningfully readable. Anything else in the window reads zero.
    pub fn read(&mut self, addr: u32, _len: u32) -> u32 {
        match addr {
            TIMER_LO_ADDR => self.micros() as u32,
            TIMER_HI_ADDR => (self.micros() >> 32) as u32,
            _ => 0,
        }
    }

    /// A write of any length to the serial address emits its low byte to
    /// stdout and flushes. Writes to the timer addresses are ignored.
    pub fn write(&mut self, addr: u32, _len: u32, value: u32) {
        if addr == SERIAL_ADDR {
            use std::io::Write as _;
            print!("{}", value as u8 as char);
            let _ = std::io::stdout().flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Mmio, MMIO_BASE, MMIO_END, TIMER_HI_ADDR, TIMER_LO_ADDR, is_mmio};

    #[test]
    fn window_membership() {
        assert!(is_mmio(MMIO_BASE));
        assert!(is_mmio(MMIO_END));
        assert!(!is_mmio(MMIO_BASE - 1));
        assert!(!is_mmio(MMIO_END + 1));
    }

    #[test]
    fn timer_starts_at_zero_and_advances() {
        let mut mmio = Mmio::new();
        let lo0 = mmio.read(TIMER_LO_ADDR, 4);
        let hi0 = mmio.read(TIMER_HI_ADDR, 4);
        assert_eq!((lo0, hi0), (0, 0));
        let lo1 = mmio.read(TIMER_LO_ADDR, 4);
        assert!(lo1 >= lo0);
    }
}
