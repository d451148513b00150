//! Boot-relative millisecond clock.
//!
//! Time is a wrapping 32-bit millisecond counter, the same shape as the
//! microcontroller tick the device runs on. The counter wraps after about
//! 49.7 days; interval checks use wrapping subtraction and stay correct
//! across one wrap, while log timestamps simply restart from zero.

use std::time::Instant;

/// Source of boot-relative time.
pub trait Clock: Send {
    /// Milliseconds since boot, wrapping at `u32::MAX`.
    fn millis(&self) -> u32;
}

/// [`Clock`] backed by `std::time::Instant`.
#[derive(Debug, Clone, Copy)]
pub struct BootClock {
    boot: Instant,
}

impl BootClock {
    pub fn new() -> Self {
        Self {
            boot: Instant::now(),
        }
    }
}

impl Default for BootClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for BootClock {
    fn millis(&self) -> u32 {
        // Truncation reproduces the hardware counter wrap.
        self.boot.elapsed().as_millis() as u32
    }
}

/// Milliseconds from `since` to `now`, tolerant of a single wrap.
pub fn elapsed_ms(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}

/// Whole seconds since boot for a wrapping millisecond reading.
pub fn seconds_since_boot(now: u32) -> u32 {
    now / 1000
}
