//! Write-enable pulse generation.

use embedded_hal::digital::v2::OutputPin;

/// Minimum `/WE` low time of the AT28C256 (tWP), in nanoseconds
pub const WRITE_PULSE_MIN_NS: u32 = 100;

/// Spin iterations held by [`CriticalStrobe`] unless told otherwise
///
/// Twelve cycles are ~750 ns on a 16 MHz core.
pub const DEFAULT_HOLD_CYCLES: u32 = 12;

/// Spin iterations needed to hold `/WE` low for `min_ns` on a `cpu_hz` core
///
/// Assumes each iteration costs at least one core cycle and rounds up. Every
/// iteration passes its counter through [`core::hint::black_box`], so the
/// optimizer cannot drop the loop on any target.
pub const fn hold_cycles(cpu_hz: u32, min_ns: u32) -> u32 {
    let cycles = (min_ns as u64 * cpu_hz as u64 + 999_999_999) / 1_000_000_000;
    if cycles == 0 {
        1
    } else {
        cycles as u32
    }
}

/// Busy-wait `cycles` iterations, returning how many ran
#[inline(never)]
fn hold(cycles: u32) -> u32 {
    let mut spun = 0;
    for i in 0..cycles {
        spun = core::hint::black_box(i) + 1;
    }
    spun
}

/// Platform capability driving the chip's active-low `/WE` input
pub trait WriteStrobe {
    type Error;

    /// Drive `/WE` to its inactive (high) level
    fn idle(&mut self) -> Result<(), Self::Error>;

    /// Drive `/WE` low for at least the chip's minimum pulse width, then high
    ///
    /// No interrupt handler may run while the line is low.
    fn pulse(&mut self) -> Result<(), Self::Error>;
}

/// [`WriteStrobe`] over a plain output pin, timed by a spin loop inside a
/// critical section
pub struct CriticalStrobe<WE> {
    pin: WE,
    hold_cycles: u32,
}

impl<WE: OutputPin> CriticalStrobe<WE> {
    /// Strobe holding for [`DEFAULT_HOLD_CYCLES`]
    pub fn new(pin: WE) -> Self {
        Self::with_hold_cycles(pin, DEFAULT_HOLD_CYCLES)
    }

    /// Strobe holding for `hold_cycles` spin iterations, see [`hold_cycles`]
    pub fn with_hold_cycles(pin: WE, hold_cycles: u32) -> Self {
        CriticalStrobe {
            pin,
            hold_cycles: hold_cycles.max(1),
        }
    }

    pub fn release(self) -> WE {
        self.pin
    }
}

impl<WE: OutputPin> WriteStrobe for CriticalStrobe<WE> {
    type Error = WE::Error;

    fn idle(&mut self) -> Result<(), WE::Error> {
        self.pin.set_high()
    }

    fn pulse(&mut self) -> Result<(), WE::Error> {
        let pin = &mut self.pin;
        let hold_cycles = self.hold_cycles;
        critical_section::with(|_| -> Result<(), WE::Error> {
            pin.set_low()?;
            hold(hold_cycles);
            pin.set_high()
        })
    }
}
