//! Address selection through two daisy-chained 74HC595 shift registers.
//!
//! The upper register carries the active-low output-enable line on its `Q7`
//! output and address bits 14..8 on `Q6..Q0`. The lower register carries
//! address bits 7..0.

use embedded_hal::digital::v2::OutputPin;

/// Highest addressable byte (15 address lines)
pub const ADDRESS_LAST: u16 = 0x7fff;

/// Number of addressable bytes
pub const CAPACITY: usize = ADDRESS_LAST as usize + 1;

/// Frame bit driving the chip's `/OE` input
const OE_BIT: u16 = 1 << 15;

/// The two bytes shifted into the register chain for one address selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// First byte shifted out, ends up in the upper register
    pub high: u8,
    /// Second byte shifted out, ends up in the lower register
    pub low: u8,
}

impl Frame {
    /// Encode an address and the output-enable flag
    ///
    /// Address bit 15 is ignored, its position carries `/OE`.
    pub fn encode(address: u16, output_enable: bool) -> Self {
        let mut word = address & ADDRESS_LAST;
        if !output_enable {
            word |= OE_BIT;
        }
        Frame {
            high: (word >> 8) as u8,
            low: (word & 0xff) as u8,
        }
    }

    /// Recover the address and output-enable flag
    pub fn decode(self) -> (u16, bool) {
        let word = u16::from(self.high) << 8 | u16::from(self.low);
        (word & ADDRESS_LAST, word & OE_BIT == 0)
    }
}

/// Serial data, clock and latch lines of the register chain
pub struct ShiftChain<SD, SC, SL> {
    data: SD,
    clock: SC,
    latch: SL,
}

impl<SD, SC, SL, E> ShiftChain<SD, SC, SL>
where
    SD: OutputPin<Error = E>,
    SC: OutputPin<Error = E>,
    SL: OutputPin<Error = E>,
{
    /// Create the chain from three output pins
    pub fn new(data: SD, clock: SC, latch: SL) -> Self {
        ShiftChain { data, clock, latch }
    }

    /// Present `address` and the output-enable flag on the register outputs
    ///
    /// Both frames are shifted MSB first, then the latch is pulsed so that all
    /// sixteen outputs change together.
    pub fn set_address(&mut self, address: u16, output_enable: bool) -> Result<(), E> {
        let frame = Frame::encode(address, output_enable);
        self.shift_out(frame.high)?;
        self.shift_out(frame.low)?;

        self.latch.set_low()?;
        self.latch.set_high()?;
        self.latch.set_low()
    }

    fn shift_out(&mut self, byte: u8) -> Result<(), E> {
        for bit in (0..8).rev() {
            if byte & (1 << bit) != 0 {
                self.data.set_high()?;
            } else {
                self.data.set_low()?;
            }
            self.clock.set_high()?;
            self.clock.set_low()?;
        }
        Ok(())
    }

    /// Give back the pins
    pub fn release(self) -> (SD, SC, SL) {
        (self.data, self.clock, self.latch)
    }
}
