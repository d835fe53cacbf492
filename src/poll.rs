//! `DATA` polling for the end of an internal write cycle.
//!
//! While the chip is busy, reads of the address being written return the
//! complement of bit 7 of the written byte. Once the cycle is done the true
//! value is returned.

use embedded_hal::blocking::delay::DelayUs;

const TOP_BIT: u8 = 0x80;

/// Why polling stopped without a match
#[derive(Debug, PartialEq, Eq)]
pub enum PollError<E> {
    /// The probe itself failed
    Probe(E),
    /// `limit` retries passed without a match
    Exhausted,
}

/// Rate-limited, bounded poll loop
#[derive(Debug, Clone, Copy)]
pub struct Poller {
    pub interval_us: u32,
    pub limit: u32,
}

impl Poller {
    /// Probe until bit 7 of the probed byte equals bit 7 of `written`
    ///
    /// The first probe is immediate, every retry waits `interval_us` first.
    /// Returns the number of probes made.
    pub fn wait<D, F, E>(
        &self,
        delay: &mut D,
        written: u8,
        mut probe: F,
    ) -> Result<u32, PollError<E>>
    where
        D: DelayUs<u32>,
        F: FnMut() -> Result<u8, E>,
    {
        let expected = written & TOP_BIT;
        let mut retries = 0u32;
        let mut observed = probe().map_err(PollError::Probe)? & TOP_BIT;
        while observed != expected {
            if retries == self.limit {
                return Err(PollError::Exhausted);
            }
            delay.delay_us(self.interval_us);
            observed = probe().map_err(PollError::Probe)? & TOP_BIT;
            retries += 1;
        }
        Ok(retries.saturating_add(1))
    }
}
