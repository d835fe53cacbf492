//! A `no_std` driver for AT28C256-style parallel EEPROMs whose address lines
//! are fed by two daisy-chained 74HC595 shift registers.
//!
//! Three pins load the registers with 15 address bits plus the chip's `/OE`
//! line, eight pins carry the data bus and one pin strobes `/WE`. The end of
//! each write cycle is detected by `DATA` polling.
//!
//! # Example
//!
//! ```
//! use core::cell::RefCell;
//! use parallel_eeprom::port::{self, GpioPort, PinConfig, PinId, PinMode};
//! use parallel_eeprom::{Config, EepromDevice};
//! # struct Board;
//! # impl GpioPort for Board {
//! #     type Error = ();
//! #     fn set_mode(&mut self, _: PinId, _: PinMode) -> Result<(), ()> { Ok(()) }
//! #     fn set_level(&mut self, _: PinId, _: bool) -> Result<(), ()> { Ok(()) }
//! #     fn level(&mut self, _: PinId) -> Result<bool, ()> { Ok(false) }
//! # }
//! # let board = Board;
//! # let delay = embedded_hal_mock::delay::MockNoop::new();
//!
//! let board = RefCell::new(board);
//! let pins = PinConfig {
//!     serial_data: 2,
//!     serial_clock: 3,
//!     serial_latch: 4,
//!     data_low: 5,
//!     data_high: 12,
//!     write_enable: 13,
//! };
//! let parts = port::split(&board, pins).unwrap();
//! let mut eeprom = EepromDevice::new(parts, delay, Config::default()).unwrap();
//!
//! let first = eeprom.read(0x0000).unwrap();
//! ```

#![cfg_attr(not(test), no_std)]

use core::fmt;

use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::digital::v2::OutputPin;
use log::{debug, trace, warn};

pub mod address;
pub mod bus;
pub mod poll;
pub mod port;
pub mod strobe;

pub use address::{ShiftChain, ADDRESS_LAST, CAPACITY};
pub use bus::DataBus;
pub use port::ConfigError;
pub use strobe::{CriticalStrobe, WriteStrobe};

use poll::{PollError, Poller};

#[derive(Debug)]
pub enum Error<E> {
    /// GPIO error
    Pin(E),
    /// Pin configuration error (range or aliasing)
    Configuration(ConfigError),
    /// Address beyond [`ADDRESS_LAST`]
    AddressOutOfRange(u16),
    /// The chip did not finish a write within the poll limit
    WriteTimeout { address: u16 },
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Pin(e) => write!(f, "pin error: {:?}", e),
            Error::Configuration(e) => write!(f, "invalid pin configuration: {}", e),
            Error::AddressOutOfRange(address) => {
                write!(f, "address {:#06x} out of range", address)
            }
            Error::WriteTimeout { address } => {
                write!(f, "write to {:#06x} did not complete", address)
            }
        }
    }
}

/// Driver configuration
///
/// # Example (create config with other than default settings)
///
/// ```
/// use parallel_eeprom::Config;
///
/// let config = Config {
///     poll_limit: 500,
///     ..Config::default()
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Delay between two `DATA` polls, in microseconds
    pub poll_interval_us: u32,
    /// Polls after the first one before a write is reported as timed out
    ///
    /// The default covers twice the chip's 10 ms maximum write cycle.
    pub poll_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            poll_interval_us: 200,
            poll_limit: 100,
        }
    }
}

/// The hardware pieces a driver is built from
pub struct Parts<SD, SC, SL, B, S> {
    pub chain: ShiftChain<SD, SC, SL>,
    pub bus: B,
    pub strobe: S,
}

/// Parallel EEPROM driver
pub struct EepromDevice<SD, SC, SL, B, S, D> {
    /// Address and `/OE` shift register chain
    chain: ShiftChain<SD, SC, SL>,
    /// `D0..D7`
    bus: B,
    /// `/WE`
    strobe: S,
    /// Paces `DATA` polling
    delay: D,
    config: Config,
}

impl<SD, SC, SL, B, S, D, E> EepromDevice<SD, SC, SL, B, S, D>
where
    SD: OutputPin<Error = E>,
    SC: OutputPin<Error = E>,
    SL: OutputPin<Error = E>,
    B: DataBus<Error = E>,
    S: WriteStrobe<Error = E>,
    D: DelayUs<u32>,
{
    /// Create a new instance of the driver
    ///
    /// `/WE` is driven to its inactive level.
    pub fn new(
        parts: Parts<SD, SC, SL, B, S>,
        delay: D,
        config: Config,
    ) -> Result<Self, Error<E>> {
        let Parts {
            chain,
            bus,
            mut strobe,
        } = parts;
        strobe.idle().map_err(Error::Pin)?;
        Ok(EepromDevice {
            chain,
            bus,
            strobe,
            delay,
            config,
        })
    }

    /// The configuration the driver was created with
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn check(address: u16) -> Result<(), Error<E>> {
        if address > ADDRESS_LAST {
            return Err(Error::AddressOutOfRange(address));
        }
        Ok(())
    }

    fn fetch(chain: &mut ShiftChain<SD, SC, SL>, bus: &mut B, address: u16) -> Result<u8, E> {
        let mut lines = bus::input(bus)?;
        chain.set_address(address, true)?;
        lines.read_byte()
    }

    /// Read the byte at `address`
    pub fn read(&mut self, address: u16) -> Result<u8, Error<E>> {
        Self::check(address)?;
        let data = Self::fetch(&mut self.chain, &mut self.bus, address).map_err(Error::Pin)?;
        trace!("read {:#06x} -> {:#04x}", address, data);
        Ok(data)
    }

    /// Write `data` to `address` and wait for the write cycle to end
    ///
    /// Note: Writes unconditionally, see [`update`](Self::update) to spare
    /// write cycles
    pub fn write(&mut self, address: u16, data: u8) -> Result<(), Error<E>> {
        Self::check(address)?;

        // `/OE` must be inactive before the bus is driven
        self.chain.set_address(address, false).map_err(Error::Pin)?;
        bus::output(&mut self.bus)
            .and_then(|mut lines| lines.write_byte(data))
            .map_err(Error::Pin)?;
        self.strobe.pulse().map_err(Error::Pin)?;

        let poller = Poller {
            interval_us: self.config.poll_interval_us,
            limit: self.config.poll_limit,
        };
        let EepromDevice {
            chain, bus, delay, ..
        } = self;
        match poller.wait(delay, data, || Self::fetch(chain, bus, address)) {
            Ok(polls) => {
                debug!(
                    "wrote {:#04x} to {:#06x} after {} polls",
                    data, address, polls
                );
                Ok(())
            }
            Err(PollError::Probe(e)) => Err(Error::Pin(e)),
            Err(PollError::Exhausted) => {
                warn!(
                    "write to {:#06x} still busy after {} retries",
                    address, poller.limit
                );
                Err(Error::WriteTimeout { address })
            }
        }
    }

    /// Write `data` to `address` unless it is already stored there
    ///
    /// Returns whether a write was performed.
    pub fn update(&mut self, address: u16, data: u8) -> Result<bool, Error<E>> {
        if self.read(address)? == data {
            debug!("{:#06x} already holds {:#04x}", address, data);
            return Ok(false);
        }
        self.write(address, data)?;
        Ok(true)
    }

    /// Destroy the driver and give back its parts
    pub fn release(self) -> (Parts<SD, SC, SL, B, S>, D) {
        (
            Parts {
                chain: self.chain,
                bus: self.bus,
                strobe: self.strobe,
            },
            self.delay,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::delay::MockNoop;
    use embedded_hal_mock::pin::{Mock, State, Transaction};
    use embedded_hal_mock::MockError;

    /// A bus that must never be touched
    struct Untouched;

    impl DataBus for Untouched {
        type Error = MockError;

        fn set_direction(&mut self, _: bus::Direction) -> Result<(), MockError> {
            panic!("bus switched")
        }

        fn sample(&mut self, _: u8) -> Result<bool, MockError> {
            panic!("bus sampled")
        }

        fn drive(&mut self, _: u8, _: bool) -> Result<(), MockError> {
            panic!("bus driven")
        }
    }

    #[test]
    fn out_of_range_address_is_rejected_before_bus_activity() {
        let none: [Transaction; 0] = [];
        let (data, clock, latch) = (Mock::new(&none), Mock::new(&none), Mock::new(&none));
        let we = Mock::new(&[Transaction::set(State::High)]);
        let parts = Parts {
            chain: ShiftChain::new(data, clock, latch),
            bus: Untouched,
            strobe: CriticalStrobe::new(we),
        };
        let mut eeprom = EepromDevice::new(parts, MockNoop::new(), Config::default()).unwrap();

        assert!(matches!(
            eeprom.read(0x8000),
            Err(Error::AddressOutOfRange(0x8000))
        ));
        assert!(matches!(
            eeprom.write(0xffff, 0x00),
            Err(Error::AddressOutOfRange(0xffff))
        ));
        assert!(matches!(
            eeprom.update(0x8000, 0x00),
            Err(Error::AddressOutOfRange(0x8000))
        ));

        let (parts, _) = eeprom.release();
        let (mut data, mut clock, mut latch) = parts.chain.release();
        data.done();
        clock.done();
        latch.done();
        parts.strobe.release().done();
    }

    #[test]
    fn default_config_polls_for_twenty_milliseconds() {
        let config = Config::default();
        assert_eq!(config.poll_interval_us * config.poll_limit, 20_000);
    }
}
