//! Wiring the driver to a GPIO port addressed by pin number.
//!
//! [`split`] validates a [`PinConfig`], puts the control pins into their
//! initial state and hands out `embedded-hal` output pins and a [`DataBus`] that all
//! share the one port through a [`RefCell`].

use core::cell::RefCell;
use core::fmt;

use embedded_hal::digital::v2::OutputPin;

use crate::address::ShiftChain;
use crate::bus::{DataBus, Direction};
use crate::strobe::CriticalStrobe;
use crate::{Error, Parts};

/// Physical pin number on the host port
pub type PinId = u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    Output,
}

/// A GPIO port whose pins are selected by number
pub trait GpioPort {
    type Error;

    fn set_mode(&mut self, pin: PinId, mode: PinMode) -> Result<(), Self::Error>;
    fn set_level(&mut self, pin: PinId, high: bool) -> Result<(), Self::Error>;
    fn level(&mut self, pin: PinId) -> Result<bool, Self::Error>;
}

/// Which port pin serves which role
///
/// # Example
///
/// ```
/// use parallel_eeprom::port::PinConfig;
///
/// let pins = PinConfig {
///     serial_data: 2,
///     serial_clock: 3,
///     serial_latch: 4,
///     data_low: 5,
///     data_high: 12,
///     write_enable: 13,
/// };
/// assert!(pins.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinConfig {
    /// 74HC595 `SER`
    pub serial_data: PinId,
    /// 74HC595 `SRCLK`
    pub serial_clock: PinId,
    /// 74HC595 `RCLK`
    pub serial_latch: PinId,
    /// EEPROM `D0`, first of eight consecutive pins
    pub data_low: PinId,
    /// EEPROM `D7`, last of eight consecutive pins
    pub data_high: PinId,
    /// EEPROM `/WE`
    pub write_enable: PinId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// `data_low..=data_high` is not exactly eight pins
    DataRange { low: PinId, high: PinId },
    /// A pin is assigned to more than one role
    Alias(PinId),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::DataRange { low, high } => {
                write!(f, "data pins {}..={} do not span 8 pins", low, high)
            }
            ConfigError::Alias(pin) => write!(f, "pin {} assigned to more than one role", pin),
        }
    }
}

impl PinConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (low, high) = (self.data_low, self.data_high);
        if high < low || high - low != 7 {
            return Err(ConfigError::DataRange { low, high });
        }

        let control = [
            self.serial_data,
            self.serial_clock,
            self.serial_latch,
            self.write_enable,
        ];
        for (i, &pin) in control.iter().enumerate() {
            if (low..=high).contains(&pin) || control[..i].contains(&pin) {
                return Err(ConfigError::Alias(pin));
            }
        }
        Ok(())
    }
}

/// One numbered pin of a shared port
pub struct PortPin<'a, P> {
    port: &'a RefCell<P>,
    pin: PinId,
}

impl<'a, P: GpioPort> PortPin<'a, P> {
    pub fn new(port: &'a RefCell<P>, pin: PinId) -> Self {
        PortPin { port, pin }
    }
}

impl<P: GpioPort> OutputPin for PortPin<'_, P> {
    type Error = P::Error;

    fn set_low(&mut self) -> Result<(), P::Error> {
        self.port.borrow_mut().set_level(self.pin, false)
    }

    fn set_high(&mut self) -> Result<(), P::Error> {
        self.port.borrow_mut().set_level(self.pin, true)
    }
}

/// The eight consecutive data pins of a shared port
pub struct PortBus<'a, P> {
    port: &'a RefCell<P>,
    low: PinId,
}

impl<P: GpioPort> DataBus for PortBus<'_, P> {
    type Error = P::Error;

    fn set_direction(&mut self, direction: Direction) -> Result<(), P::Error> {
        let mode = match direction {
            Direction::Input => PinMode::Input,
            Direction::Output => PinMode::Output,
        };
        let mut port = self.port.borrow_mut();
        for line in 0..8 {
            port.set_mode(self.low + line, mode)?;
        }
        Ok(())
    }

    fn sample(&mut self, line: u8) -> Result<bool, P::Error> {
        debug_assert!(line < 8);
        self.port.borrow_mut().level(self.low + line)
    }

    fn drive(&mut self, line: u8, high: bool) -> Result<(), P::Error> {
        debug_assert!(line < 8);
        self.port.borrow_mut().set_level(self.low + line, high)
    }
}

/// Everything [`split`] hands out for a port `P`
pub type PortParts<'a, P> = Parts<
    PortPin<'a, P>,
    PortPin<'a, P>,
    PortPin<'a, P>,
    PortBus<'a, P>,
    CriticalStrobe<PortPin<'a, P>>,
>;

/// Validate `pins` and claim them on `port`
///
/// `/WE` is driven high before it becomes an output so the chip never sees a
/// spurious write. The data pins are left alone, their direction is set per
/// operation.
pub fn split<P: GpioPort>(
    port: &RefCell<P>,
    pins: PinConfig,
) -> Result<PortParts<'_, P>, Error<P::Error>> {
    pins.validate().map_err(Error::Configuration)?;

    {
        let mut port = port.borrow_mut();
        for pin in [pins.serial_data, pins.serial_clock, pins.serial_latch] {
            port.set_mode(pin, PinMode::Output).map_err(Error::Pin)?;
        }
        port.set_level(pins.write_enable, true).map_err(Error::Pin)?;
        port.set_mode(pins.write_enable, PinMode::Output).map_err(Error::Pin)?;
    }

    Ok(Parts {
        chain: ShiftChain::new(
            PortPin::new(port, pins.serial_data),
            PortPin::new(port, pins.serial_clock),
            PortPin::new(port, pins.serial_latch),
        ),
        bus: PortBus {
            port,
            low: pins.data_low,
        },
        strobe: CriticalStrobe::new(PortPin::new(port, pins.write_enable)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PINS: PinConfig = PinConfig {
        serial_data: 2,
        serial_clock: 3,
        serial_latch: 4,
        data_low: 5,
        data_high: 12,
        write_enable: 13,
    };

    #[test]
    fn accepts_reference_wiring() {
        assert_eq!(PINS.validate(), Ok(()));
    }

    #[test]
    fn rejects_short_or_reversed_data_range() {
        for (low, high) in [(5, 11), (5, 13), (12, 5)] {
            let pins = PinConfig {
                data_low: low,
                data_high: high,
                write_enable: 20,
                ..PINS
            };
            assert_eq!(
                pins.validate(),
                Err(ConfigError::DataRange { low, high })
            );
        }
    }

    #[test]
    fn rejects_aliased_pins() {
        let latch_on_clock = PinConfig {
            serial_latch: 3,
            ..PINS
        };
        assert_eq!(latch_on_clock.validate(), Err(ConfigError::Alias(3)));

        let we_on_d7 = PinConfig {
            write_enable: 12,
            ..PINS
        };
        assert_eq!(we_on_d7.validate(), Err(ConfigError::Alias(12)));
    }

    /// Records every call in order
    #[derive(Default)]
    struct Recorder(Vec<(PinId, &'static str, bool)>);

    impl GpioPort for Recorder {
        type Error = ();

        fn set_mode(&mut self, pin: PinId, mode: PinMode) -> Result<(), ()> {
            self.0.push((pin, "mode", mode == PinMode::Output));
            Ok(())
        }

        fn set_level(&mut self, pin: PinId, high: bool) -> Result<(), ()> {
            self.0.push((pin, "level", high));
            Ok(())
        }

        fn level(&mut self, _pin: PinId) -> Result<bool, ()> {
            Ok(false)
        }
    }

    #[test]
    fn split_raises_write_enable_before_enabling_it() {
        let port = RefCell::new(Recorder::default());
        split(&port, PINS).unwrap();
        assert_eq!(
            port.into_inner().0,
            [
                (2, "mode", true),
                (3, "mode", true),
                (4, "mode", true),
                (13, "level", true),
                (13, "mode", true),
            ]
        );
    }

    #[test]
    fn split_refuses_bad_config_without_touching_port() {
        let port = RefCell::new(Recorder::default());
        let pins = PinConfig {
            serial_data: 7,
            ..PINS
        };
        assert!(matches!(
            split(&port, pins),
            Err(Error::Configuration(ConfigError::Alias(7)))
        ));
        assert!(port.into_inner().0.is_empty());
    }
}
