//! The eight shared data lines `D0..D7`.
//!
//! Direction is carried in the type of the [`Lines`] handle: [`input`] and
//! [`output`] switch the physical direction and hand out a handle that only
//! permits transfers in that direction.

use core::marker::PhantomData;

/// Physical direction of the data lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// The chip drives the bus
    Input,
    /// The driver drives the bus
    Output,
}

/// Typestate for lines switched to input
pub struct Input;
/// Typestate for lines switched to output
pub struct Output;

/// Platform access to the data lines
///
/// `line` is the chip's data bit number, `0` for `D0` up to `7` for `D7`.
pub trait DataBus {
    type Error;

    /// Switch all eight lines to `direction`
    fn set_direction(&mut self, direction: Direction) -> Result<(), Self::Error>;

    /// Read the level of one line configured as input
    fn sample(&mut self, line: u8) -> Result<bool, Self::Error>;

    /// Drive one line configured as output
    fn drive(&mut self, line: u8, high: bool) -> Result<(), Self::Error>;
}

/// Data lines known to be switched to direction `DIR`
pub struct Lines<'a, B, DIR> {
    bus: &'a mut B,
    _direction: PhantomData<DIR>,
}

/// Switch the bus to input
pub fn input<B: DataBus>(bus: &mut B) -> Result<Lines<'_, B, Input>, B::Error> {
    bus.set_direction(Direction::Input)?;
    Ok(Lines {
        bus,
        _direction: PhantomData,
    })
}

/// Switch the bus to output
pub fn output<B: DataBus>(bus: &mut B) -> Result<Lines<'_, B, Output>, B::Error> {
    bus.set_direction(Direction::Output)?;
    Ok(Lines {
        bus,
        _direction: PhantomData,
    })
}

impl<B: DataBus> Lines<'_, B, Input> {
    /// Sample `D7` down to `D0`, shifting each bit in from the right
    pub fn read_byte(&mut self) -> Result<u8, B::Error> {
        let mut data = 0u8;
        for line in (0..8).rev() {
            data = (data << 1) | u8::from(self.bus.sample(line)?);
        }
        Ok(data)
    }
}

impl<B: DataBus> Lines<'_, B, Output> {
    /// Drive `D0` up to `D7` with successive low-order bits of `data`
    pub fn write_byte(&mut self, mut data: u8) -> Result<(), B::Error> {
        for line in 0..8 {
            self.bus.drive(line, data & 1 != 0)?;
            data >>= 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Lines wired straight back to themselves, recording the access order
    #[derive(Default)]
    struct Loopback {
        levels: [bool; 8],
        direction: Option<Direction>,
        order: Vec<u8>,
    }

    impl DataBus for Loopback {
        type Error = ();

        fn set_direction(&mut self, direction: Direction) -> Result<(), ()> {
            self.direction = Some(direction);
            Ok(())
        }

        fn sample(&mut self, line: u8) -> Result<bool, ()> {
            assert_eq!(self.direction, Some(Direction::Input));
            self.order.push(line);
            Ok(self.levels[line as usize])
        }

        fn drive(&mut self, line: u8, high: bool) -> Result<(), ()> {
            assert_eq!(self.direction, Some(Direction::Output));
            self.order.push(line);
            self.levels[line as usize] = high;
            Ok(())
        }
    }

    #[test]
    fn write_drives_low_line_first() {
        let mut bus = Loopback::default();
        output(&mut bus).unwrap().write_byte(0b0000_0101).unwrap();
        assert_eq!(bus.order, [0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(
            bus.levels,
            [true, false, true, false, false, false, false, false]
        );
    }

    #[test]
    fn read_samples_high_line_first() {
        let mut bus = Loopback {
            levels: [false, false, false, false, false, false, false, true],
            ..Loopback::default()
        };
        assert_eq!(input(&mut bus).unwrap().read_byte().unwrap(), 0x80);
        assert_eq!(bus.order, [7, 6, 5, 4, 3, 2, 1, 0]);
    }

    proptest! {
        #[test]
        fn loopback_round_trip(byte in any::<u8>()) {
            let mut bus = Loopback::default();
            output(&mut bus).unwrap().write_byte(byte).unwrap();
            prop_assert_eq!(input(&mut bus).unwrap().read_byte().unwrap(), byte);
        }
    }
}
