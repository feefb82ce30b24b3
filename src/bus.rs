//! Bus access layer
//!
//! The RDA5807 moves 16-bit big-endian register words over I2C and
//! exposes two device addresses: a sequential-access address whose
//! transfers auto-increment from fixed start registers (writes from 0x2,
//! reads from 0xA), and a random-access address for index-prefixed
//! single-register transfers.
//!
//! The tuner engine is written against the [`TunerBus`] trait so it can
//! run against real hardware or an in-memory fake. [`I2cTunerBus`] is the
//! bundled implementation over an [`embedded_hal::i2c::I2c`] peripheral.

use embedded_hal::i2c::I2c;

use crate::config::{I2C_RANDOM_ACCESS_ADDRESS, I2C_SEQUENTIAL_ADDRESS};
use crate::regs::{CONTROL_BASE, STATUS_BASE};

/// Register transfer primitives consumed by the tuner engine.
pub trait TunerBus {
    /// Transport error.
    type Error;

    /// One-time electrical setup of the bus lines, invoked during
    /// power-up.
    ///
    /// Implementations backed by a pre-configured peripheral can keep
    /// the default no-op; bit-banged or pin-muxed transports set up pin
    /// functions and pull-ups here.
    fn configure(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Write consecutive registers starting at 0x2.
    fn write_registers(&mut self, words: &[u16]) -> Result<(), Self::Error>;

    /// Read consecutive registers starting at 0xA.
    fn read_registers(&mut self, words: &mut [u16]) -> Result<(), Self::Error>;

    /// Write a single register.
    fn write_register(&mut self, index: u8, word: u16) -> Result<(), Self::Error>;

    /// Read a single register.
    fn read_register(&mut self, index: u8) -> Result<u16, Self::Error>;
}

/// [`TunerBus`] implementation over a blocking I2C peripheral.
pub struct I2cTunerBus<I2C> {
    i2c: I2C,
}

impl<I2C> I2cTunerBus<I2C> {
    /// Wrap an I2C peripheral.
    pub const fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    /// Release the wrapped peripheral.
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> TunerBus for I2cTunerBus<I2C> {
    type Error = I2C::Error;

    fn write_registers(&mut self, words: &[u16]) -> Result<(), Self::Error> {
        // Sequential window is 0x2..=0x8.
        debug_assert!(words.len() <= 7);

        let mut buf = [0u8; 14];
        for (i, &word) in words.iter().enumerate() {
            buf[2 * i] = (word >> 8) as u8;
            buf[2 * i + 1] = (word & 0xFF) as u8;
        }
        self.i2c
            .write(I2C_SEQUENTIAL_ADDRESS, &buf[..2 * words.len()])
    }

    fn read_registers(&mut self, words: &mut [u16]) -> Result<(), Self::Error> {
        // Sequential window is 0xA..=0xF.
        debug_assert!(words.len() <= 6);

        let mut buf = [0u8; 12];
        self.i2c
            .read(I2C_SEQUENTIAL_ADDRESS, &mut buf[..2 * words.len()])?;
        for (i, word) in words.iter_mut().enumerate() {
            *word = u16::from(buf[2 * i]) << 8 | u16::from(buf[2 * i + 1]);
        }
        Ok(())
    }

    fn write_register(&mut self, index: u8, word: u16) -> Result<(), Self::Error> {
        if index == CONTROL_BASE {
            // The sequential address starts writing at 0x2 anyway, which
            // saves the index byte.
            return self.write_registers(&[word]);
        }
        let buf = [index, (word >> 8) as u8, (word & 0xFF) as u8];
        self.i2c.write(I2C_RANDOM_ACCESS_ADDRESS, &buf)
    }

    fn read_register(&mut self, index: u8) -> Result<u16, Self::Error> {
        if index == STATUS_BASE {
            let mut words = [0u16; 1];
            self.read_registers(&mut words)?;
            return Ok(words[0]);
        }
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(I2C_RANDOM_ACCESS_ADDRESS, &[index], &mut buf)?;
        Ok(u16::from(buf[0]) << 8 | u16::from(buf[1]))
    }
}
