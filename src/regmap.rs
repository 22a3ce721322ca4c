/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! I²C register map with a write-through cache

use crate::hal::blocking::i2c::{Write, WriteRead};
use crate::register::{Register, MAX_REGISTER, PARAMETERS_LENGTH};
use crate::{i2c_error, Error};

const REGISTER_COUNT: usize = MAX_REGISTER as usize + 1;

/// Byte-wide register access, the only thing the clock nodes need from the bus.
pub trait RegisterAccess {
    fn read(&mut self, reg: u8) -> Result<u8, Error>;
    fn write(&mut self, reg: u8, val: u8) -> Result<(), Error>;

    fn bulk_read(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Error> {
        for (offset, byte) in buf.iter_mut().enumerate() {
            *byte = self.read(reg + offset as u8)?;
        }
        Ok(())
    }

    fn bulk_write(&mut self, reg: u8, buf: &[u8]) -> Result<(), Error> {
        for (offset, &byte) in buf.iter().enumerate() {
            self.write(reg + offset as u8, byte)?;
        }
        Ok(())
    }

    /// Read-modify-write of the bits in `mask`. Skips the write if nothing changes.
    fn set_bits(&mut self, reg: u8, mask: u8, val: u8) -> Result<(), Error> {
        let orig = self.read(reg)?;
        let updated = (orig & !mask) | (val & mask);
        if updated != orig {
            self.write(reg, updated)?;
        }
        Ok(())
    }
}

/// Register map of a device sitting on an I²C bus.
///
/// Non-volatile registers are cached after the first read or write, so
/// read-modify-write sequences cost a single bus transaction.
pub struct Regmap<I2C> {
    i2c: I2C,
    address: u8,
    cache: [Option<u8>; REGISTER_COUNT],
}

impl<I2C, E> Regmap<I2C>
where
    I2C: WriteRead<Error = E> + Write<Error = E>,
{
    pub fn new(i2c: I2C, address: u8) -> Self {
        Regmap {
            i2c,
            address,
            cache: [None; REGISTER_COUNT],
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Forget every cached value, e.g. after the device lost power.
    pub fn invalidate_cache(&mut self) {
        self.cache = [None; REGISTER_COUNT];
    }

    /// Gives the bus back.
    pub fn release(self) -> I2C {
        self.i2c
    }

    #[cfg(test)]
    pub(crate) fn bus(&mut self) -> &mut I2C {
        &mut self.i2c
    }

    fn check_range(reg: u8, len: usize) -> Result<(), Error> {
        if len == 0 || reg as usize + len > REGISTER_COUNT {
            return Err(Error::InvalidArgument);
        }
        Ok(())
    }

    fn cached(&self, reg: u8) -> Option<u8> {
        if Register::is_volatile(reg) {
            None
        } else {
            self.cache[reg as usize]
        }
    }

    fn store(&mut self, reg: u8, val: u8) {
        if !Register::is_volatile(reg) {
            self.cache[reg as usize] = Some(val);
        }
    }
}

impl<I2C, E> RegisterAccess for Regmap<I2C>
where
    I2C: WriteRead<Error = E> + Write<Error = E>,
{
    fn read(&mut self, reg: u8) -> Result<u8, Error> {
        Self::check_range(reg, 1)?;
        if let Some(val) = self.cached(reg) {
            return Ok(val);
        }

        let mut buffer = [0u8; 1];
        self.i2c
            .write_read(self.address, &[reg], &mut buffer)
            .map_err(i2c_error)?;
        self.store(reg, buffer[0]);
        Ok(buffer[0])
    }

    fn write(&mut self, reg: u8, val: u8) -> Result<(), Error> {
        Self::check_range(reg, 1)?;
        if !Register::is_writeable(reg) {
            return Err(Error::InvalidArgument);
        }

        self.i2c
            .write(self.address, &[reg, val])
            .map_err(i2c_error)?;
        self.store(reg, val);
        Ok(())
    }

    fn bulk_read(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Error> {
        Self::check_range(reg, buf.len())?;

        let mut hit = true;
        for (offset, byte) in buf.iter_mut().enumerate() {
            match self.cached(reg + offset as u8) {
                Some(val) => *byte = val,
                None => {
                    hit = false;
                    break;
                }
            }
        }
        if hit {
            return Ok(());
        }

        self.i2c
            .write_read(self.address, &[reg], buf)
            .map_err(i2c_error)?;
        for (offset, &byte) in buf.iter().enumerate() {
            self.store(reg + offset as u8, byte);
        }
        Ok(())
    }

    fn bulk_write(&mut self, reg: u8, buf: &[u8]) -> Result<(), Error> {
        Self::check_range(reg, buf.len())?;
        if buf.len() > PARAMETERS_LENGTH as usize {
            return Err(Error::InvalidArgument);
        }
        if (0..buf.len()).any(|offset| !Register::is_writeable(reg + offset as u8)) {
            return Err(Error::InvalidArgument);
        }

        let mut frame = [0u8; PARAMETERS_LENGTH as usize + 1];
        frame[0] = reg;
        frame[1..=buf.len()].copy_from_slice(buf);
        self.i2c
            .write(self.address, &frame[..=buf.len()])
            .map_err(i2c_error)?;
        for (offset, &byte) in buf.iter().enumerate() {
            self.store(reg + offset as u8, byte);
        }
        Ok(())
    }
}
