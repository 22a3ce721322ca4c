/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! In-memory Si5351 register file behind the `embedded-hal` I²C traits

use crate::hal::blocking::i2c::{Write, WriteRead};
use crate::regmap::Regmap;
use crate::register::Register;

#[derive(Debug)]
pub struct BusFault;

pub struct FakeI2c {
    pub regs: [u8; 256],
    pub reads: usize,
    pub writes: usize,
    /// Every value strobed into the self-clearing PLL reset register
    pub pll_resets: u8,
    pub fail: bool,
}

impl FakeI2c {
    pub fn new() -> Self {
        FakeI2c {
            regs: [0; 256],
            reads: 0,
            writes: 0,
            pll_resets: 0,
            fail: false,
        }
    }
}

impl Write for FakeI2c {
    type Error = BusFault;

    fn write(&mut self, _address: u8, bytes: &[u8]) -> Result<(), BusFault> {
        if self.fail {
            return Err(BusFault);
        }
        self.writes += 1;
        let reg = bytes[0] as usize;
        for (offset, &byte) in bytes[1..].iter().enumerate() {
            if reg + offset == Register::PllReset as usize {
                self.pll_resets |= byte;
            } else {
                self.regs[reg + offset] = byte;
            }
        }
        Ok(())
    }
}

impl WriteRead for FakeI2c {
    type Error = BusFault;

    fn write_read(&mut self, _address: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), BusFault> {
        if self.fail {
            return Err(BusFault);
        }
        self.reads += 1;
        let reg = bytes[0] as usize;
        buffer.copy_from_slice(&self.regs[reg..reg + buffer.len()]);
        Ok(())
    }
}

pub fn regmap() -> Regmap<FakeI2c> {
    Regmap::new(FakeI2c::new(), 0x60)
}
