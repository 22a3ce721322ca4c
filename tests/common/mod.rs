/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use embedded_hal::blocking::i2c::{Write, WriteRead};

pub const PLL_RESET: usize = 177;

#[derive(Debug)]
pub struct BusFault;

pub struct Registers {
    pub regs: [u8; 256],
    pub pll_resets: u8,
    pub fail: bool,
    pub address: Option<u8>,
}

/// Si5351 register file on a fake bus. The registers stay reachable through
/// the shared handle after the bus moves into the driver.
pub struct FakeI2c(Rc<RefCell<Registers>>);

impl FakeI2c {
    pub fn new() -> (FakeI2c, Rc<RefCell<Registers>>) {
        let regs = Rc::new(RefCell::new(Registers {
            regs: [0; 256],
            pll_resets: 0,
            fail: false,
            address: None,
        }));
        (FakeI2c(regs.clone()), regs)
    }
}

impl Write for FakeI2c {
    type Error = BusFault;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusFault> {
        let mut state = self.0.borrow_mut();
        if state.fail {
            return Err(BusFault);
        }
        state.address = Some(address);
        let reg = bytes[0] as usize;
        for (offset, &byte) in bytes[1..].iter().enumerate() {
            if reg + offset == PLL_RESET {
                state.pll_resets |= byte;
            } else {
                state.regs[reg + offset] = byte;
            }
        }
        Ok(())
    }
}

impl WriteRead for FakeI2c {
    type Error = BusFault;

    fn write_read(&mut self, address: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), BusFault> {
        let mut state = self.0.borrow_mut();
        if state.fail {
            return Err(BusFault);
        }
        state.address = Some(address);
        let reg = bytes[0] as usize;
        buffer.copy_from_slice(&state.regs[reg..reg + buffer.len()]);
        Ok(())
    }
}
