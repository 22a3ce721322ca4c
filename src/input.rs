/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! Reference inputs

use log::{debug, warn};

use crate::constants::CLKIN_PLL_INPUT_MAX;
use crate::node::ClockNode;
use crate::register::{FanoutEnableBits, PllInputSourceBits, Register};
use crate::regmap::RegisterAccess;
use crate::Error;

/// Crystal oscillator input gate
pub struct Xtal;

impl ClockNode for Xtal {
    fn name(&self) -> &'static str {
        "xtal"
    }

    fn prepare<R: RegisterAccess>(&mut self, regs: &mut R) -> Result<(), Error> {
        let bit = FanoutEnableBits::XTAL_EN.bits();
        regs.set_bits(Register::FanoutEnable.addr(), bit, bit)
    }

    fn unprepare<R: RegisterAccess>(&mut self, regs: &mut R) -> Result<(), Error> {
        regs.set_bits(Register::FanoutEnable.addr(), FanoutEnableBits::XTAL_EN.bits(), 0)
    }
}

/// CMOS clock input of the Si5351C.
///
/// The PLL input range is 10 MHz to 40 MHz, faster CLKIN signals go
/// through the input divider.
pub struct Clkin;

impl Clkin {
    fn divider(parent_rate: u32) -> (PllInputSourceBits, u32) {
        if parent_rate > 4 * CLKIN_PLL_INPUT_MAX {
            (PllInputSourceBits::CLKIN_DIV_8, 8)
        } else if parent_rate > 2 * CLKIN_PLL_INPUT_MAX {
            (PllInputSourceBits::CLKIN_DIV_4, 4)
        } else if parent_rate > CLKIN_PLL_INPUT_MAX {
            (PllInputSourceBits::CLKIN_DIV_2, 2)
        } else {
            (PllInputSourceBits::CLKIN_DIV_1, 1)
        }
    }
}

impl ClockNode for Clkin {
    fn name(&self) -> &'static str {
        "clkin"
    }

    fn recalc_rate<R: RegisterAccess>(&mut self, regs: &mut R, parent_rate: u32) -> Result<u32, Error> {
        let (idiv, div) = Clkin::divider(parent_rate);
        regs.set_bits(
            Register::PllInputSource.addr(),
            PllInputSourceBits::CLKIN_DIV_MASK.bits(),
            idiv.bits(),
        )?;

        let rate = parent_rate / div;
        debug!("{}: div = {}, rate = {}", self.name(), div, rate);
        Ok(rate)
    }

    fn prepare<R: RegisterAccess>(&mut self, regs: &mut R) -> Result<(), Error> {
        let bit = FanoutEnableBits::CLKIN_EN.bits();
        regs.set_bits(Register::FanoutEnable.addr(), bit, bit)
    }

    fn unprepare<R: RegisterAccess>(&mut self, regs: &mut R) -> Result<(), Error> {
        regs.set_bits(Register::FanoutEnable.addr(), FanoutEnableBits::CLKIN_EN.bits(), 0)
    }
}

/// Voltage-controlled crystal oscillator of the Si5351B, sits where PLL B
/// would be. Not driven yet; it reports no rate.
pub struct Vcxo;

impl ClockNode for Vcxo {
    fn name(&self) -> &'static str {
        "vxco"
    }

    fn recalc_rate<R: RegisterAccess>(&mut self, _regs: &mut R, _parent_rate: u32) -> Result<u32, Error> {
        Ok(0)
    }

    fn round_rate(&self, _rate: u32, _parent_rate: &mut u32) -> Result<u32, Error> {
        Ok(0)
    }

    fn prepare<R: RegisterAccess>(&mut self, _regs: &mut R) -> Result<(), Error> {
        warn!("VCXO currently unsupported");
        Ok(())
    }
}
