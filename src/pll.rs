/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! Feedback multisynths (PLL A and B)
//!
//! ```text
//! fVCO = fIN * (a + b/c)
//! ```
//!
//! with `15 + 0/1048575 <= a + b/c <= 90 + 0/1048575` and `fIN` either the
//! crystal or the pre-divided CLKIN.

use log::debug;

use crate::constants::*;
use crate::node::ClockNode;
use crate::params::{Parameters, Ratio};
use crate::rational::approximate_ppm;
use crate::register::{ClockControlBits, PllInputSourceBits, PllResetBits, Register};
use crate::regmap::RegisterAccess;
use crate::{Error, Variant, PLL};

impl PLL {
    fn params_addr(&self) -> u8 {
        match *self {
            PLL::A => Register::PllAParameters.addr(),
            PLL::B => Register::PllBParameters.addr(),
        }
    }

    fn source_bit(&self) -> PllInputSourceBits {
        match *self {
            PLL::A => PllInputSourceBits::PLLA_SRC,
            PLL::B => PllInputSourceBits::PLLB_SRC,
        }
    }

    fn reset_bit(&self) -> PllResetBits {
        match *self {
            PLL::A => PllResetBits::PLLA_RST,
            PLL::B => PllResetBits::PLLB_RST,
        }
    }

    /// The FBx_INT bits live in the CLK6 and CLK7 control registers.
    fn int_mode_reg(&self) -> u8 {
        match *self {
            PLL::A => Register::Clk6.addr(),
            PLL::B => Register::Clk7.addr(),
        }
    }
}

/// Chooses the feedback ratio for `rate` and returns it with the VCO
/// frequency it actually produces.
///
/// The request is clamped into the VCO range first. The fractional part is
/// rounded to the nearest ppm of `fIN`, nudged by one ppm if that would
/// leave the VCO range. Parents that can't reach the VCO range with any
/// `a` in [15, 90] are rejected.
pub fn round(rate: u32, parent_rate: u32) -> Result<(u32, Ratio), Error> {
    let fin = parent_rate as u64;
    if fin * (PLL_A_MAX as u64) < PLL_VCO_MIN as u64 || fin * (PLL_A_MIN as u64) > PLL_VCO_MAX as u64 {
        return Err(Error::InvalidArgument);
    }

    let rate = rate.max(PLL_VCO_MIN).min(PLL_VCO_MAX);
    let a = rate / parent_rate;

    let ratio = if a < PLL_A_MIN {
        Ratio::integer(PLL_A_MIN)
    } else if a > PLL_A_MAX {
        Ratio::integer(PLL_A_MAX)
    } else {
        let rem = (rate % parent_rate) as u64;
        let ppm = ((2 * rem * PPM as u64 + parent_rate as u64) / (2 * parent_rate as u64)) as u32;

        let ratio = fractional(a, ppm);
        let vco = ratio.multiply(parent_rate);
        if vco > PLL_VCO_MAX {
            fractional(a, ppm - 1)
        } else if vco < PLL_VCO_MIN {
            fractional(a, ppm + 1)
        } else {
            ratio
        }
    };

    Ok((ratio.multiply(parent_rate), ratio))
}

fn fractional(a: u32, ppm: u32) -> Ratio {
    if ppm >= PPM {
        if a < PLL_A_MAX {
            return Ratio::integer(a + 1);
        }
        return fractional(a, PPM - 1);
    }

    let (b, c) = approximate_ppm(ppm, PLL_B_MAX, PLL_C_MAX);
    Ratio { a, b, c }
}

pub struct Pll {
    pll: PLL,
    variant: Variant,
    params: Option<Parameters>,
}

impl Pll {
    pub fn new(pll: PLL, variant: Variant) -> Self {
        Pll {
            pll,
            variant,
            params: None,
        }
    }

    /// Last parameters read back from the device, `None` once stale.
    pub fn params(&self) -> Option<Parameters> {
        self.params
    }
}

impl ClockNode for Pll {
    fn name(&self) -> &'static str {
        match self.pll {
            PLL::A => "plla",
            PLL::B => "pllb",
        }
    }

    fn recalc_rate<R: RegisterAccess>(&mut self, regs: &mut R, parent_rate: u32) -> Result<u32, Error> {
        let params = match self.params {
            Some(params) => params,
            None => {
                let params = Parameters::read(regs, self.pll.params_addr(), false)?;
                self.params = Some(params);
                params
            }
        };

        if params.p3 == 0 {
            return Ok(parent_rate);
        }

        // fVCO = fIN * (P1*P3 + 512*P3 + P2)/(128*P3)
        let (num, denom) = params.ratio();
        let rate = (parent_rate as u64 * num / denom) as u32;

        debug!(
            "{}: p1 = {}, p2 = {}, p3 = {}, parent_rate = {}, rate = {}",
            self.name(),
            params.p1,
            params.p2,
            params.p3,
            parent_rate,
            rate
        );

        Ok(rate)
    }

    fn round_rate(&self, rate: u32, parent_rate: &mut u32) -> Result<u32, Error> {
        let (rate, ratio) = round(rate, *parent_rate)?;
        debug!(
            "{}: a = {}, b = {}, c = {}, parent_rate = {}, rate = {}",
            self.name(),
            ratio.a,
            ratio.b,
            ratio.c,
            parent_rate,
            rate
        );
        Ok(rate)
    }

    fn set_rate<R: RegisterAccess>(&mut self, regs: &mut R, rate: u32, parent_rate: u32) -> Result<(), Error> {
        let (_, ratio) = round(rate, parent_rate)?;
        let params = Parameters::from(ratio);

        params.write(regs, self.pll.params_addr(), false)?;
        self.params = None;

        regs.set_bits(
            self.pll.int_mode_reg(),
            ClockControlBits::MS_INT.bits(),
            if ratio.is_integer() {
                ClockControlBits::MS_INT.bits()
            } else {
                0
            },
        )?;

        let reset = self.pll.reset_bit().bits();
        regs.set_bits(Register::PllReset.addr(), reset, reset)?;

        debug!(
            "{}: p1 = {}, p2 = {}, p3 = {}, parent_rate = {}, rate = {}",
            self.name(),
            params.p1,
            params.p2,
            params.p3,
            parent_rate,
            rate
        );

        Ok(())
    }

    fn get_parent<R: RegisterAccess>(&mut self, regs: &mut R) -> Result<u8, Error> {
        let val = regs.read(Register::PllInputSource.addr())?;
        Ok(if val & self.pll.source_bit().bits() != 0 { 1 } else { 0 })
    }

    fn set_parent<R: RegisterAccess>(&mut self, regs: &mut R, index: u8) -> Result<(), Error> {
        if index > 1 {
            return Err(Error::InvalidArgument);
        }
        if index > 0 && !self.variant.has_clkin() {
            return Err(Error::Unsupported);
        }

        let mask = self.pll.source_bit().bits();
        regs.set_bits(
            Register::PllInputSource.addr(),
            mask,
            if index == 1 { mask } else { 0 },
        )
    }
}
