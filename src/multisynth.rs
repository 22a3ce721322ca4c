/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! Output multisynths
//!
//! For outputs up to 150 MHz:
//!
//! ```text
//! fOUT = fVCO / (a + b/c)
//! ```
//!
//! with `6 + 0/1048575 <= a + b/c <= 1800 + 0/1048575`. Multisynths 6 and 7
//! are integer dividers only, programmed with `a` directly.
//!
//! Between 150 MHz and 160 MHz the multisynth runs in divide-by-4 mode with
//! `P1 = 0, P2 = 0, P3 = 1` and the DIVBY4 bits set.

use log::debug;

use crate::constants::*;
use crate::node::ClockNode;
use crate::params::{Parameters, Ratio};
use crate::rational::approximate_ppm;
use crate::register::{ClockControlBits, OutputDividerBits, Register};
use crate::regmap::RegisterAccess;
use crate::{ClockOutput, Error};

impl ClockOutput {
    pub(crate) fn is_integer_only(&self) -> bool {
        self.ix() >= 6
    }

    fn max_msynth_freq(&self) -> u32 {
        if self.is_integer_only() {
            MULTISYNTH67_MAX_FREQ
        } else {
            MULTISYNTH_MAX_FREQ
        }
    }

    fn max_msynth_a(&self) -> u32 {
        if self.is_integer_only() {
            MULTISYNTH67_A_MAX
        } else {
            MULTISYNTH_A_MAX
        }
    }
}

/// How a multisynth divides its PLL
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Divider {
    DivBy4,
    Ratio(Ratio),
}

impl Divider {
    pub fn divide(&self, parent_rate: u32) -> u32 {
        match *self {
            Divider::DivBy4 => parent_rate / 4,
            Divider::Ratio(ratio) => ratio.divide(parent_rate),
        }
    }
}

/// Divider for `rate` out of a PLL running at `parent_rate`. `rate` must be
/// non-zero.
fn fixed_parent_ratio(ms: ClockOutput, rate: u32, parent_rate: u32) -> Ratio {
    let a = parent_rate / rate;

    // a clamped divider can't hit the rate anyway, drop the fraction
    if a < MULTISYNTH_A_MIN {
        return Ratio::integer(MULTISYNTH_A_MIN);
    }
    if a > ms.max_msynth_a() {
        return Ratio::integer(ms.max_msynth_a());
    }
    if ms.is_integer_only() {
        return Ratio::integer(a);
    }

    // b/c = (fVCO mod fOUT) / fOUT
    let rem = (parent_rate % rate) as u64;
    let ppm = (rem * PPM as u64 / rate as u64) as u32;
    let (b, c) = approximate_ppm(ppm, MULTISYNTH_B_MAX, MULTISYNTH_C_MAX);
    Ratio { a, b, c }
}

/// Rounds a request for multisynth `ms`.
///
/// A PLL master picks the largest integer divider that keeps the VCO under
/// its maximum and asks for `a * rate` from the PLL through `parent_rate`.
/// Rates too low for that to reach the VCO minimum are rounded up.
/// Otherwise the PLL rate is fixed; requests in the divide-by-4 range are
/// then served from the 150 MHz boundary with a regular divider.
pub fn round(ms: ClockOutput, pll_master: bool, rate: u32, parent_rate: &mut u32) -> (u32, Divider) {
    let rate = rate.min(ms.max_msynth_freq()).max(MULTISYNTH_MIN_FREQ);
    let divby4 = rate > MULTISYNTH_DIVBY4_FREQ;

    let divider = if pll_master {
        let a = if divby4 {
            4
        } else {
            (PLL_VCO_MAX / rate).min(ms.max_msynth_a())
        };
        // ms6/7 stop at a = 254, raise the rate until the VCO reaches its minimum
        let rate = if a * rate < PLL_VCO_MIN {
            (PLL_VCO_MIN + a - 1) / a
        } else {
            rate
        };
        *parent_rate = a * rate;

        if divby4 {
            Divider::DivBy4
        } else {
            Divider::Ratio(Ratio::integer(a))
        }
    } else {
        // FIXME: this throws the caller's rate away for the boundary
        // constant, a request above 150 MHz could be divided from the PLL
        // rate directly.
        let rate = if divby4 { MULTISYNTH_DIVBY4_FREQ } else { rate };
        Divider::Ratio(fixed_parent_ratio(ms, rate, *parent_rate))
    };

    (divider.divide(*parent_rate), divider)
}

pub struct Multisynth {
    ms: ClockOutput,
    params: Option<Parameters>,
    pll_master: bool,
}

impl Multisynth {
    pub fn new(ms: ClockOutput) -> Self {
        Multisynth {
            ms,
            params: None,
            pll_master: false,
        }
    }

    /// Lets this multisynth set the rate of its PLL. Keep it to one
    /// multisynth per PLL.
    pub fn set_pll_master(&mut self, is_master: bool) {
        self.pll_master = is_master;
    }

    pub fn params(&self) -> Option<Parameters> {
        self.params
    }

    fn params_addr(&self) -> u8 {
        Register::msynth_params(self.ms.ix())
    }
}

impl ClockNode for Multisynth {
    fn name(&self) -> &'static str {
        const NAMES: [&str; 8] = ["ms0", "ms1", "ms2", "ms3", "ms4", "ms5", "ms6", "ms7"];
        NAMES[self.ms.ix() as usize]
    }

    fn rate_parent(&self) -> bool {
        self.pll_master
    }

    fn recalc_rate<R: RegisterAccess>(&mut self, regs: &mut R, parent_rate: u32) -> Result<u32, Error> {
        let integer_only = self.ms.is_integer_only();
        let params = match self.params {
            Some(params) => params,
            None => {
                let params = Parameters::read(regs, self.params_addr(), integer_only)?;
                self.params = Some(params);
                params
            }
        };

        if params.p3 == 0 {
            return Ok(parent_rate);
        }

        let divby4 = OutputDividerBits::DIVBY4.bits();
        let rate = if integer_only {
            // fOUT = fIN / P1
            if params.p1 == 0 {
                0
            } else {
                parent_rate / params.p1
            }
        } else if regs.read(self.params_addr() + 2)? & divby4 == divby4 {
            parent_rate / 4
        } else {
            // fOUT = (128 * P3 * fIN) / (P1*P3 + P2 + 512*P3)
            let (num, denom) = params.ratio();
            (parent_rate as u64 * denom / num) as u32
        };

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
        let (rate, divider) = round(self.ms, self.pll_master, rate, parent_rate);
        debug!(
            "{}: divider = {:?}, parent_rate = {}, rate = {}",
            self.name(),
            divider,
            parent_rate,
            rate
        );
        Ok(rate)
    }

    fn set_rate<R: RegisterAccess>(&mut self, regs: &mut R, rate: u32, parent_rate: u32) -> Result<(), Error> {
        let integer_only = self.ms.is_integer_only();
        let rate = rate.min(self.ms.max_msynth_freq()).max(MULTISYNTH_MIN_FREQ);
        let divby4 = rate > MULTISYNTH_DIVBY4_FREQ;

        let (params, int_mode) = if divby4 {
            (Parameters::DIVBY4, true)
        } else {
            let ratio = fixed_parent_ratio(self.ms, rate, parent_rate);
            if integer_only {
                (Parameters::integer_only(ratio.a), true)
            } else {
                (Parameters::from(ratio), ratio.is_integer())
            }
        };

        params.write(regs, self.params_addr(), integer_only)?;
        self.params = None;

        if !integer_only {
            let mask = OutputDividerBits::DIVBY4.bits();
            regs.set_bits(self.params_addr() + 2, mask, if divby4 { mask } else { 0 })?;

            let mask = ClockControlBits::MS_INT.bits();
            regs.set_bits(
                Register::clk_ctrl(self.ms.ix()),
                mask,
                if int_mode { mask } else { 0 },
            )?;
        }

        debug!(
            "{}: p1 = {}, p2 = {}, p3 = {}, divby4 = {}, parent_rate = {}, rate = {}",
            self.name(),
            params.p1,
            params.p2,
            params.p3,
            divby4,
            parent_rate,
            rate
        );

        Ok(())
    }

    fn get_parent<R: RegisterAccess>(&mut self, regs: &mut R) -> Result<u8, Error> {
        let val = regs.read(Register::clk_ctrl(self.ms.ix()))?;
        Ok(if val & ClockControlBits::MS_SRC.bits() != 0 { 1 } else { 0 })
    }

    fn set_parent<R: RegisterAccess>(&mut self, regs: &mut R, index: u8) -> Result<(), Error> {
        if index > 1 {
            return Err(Error::InvalidArgument);
        }

        let mask = ClockControlBits::MS_SRC.bits();
        regs.set_bits(
            Register::clk_ctrl(self.ms.ix()),
            mask,
            if index == 1 { mask } else { 0 },
        )
    }
}
