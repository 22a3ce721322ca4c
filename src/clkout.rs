/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! Output stage: R-divider, source mux, drive strength and enable gate

use log::debug;

use crate::constants::*;
use crate::node::ClockNode;
use crate::register::{
    Clk67DividerBits, ClockControlBits, OutputDividerBits, Register, R_DIV_SHIFT,
};
use crate::regmap::RegisterAccess;
use crate::{ClockOutput, DriveStrength, Error, OutputDivider, Variant};

fn abs_diff(a: u32, b: u32) -> u32 {
    if a > b {
        a - b
    } else {
        b - a
    }
}

/// R-divider whose output lands closest to `rate`.
///
/// Halving is monotonic, so the scan stops as soon as the error grows.
pub fn closest_divider(parent_rate: u32, rate: u32) -> OutputDivider {
    let mut shift = 0;
    let mut new_rate = parent_rate;
    let mut err = abs_diff(new_rate, rate);
    while shift < RDIV_MAX_SHIFT {
        new_rate >>= 1;
        let new_err = abs_diff(new_rate, rate);
        if new_err > err {
            break;
        }
        shift += 1;
        err = new_err;
    }
    OutputDivider::from_shift(shift)
}

impl DriveStrength {
    fn ctrl_bits(&self) -> ClockControlBits {
        match *self {
            DriveStrength::_2 => ClockControlBits::CLK_DRV_2,
            DriveStrength::_4 => ClockControlBits::CLK_DRV_4,
            DriveStrength::_6 => ClockControlBits::CLK_DRV_6,
            DriveStrength::_8 => ClockControlBits::CLK_DRV_8,
        }
    }
}

pub struct ClkOut {
    clk: ClockOutput,
    variant: Variant,
    rate_parent: bool,
}

impl ClkOut {
    pub fn new(clk: ClockOutput, variant: Variant) -> Self {
        ClkOut {
            clk,
            variant,
            rate_parent: false,
        }
    }

    fn ctrl_reg(&self) -> u8 {
        Register::clk_ctrl(self.clk.ix())
    }

    fn max_freq(&self) -> u32 {
        if self.clk.is_integer_only() {
            CLKOUT67_MAX_FREQ
        } else {
            CLKOUT_MAX_FREQ
        }
    }

    /// Register and field holding the R-divider of this output.
    fn divider_field(&self) -> (u8, u8, u8) {
        match self.clk {
            ClockOutput::Clk6 => (
                Register::Clk6_7OutputDivider.addr(),
                Clk67DividerBits::R6_DIV_MASK.bits(),
                0,
            ),
            ClockOutput::Clk7 => (
                Register::Clk6_7OutputDivider.addr(),
                Clk67DividerBits::R7_DIV_MASK.bits(),
                R_DIV_SHIFT,
            ),
            _ => (
                Register::msynth_params(self.clk.ix()) + 2,
                OutputDividerBits::R_DIV_MASK.bits(),
                R_DIV_SHIFT,
            ),
        }
    }

    pub fn set_drive_strength<R: RegisterAccess>(&mut self, regs: &mut R, drive: DriveStrength) -> Result<(), Error> {
        regs.set_bits(
            self.ctrl_reg(),
            ClockControlBits::CLK_DRV_MASK.bits(),
            drive.ctrl_bits().bits(),
        )
    }

    pub fn divider<R: RegisterAccess>(&mut self, regs: &mut R) -> Result<OutputDivider, Error> {
        let (reg, mask, shift) = self.divider_field();
        let val = regs.read(reg)?;
        Ok(OutputDivider::from_shift((val & mask) >> shift))
    }
}

impl ClockNode for ClkOut {
    fn name(&self) -> &'static str {
        const NAMES: [&str; 8] = ["clk0", "clk1", "clk2", "clk3", "clk4", "clk5", "clk6", "clk7"];
        NAMES[self.clk.ix() as usize]
    }

    fn rate_parent(&self) -> bool {
        self.rate_parent
    }

    fn recalc_rate<R: RegisterAccess>(&mut self, regs: &mut R, parent_rate: u32) -> Result<u32, Error> {
        let rdiv = self.divider(regs)?;
        Ok(parent_rate >> rdiv.bits())
    }

    fn round_rate(&self, rate: u32, parent_rate: &mut u32) -> Result<u32, Error> {
        let mut rate = rate.min(self.max_freq()).max(CLKOUT_MIN_FREQ);

        let rdiv = if self.rate_parent {
            // multisynths stop at 1 MHz, the R-divider covers the rest
            let mut shift = 0;
            while rate < MULTISYNTH_MIN_FREQ && shift < RDIV_MAX_SHIFT {
                shift += 1;
                rate *= 2;
            }
            *parent_rate = rate;
            OutputDivider::from_shift(shift)
        } else {
            closest_divider(*parent_rate, rate)
        };

        let rate = *parent_rate >> rdiv.bits();
        debug!(
            "{}: rdiv = {}, parent_rate = {}, rate = {}",
            self.name(),
            rdiv.denominator_u8(),
            parent_rate,
            rate
        );
        Ok(rate)
    }

    fn set_rate<R: RegisterAccess>(&mut self, regs: &mut R, rate: u32, parent_rate: u32) -> Result<(), Error> {
        let rdiv = closest_divider(parent_rate, rate);
        let pdn = ClockControlBits::CLK_PDN.bits();
        let was_running = regs.read(self.ctrl_reg())? & pdn == 0;

        regs.set_bits(self.ctrl_reg(), pdn, pdn)?;
        let (reg, mask, shift) = self.divider_field();
        regs.set_bits(reg, mask, rdiv.bits() << shift)?;
        if was_running {
            regs.set_bits(self.ctrl_reg(), pdn, 0)?;
        }

        debug!(
            "{}: rdiv = {}, parent_rate = {}, rate = {}",
            self.name(),
            rdiv.denominator_u8(),
            parent_rate,
            rate
        );
        Ok(())
    }

    /// 0: own multisynth, 1: multisynth 0 or 4, 2: crystal, 3: CLKIN
    fn get_parent<R: RegisterAccess>(&mut self, regs: &mut R) -> Result<u8, Error> {
        let src = ClockControlBits::from_bits_truncate(regs.read(self.ctrl_reg())?)
            & ClockControlBits::CLK_SRC_MASK;
        Ok(if src == ClockControlBits::CLK_SRC_MS {
            0
        } else if src == ClockControlBits::CLK_SRC_MS_ALT {
            1
        } else if src == ClockControlBits::CLK_SRC_XTAL {
            2
        } else {
            3
        })
    }

    fn set_parent<R: RegisterAccess>(&mut self, regs: &mut R, index: u8) -> Result<(), Error> {
        let src = match index {
            0 => ClockControlBits::CLK_SRC_MS,
            // clk0 and clk4 can only reach their own multisynth
            1 if self.clk.ix() == 0 || self.clk.ix() == 4 => ClockControlBits::CLK_SRC_MS,
            1 => ClockControlBits::CLK_SRC_MS_ALT,
            2 => ClockControlBits::CLK_SRC_XTAL,
            3 if self.variant.has_clkin() => ClockControlBits::CLK_SRC_CLKIN,
            _ => return Err(Error::InvalidArgument),
        };

        regs.set_bits(
            self.ctrl_reg(),
            ClockControlBits::CLK_SRC_MASK.bits(),
            src.bits(),
        )?;
        self.rate_parent = index == 0;
        Ok(())
    }

    fn prepare<R: RegisterAccess>(&mut self, regs: &mut R) -> Result<(), Error> {
        regs.set_bits(self.ctrl_reg(), ClockControlBits::CLK_PDN.bits(), 0)?;
        regs.set_bits(Register::OutputEnable.addr(), 1 << self.clk.ix(), 0)
    }

    fn unprepare<R: RegisterAccess>(&mut self, regs: &mut R) -> Result<(), Error> {
        let pdn = ClockControlBits::CLK_PDN.bits();
        regs.set_bits(self.ctrl_reg(), pdn, pdn)?;
        let oeb = 1 << self.clk.ix();
        regs.set_bits(Register::OutputEnable.addr(), oeb, oeb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock;

    #[test]
    fn picks_closest_power_of_two() {
        assert_eq!(closest_divider(100_000_000, 24_000_000), OutputDivider::Div4);
        assert_eq!(closest_divider(100_000_000, 100_000_000), OutputDivider::Div1);
        assert_eq!(closest_divider(100_000_000, 1), OutputDivider::Div128);
        assert_eq!(closest_divider(100_000_000, 40_000_000), OutputDivider::Div2);
        assert_eq!(closest_divider(100_000_000, 37_000_000), OutputDivider::Div4);
    }

    #[test]
    fn closest_divider_matches_exhaustive_search() {
        let parent = 100_000_000;
        let mut rate = 8_000;
        while rate < 160_000_000 {
            let best = (0..=RDIV_MAX_SHIFT)
                .map(|shift| abs_diff(parent >> shift, rate))
                .min()
                .unwrap();
            let picked = closest_divider(parent, rate);
            assert_eq!(abs_diff(parent >> picked.bits(), rate), best, "rate {}", rate);
            rate += 98_765;
        }
    }

    #[test]
    fn rate_parent_doubles_into_multisynth_range() {
        let mut clk = ClkOut::new(ClockOutput::Clk2, Variant::A);
        let mut regs = mock::regmap();
        clk.set_parent(&mut regs, 0).unwrap();
        assert!(clk.rate_parent());

        let mut parent = 0;
        assert_eq!(clk.round_rate(10_000, &mut parent).unwrap(), 10_000);
        assert_eq!(parent, 1_280_000);

        assert_eq!(clk.round_rate(25_000_000, &mut parent).unwrap(), 25_000_000);
        assert_eq!(parent, 25_000_000);

        // clamped to 8 kHz first
        assert_eq!(clk.round_rate(1, &mut parent).unwrap(), 8_000);
        assert_eq!(parent, 1_024_000);
    }

    #[test]
    fn fixed_parent_rounding() {
        let clk = ClkOut::new(ClockOutput::Clk0, Variant::A);
        let mut parent = 100_000_000;
        assert_eq!(clk.round_rate(24_000_000, &mut parent).unwrap(), 25_000_000);
        assert_eq!(parent, 100_000_000);

        let clk = ClkOut::new(ClockOutput::Clk6, Variant::A);
        let mut parent = 155_000_000;
        assert_eq!(clk.round_rate(155_000_000, &mut parent).unwrap(), 155_000_000);
    }

    #[test]
    fn divider_registers() {
        let mut regs = mock::regmap();
        for ix in 0..8 {
            let mut clk = ClkOut::new(ClockOutput::from_index(ix).unwrap(), Variant::A);
            clk.set_rate(&mut regs, 24_000_000, 100_000_000).unwrap();
            assert_eq!(clk.recalc_rate(&mut regs, 100_000_000).unwrap(), 25_000_000);
        }
        assert_eq!(regs.bus().regs[44], 0b0010_0000);
        assert_eq!(regs.bus().regs[84], 0b0010_0000);
        assert_eq!(regs.bus().regs[92], 0b0010_0010);

        let mut clk6 = ClkOut::new(ClockOutput::Clk6, Variant::A);
        clk6.set_rate(&mut regs, 800_000, 100_000_000).unwrap();
        assert_eq!(regs.bus().regs[92], 0b0010_0111);
        assert_eq!(clk6.recalc_rate(&mut regs, 100_000_000).unwrap(), 781_250);
    }

    #[test]
    fn set_rate_keeps_gate_state() {
        let mut regs = mock::regmap();
        let mut clk = ClkOut::new(ClockOutput::Clk1, Variant::A);

        regs.bus().regs[17] = ClockControlBits::CLK_PDN.bits();
        clk.set_rate(&mut regs, 50_000_000, 100_000_000).unwrap();
        assert_eq!(regs.bus().regs[17], ClockControlBits::CLK_PDN.bits());

        clk.prepare(&mut regs).unwrap();
        clk.set_rate(&mut regs, 25_000_000, 100_000_000).unwrap();
        assert_eq!(regs.bus().regs[17], 0);
    }

    #[test]
    fn gate() {
        let mut regs = mock::regmap();
        regs.bus().regs[3] = 0xFF;
        regs.bus().regs[21] = 0x8F;
        let mut clk = ClkOut::new(ClockOutput::Clk5, Variant::A);

        clk.prepare(&mut regs).unwrap();
        assert_eq!(regs.bus().regs[3], 0b1101_1111);
        assert_eq!(regs.bus().regs[21], 0x0F);

        clk.unprepare(&mut regs).unwrap();
        assert_eq!(regs.bus().regs[3], 0xFF);
        assert_eq!(regs.bus().regs[21], 0x8F);
    }

    #[test]
    fn source_mux() {
        let mut regs = mock::regmap();
        let mut clk = ClkOut::new(ClockOutput::Clk3, Variant::A);

        clk.set_parent(&mut regs, 1).unwrap();
        assert!(!clk.rate_parent());
        assert_eq!(clk.get_parent(&mut regs).unwrap(), 1);
        clk.set_parent(&mut regs, 2).unwrap();
        assert_eq!(clk.get_parent(&mut regs).unwrap(), 2);
        assert_eq!(clk.set_parent(&mut regs, 3), Err(Error::InvalidArgument));
        assert_eq!(clk.set_parent(&mut regs, 4), Err(Error::InvalidArgument));
        assert_eq!(clk.get_parent(&mut regs).unwrap(), 2);

        let mut clk = ClkOut::new(ClockOutput::Clk3, Variant::C);
        clk.set_parent(&mut regs, 3).unwrap();
        assert_eq!(clk.get_parent(&mut regs).unwrap(), 3);

        let mut clk = ClkOut::new(ClockOutput::Clk4, Variant::A);
        clk.set_parent(&mut regs, 1).unwrap();
        assert_eq!(clk.get_parent(&mut regs).unwrap(), 0);
        assert!(!clk.rate_parent());
    }

    #[test]
    fn drive_strength() {
        let mut regs = mock::regmap();
        let mut clk = ClkOut::new(ClockOutput::Clk0, Variant::A);
        regs.bus().regs[16] = 0b1000_1100;
        clk.set_drive_strength(&mut regs, DriveStrength::_6).unwrap();
        assert_eq!(regs.bus().regs[16], 0b1000_1110);
    }
}
