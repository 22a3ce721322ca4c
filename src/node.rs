/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! Clock tree nodes

use crate::regmap::RegisterAccess;
use crate::{ClockOutput, Error, PLL};

/// Every clock inside the device.
///
/// Multisynth `n` always feeds output `n` (or a neighbour through the
/// shared multisynth path), so both are indexed by `ClockOutput`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClockId {
    Xtal,
    Clkin,
    Pll(PLL),
    /// Takes the place of PLL B on the Si5351B
    Vcxo,
    Multisynth(ClockOutput),
    Output(ClockOutput),
}

/// Operations a clock supports.
///
/// Rates are in Hz. `parent_rate` is always the current rate of the node's
/// selected parent; nodes never look up their parents themselves.
pub trait ClockNode {
    fn name(&self) -> &'static str;

    /// Whether a rate request on this node may change its parent's rate.
    fn rate_parent(&self) -> bool {
        false
    }

    fn recalc_rate<R: RegisterAccess>(&mut self, _regs: &mut R, parent_rate: u32) -> Result<u32, Error> {
        Ok(parent_rate)
    }

    /// Closest rate the node can produce. Rate-parent nodes may rewrite
    /// `parent_rate` with the parent rate they'd like to have.
    fn round_rate(&self, _rate: u32, parent_rate: &mut u32) -> Result<u32, Error> {
        Ok(*parent_rate)
    }

    fn set_rate<R: RegisterAccess>(&mut self, _regs: &mut R, _rate: u32, _parent_rate: u32) -> Result<(), Error> {
        Ok(())
    }

    fn get_parent<R: RegisterAccess>(&mut self, _regs: &mut R) -> Result<u8, Error> {
        Ok(0)
    }

    fn set_parent<R: RegisterAccess>(&mut self, _regs: &mut R, index: u8) -> Result<(), Error> {
        if index == 0 {
            Ok(())
        } else {
            Err(Error::InvalidArgument)
        }
    }

    fn prepare<R: RegisterAccess>(&mut self, _regs: &mut R) -> Result<(), Error> {
        Ok(())
    }

    fn unprepare<R: RegisterAccess>(&mut self, _regs: &mut R) -> Result<(), Error> {
        Ok(())
    }
}
