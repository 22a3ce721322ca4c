/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! Frequency and divider limits

/// Default 7-bit I²C address, the LSB is selected by the A0 pin
pub const ADDRESS: u8 = 0b0110_0000;

/// Minimum VCO frequency
pub const PLL_VCO_MIN: u32 = 600_000_000;

/// Maximum VCO frequency
pub const PLL_VCO_MAX: u32 = 900_000_000;

/// Feedback multisynth integer part, `15 + 0/1048575 <= a + b/c <= 90 + 0/1048575`
pub const PLL_A_MIN: u32 = 15;
pub const PLL_A_MAX: u32 = 90;
pub const PLL_C_MAX: u32 = 1_048_575;
pub const PLL_B_MAX: u32 = PLL_C_MAX - 1;

pub const MULTISYNTH_MIN_FREQ: u32 = 1_000_000;

/// Above this output frequency the multisynth has to run in divide-by-4 mode
pub const MULTISYNTH_DIVBY4_FREQ: u32 = 150_000_000;
pub const MULTISYNTH_MAX_FREQ: u32 = 160_000_000;

/// Multisynth 6 and 7 can't do divide-by-4
pub const MULTISYNTH67_MAX_FREQ: u32 = MULTISYNTH_DIVBY4_FREQ;

pub const MULTISYNTH_A_MIN: u32 = 6;
pub const MULTISYNTH_A_MAX: u32 = 1800;
pub const MULTISYNTH67_A_MAX: u32 = 254;
pub const MULTISYNTH_C_MAX: u32 = 1_048_575;
pub const MULTISYNTH_B_MAX: u32 = MULTISYNTH_C_MAX - 1;

pub const CLKOUT_MIN_FREQ: u32 = 8_000;
pub const CLKOUT_MAX_FREQ: u32 = MULTISYNTH_MAX_FREQ;
pub const CLKOUT67_MAX_FREQ: u32 = MULTISYNTH67_MAX_FREQ;

/// PLL input must not exceed this, faster CLKIN signals get pre-divided
pub const CLKIN_PLL_INPUT_MAX: u32 = 40_000_000;

/// Denominator used to express fractional remainders in parts-per-million
pub const PPM: u32 = 1_000_000;

/// Widest R-divider shift, divide by 128
pub const RDIV_MAX_SHIFT: u8 = 7;
