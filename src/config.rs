/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! Board configuration applied by `Si5351::init`

use crate::{ClockOutput, CrystalLoad, Variant, PLL};

/// Per-output options. `None` leaves the power-on setting alone.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct OutputConfig {
    /// The output's multisynth may retune its PLL
    pub pll_master: bool,
    /// Drive strength in mA: 2, 4, 6 or 8
    pub drive_strength: Option<u8>,
    /// 0 for PLL A, 1 for PLL B (or the VCXO)
    pub multisynth_source: Option<u8>,
    /// 0 own multisynth, 1 shared multisynth, 2 crystal, 3 CLKIN
    pub clock_source: Option<u8>,
    /// Initial rate in Hz. The output is enabled after it's set.
    pub clock_frequency: Option<u32>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Config {
    pub variant: Variant,
    /// Crystal frequency in Hz
    pub xtal_freq: u32,
    /// Frequency fed into CLKIN (Si5351C only)
    pub clkin_freq: Option<u32>,
    pub crystal_load: CrystalLoad,
    /// 0 for the crystal, 1 for CLKIN, per PLL
    pub pll_source: [Option<u8>; 2],
    pub outputs: [OutputConfig; 8],
}

impl Config {
    pub fn new(variant: Variant, xtal_freq: u32) -> Self {
        Config {
            variant,
            xtal_freq,
            clkin_freq: None,
            crystal_load: CrystalLoad::_10,
            pll_source: [None; 2],
            outputs: [OutputConfig::default(); 8],
        }
    }

    /// [Adafruit module](https://www.adafruit.com/product/2045): Si5351A
    /// with a 25 MHz crystal and 10 pF load
    pub fn adafruit_module() -> Self {
        Config::new(Variant::A, 25_000_000)
    }

    pub fn clkin(mut self, freq: u32) -> Self {
        self.clkin_freq = Some(freq);
        self
    }

    pub fn crystal_load(mut self, load: CrystalLoad) -> Self {
        self.crystal_load = load;
        self
    }

    pub fn pll_source(mut self, pll: PLL, source: u8) -> Self {
        self.pll_source[pll as usize] = Some(source);
        self
    }

    pub fn output(mut self, clk: ClockOutput, output: OutputConfig) -> Self {
        self.outputs[clk.ix() as usize] = output;
        self
    }
}
