/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
/*!
A platform agnostic clock-tree driver for the [Si5351], based on the
[`embedded-hal`] traits.

## The Device

The Silicon Labs [Si5351] is an any-frequency CMOS clock generator. Every
part has an I²C interface and comes in four flavours:

- Si5351A: crystal input, two PLLs, eight outputs (three on the MSOP-10 package)
- Si5351B: like the A, with a VCXO in place of PLL B
- Si5351C: like the A, with an additional CLKIN input

## The clock tree

```text
xtal ──┬── plla ──┬── ms0..ms7 ── R-divider ── clk0..clk7
clkin ─┴── pllb ──┘
```

Every box is a node addressed by [`ClockId`]. The driver picks divider
coefficients for a requested rate, programs them and reads the achieved rate
back from the registers. A multisynth marked as PLL master retunes its PLL,
and an output sourced from its own multisynth retunes the multisynth, so a
single `set_rate` on an output can reprogram the whole path.

## Usage

Instantiate the device with its board configuration:

```ignore
use si5351_synth::{ClockId, ClockOutput, Config, OutputConfig, Si5351, Si5351Device, Variant};

let config = Config::new(Variant::A, 25_000_000).output(
    ClockOutput::Clk0,
    OutputConfig {
        pll_master: true,
        clock_source: Some(0),
        ..OutputConfig::default()
    },
);
let mut clock = Si5351Device::new(i2c, false, config);
clock.init()?;
```

Or, if you have an [Adafruit module], use the shortcut:

```ignore
let mut clock = Si5351Device::new_adafruit_module(i2c);
clock.init()?;
```

Then set a rate on one of the outputs and enable it:

```ignore
clock.set_rate(ClockId::Output(ClockOutput::Clk0), 14_175_000)?;
clock.prepare(ClockId::Output(ClockOutput::Clk0))?;
assert_eq!(clock.rate(ClockId::Output(ClockOutput::Clk0))?, 14_175_000);
```

Rate calculations and register writes are logged through the [`log`] facade.

[Si5351]: https://www.silabs.com/documents/public/data-sheets/Si5351-B.pdf
[`embedded-hal`]: https://github.com/japaric/embedded-hal
[Adafruit module]: https://www.adafruit.com/product/2045
[`log`]: https://docs.rs/log
*/
#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate bitflags;
use embedded_hal as hal;

use core::fmt;

mod clkout;
pub mod config;
pub mod constants;
mod device;
mod input;
mod multisynth;
mod node;
pub mod params;
mod pll;
pub mod rational;
pub mod register;
pub mod regmap;

#[cfg(test)]
mod mock;

pub use crate::config::{Config, OutputConfig};
pub use crate::device::{Si5351, Si5351Device};
pub use crate::node::ClockId;
pub use crate::register::DeviceStatusBits;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error {
    /// Out-of-range parameter, or a clock the part doesn't have
    InvalidArgument,
    /// I²C transaction failed
    BusError,
    /// Valid request the part can't honour
    Unsupported,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::InvalidArgument => f.write_str("invalid argument"),
            Error::BusError => f.write_str("I2C bus error"),
            Error::Unsupported => f.write_str("unsupported"),
        }
    }
}

pub(crate) fn i2c_error<E>(_: E) -> Error {
    Error::BusError
}

/// Part number suffix
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Variant {
    A,
    /// Si5351A in the MSOP-10 package
    A3,
    B,
    C,
}

impl Variant {
    pub fn num_outputs(&self) -> u8 {
        match *self {
            Variant::A3 => 3,
            _ => 8,
        }
    }

    pub fn has_clkin(&self) -> bool {
        *self == Variant::C
    }

    pub fn has_pll_b(&self) -> bool {
        *self != Variant::B
    }

    pub fn has_vcxo(&self) -> bool {
        *self == Variant::B
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CrystalLoad {
    _6,
    _8,
    _10,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PLL {
    A,
    B,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClockOutput {
    Clk0 = 0,
    Clk1,
    Clk2,
    Clk3,
    Clk4,
    Clk5,
    Clk6,
    Clk7,
}

impl ClockOutput {
    pub const ALL: [ClockOutput; 8] = [
        ClockOutput::Clk0,
        ClockOutput::Clk1,
        ClockOutput::Clk2,
        ClockOutput::Clk3,
        ClockOutput::Clk4,
        ClockOutput::Clk5,
        ClockOutput::Clk6,
        ClockOutput::Clk7,
    ];

    pub fn ix(&self) -> u8 {
        *self as u8
    }

    pub fn from_index(ix: u8) -> Result<Self, Error> {
        ClockOutput::ALL
            .get(ix as usize)
            .cloned()
            .ok_or(Error::InvalidArgument)
    }
}

/// Power-of-two R-divider between a multisynth and its output pin
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OutputDivider {
    Div1 = 0,
    Div2,
    Div4,
    Div8,
    Div16,
    Div32,
    Div64,
    Div128,
}

impl OutputDivider {
    pub fn bits(&self) -> u8 {
        *self as u8
    }

    /// Divider for a 3-bit register field, upper bits are ignored
    pub fn from_shift(shift: u8) -> Self {
        match shift & 0b111 {
            0 => OutputDivider::Div1,
            1 => OutputDivider::Div2,
            2 => OutputDivider::Div4,
            3 => OutputDivider::Div8,
            4 => OutputDivider::Div16,
            5 => OutputDivider::Div32,
            6 => OutputDivider::Div64,
            _ => OutputDivider::Div128,
        }
    }

    pub fn denominator_u8(&self) -> u8 {
        1 << self.bits()
    }
}

/// Output driver strength in mA
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DriveStrength {
    _2,
    _4,
    _6,
    _8,
}

impl DriveStrength {
    pub fn from_milliamps(ma: u8) -> Result<Self, Error> {
        match ma {
            2 => Ok(DriveStrength::_2),
            4 => Ok(DriveStrength::_4),
            6 => Ok(DriveStrength::_6),
            8 => Ok(DriveStrength::_8),
            _ => Err(Error::InvalidArgument),
        }
    }
}
