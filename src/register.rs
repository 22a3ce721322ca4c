/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! Register map

/// Highest register address on the device
pub const MAX_REGISTER: u8 = 187;

/// Length of a fractional divider parameter block
pub const PARAMETERS_LENGTH: u8 = 8;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Register {
    DeviceStatus = 0,
    InterruptStatus = 1,
    InterruptMask = 2,
    OutputEnable = 3,
    PllInputSource = 15,
    Clk0 = 16,
    Clk1 = 17,
    Clk2 = 18,
    Clk3 = 19,
    Clk4 = 20,
    Clk5 = 21,
    Clk6 = 22,
    Clk7 = 23,
    Clk3_0DisableState = 24,
    Clk7_4DisableState = 25,
    PllAParameters = 26,
    PllBParameters = 34,
    Clk0Parameters = 42,
    Clk6Parameters = 90,
    Clk7Parameters = 91,
    Clk6_7OutputDivider = 92,
    PllReset = 177,
    CrystalLoad = 183,
    FanoutEnable = 187,
}

impl Register {
    pub fn addr(&self) -> u8 {
        *self as u8
    }

    /// Clock control register of output `ix`
    pub fn clk_ctrl(ix: u8) -> u8 {
        Register::Clk0.addr() + ix
    }

    /// First parameter register of output multisynth `ix`
    pub fn msynth_params(ix: u8) -> u8 {
        match ix {
            6 => Register::Clk6Parameters.addr(),
            7 => Register::Clk7Parameters.addr(),
            _ => Register::Clk0Parameters.addr() + PARAMETERS_LENGTH * ix,
        }
    }

    /// Registers the host can't write: reserved ranges and device status.
    pub fn is_writeable(addr: u8) -> bool {
        match addr {
            0 | 4..=8 | 10..=14 | 173..=176 | 178..=182 => false,
            _ => addr <= MAX_REGISTER,
        }
    }

    /// Registers the device changes on its own, or that self-clear.
    pub fn is_volatile(addr: u8) -> bool {
        addr == Register::DeviceStatus.addr()
            || addr == Register::InterruptStatus.addr()
            || addr == Register::PllReset.addr()
    }
}

bitflags! {
    pub struct DeviceStatusBits: u8 {
        const SYS_INIT = 0b1000_0000;
        const LOL_B = 0b0100_0000;
        const LOL_A = 0b0010_0000;
        const LOS = 0b0001_0000;
    }
}

bitflags! {
    pub struct PllInputSourceBits: u8 {
        const CLKIN_DIV_MASK = 0b1100_0000;
        const CLKIN_DIV_1 = 0b0000_0000;
        const CLKIN_DIV_2 = 0b0100_0000;
        const CLKIN_DIV_4 = 0b1000_0000;
        const CLKIN_DIV_8 = 0b1100_0000;
        const PLLB_SRC = 0b0000_1000;
        const PLLA_SRC = 0b0000_0100;
    }
}

bitflags! {
    pub struct CrystalLoadBits: u8 {
        const RESERVED = 0b00_010010;
        const CL_MASK = 0b11_000000;
        const CL_6 = 0b01_000000;
        const CL_8 = 0b10_000000;
        const CL_10 = 0b11_000000;
    }
}

bitflags! {
    pub struct ClockControlBits: u8 {
        const CLK_PDN = 0b1000_0000;
        const MS_INT = 0b0100_0000;
        const MS_SRC = 0b0010_0000;
        const CLK_INV = 0b0001_0000;
        const CLK_SRC_MASK = 0b0000_1100;
        const CLK_SRC_XTAL = 0b0000_0000;
        const CLK_SRC_CLKIN = 0b0000_0100;
        const CLK_SRC_MS_ALT = 0b0000_1000;
        const CLK_SRC_MS = 0b0000_1100;
        const CLK_DRV_MASK = 0b0000_0011;
        const CLK_DRV_2 = 0b0000_0000;
        const CLK_DRV_4 = 0b0000_0001;
        const CLK_DRV_6 = 0b0000_0010;
        const CLK_DRV_8 = 0b0000_0011;
    }
}

bitflags! {
    /// Third byte of a multisynth parameter block, shared with the R-divider
    pub struct OutputDividerBits: u8 {
        const R_DIV_MASK = 0b0111_0000;
        const DIVBY4 = 0b0000_1100;
        const P1_HIGH_MASK = 0b0000_0011;
    }
}

bitflags! {
    /// Register 92 packs the R-dividers of outputs 6 and 7
    pub struct Clk67DividerBits: u8 {
        const R7_DIV_MASK = 0b0111_0000;
        const R6_DIV_MASK = 0b0000_0111;
    }
}

bitflags! {
    pub struct PllResetBits: u8 {
        const PLLB_RST = 0b1000_0000;
        const PLLA_RST = 0b0010_0000;
    }
}

bitflags! {
    pub struct FanoutEnableBits: u8 {
        const CLKIN_EN = 0b1000_0000;
        const XTAL_EN = 0b0100_0000;
    }
}

/// Bit position of the R-divider field in `OutputDividerBits` and for output 7
pub const R_DIV_SHIFT: u8 = 4;
