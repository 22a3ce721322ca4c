/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! Multisynth parameter registers
//!
//! Both feedback and output multisynths are programmed with three values
//! derived from the ratio `a + b/c`:
//!
//! ```text
//! P1[17:0] = 128 * a + floor(128 * b/c) - 512
//! P2[19:0] = 128 * b - c * floor(128 * b/c) = (128 * b) mod c
//! P3[19:0] = c
//! ```
//!
//! which gives back `a + b/c = (P1 * P3 + P2 + 512 * P3) / (128 * P3)`.

use crate::register::{OutputDividerBits, PARAMETERS_LENGTH};
use crate::regmap::RegisterAccess;
use crate::Error;

pub const P1_MAX: u32 = (1 << 18) - 1;
pub const P2_MAX: u32 = (1 << 20) - 1;
pub const P3_MAX: u32 = (1 << 20) - 1;

/// Divider or multiplier ratio `a + b/c`
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Ratio {
    pub a: u32,
    pub b: u32,
    pub c: u32,
}

impl Ratio {
    pub fn integer(a: u32) -> Self {
        Ratio { a, b: 0, c: 1 }
    }

    pub fn is_integer(&self) -> bool {
        self.b == 0
    }

    /// `rate * (a + b/c)`, rounded down
    pub fn multiply(&self, rate: u32) -> u32 {
        let frac = rate as u64 * self.b as u64 / self.c as u64;
        (rate as u64 * self.a as u64 + frac) as u32
    }

    /// `rate / (a + b/c)`, rounded down
    pub fn divide(&self, rate: u32) -> u32 {
        let m = self.a as u64 * self.c as u64 + self.b as u64;
        if m == 0 {
            return 0;
        }
        (rate as u64 * self.c as u64 / m) as u32
    }
}

/// Raw register encoding of a multisynth ratio
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Parameters {
    pub p1: u32,
    pub p2: u32,
    pub p3: u32,
}

impl Parameters {
    /// Parameters for divide-by-4 mode, the ratio is ignored by the hardware
    pub const DIVBY4: Parameters = Parameters { p1: 0, p2: 0, p3: 1 };

    /// Encoding of an integer-only multisynth (6 and 7): P1 is the divisor.
    pub fn integer_only(a: u32) -> Self {
        Parameters { p1: a, p2: 0, p3: 1 }
    }

    /// `a + b/c` numerator and denominator, `(P1*P3 + P2 + 512*P3, 128*P3)`
    pub fn ratio(&self) -> (u64, u64) {
        let p3 = self.p3 as u64;
        (
            self.p1 as u64 * p3 + self.p2 as u64 + 512 * p3,
            128 * p3,
        )
    }

    /// Packs into the 8-byte register block. Byte 2 only carries P1[17:16],
    /// the R-divider and divide-by-4 bits sharing it are left clear.
    pub fn encode(&self) -> [u8; 8] {
        [
            ((self.p3 & 0x0_FF00) >> 8) as u8,
            self.p3 as u8,
            ((self.p1 & 0x3_0000) >> 16) as u8,
            ((self.p1 & 0x0_FF00) >> 8) as u8,
            self.p1 as u8,
            (((self.p3 & 0xF_0000) >> 12) | ((self.p2 & 0xF_0000) >> 16)) as u8,
            ((self.p2 & 0x0_FF00) >> 8) as u8,
            self.p2 as u8,
        ]
    }

    pub fn decode(buf: &[u8; 8]) -> Self {
        Parameters {
            p1: ((buf[2] as u32 & 0x03) << 16) | ((buf[3] as u32) << 8) | buf[4] as u32,
            p2: ((buf[5] as u32 & 0x0F) << 16) | ((buf[6] as u32) << 8) | buf[7] as u32,
            p3: ((buf[5] as u32 & 0xF0) << 12) | ((buf[0] as u32) << 8) | buf[1] as u32,
        }
    }

    /// Reads a parameter block; `integer_only` blocks are a single byte.
    pub fn read<R: RegisterAccess>(regs: &mut R, base: u8, integer_only: bool) -> Result<Self, Error> {
        if integer_only {
            return Ok(Parameters::integer_only(regs.read(base)? as u32));
        }

        let mut buf = [0u8; PARAMETERS_LENGTH as usize];
        regs.bulk_read(base, &mut buf)?;
        Ok(Parameters::decode(&buf))
    }

    /// Writes a parameter block, keeping the R-divider and divide-by-4 bits.
    pub fn write<R: RegisterAccess>(&self, regs: &mut R, base: u8, integer_only: bool) -> Result<(), Error> {
        if integer_only {
            return regs.write(base, self.p1 as u8);
        }

        let mut buf = self.encode();
        let preserved = regs.read(base + 2)? & !OutputDividerBits::P1_HIGH_MASK.bits();
        buf[2] |= preserved;
        regs.bulk_write(base, &buf)
    }
}

impl From<Ratio> for Parameters {
    fn from(ratio: Ratio) -> Self {
        let Ratio { a, b, c } = ratio;
        let frac = 128 * b as u64 / c as u64;
        Parameters {
            p1: (128 * a as u64 + frac - 512) as u32,
            p2: ((128 * b as u64) % c as u64) as u32,
            p3: c,
        }
    }
}
