/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! Device context: owns the register map and every clock of the tree

use log::{debug, warn};

use crate::clkout::ClkOut;
use crate::config::Config;
use crate::constants::ADDRESS;
use crate::hal::blocking::i2c::{Write, WriteRead};
use crate::input::{Clkin, Vcxo, Xtal};
use crate::multisynth::Multisynth;
use crate::node::{ClockId, ClockNode};
use crate::pll::Pll;
use crate::register::{ClockControlBits, CrystalLoadBits, DeviceStatusBits, PllInputSourceBits, Register};
use crate::regmap::{Regmap, RegisterAccess};
use crate::{ClockOutput, CrystalLoad, DriveStrength, Error, Variant, PLL};

/// Output -> multisynth -> PLL -> input is the longest parent chain
const MAX_DEPTH: usize = 4;

/// Runs `$body` with `$node` bound to the node behind `$id`.
macro_rules! with_node {
    ($tree:expr, $id:expr, |$node:ident| $body:expr) => {
        match $id {
            ClockId::Xtal => {
                let $node = &mut $tree.xtal;
                $body
            }
            ClockId::Clkin => {
                let $node = &mut $tree.clkin;
                $body
            }
            ClockId::Vcxo => {
                let $node = &mut $tree.vcxo;
                $body
            }
            ClockId::Pll(pll) => {
                let $node = &mut $tree.pll[pll as usize];
                $body
            }
            ClockId::Multisynth(ms) => {
                let $node = &mut $tree.msynth[ms.ix() as usize];
                $body
            }
            ClockId::Output(clk) => {
                let $node = &mut $tree.clkout[clk.ix() as usize];
                $body
            }
        }
    };
}

struct Tree {
    xtal: Xtal,
    clkin: Clkin,
    vcxo: Vcxo,
    pll: [Pll; 2],
    msynth: [Multisynth; 8],
    clkout: [ClkOut; 8],
}

impl Tree {
    fn new(variant: Variant) -> Self {
        let clk = ClockOutput::ALL;
        Tree {
            xtal: Xtal,
            clkin: Clkin,
            vcxo: Vcxo,
            pll: [Pll::new(PLL::A, variant), Pll::new(PLL::B, variant)],
            msynth: [
                Multisynth::new(clk[0]),
                Multisynth::new(clk[1]),
                Multisynth::new(clk[2]),
                Multisynth::new(clk[3]),
                Multisynth::new(clk[4]),
                Multisynth::new(clk[5]),
                Multisynth::new(clk[6]),
                Multisynth::new(clk[7]),
            ],
            clkout: [
                ClkOut::new(clk[0], variant),
                ClkOut::new(clk[1], variant),
                ClkOut::new(clk[2], variant),
                ClkOut::new(clk[3], variant),
                ClkOut::new(clk[4], variant),
                ClkOut::new(clk[5], variant),
                ClkOut::new(clk[6], variant),
                ClkOut::new(clk[7], variant),
            ],
        }
    }
}

/// Nodes whose rates change in one `set_rate`, leaf first
struct RateChain {
    nodes: [(ClockId, u32); MAX_DEPTH],
    len: usize,
}

impl RateChain {
    fn new() -> Self {
        RateChain {
            nodes: [(ClockId::Xtal, 0); MAX_DEPTH],
            len: 0,
        }
    }

    fn push(&mut self, id: ClockId, rate: u32) -> Result<(), Error> {
        if self.len == MAX_DEPTH {
            return Err(Error::InvalidArgument);
        }
        self.nodes[self.len] = (id, rate);
        self.len += 1;
        Ok(())
    }

    fn leaf_rate(&self) -> u32 {
        self.nodes[0].1
    }

    fn top_down(&self) -> impl Iterator<Item = &(ClockId, u32)> {
        self.nodes[..self.len].iter().rev()
    }
}

/// Si5351 driver
pub struct Si5351Device<I2C> {
    regmap: Regmap<I2C>,
    config: Config,
    tree: Tree,
}

pub trait Si5351 {
    /// Waits for the device to come out of reset, brings it into a known
    /// state and applies the configuration.
    fn init(&mut self) -> Result<(), Error>;
    fn read_device_status(&mut self) -> Result<DeviceStatusBits, Error>;

    /// Current rate of a clock, read back from the device.
    fn rate(&mut self, id: ClockId) -> Result<u32, Error>;
    /// Closest rate to `rate`, assuming every parent that gets retuned
    /// delivers exactly what it is asked for. Doesn't touch the device.
    fn round_rate(&mut self, id: ClockId, rate: u32) -> Result<u32, Error>;
    /// Programs the closest achievable rate. Retunes parents as far up as
    /// their rate-parent flags allow.
    fn set_rate(&mut self, id: ClockId, rate: u32) -> Result<(), Error>;

    /// Currently selected parent, `None` for the inputs.
    fn parent(&mut self, id: ClockId) -> Result<Option<ClockId>, Error>;
    fn set_parent(&mut self, id: ClockId, index: u8) -> Result<(), Error>;

    /// Enables a clock along with everything upstream of it.
    fn prepare(&mut self, id: ClockId) -> Result<(), Error>;
    /// Disables a single clock, parents keep running.
    fn unprepare(&mut self, id: ClockId) -> Result<(), Error>;

    fn set_drive_strength(&mut self, clk: ClockOutput, drive: DriveStrength) -> Result<(), Error>;
    fn set_pll_master(&mut self, ms: ClockOutput, is_master: bool) -> Result<(), Error>;

    /// Applies the configuration options. Options that fail are logged and
    /// skipped, only bus errors abort.
    fn apply_config(&mut self) -> Result<(), Error>;
}

impl<I2C, E> Si5351Device<I2C>
where
    I2C: WriteRead<Error = E> + Write<Error = E>,
{
    /// Creates a new driver from a I2C peripheral
    pub fn new(i2c: I2C, address_bit: bool, config: Config) -> Self {
        let address = ADDRESS | if address_bit { 1 } else { 0 };

        Si5351Device {
            regmap: Regmap::new(i2c, address),
            config,
            tree: Tree::new(config.variant),
        }
    }

    pub fn new_adafruit_module(i2c: I2C) -> Self {
        Si5351Device::new(i2c, false, Config::adafruit_module())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Destroys the driver and hands back the I2C peripheral
    pub fn release(self) -> I2C {
        self.regmap.release()
    }

    fn check(&self, id: ClockId) -> Result<(), Error> {
        let variant = self.config.variant;
        let exists = match id {
            ClockId::Xtal => true,
            ClockId::Clkin => variant.has_clkin(),
            ClockId::Vcxo => variant.has_vcxo(),
            ClockId::Pll(PLL::A) => true,
            ClockId::Pll(PLL::B) => variant.has_pll_b(),
            ClockId::Multisynth(clk) | ClockId::Output(clk) => clk.ix() < variant.num_outputs(),
        };
        if exists {
            Ok(())
        } else {
            Err(Error::InvalidArgument)
        }
    }

    fn name(&mut self, id: ClockId) -> &'static str {
        with_node!(self.tree, id, |node| node.name())
    }

    fn parent_of(&mut self, id: ClockId) -> Result<Option<ClockId>, Error> {
        self.check(id)?;
        let regs = &mut self.regmap;
        let index = with_node!(self.tree, id, |node| node.get_parent(regs))?;

        let parent = match id {
            ClockId::Xtal | ClockId::Clkin | ClockId::Vcxo => return Ok(None),
            ClockId::Pll(_) => match index {
                0 => ClockId::Xtal,
                _ => ClockId::Clkin,
            },
            ClockId::Multisynth(_) => match index {
                0 => ClockId::Pll(PLL::A),
                _ if self.config.variant.has_vcxo() => ClockId::Vcxo,
                _ => ClockId::Pll(PLL::B),
            },
            ClockId::Output(clk) => match index {
                0 => ClockId::Multisynth(clk),
                1 if clk.ix() < 4 => ClockId::Multisynth(ClockOutput::Clk0),
                1 => ClockId::Multisynth(ClockOutput::Clk4),
                2 => ClockId::Xtal,
                _ => ClockId::Clkin,
            },
        };

        self.check(parent)?;
        Ok(Some(parent))
    }

    /// Rate feeding `id`: the parent's rate, or the external frequency for
    /// the inputs.
    fn input_rate(&mut self, id: ClockId, parent: Option<ClockId>) -> Result<u32, Error> {
        match parent {
            Some(parent) => self.recalc(parent),
            None => Ok(match id {
                ClockId::Xtal => self.config.xtal_freq,
                ClockId::Clkin => self.config.clkin_freq.unwrap_or(0),
                _ => 0,
            }),
        }
    }

    fn recalc(&mut self, id: ClockId) -> Result<u32, Error> {
        let parent = self.parent_of(id)?;
        let parent_rate = self.input_rate(id, parent)?;
        let regs = &mut self.regmap;
        with_node!(self.tree, id, |node| node.recalc_rate(regs, parent_rate))
    }

    /// Rounds `rate` at `id`, then keeps going upward while the node may
    /// retune its parent and wants a different parent rate.
    fn calc_new_rates(&mut self, id: ClockId, rate: u32) -> Result<RateChain, Error> {
        let mut chain = RateChain::new();
        let mut id = id;
        let mut rate = rate;

        loop {
            let parent = self.parent_of(id)?;
            let current = self.input_rate(id, parent)?;
            let mut parent_rate = current;
            let (new_rate, rate_parent) = with_node!(self.tree, id, |node| (
                node.round_rate(rate, &mut parent_rate)?,
                node.rate_parent()
            ));
            chain.push(id, new_rate)?;

            match parent {
                Some(parent) if rate_parent && parent_rate != current => {
                    id = parent;
                    rate = parent_rate;
                }
                _ => break,
            }
        }

        Ok(chain)
    }
}

impl<I2C, E> Si5351 for Si5351Device<I2C>
where
    I2C: WriteRead<Error = E> + Write<Error = E>,
{
    fn init(&mut self) -> Result<(), Error> {
        loop {
            let device_status = self.read_device_status()?;
            if !device_status.contains(DeviceStatusBits::SYS_INIT) {
                break;
            }
        }

        // mask all interrupts, disabled outputs drive low
        self.regmap.write(Register::InterruptMask.addr(), 0xF0)?;
        self.regmap.write(Register::Clk3_0DisableState.addr(), 0x00)?;
        self.regmap.write(Register::Clk7_4DisableState.addr(), 0x00)?;

        if !self.config.variant.has_clkin() {
            let mask = (PllInputSourceBits::PLLA_SRC | PllInputSourceBits::PLLB_SRC).bits();
            self.regmap.set_bits(Register::PllInputSource.addr(), mask, 0)?;
        }

        self.regmap.write(Register::OutputEnable.addr(), 0xFF)?;
        let pdn = ClockControlBits::CLK_PDN.bits();
        for clk in ClockOutput::ALL.iter() {
            self.regmap.set_bits(Register::clk_ctrl(clk.ix()), pdn, pdn)?;
        }

        let load = match self.config.crystal_load {
            CrystalLoad::_6 => CrystalLoadBits::CL_6,
            CrystalLoad::_8 => CrystalLoadBits::CL_8,
            CrystalLoad::_10 => CrystalLoadBits::CL_10,
        };
        self.regmap.write(
            Register::CrystalLoad.addr(),
            (CrystalLoadBits::RESERVED | load).bits(),
        )?;

        self.apply_config()?;
        debug!("si5351 at {:#04x} initialized", self.regmap.address());
        Ok(())
    }

    fn read_device_status(&mut self) -> Result<DeviceStatusBits, Error> {
        let status = self.regmap.read(Register::DeviceStatus.addr())?;
        Ok(DeviceStatusBits::from_bits_truncate(status))
    }

    fn rate(&mut self, id: ClockId) -> Result<u32, Error> {
        self.recalc(id)
    }

    fn round_rate(&mut self, id: ClockId, rate: u32) -> Result<u32, Error> {
        Ok(self.calc_new_rates(id, rate)?.leaf_rate())
    }

    fn set_rate(&mut self, id: ClockId, rate: u32) -> Result<(), Error> {
        let chain = self.calc_new_rates(id, rate)?;

        for &(id, new_rate) in chain.top_down() {
            let parent = self.parent_of(id)?;
            let parent_rate = self.input_rate(id, parent)?;
            let regs = &mut self.regmap;
            with_node!(self.tree, id, |node| node.set_rate(regs, new_rate, parent_rate))?;
        }

        Ok(())
    }

    fn parent(&mut self, id: ClockId) -> Result<Option<ClockId>, Error> {
        self.parent_of(id)
    }

    fn set_parent(&mut self, id: ClockId, index: u8) -> Result<(), Error> {
        self.check(id)?;
        let regs = &mut self.regmap;
        with_node!(self.tree, id, |node| node.set_parent(regs, index))
    }

    fn prepare(&mut self, id: ClockId) -> Result<(), Error> {
        if let Some(parent) = self.parent_of(id)? {
            self.prepare(parent)?;
        }
        let regs = &mut self.regmap;
        with_node!(self.tree, id, |node| node.prepare(regs))
    }

    fn unprepare(&mut self, id: ClockId) -> Result<(), Error> {
        self.check(id)?;
        let regs = &mut self.regmap;
        with_node!(self.tree, id, |node| node.unprepare(regs))
    }

    fn set_drive_strength(&mut self, clk: ClockOutput, drive: DriveStrength) -> Result<(), Error> {
        self.check(ClockId::Output(clk))?;
        self.tree.clkout[clk.ix() as usize].set_drive_strength(&mut self.regmap, drive)
    }

    fn set_pll_master(&mut self, ms: ClockOutput, is_master: bool) -> Result<(), Error> {
        self.check(ClockId::Multisynth(ms))?;
        self.tree.msynth[ms.ix() as usize].set_pll_master(is_master);
        Ok(())
    }

    fn apply_config(&mut self) -> Result<(), Error> {
        let config = self.config;

        for (&pll, source) in [PLL::A, PLL::B].iter().zip(config.pll_source.iter()) {
            if let Some(source) = *source {
                let id = ClockId::Pll(pll);
                skip_invalid(self.set_parent(id, source), || {
                    warn!("unable to reparent pll {:?} to {}", pll, source)
                })?;
            }
        }

        for &clk in ClockOutput::ALL[..config.variant.num_outputs() as usize].iter() {
            let output = config.outputs[clk.ix() as usize];
            let ms = ClockId::Multisynth(clk);
            let out = ClockId::Output(clk);

            if output.pll_master {
                self.set_pll_master(clk, true)?;
            }

            if let Some(ma) = output.drive_strength {
                let result = DriveStrength::from_milliamps(ma)
                    .and_then(|drive| self.set_drive_strength(clk, drive));
                skip_invalid(result, || {
                    warn!("unable to set drive strength of {} to {}", clk.ix(), ma)
                })?;
            }

            if let Some(source) = output.multisynth_source {
                let result = self.set_parent(ms, source);
                let name = self.name(ms);
                skip_invalid(result, || warn!("unable to reparent {} to {}", name, source))?;
            }

            if let Some(source) = output.clock_source {
                let result = self.set_parent(out, source);
                let name = self.name(out);
                skip_invalid(result, || warn!("unable to reparent {} to {}", name, source))?;
            }

            if let Some(freq) = output.clock_frequency {
                let result = self.set_rate(out, freq).and_then(|_| self.prepare(out));
                let name = self.name(out);
                skip_invalid(result, || warn!("unable to set {} to {} Hz", name, freq))?;
            }
        }

        Ok(())
    }
}

/// Logs and swallows everything but bus errors.
fn skip_invalid<F: FnOnce()>(result: Result<(), Error>, log: F) -> Result<(), Error> {
    match result {
        Err(Error::BusError) => Err(Error::BusError),
        Err(_) => {
            log();
            Ok(())
        }
        Ok(()) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputConfig;
    use crate::mock::FakeI2c;

    fn device(config: Config) -> Si5351Device<FakeI2c> {
        Si5351Device::new(FakeI2c::new(), false, config)
    }

    #[test]
    fn missing_nodes_are_rejected() {
        let mut dev = device(Config::new(Variant::A3, 25_000_000));
        assert_eq!(dev.rate(ClockId::Output(ClockOutput::Clk3)), Err(Error::InvalidArgument));
        assert_eq!(dev.set_rate(ClockId::Multisynth(ClockOutput::Clk7), 1_000_000), Err(Error::InvalidArgument));
        assert_eq!(dev.prepare(ClockId::Clkin), Err(Error::InvalidArgument));
        assert_eq!(dev.rate(ClockId::Vcxo), Err(Error::InvalidArgument));
        assert!(dev.rate(ClockId::Output(ClockOutput::Clk2)).is_ok());

        let mut dev = device(Config::new(Variant::B, 25_000_000));
        assert_eq!(dev.rate(ClockId::Pll(PLL::B)), Err(Error::InvalidArgument));
        assert_eq!(dev.rate(ClockId::Vcxo), Ok(0));
    }

    #[test]
    fn parents_follow_the_mux_registers() {
        let mut dev = device(Config::new(Variant::B, 25_000_000));
        let ms5 = ClockId::Multisynth(ClockOutput::Clk5);
        let clk5 = ClockId::Output(ClockOutput::Clk5);

        assert_eq!(dev.parent(ClockId::Pll(PLL::A)), Ok(Some(ClockId::Xtal)));
        assert_eq!(dev.parent(ms5), Ok(Some(ClockId::Pll(PLL::A))));
        dev.set_parent(ms5, 1).unwrap();
        assert_eq!(dev.parent(ms5), Ok(Some(ClockId::Vcxo)));

        dev.set_parent(clk5, 0).unwrap();
        assert_eq!(dev.parent(clk5), Ok(Some(ms5)));
        dev.set_parent(clk5, 1).unwrap();
        assert_eq!(dev.parent(clk5), Ok(Some(ClockId::Multisynth(ClockOutput::Clk4))));
        dev.set_parent(clk5, 2).unwrap();
        assert_eq!(dev.parent(clk5), Ok(Some(ClockId::Xtal)));
        assert_eq!(dev.parent(ClockId::Xtal), Ok(None));
    }

    #[test]
    fn round_rate_leaves_the_device_alone() {
        let mut dev = device(Config::adafruit_module());
        dev.set_pll_master(ClockOutput::Clk0, true).unwrap();
        dev.set_parent(ClockId::Output(ClockOutput::Clk0), 0).unwrap();
        let writes = dev.regmap.bus().writes;

        assert_eq!(dev.round_rate(ClockId::Output(ClockOutput::Clk0), 10_000), Ok(10_000));
        assert_eq!(dev.regmap.bus().writes, writes);
    }

    #[test]
    fn rate_chain_stops_at_fixed_parent() {
        let mut dev = device(Config::adafruit_module());
        let chain = dev
            .calc_new_rates(ClockId::Output(ClockOutput::Clk1), 1_000_000)
            .unwrap();
        assert_eq!(chain.len, 1);

        dev.set_pll_master(ClockOutput::Clk1, true).unwrap();
        dev.set_parent(ClockId::Output(ClockOutput::Clk1), 0).unwrap();
        let chain = dev
            .calc_new_rates(ClockId::Output(ClockOutput::Clk1), 1_000_000)
            .unwrap();
        assert_eq!(chain.len, 3);
        assert_eq!(chain.nodes[2], (ClockId::Pll(PLL::A), 900_000_000));
    }

    #[test]
    fn bus_errors_abort_config() {
        assert_eq!(skip_invalid(Err(Error::InvalidArgument), || ()), Ok(()));
        assert_eq!(skip_invalid(Err(Error::Unsupported), || ()), Ok(()));
        assert_eq!(skip_invalid(Err(Error::BusError), || ()), Err(Error::BusError));

        let config = Config::adafruit_module().output(
            ClockOutput::Clk0,
            OutputConfig {
                drive_strength: Some(3),
                ..OutputConfig::default()
            },
        );
        let mut dev = device(config);
        assert_eq!(dev.apply_config(), Ok(()));
    }
}
