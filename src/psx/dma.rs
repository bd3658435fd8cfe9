//! DMA controller, reduced to its register surface.
//!
//! Actual block transfers are the business of the external DMA engine; this
//! model latches the per-channel setup, completes "started" channels
//! immediately and runs the interrupt plumbing of the DICR register so that
//! guests waiting on a DMA interrupt make progress.

use log::debug;

use super::bus::Bus;
use super::irq::{self, Interrupt};
use super::Addressable;
use crate::savestate::{SaveState, Snapshot};
use crate::Result;

/// Channel control bits.
const CHCR_ENABLE: u32 = 1 << 24;
const CHCR_TRIGGER: u32 = 1 << 28;

/// DICR layout: per-channel enable in 16..22, master enable bit 23,
/// per-channel flags in 24..30, master flag bit 31.
const DICR_MASTER_ENABLE: u32 = 1 << 23;

#[derive(Debug, Clone, Copy, Default)]
struct Channel {
    base: u32,
    block: u32,
    control: u32,
}

pub struct Dma {
    channels: [Channel; 7],
    /// DPCR, channel priority/enable
    control: u32,
    /// DICR, interrupt enables and flags
    interrupt: u32,
    /// An interrupt edge waiting for the next controller step
    pending_irq: bool,
}

impl Dma {
    pub fn new() -> Dma {
        Dma {
            channels: [Channel::default(); 7],
            control: 0x0765_4321,
            interrupt: 0,
            pending_irq: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Dma::new();
    }

    pub fn load<T: Addressable>(&self, offset: u32) -> T {
        let register = offset & !3;

        let v = match register {
            0x00..=0x6c => {
                let channel = &self.channels[(register >> 4) as usize];

                match register & 0xc {
                    0x0 => channel.base,
                    0x4 => channel.block,
                    _ => channel.control,
                }
            }
            0x70 => self.control,
            0x74 => self.interrupt,
            _ => panic!("unhandled DMA read at +0x{:x}", offset),
        };

        let shift = (offset & 3) * 8;

        T::from_u32(v >> shift)
    }

    pub fn store<T: Addressable>(&mut self, offset: u32, value: T) {
        let register = offset & !3;
        let value = value.as_u32() << ((offset & 3) * 8);

        match register {
            0x00..=0x6c => {
                let index = (register >> 4) as usize;

                match register & 0xc {
                    0x0 => self.channels[index].base = value & 0xff_ffff,
                    0x4 => self.channels[index].block = value,
                    _ => self.set_channel_control(index, value),
                }
            }
            0x70 => self.control = value,
            0x74 => self.set_interrupt(value),
            _ => panic!("unhandled DMA write at +0x{:x} = 0x{:08x}", offset, value),
        }
    }

    /// The transfer itself happens outside this crate, so a started channel
    /// completes instantly: the enable/trigger bits never read back as
    /// busy.
    fn set_channel_control(&mut self, index: usize, value: u32) {
        let started = value & CHCR_ENABLE != 0;

        self.channels[index].control = value & !(CHCR_ENABLE | CHCR_TRIGGER);

        if started {
            debug!("DMA channel {} kicked, completing immediately", index);

            let flag = 1 << (24 + index);
            let enable = 1 << (16 + index);

            if self.interrupt & DICR_MASTER_ENABLE != 0 && self.interrupt & enable != 0 {
                self.interrupt |= flag;
                self.pending_irq = true;
            }
        }
    }

    /// DICR: flag bits acknowledge by writing 1.
    fn set_interrupt(&mut self, value: u32) {
        let ack = value & 0x7f00_0000;

        self.interrupt = (value & 0x00ff_ffff) | (self.interrupt & 0x7f00_0000 & !ack);
    }

    /// Master flag: any enabled channel flag while the master enable is
    /// set.
    fn master_flag(&self) -> bool {
        let flags = (self.interrupt >> 24) & 0x7f;
        let enables = (self.interrupt >> 16) & 0x7f;

        self.interrupt & DICR_MASTER_ENABLE != 0 && flags & enables != 0
    }
}

/// Controller step: surface any pending completion interrupt.
pub fn run(bus: &mut Bus, _steps: u32) {
    if bus.dma.pending_irq {
        bus.dma.pending_irq = false;

        if bus.dma.master_flag() {
            bus.dma.interrupt |= 1 << 31;
            bus.irq.trigger(Interrupt::Dma);
            irq::refresh_pending(&bus.irq, &mut bus.cop0);
        }
    }
}

impl Snapshot for Dma {
    fn serialize(&self, state: &mut SaveState) {
        for channel in &self.channels {
            state.put_u32(channel.base);
            state.put_u32(channel.block);
            state.put_u32(channel.control);
        }
        state.put_u32(self.control);
        state.put_u32(self.interrupt);
        state.put_bool(self.pending_irq);
    }

    fn deserialize(&mut self, state: &mut SaveState) -> Result<()> {
        for channel in &mut self.channels {
            channel.base = state.take_u32()?;
            channel.block = state.take_u32()?;
            channel.control = state.take_u32()?;
        }
        self.control = state.take_u32()?;
        self.interrupt = state.take_u32()?;
        self.pending_irq = state.take_bool()?;

        Ok(())
    }
}
