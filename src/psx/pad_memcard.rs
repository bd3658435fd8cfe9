//! Gamepad and memory card port, reduced to its register surface. The
//! serial exchange with actual devices is external; reads of the RX FIFO
//! return the idle line and the status register always reports the
//! transmitter ready.

use super::Addressable;
use crate::savestate::{SaveState, Snapshot};
use crate::Result;

/// TX ready (start and finished) bits of JOY_STAT.
const STAT_TX_READY: u32 = 0x5;

pub struct PadMemCard {
    mode: u16,
    control: u16,
    baud: u16,
}

impl PadMemCard {
    pub fn new() -> PadMemCard {
        PadMemCard {
            mode: 0,
            control: 0,
            baud: 0,
        }
    }

    pub fn reset(&mut self) {
        self.mode = 0;
        self.control = 0;
        self.baud = 0;
    }

    pub fn load<T: Addressable>(&self, offset: u32) -> T {
        let v = match offset {
            // JOY_DATA: no device answering, the line floats high
            0x0 => 0xff,
            0x4 => STAT_TX_READY,
            0x8 => u32::from(self.mode),
            0xa => u32::from(self.control),
            0xe => u32::from(self.baud),
            _ => panic!("unhandled pad/memcard read at +0x{:x}", offset),
        };

        T::from_u32(v)
    }

    pub fn store<T: Addressable>(&mut self, offset: u32, value: T) {
        let v = value.as_u32();

        match offset {
            // TX data is consumed by the external device layer
            0x0 => (),
            0x8 => self.mode = v as u16,
            0xa => self.control = v as u16,
            0xe => self.baud = v as u16,
            _ => panic!("unhandled pad/memcard write at +0x{:x} = 0x{:08x}", offset, v),
        }
    }
}

impl Snapshot for PadMemCard {
    fn serialize(&self, state: &mut SaveState) {
        state.put_u16(self.mode);
        state.put_u16(self.control);
        state.put_u16(self.baud);
    }

    fn deserialize(&mut self, state: &mut SaveState) -> Result<()> {
        self.mode = state.take_u16()?;
        self.control = state.take_u16()?;
        self.baud = state.take_u16()?;

        Ok(())
    }
}
