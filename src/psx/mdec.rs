//! Video decoder, reduced to its register surface. Macroblock decode is
//! external; commands latch and the status register always reports an idle,
//! ready engine.

use log::debug;

use crate::savestate::{SaveState, Snapshot};
use crate::Result;

/// Idle status: data-out request clear, data-in request set, no words
/// remaining.
const STATUS_IDLE: u32 = 0x8004_0000;

pub struct Mdec {
    command: u32,
    control: u32,
}

impl Mdec {
    pub fn new() -> Mdec {
        Mdec {
            command: 0,
            control: 0,
        }
    }

    pub fn reset(&mut self) {
        self.command = 0;
        self.control = 0;
    }

    pub fn load(&self, offset: u32) -> u32 {
        match offset {
            // Data/response port: nothing to stream out in this model
            0 => 0,
            4 => STATUS_IDLE,
            _ => panic!("unhandled MDEC read at +0x{:x}", offset),
        }
    }

    pub fn store(&mut self, offset: u32, value: u32) {
        match offset {
            0 => {
                debug!("MDEC command 0x{:08x}", value);
                self.command = value;
            }
            4 => {
                // Reset bit clears the command latch
                if value & (1 << 31) != 0 {
                    self.command = 0;
                }
                self.control = value;
            }
            _ => panic!("unhandled MDEC write at +0x{:x} = 0x{:08x}", offset, value),
        }
    }
}

impl Snapshot for Mdec {
    fn serialize(&self, state: &mut SaveState) {
        state.put_u32(self.command);
        state.put_u32(self.control);
    }

    fn deserialize(&mut self, state: &mut SaveState) -> Result<()> {
        self.command = state.take_u32()?;
        self.control = state.take_u32()?;

        Ok(())
    }
}
