//! Audio processor, reduced to its register file.
//!
//! Mixing, ADPCM decode and reverb are external; the guest-visible surface
//! is a 512-byte bank of 16-bit registers that reads back what was written.
//! The status register mirrors the low bits of the control register the way
//! the hardware does.

use super::{AccessWidth, Addressable};
use crate::savestate::{SaveState, Snapshot};
use crate::Result;

/// Register offsets with non-latch behavior.
const SPUCNT: u32 = 0x1aa;
const SPUSTAT: u32 = 0x1ae;

pub struct Spu {
    registers: [u16; 0x200],
}

impl Spu {
    pub fn new() -> Spu {
        Spu {
            registers: [0; 0x200],
        }
    }

    pub fn reset(&mut self) {
        self.registers = [0; 0x200];
    }

    fn register(&self, offset: u32) -> u16 {
        match offset {
            // SPUSTAT reflects the current mode bits of SPUCNT
            SPUSTAT => self.registers[(SPUCNT >> 1) as usize] & 0x3f,
            _ => self.registers[(offset >> 1) as usize],
        }
    }

    pub fn load<T: Addressable>(&self, offset: u32) -> T {
        let v = match T::width() {
            AccessWidth::Byte => {
                let half = u32::from(self.register(offset & !1));

                (half >> ((offset & 1) * 8)) & 0xff
            }
            AccessWidth::HalfWord => u32::from(self.register(offset)),
            AccessWidth::Word => {
                let lo = u32::from(self.register(offset));
                let hi = u32::from(self.register(offset + 2));

                lo | (hi << 16)
            }
        };

        T::from_u32(v)
    }

    pub fn store<T: Addressable>(&mut self, offset: u32, value: T) {
        let v = value.as_u32();

        match T::width() {
            AccessWidth::Byte => {
                let index = (offset >> 1) as usize;
                let shift = (offset & 1) * 8;
                let kept = self.registers[index] & !(0xff << shift);

                self.registers[index] = kept | ((v as u16 & 0xff) << shift);
            }
            AccessWidth::HalfWord => self.registers[(offset >> 1) as usize] = v as u16,
            AccessWidth::Word => {
                self.registers[(offset >> 1) as usize] = v as u16;
                self.registers[((offset >> 1) + 1) as usize] = (v >> 16) as u16;
            }
        }
    }
}

impl Snapshot for Spu {
    fn serialize(&self, state: &mut SaveState) {
        for &reg in &self.registers {
            state.put_u16(reg);
        }
    }

    fn deserialize(&mut self, state: &mut SaveState) -> Result<()> {
        for reg in &mut self.registers {
            *reg = state.take_u16()?;
        }

        Ok(())
    }
}
