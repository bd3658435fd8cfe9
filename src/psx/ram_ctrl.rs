//! RAM-size control register.

use super::Addressable;
use crate::savestate::{SaveState, Snapshot};
use crate::Result;

/// Power-on value: 2MB fitted, 8MB window.
const RESET_VALUE: u32 = 0x0000_0b88;

pub struct RamCtrl {
    ram_size: u32,
}

impl RamCtrl {
    pub fn new() -> RamCtrl {
        RamCtrl {
            ram_size: RESET_VALUE,
        }
    }

    pub fn reset(&mut self) {
        self.ram_size = RESET_VALUE;
    }

    pub fn load<T: Addressable>(&self, offset: u32) -> T {
        T::from_u32(self.ram_size >> ((offset & 3) * 8))
    }

    pub fn store<T: Addressable>(&mut self, offset: u32, value: T) {
        self.ram_size = value.as_u32() << ((offset & 3) * 8);
    }
}

impl Snapshot for RamCtrl {
    fn serialize(&self, state: &mut SaveState) {
        state.put_u32(self.ram_size);
    }

    fn deserialize(&mut self, state: &mut SaveState) -> Result<()> {
        self.ram_size = state.take_u32()?;

        Ok(())
    }
}
