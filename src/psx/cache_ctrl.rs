//! Cache control register window in KSEG2. The instruction cache itself is
//! not emulated; the register is a latch so BIOS cache setup sequences read
//! back what they wrote.

use log::debug;

use super::Addressable;
use crate::savestate::{SaveState, Snapshot};
use crate::Result;

/// Offset of the cache control register within the window.
const CACHE_CONTROL: u32 = 0x130;

pub struct CacheCtrl {
    control: u32,
}

impl CacheCtrl {
    pub fn new() -> CacheCtrl {
        CacheCtrl { control: 0 }
    }

    pub fn reset(&mut self) {
        self.control = 0;
    }

    pub fn load<T: Addressable>(&self, offset: u32) -> T {
        match offset & !3 {
            CACHE_CONTROL => T::from_u32(self.control >> ((offset & 3) * 8)),
            _ => {
                debug!("cache control read at +0x{:x}", offset);
                T::from_u32(0)
            }
        }
    }

    pub fn store<T: Addressable>(&mut self, offset: u32, value: T) {
        match offset & !3 {
            CACHE_CONTROL => self.control = value.as_u32() << ((offset & 3) * 8),
            _ => debug!(
                "cache control write at +0x{:x} = 0x{:08x}",
                offset,
                value.as_u32()
            ),
        }
    }
}

impl Snapshot for CacheCtrl {
    fn serialize(&self, state: &mut SaveState) {
        state.put_u32(self.control);
    }

    fn deserialize(&mut self, state: &mut SaveState) -> Result<()> {
        self.control = state.take_u32()?;

        Ok(())
    }
}
