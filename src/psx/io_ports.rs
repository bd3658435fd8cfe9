//! Expansion region 2: the I/O port window, home of the POST display and
//! the debug UART on development hardware. Retail units have nothing
//! fitted, so reads float and writes only feed the log.

use log::debug;

use crate::savestate::{SaveState, Snapshot};
use crate::Result;

/// Seven-segment POST display register.
const POST: u32 = 0x41;

pub struct IoPorts {
    post: u8,
}

impl IoPorts {
    pub fn new() -> IoPorts {
        IoPorts { post: 0 }
    }

    pub fn reset(&mut self) {
        self.post = 0;
    }

    pub fn load(&self, _offset: u32) -> u32 {
        0
    }

    pub fn store(&mut self, offset: u32, value: u32) {
        match offset {
            POST => {
                debug!("BIOS POST 0x{:x}", value & 0xf);
                self.post = value as u8;
            }
            _ => debug!("I/O port write at +0x{:x} = 0x{:08x}", offset, value),
        }
    }
}

impl Snapshot for IoPorts {
    fn serialize(&self, state: &mut SaveState) {
        state.put_u8(self.post);
    }

    fn deserialize(&mut self, state: &mut SaveState) -> Result<()> {
        self.post = state.take_u8()?;

        Ok(())
    }
}
