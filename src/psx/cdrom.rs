//! Optical disc controller, reduced to its command/response surface.
//!
//! The sector state machine and disc image handling live outside this
//! crate. What remains is the index/status port, the parameter and response
//! FIFOs and the interrupt handshake, enough for a guest to issue a command
//! and collect the acknowledge.

use arrayvec::ArrayVec;
use log::{debug, warn};

use super::bus::Bus;
use super::irq::{self, Interrupt};
use crate::savestate::{SaveState, Snapshot};
use crate::Result;

/// Drive status byte: motor on, nothing else going on.
const DRIVE_STATUS: u8 = 0x02;

/// Delay between a command write and its acknowledge interrupt, in
/// controller steps.
const ACK_DELAY: u32 = 16;

pub struct CdRom {
    /// Port 0 index selecting the banked registers
    index: u8,
    params: ArrayVec<u8, 16>,
    response: ArrayVec<u8, 16>,
    /// Interrupt enable and flag registers (INT number in the low bits)
    irq_enable: u8,
    irq_flags: u8,
    /// Countdown to the acknowledge of the command in flight
    ack_countdown: u32,
}

impl CdRom {
    pub fn new() -> CdRom {
        CdRom {
            index: 0,
            params: ArrayVec::new(),
            response: ArrayVec::new(),
            irq_enable: 0,
            irq_flags: 0,
            ack_countdown: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = CdRom::new();
    }

    pub fn load(&mut self, offset: u32) -> u8 {
        match (offset, self.index) {
            // Status port: index plus FIFO occupancy bits
            (0, _) => {
                let mut status = self.index;

                // Parameter FIFO empty / not full
                if self.params.is_empty() {
                    status |= 1 << 3;
                }
                if !self.params.is_full() {
                    status |= 1 << 4;
                }
                // Response FIFO not empty
                if !self.response.is_empty() {
                    status |= 1 << 5;
                }

                status
            }
            // Response FIFO
            (1, _) => self.response.pop_at(0).unwrap_or(0),
            // Interrupt enable / flags in bank 1
            (2, 1) => self.irq_enable,
            (3, 1) | (3, 3) => self.irq_flags | 0xe0,
            _ => {
                warn!("CDROM read at +{} index {}", offset, self.index);
                0
            }
        }
    }

    pub fn store(&mut self, offset: u32, value: u8) {
        match (offset, self.index) {
            (0, _) => self.index = value & 3,
            // Command port
            (1, 0) => self.command(value),
            // Parameter FIFO
            (2, 0) => {
                if self.params.try_push(value).is_err() {
                    warn!("CDROM parameter FIFO overflow");
                }
            }
            (2, 1) => self.irq_enable = value & 0x1f,
            // Acknowledge interrupt flags, clearing the response FIFO on
            // request
            (3, 1) => {
                self.irq_flags &= !(value & 0x1f);

                if value & 0x40 != 0 {
                    self.params.clear();
                }
            }
            _ => debug!(
                "CDROM write at +{} index {} = 0x{:02x}",
                offset, self.index, value
            ),
        }
    }

    fn command(&mut self, command: u8) {
        debug!("CDROM command 0x{:02x}", command);

        self.params.clear();
        self.response.clear();

        // Every command acknowledges with the drive status; the real
        // payloads come from the external disc machinery
        self.response.push(DRIVE_STATUS);
        self.ack_countdown = ACK_DELAY;
    }
}

/// Controller step, scaled down from CPU cycles by the bus.
pub fn run(bus: &mut Bus, steps: u32) {
    let cdrom = &mut bus.cdrom;

    if cdrom.ack_countdown == 0 {
        return;
    }

    cdrom.ack_countdown = cdrom.ack_countdown.saturating_sub(steps);

    if cdrom.ack_countdown == 0 {
        // INT3: acknowledge
        cdrom.irq_flags |= 3;

        if cdrom.irq_enable & cdrom.irq_flags != 0 {
            bus.irq.trigger(Interrupt::CdRom);
            irq::refresh_pending(&bus.irq, &mut bus.cop0);
        }
    }
}

impl Snapshot for CdRom {
    fn serialize(&self, state: &mut SaveState) {
        state.put_u8(self.index);
        state.put_u8(self.params.len() as u8);
        for &p in &self.params {
            state.put_u8(p);
        }
        state.put_u8(self.response.len() as u8);
        for &r in &self.response {
            state.put_u8(r);
        }
        state.put_u8(self.irq_enable);
        state.put_u8(self.irq_flags);
        state.put_u32(self.ack_countdown);
    }

    fn deserialize(&mut self, state: &mut SaveState) -> Result<()> {
        self.index = state.take_u8()?;

        self.params.clear();
        let params = state.take_u8()?;
        for _ in 0..params {
            let v = state.take_u8()?;
            let _ = self.params.try_push(v);
        }

        self.response.clear();
        let responses = state.take_u8()?;
        for _ in 0..responses {
            let v = state.take_u8()?;
            let _ = self.response.try_push(v);
        }

        self.irq_enable = state.take_u8()?;
        self.irq_flags = state.take_u8()?;
        self.ack_countdown = state.take_u32()?;

        Ok(())
    }
}
