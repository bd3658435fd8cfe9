//! Interrupt controller.
//!
//! Two 16-bit registers: a status word latching every interrupt request and
//! a mask word selecting which of them reach the CPU. Software acknowledges
//! requests by writing the status register, which is ANDed with the written
//! value. Every mutation recomputes `status & mask` and pushes the result
//! into the exception controller; the CPU never talks to this block
//! directly.

use bitflags::bitflags;
use log::debug;

use super::cop0::Cop0;
use super::{AccessWidth, Addressable};
use crate::savestate::{SaveState, Snapshot};
use crate::Result;

/// Interrupt sources, by status/mask bit position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    VBlank = 0,
    Gpu = 1,
    CdRom = 2,
    Dma = 3,
    Timer0 = 4,
    Timer1 = 5,
    Timer2 = 6,
    PadMemCard = 7,
    Sio = 8,
    Spu = 9,
    Lightpen = 10,
}

bitflags! {
    /// The eleven request lines of the status and mask registers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InterruptFlags: u16 {
        const VBLANK = 1 << 0;
        const GPU = 1 << 1;
        const CDROM = 1 << 2;
        const DMA = 1 << 3;
        const TIMER0 = 1 << 4;
        const TIMER1 = 1 << 5;
        const TIMER2 = 1 << 6;
        const PAD_MEMCARD = 1 << 7;
        const SIO = 1 << 8;
        const SPU = 1 << 9;
        const LIGHTPEN = 1 << 10;
    }
}

/// Register offsets within the controller's window.
const STATUS: u32 = 0;
const MASK: u32 = 4;

pub struct InterruptController {
    status: InterruptFlags,
    mask: InterruptFlags,
}

impl InterruptController {
    pub fn new() -> InterruptController {
        InterruptController {
            status: InterruptFlags::empty(),
            mask: InterruptFlags::empty(),
        }
    }

    pub fn reset(&mut self) {
        self.status = InterruptFlags::empty();
        self.mask = InterruptFlags::empty();
    }

    /// Latch a request line. The caller must push the new pending state
    /// into COP0 afterwards (see [`refresh_pending`]).
    pub fn trigger(&mut self, which: Interrupt) {
        debug!("interrupt raised: {:?}", which);

        self.status |= InterruptFlags::from_bits_retain(1 << which as u16);
    }

    /// `status & mask`, the line consumed by the CPU on its next cycle.
    pub fn pending(&self) -> bool {
        !(self.status & self.mask).is_empty()
    }

    pub fn load<T: Addressable>(&self, offset: u32) -> T {
        let register = match offset & !3 {
            STATUS => self.status.bits(),
            MASK => self.mask.bits(),
            _ => panic!("unhandled interrupt controller read at +0x{:x}", offset),
        };

        let shift = (offset & 3) * 8;

        T::from_u32(u32::from(register) >> shift)
    }

    pub fn store<T: Addressable>(&mut self, offset: u32, value: T) {
        // Only the byte lanes actually covered by the access take part
        let shift = (offset & 3) * 8;
        let lane_mask = match T::width() {
            AccessWidth::Byte => 0xffu32 << shift,
            AccessWidth::HalfWord => 0xffffu32 << shift,
            AccessWidth::Word => 0xffff_ffffu32,
        };
        let value = (value.as_u32() << shift) as u32;

        match offset & !3 {
            STATUS => {
                // Write-with-AND acknowledge, untouched lanes keep their state
                let ack = (value | !lane_mask) as u16;

                self.status &= InterruptFlags::from_bits_retain(ack);
            }
            MASK => {
                let kept = self.mask.bits() & !(lane_mask as u16);

                self.mask = InterruptFlags::from_bits_retain(kept | (value & lane_mask) as u16);
            }
            _ => panic!(
                "unhandled interrupt controller write at +0x{:x} = 0x{:08x}",
                offset,
                value
            ),
        }
    }
}

/// Push the controller's pending state into the exception controller. Must
/// run after every status or mask mutation.
pub fn refresh_pending(irq: &InterruptController, cop0: &mut Cop0) {
    cop0.set_interrupt_pending(irq.pending());
}

impl Snapshot for InterruptController {
    fn serialize(&self, state: &mut SaveState) {
        state.put_u16(self.status.bits());
        state.put_u16(self.mask.bits());
    }

    fn deserialize(&mut self, state: &mut SaveState) -> Result<()> {
        self.status = InterruptFlags::from_bits_retain(state.take_u16()?);
        self.mask = InterruptFlags::from_bits_retain(state.take_u16()?);

        Ok(())
    }
}
