//! Video controller, reduced to its bus-visible surface.
//!
//! The rasterizer proper is outside this crate; what remains is the GP0/GP1
//! register pair and enough display timing to derive the vertical-blanking
//! interrupt and the frame-ready flag that paces `run_until_frame`. The
//! video core runs off its own clock at 22/7 the CPU frequency.

use log::debug;

use super::bus::Bus;
use super::irq::{self, Interrupt};
use crate::savestate::{SaveState, Snapshot};
use crate::Result;

/// Video-to-CPU clock ratio, as a fraction.
pub const CLOCK_RATIO_NUM: u64 = 22;
pub const CLOCK_RATIO_DEN: u64 = 7;

/// NTSC line timing in video clocks.
const CYCLES_PER_LINE: u64 = 3413;
const LINES_PER_FRAME: u64 = 263;
const VBLANK_START_LINE: u64 = 240;

/// Ready bits of the status register: receive-command, send-VRAM and
/// receive-DMA ready, plus DMA direction off.
const STATUS_READY: u32 = 0x1c80_2000;

pub struct Gpu {
    /// Last word written to GP0, kept for diagnostics
    gp0_latch: u32,
    /// Response latch read back through GPUREAD
    read_latch: u32,
    /// Remainder of the CPU-to-video clock conversion
    clock_fraction: u64,
    /// Video clocks into the current line
    line_cycles: u64,
    /// Current scanline
    line: u64,
    /// True while the beam is in the vertical blanking interval
    in_vblank: bool,
    /// Frames completed since reset
    frames: u64,
}

impl Gpu {
    pub fn new() -> Gpu {
        Gpu {
            gp0_latch: 0,
            read_latch: 0,
            clock_fraction: 0,
            line_cycles: 0,
            line: 0,
            in_vblank: false,
            frames: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Gpu::new();
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn load(&self, offset: u32) -> u32 {
        match offset {
            // GPUREAD
            0 => self.read_latch,
            // GPUSTAT, with the odd/even line bit derived from the beam
            4 => {
                let odd = (self.line & 1) as u32;

                STATUS_READY | (odd << 31)
            }
            _ => panic!("unhandled GPU read at +0x{:x}", offset),
        }
    }

    pub fn store(&mut self, offset: u32, value: u32) {
        match offset {
            // GP0: rendering commands are consumed by the external
            // rasterizer, only the latch is observable here
            0 => self.gp0_latch = value,
            // GP1: display control
            4 => self.gp1_command(value),
            _ => panic!("unhandled GPU write at +0x{:x} = 0x{:08x}", offset, value),
        }
    }

    fn gp1_command(&mut self, value: u32) {
        match value >> 24 {
            // Reset
            0x00 => {
                self.gp0_latch = 0;
                self.read_latch = 0;
            }
            // Display/DMA setup commands have no observable effect at this
            // level
            _ => debug!("GP1 command 0x{:08x}", value),
        }
    }
}

/// Advance the video state by `cpu_cycles` CPU clocks, raising Vblank when
/// the beam wraps into the blanking interval.
pub fn run(bus: &mut Bus, cpu_cycles: u32) {
    let clocks = bus.gpu.clock_fraction + u64::from(cpu_cycles) * CLOCK_RATIO_NUM;

    bus.gpu.clock_fraction = clocks % CLOCK_RATIO_DEN;
    bus.gpu.line_cycles += clocks / CLOCK_RATIO_DEN;

    while bus.gpu.line_cycles >= CYCLES_PER_LINE {
        bus.gpu.line_cycles -= CYCLES_PER_LINE;
        bus.gpu.line += 1;

        if bus.gpu.line >= LINES_PER_FRAME {
            bus.gpu.line = 0;
            bus.gpu.in_vblank = false;
        } else if bus.gpu.line >= VBLANK_START_LINE && !bus.gpu.in_vblank {
            bus.gpu.in_vblank = true;
            bus.gpu.frames += 1;

            bus.frame_ready = true;
            bus.irq.trigger(Interrupt::VBlank);
            irq::refresh_pending(&bus.irq, &mut bus.cop0);
        }
    }
}

impl Snapshot for Gpu {
    fn serialize(&self, state: &mut SaveState) {
        state.put_u32(self.gp0_latch);
        state.put_u32(self.read_latch);
        state.put_u64(self.clock_fraction);
        state.put_u64(self.line_cycles);
        state.put_u64(self.line);
        state.put_bool(self.in_vblank);
        state.put_u64(self.frames);
    }

    fn deserialize(&mut self, state: &mut SaveState) -> Result<()> {
        self.gp0_latch = state.take_u32()?;
        self.read_latch = state.take_u32()?;
        self.clock_fraction = state.take_u64()?;
        self.line_cycles = state.take_u64()?;
        self.line = state.take_u64()?;
        self.in_vblank = state.take_bool()?;
        self.frames = state.take_u64()?;

        Ok(())
    }
}
