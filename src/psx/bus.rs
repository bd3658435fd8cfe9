//! The system bus.
//!
//! Owns every hardware component and memory region, translates CPU-visible
//! addresses to physical ones and routes each access to the window that
//! claims it. The bus is also the clock master: [`Bus::execute`] runs the
//! CPU first, then advances every other component by the same step count
//! scaled to its own clock.

use super::cache_ctrl::CacheCtrl;
use super::cdrom::{self, CdRom};
use super::cop0::Cop0;
use super::cpu::{self, Cpu};
use super::dma::{self, Dma};
use super::gpu::{self, Gpu};
use super::gte::Gte;
use super::io_ports::IoPorts;
use super::irq::{self, Interrupt, InterruptController};
use super::mdec::Mdec;
use super::mem_ctrl::MemCtrl;
use super::memory::Memory;
use super::memory_map as map;
use super::pad_memcard::PadMemCard;
use super::ram_ctrl::RamCtrl;
use super::serial::SerialPort;
use super::spu::Spu;
use super::timers::{self, Timers};
use super::Addressable;
use crate::exe::Executable;
use crate::savestate::{SaveState, Snapshot};
use crate::{EmuError, Result};

/// Number of CPU cycles the slow components (DMA, disc controller) batch
/// into one of their own steps, and the granularity `run_until_frame` uses
/// for its execute calls.
pub const OPTIMAL_STEP_GRANULARITY: u32 = 32;

const RAM_LEN: usize = map::RAM_SIZE as usize;
const BIOS_LEN: usize = map::BIOS_SIZE as usize;
const SCRATCHPAD_LEN: usize = map::SCRATCHPAD_SIZE as usize;
const EXPANSION_LEN: usize = map::EXPANSION_SIZE as usize;

pub struct Bus {
    pub cpu: Cpu,
    pub cop0: Cop0,
    pub gte: Gte,
    pub irq: InterruptController,
    pub mem_ctrl: MemCtrl,
    pub pad_memcard: PadMemCard,
    pub serial: SerialPort,
    pub ram_ctrl: RamCtrl,
    pub dma: Dma,
    pub timers: Timers,
    pub cdrom: CdRom,
    pub gpu: Gpu,
    pub mdec: Mdec,
    pub spu: Spu,
    pub io_ports: IoPorts,
    pub cache_ctrl: CacheCtrl,
    ram: Memory<RAM_LEN>,
    bios: Memory<BIOS_LEN>,
    scratchpad: Memory<SCRATCHPAD_LEN>,
    expansion: Memory<EXPANSION_LEN>,
    /// Set by the video component when a frame completes, consumed by
    /// `frame_ready`
    pub(super) frame_ready: bool,
}

impl Bus {
    /// Build the machine around a BIOS image.
    pub fn new(bios: &[u8]) -> Result<Bus> {
        let mut bus = Bus {
            cpu: Cpu::new(),
            cop0: Cop0::new(),
            gte: Gte::new(),
            irq: InterruptController::new(),
            mem_ctrl: MemCtrl::new(),
            pad_memcard: PadMemCard::new(),
            serial: SerialPort::new(),
            ram_ctrl: RamCtrl::new(),
            dma: Dma::new(),
            timers: Timers::new(),
            cdrom: CdRom::new(),
            gpu: Gpu::new(),
            mdec: Mdec::new(),
            spu: Spu::new(),
            io_ports: IoPorts::new(),
            cache_ctrl: CacheCtrl::new(),
            ram: Memory::new(),
            bios: Memory::new(),
            scratchpad: Memory::new(),
            expansion: Memory::new(),
            frame_ready: false,
        };

        bus.load_bios(bios)?;
        Ok(bus)
    }

    /// Replace the BIOS ROM contents.
    pub fn load_bios(&mut self, image: &[u8]) -> Result<()> {
        if image.len() != BIOS_LEN {
            return Err(EmuError::BadBios(format!(
                "BIOS image is {} bytes, expected {}",
                image.len(),
                BIOS_LEN
            )));
        }

        self.bios.copy_from(image);
        Ok(())
    }

    /// Reset the whole console. ROM contents survive.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.cop0.reset();
        self.gte.reset();
        self.irq.reset();
        self.mem_ctrl.reset();
        self.pad_memcard.reset();
        self.serial.reset();
        self.ram_ctrl.reset();
        self.dma.reset();
        self.timers.reset();
        self.cdrom.reset();
        self.gpu.reset();
        self.mdec.reset();
        self.spu.reset();
        self.io_ports.reset();
        self.cache_ctrl.reset();
        self.ram.reset();
        self.scratchpad.reset();
        self.expansion.reset();

        self.frame_ready = false;
    }

    /// Run the machine for `num_steps` CPU cycles. The CPU goes first; if
    /// it stopped on a breakpoint the other components are not advanced so
    /// the whole machine freezes at the stop point.
    pub fn execute(&mut self, num_steps: u32) {
        cpu::execute(self, num_steps);

        if self.cpu.breakpoint_hit().is_some() {
            return;
        }

        dma::run(self, num_steps / OPTIMAL_STEP_GRANULARITY);
        timers::run(self, num_steps);
        cdrom::run(self, num_steps / OPTIMAL_STEP_GRANULARITY);
        gpu::run(self, num_steps);
    }

    /// Run until the video component signals a completed frame or a
    /// breakpoint stops the CPU.
    pub fn run_until_frame(&mut self) {
        while !self.frame_ready && self.cpu.breakpoint_hit().is_none() {
            self.execute(OPTIMAL_STEP_GRANULARITY);
        }

        self.frame_ready = false;
    }

    /// Run until the CPU is about to execute `address`, then acknowledge
    /// the stop.
    pub fn run_until(&mut self, address: u32) {
        self.cpu.add_breakpoint(address);

        while self.cpu.breakpoint_hit().is_none() {
            self.execute(OPTIMAL_STEP_GRANULARITY);
        }

        self.cpu.acknowledge_breakpoint();
    }

    /// Raise one of the interrupt request lines, as an external component
    /// (pad, memory card, external SPU core) would.
    pub fn trigger_interrupt(&mut self, which: Interrupt) {
        self.irq.trigger(which);
        irq::refresh_pending(&self.irq, &mut self.cop0);
    }

    /// True once per completed video frame.
    pub fn frame_ready(&mut self) -> bool {
        let ready = self.frame_ready;

        self.frame_ready = false;
        ready
    }

    /// Sideload an already-parsed executable: seed the CPU registers and
    /// copy the text segment into guest memory.
    pub fn sideload_executable(&mut self, exe: &Executable) {
        self.cpu.set_program_counter(exe.initial_pc);
        self.cpu.set_register(28, exe.initial_gp);
        self.cpu.set_register(29, exe.initial_sp);
        self.cpu.set_register(30, exe.initial_sp);

        self.copy_to_guest(exe.text_base, &exe.text);
    }

    /// Copy a span of guest memory out through the regular dispatch path.
    pub fn copy_from_guest(&mut self, address: u32, into: &mut [u8]) {
        for (i, byte) in into.iter_mut().enumerate() {
            *byte = self.load::<u8>(address.wrapping_add(i as u32));
        }
    }

    /// Copy host bytes into guest memory through the regular dispatch path.
    pub fn copy_to_guest(&mut self, address: u32, from: &[u8]) {
        for (i, &byte) in from.iter().enumerate() {
            self.store::<u8>(address.wrapping_add(i as u32), byte);
        }
    }

    /// Route a read to the component or memory region that owns the
    /// address. An address outside every window means the emulated program
    /// walked off the map; there is no defined hardware behavior to fall
    /// back on.
    pub fn load<T: Addressable>(&mut self, address: u32) -> T {
        let physical = map::mask_segment(address);

        // RAM is mirrored four times within its window
        if map::in_window(physical, map::RAM_BASE, map::RAM_SIZE * map::RAM_MIRRORS) {
            return self.ram.load((physical - map::RAM_BASE) % map::RAM_SIZE);
        }
        if map::in_window(physical, map::EXPANSION_BASE, map::EXPANSION_SIZE) {
            return self.expansion.load(physical - map::EXPANSION_BASE);
        }
        if map::in_window(physical, map::SCRATCHPAD_BASE, map::SCRATCHPAD_SIZE) {
            return self.scratchpad.load(physical - map::SCRATCHPAD_BASE);
        }
        if map::in_window(physical, map::MEM_CTRL_BASE, map::MEM_CTRL_SIZE) {
            return self.mem_ctrl.load(physical - map::MEM_CTRL_BASE);
        }
        if map::in_window(physical, map::PAD_MEMCARD_BASE, map::PAD_MEMCARD_SIZE) {
            return self.pad_memcard.load(physical - map::PAD_MEMCARD_BASE);
        }
        if map::in_window(physical, map::SERIAL_BASE, map::SERIAL_SIZE) {
            return self.serial.load(physical - map::SERIAL_BASE);
        }
        if map::in_window(physical, map::RAM_CTRL_BASE, map::RAM_CTRL_SIZE) {
            return self.ram_ctrl.load(physical - map::RAM_CTRL_BASE);
        }
        if map::in_window(physical, map::IRQ_BASE, map::IRQ_SIZE) {
            return self.irq.load(physical - map::IRQ_BASE);
        }
        if map::in_window(physical, map::DMA_BASE, map::DMA_SIZE) {
            return self.dma.load(physical - map::DMA_BASE);
        }
        if map::in_window(physical, map::TIMER0_BASE, map::TIMER_SIZE) {
            return self.timers.load(0, physical - map::TIMER0_BASE);
        }
        if map::in_window(physical, map::TIMER1_BASE, map::TIMER_SIZE) {
            return self.timers.load(1, physical - map::TIMER1_BASE);
        }
        if map::in_window(physical, map::TIMER2_BASE, map::TIMER_SIZE) {
            return self.timers.load(2, physical - map::TIMER2_BASE);
        }
        if map::in_window(physical, map::CDROM_BASE, map::CDROM_SIZE) {
            return T::from_u32(u32::from(
                self.cdrom.load(physical - map::CDROM_BASE),
            ));
        }
        if map::in_window(physical, map::GPU_BASE, map::GPU_SIZE) {
            return T::from_u32(self.gpu.load(physical - map::GPU_BASE));
        }
        if map::in_window(physical, map::MDEC_BASE, map::MDEC_SIZE) {
            return T::from_u32(self.mdec.load(physical - map::MDEC_BASE));
        }
        if map::in_window(physical, map::SPU_BASE, map::SPU_SIZE) {
            return self.spu.load(physical - map::SPU_BASE);
        }
        if map::in_window(physical, map::IO_PORTS_BASE, map::IO_PORTS_SIZE) {
            return T::from_u32(self.io_ports.load(physical - map::IO_PORTS_BASE));
        }
        if map::in_window(physical, map::BIOS_BASE, map::BIOS_SIZE) {
            return self.bios.load(physical - map::BIOS_BASE);
        }
        if map::in_window(physical, map::CACHE_CTRL_BASE, map::CACHE_CTRL_SIZE) {
            return self.cache_ctrl.load(physical - map::CACHE_CTRL_BASE);
        }

        panic!(
            "unhandled bus read at 0x{:08x} (physical 0x{:08x})",
            address, physical
        );
    }

    /// Route a write like [`Bus::load`]. While the CPU has its cache
    /// isolated, every store is silently dropped: the real machine would
    /// redirect them into the (unemulated) instruction cache.
    pub fn store<T: Addressable>(&mut self, address: u32, value: T) {
        if self.cop0.cache_isolated() {
            return;
        }

        let physical = map::mask_segment(address);

        if map::in_window(physical, map::RAM_BASE, map::RAM_SIZE * map::RAM_MIRRORS) {
            return self
                .ram
                .store((physical - map::RAM_BASE) % map::RAM_SIZE, value);
        }
        if map::in_window(physical, map::EXPANSION_BASE, map::EXPANSION_SIZE) {
            return self.expansion.store(physical - map::EXPANSION_BASE, value);
        }
        if map::in_window(physical, map::SCRATCHPAD_BASE, map::SCRATCHPAD_SIZE) {
            return self.scratchpad.store(physical - map::SCRATCHPAD_BASE, value);
        }
        if map::in_window(physical, map::MEM_CTRL_BASE, map::MEM_CTRL_SIZE) {
            return self.mem_ctrl.store(physical - map::MEM_CTRL_BASE, value);
        }
        if map::in_window(physical, map::PAD_MEMCARD_BASE, map::PAD_MEMCARD_SIZE) {
            return self
                .pad_memcard
                .store(physical - map::PAD_MEMCARD_BASE, value);
        }
        if map::in_window(physical, map::SERIAL_BASE, map::SERIAL_SIZE) {
            return self.serial.store(physical - map::SERIAL_BASE, value);
        }
        if map::in_window(physical, map::RAM_CTRL_BASE, map::RAM_CTRL_SIZE) {
            return self.ram_ctrl.store(physical - map::RAM_CTRL_BASE, value);
        }
        if map::in_window(physical, map::IRQ_BASE, map::IRQ_SIZE) {
            self.irq.store(physical - map::IRQ_BASE, value);
            irq::refresh_pending(&self.irq, &mut self.cop0);
            return;
        }
        if map::in_window(physical, map::DMA_BASE, map::DMA_SIZE) {
            return self.dma.store(physical - map::DMA_BASE, value);
        }
        if map::in_window(physical, map::TIMER0_BASE, map::TIMER_SIZE) {
            return self.timers.store(0, physical - map::TIMER0_BASE, value);
        }
        if map::in_window(physical, map::TIMER1_BASE, map::TIMER_SIZE) {
            return self.timers.store(1, physical - map::TIMER1_BASE, value);
        }
        if map::in_window(physical, map::TIMER2_BASE, map::TIMER_SIZE) {
            return self.timers.store(2, physical - map::TIMER2_BASE, value);
        }
        if map::in_window(physical, map::CDROM_BASE, map::CDROM_SIZE) {
            return self
                .cdrom
                .store(physical - map::CDROM_BASE, value.as_u32() as u8);
        }
        if map::in_window(physical, map::GPU_BASE, map::GPU_SIZE) {
            return self.gpu.store(physical - map::GPU_BASE, value.as_u32());
        }
        if map::in_window(physical, map::MDEC_BASE, map::MDEC_SIZE) {
            return self.mdec.store(physical - map::MDEC_BASE, value.as_u32());
        }
        if map::in_window(physical, map::SPU_BASE, map::SPU_SIZE) {
            return self.spu.store(physical - map::SPU_BASE, value);
        }
        if map::in_window(physical, map::IO_PORTS_BASE, map::IO_PORTS_SIZE) {
            return self
                .io_ports
                .store(physical - map::IO_PORTS_BASE, value.as_u32());
        }
        if map::in_window(physical, map::BIOS_BASE, map::BIOS_SIZE) {
            // ROM; real hardware ignores the write cycle
            return;
        }
        if map::in_window(physical, map::CACHE_CTRL_BASE, map::CACHE_CTRL_SIZE) {
            return self.cache_ctrl.store(physical - map::CACHE_CTRL_BASE, value);
        }

        panic!(
            "unhandled bus write at 0x{:08x} (physical 0x{:08x}) = 0x{:08x}",
            address,
            physical,
            value.as_u32()
        );
    }
}

impl Snapshot for Bus {
    fn serialize(&self, state: &mut SaveState) {
        self.cpu.serialize(state);
        self.cop0.serialize(state);
        self.gte.serialize(state);
        self.irq.serialize(state);
        self.mem_ctrl.serialize(state);
        self.pad_memcard.serialize(state);
        self.serial.serialize(state);
        self.ram_ctrl.serialize(state);
        self.dma.serialize(state);
        self.timers.serialize(state);
        self.cdrom.serialize(state);
        self.gpu.serialize(state);
        self.mdec.serialize(state);
        self.spu.serialize(state);
        self.io_ports.serialize(state);
        self.cache_ctrl.serialize(state);
        self.ram.serialize(state);
        self.bios.serialize(state);
        self.scratchpad.serialize(state);
        self.expansion.serialize(state);
        state.put_bool(self.frame_ready);
    }

    fn deserialize(&mut self, state: &mut SaveState) -> Result<()> {
        self.cpu.deserialize(state)?;
        self.cop0.deserialize(state)?;
        self.gte.deserialize(state)?;
        self.irq.deserialize(state)?;
        self.mem_ctrl.deserialize(state)?;
        self.pad_memcard.deserialize(state)?;
        self.serial.deserialize(state)?;
        self.ram_ctrl.deserialize(state)?;
        self.dma.deserialize(state)?;
        self.timers.deserialize(state)?;
        self.cdrom.deserialize(state)?;
        self.gpu.deserialize(state)?;
        self.mdec.deserialize(state)?;
        self.spu.deserialize(state)?;
        self.io_ports.deserialize(state)?;
        self.cache_ctrl.deserialize(state)?;
        self.ram.deserialize(state)?;
        self.bios.deserialize(state)?;
        self.scratchpad.deserialize(state)?;
        self.expansion.deserialize(state)?;
        self.frame_ready = state.take_bool()?;

        Ok(())
    }
}
