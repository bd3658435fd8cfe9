//! Physical memory map of the console.
//!
//! Every window is a fixed `(base, size)` pair on the physical bus. The
//! CPU-visible (virtual) address space aliases the physical one through the
//! three top address bits, which select cached/uncached mirrors; translation
//! is a plain mask, not an MMU. Addresses outside every window are a fatal
//! bus error.

/// Main RAM. The 2MB chip is mirrored four times within an 8MB window.
pub const RAM_BASE: u32 = 0x0000_0000;
pub const RAM_SIZE: u32 = 0x0020_0000;
pub const RAM_MIRRORS: u32 = 4;

/// Expansion region 1 (parallel port devices).
pub const EXPANSION_BASE: u32 = 0x1f00_0000;
pub const EXPANSION_SIZE: u32 = 0x0080_0000;

/// Scratchpad, the data cache used as 1KB of fast RAM.
pub const SCRATCHPAD_BASE: u32 = 0x1f80_0000;
pub const SCRATCHPAD_SIZE: u32 = 0x0000_0400;

/// Memory-timing control registers.
pub const MEM_CTRL_BASE: u32 = 0x1f80_1000;
pub const MEM_CTRL_SIZE: u32 = 0x0000_0024;

/// Gamepad and memory-card port registers.
pub const PAD_MEMCARD_BASE: u32 = 0x1f80_1040;
pub const PAD_MEMCARD_SIZE: u32 = 0x0000_0010;

/// Serial port registers.
pub const SERIAL_BASE: u32 = 0x1f80_1050;
pub const SERIAL_SIZE: u32 = 0x0000_0010;

/// RAM-size control register.
pub const RAM_CTRL_BASE: u32 = 0x1f80_1060;
pub const RAM_CTRL_SIZE: u32 = 0x0000_0004;

/// Interrupt controller (status + mask).
pub const IRQ_BASE: u32 = 0x1f80_1070;
pub const IRQ_SIZE: u32 = 0x0000_0008;

/// DMA controller.
pub const DMA_BASE: u32 = 0x1f80_1080;
pub const DMA_SIZE: u32 = 0x0000_0080;

/// Hardware timers, one 16-byte window each.
pub const TIMER0_BASE: u32 = 0x1f80_1100;
pub const TIMER1_BASE: u32 = 0x1f80_1110;
pub const TIMER2_BASE: u32 = 0x1f80_1120;
pub const TIMER_SIZE: u32 = 0x0000_0010;

/// Optical disc controller.
pub const CDROM_BASE: u32 = 0x1f80_1800;
pub const CDROM_SIZE: u32 = 0x0000_0004;

/// Video controller (GP0/GP1 ports).
pub const GPU_BASE: u32 = 0x1f80_1810;
pub const GPU_SIZE: u32 = 0x0000_0008;

/// Video decoder.
pub const MDEC_BASE: u32 = 0x1f80_1820;
pub const MDEC_SIZE: u32 = 0x0000_0008;

/// Audio processor register file.
pub const SPU_BASE: u32 = 0x1f80_1c00;
pub const SPU_SIZE: u32 = 0x0000_0400;

/// Expansion region 2 (I/O ports, debug UART).
pub const IO_PORTS_BASE: u32 = 0x1f80_2000;
pub const IO_PORTS_SIZE: u32 = 0x0000_0080;

/// BIOS ROM.
pub const BIOS_BASE: u32 = 0x1fc0_0000;
pub const BIOS_SIZE: u32 = 0x0008_0000;

/// Cache control register window (KSEG2, survives the physical mask).
pub const CACHE_CTRL_BASE: u32 = 0x1ffe_0000;
pub const CACHE_CTRL_SIZE: u32 = 0x0000_0200;

/// The CPU starts executing BIOS code through the uncached mirror.
pub const RESET_VECTOR: u32 = 0xbfc0_0000;

/// Exception handler entry points, selected by the COP0 boot-vector bit.
pub const EXCEPTION_VECTOR_RAM: u32 = 0x8000_0080;
pub const EXCEPTION_VECTOR_ROM: u32 = 0xbfc0_0180;

/// Mask keeping the high nibble of the PC on absolute jumps.
pub const JUMP_SEGMENT_MASK: u32 = 0xf000_0000;

/// Mask dropping the three segment-select bits: KUSEG, KSEG0 and KSEG1 all
/// alias the same physical bus, and the KSEG2 register windows land past
/// the BIOS.
const SEGMENT_MASK: u32 = 0x1fff_ffff;

/// Translate a CPU-visible address to a physical bus address.
#[inline(always)]
pub fn mask_segment(address: u32) -> u32 {
    address & SEGMENT_MASK
}

/// Check whether `address` falls within the `(base, size)` window.
#[inline(always)]
pub fn in_window(address: u32, base: u32, size: u32) -> bool {
    address.wrapping_sub(base) < size
}
