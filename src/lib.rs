//! Emulation core for the PlayStation CPU and memory bus.
//!
//! The crate models the R3000A CPU pipeline (branch and load delay slots,
//! precise exception entry), the coprocessors that live next to it (the
//! exception controller on COP0 and the geometry engine on COP2) and the
//! bus that routes every memory access to the right region or hardware
//! component. Peripherals outside that core (video, audio, disc, DMA,
//! timers, pads) are carried as narrow register-level components so that
//! the memory map stays total and interrupts have real producers.
//!
//! The whole machine advances in lock-step from a single thread:
//!
//! ```no_run
//! use graystation::psx::Bus;
//!
//! let bios = vec![0u8; graystation::psx::memory_map::BIOS_SIZE as usize];
//! let mut bus = Bus::new(&bios).unwrap();
//! bus.execute(1_000_000);
//! ```

pub mod error;
pub mod exe;
pub mod psx;
pub mod savestate;

pub use error::{EmuError, Result};

#[cfg(test)]
mod tests;
