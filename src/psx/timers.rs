//! Hardware timers.
//!
//! Three independent counters with a mode and a target register each. Only
//! the system-clock behavior is modelled: counters advance once per CPU
//! cycle, optionally reset at the target and raise their interrupt when the
//! mode register asks for one. Dot-clock and hblank gating belong to the
//! external video implementation.

use super::bus::Bus;
use super::irq::{self, Interrupt};
use super::Addressable;
use crate::savestate::{SaveState, Snapshot};
use crate::Result;

/// Mode register bits this model honors.
const MODE_RESET_AT_TARGET: u16 = 1 << 3;
const MODE_IRQ_AT_TARGET: u16 = 1 << 4;
const MODE_IRQ_AT_OVERFLOW: u16 = 1 << 5;
const MODE_REACHED_TARGET: u16 = 1 << 11;
const MODE_REACHED_OVERFLOW: u16 = 1 << 12;

#[derive(Debug, Clone, Copy)]
pub struct Timer {
    counter: u16,
    mode: u16,
    target: u16,
}

impl Timer {
    fn new() -> Timer {
        Timer {
            counter: 0,
            mode: 0,
            target: 0,
        }
    }

    fn load(&mut self, offset: u32) -> u32 {
        match offset & 0xc {
            0x0 => u32::from(self.counter),
            0x4 => {
                // The reached bits clear on read
                let mode = self.mode;

                self.mode &= !(MODE_REACHED_TARGET | MODE_REACHED_OVERFLOW);
                u32::from(mode)
            }
            0x8 => u32::from(self.target),
            _ => panic!("unhandled timer read at +0x{:x}", offset),
        }
    }

    fn store(&mut self, offset: u32, value: u32) {
        match offset & 0xc {
            0x0 => self.counter = value as u16,
            0x4 => {
                // Writing the mode restarts the counter
                self.mode = value as u16;
                self.counter = 0;
            }
            0x8 => self.target = value as u16,
            _ => panic!("unhandled timer write at +0x{:x} = 0x{:08x}", offset, value),
        }
    }

    /// Advance by `steps` ticks. Returns true when an interrupt should be
    /// raised.
    fn tick(&mut self, steps: u32) -> bool {
        let mut raise = false;
        let mut remaining = steps;

        while remaining > 0 {
            let counter = u32::from(self.counter);
            let target = u32::from(self.target);

            // Ticks until the counter lands on the target (a full lap when
            // it is sitting there already) and until the 16-bit wrap
            let to_target = (target.wrapping_sub(counter).wrapping_sub(1) & 0xffff) + 1;
            let to_overflow = 0x1_0000 - counter;

            let jump = remaining.min(to_target).min(to_overflow);
            let landed = counter + jump;

            self.counter = (landed & 0xffff) as u16;
            remaining -= jump;

            if jump == to_target {
                self.mode |= MODE_REACHED_TARGET;

                if self.mode & MODE_IRQ_AT_TARGET != 0 {
                    raise = true;
                }
                if self.mode & MODE_RESET_AT_TARGET != 0 {
                    self.counter = 0;
                }
            }

            if landed >= 0x1_0000 {
                self.mode |= MODE_REACHED_OVERFLOW;

                if self.mode & MODE_IRQ_AT_OVERFLOW != 0 {
                    raise = true;
                }
            }
        }

        raise
    }
}

pub struct Timers {
    timers: [Timer; 3],
}

impl Timers {
    pub fn new() -> Timers {
        Timers {
            timers: [Timer::new(); 3],
        }
    }

    pub fn reset(&mut self) {
        self.timers = [Timer::new(); 3];
    }

    pub fn load<T: Addressable>(&mut self, which: usize, offset: u32) -> T {
        let v = self.timers[which].load(offset & !3);
        let shift = (offset & 3) * 8;

        T::from_u32(v >> shift)
    }

    /// Registers are 16 bits wide; word stores carry the low half.
    pub fn store<T: Addressable>(&mut self, which: usize, offset: u32, value: T) {
        self.timers[which].store(offset & !3, value.as_u32());
    }
}

/// Advance every timer by `steps` CPU cycles.
pub fn run(bus: &mut Bus, steps: u32) {
    const LINES: [Interrupt; 3] = [Interrupt::Timer0, Interrupt::Timer1, Interrupt::Timer2];

    for (which, &line) in LINES.iter().enumerate() {
        if bus.timers.timers[which].tick(steps) {
            bus.irq.trigger(line);
            irq::refresh_pending(&bus.irq, &mut bus.cop0);
        }
    }
}

impl Snapshot for Timers {
    fn serialize(&self, state: &mut SaveState) {
        for timer in &self.timers {
            state.put_u16(timer.counter);
            state.put_u16(timer.mode);
            state.put_u16(timer.target);
        }
    }

    fn deserialize(&mut self, state: &mut SaveState) -> Result<()> {
        for timer in &mut self.timers {
            timer.counter = state.take_u16()?;
            timer.mode = state.take_u16()?;
            timer.target = state.take_u16()?;
        }

        Ok(())
    }
}
