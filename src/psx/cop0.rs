//! Coprocessor 0: the exception controller.
//!
//! Holds the system status and cause registers, computes the handler
//! address on exception entry and keeps the derived interrupt-pending line
//! that the CPU polls at the top of every cycle. The interrupt controller
//! pushes its pending state in through [`Cop0::set_interrupt_pending`]
//! whenever its status or mask registers change.

use crate::savestate::{SaveState, Snapshot};
use crate::Result;

use super::memory_map;

/// Exception causes, numbered the way the CAUSE register encodes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exception {
    Interrupt = 0,
    /// Not generated by this machine (no TLB), present for completeness.
    TlbModification = 1,
    TlbLoad = 2,
    TlbStore = 3,
    BadAddressLoad = 4,
    BadAddressStore = 5,
    BusErrorInstruction = 6,
    BusErrorData = 7,
    SystemCall = 8,
    Break = 9,
    Reserved = 10,
    CoprocessorUnusable = 11,
    Overflow = 12,
}

/// System status register (COP0 r12).
///
/// Field layout (only the bits this machine uses):
/// - bit 0: current interrupt enable
/// - bit 1: current kernel/user mode
/// - bits 2-5: previous/old copies of bits 0-1 (the 3-deep mode stack)
/// - bits 8-15: interrupt mask, paired with CAUSE bits 8-15
/// - bit 16: isolate cache (stores bypass main memory)
/// - bit 22: boot exception vectors in ROM
#[derive(Debug, Clone, Copy, Default)]
struct StatusRegister(u32);

impl StatusRegister {
    const INTERRUPT_ENABLE: u32 = 1;
    const MODE_STACK_MASK: u32 = 0x3f;
    const ISOLATE_CACHE: u32 = 1 << 16;
    const BOOT_VECTORS_IN_ROM: u32 = 1 << 22;

    fn interrupt_enabled(self) -> bool {
        self.0 & Self::INTERRUPT_ENABLE != 0
    }

    fn interrupt_mask(self) -> u32 {
        (self.0 >> 8) & 0xff
    }

    fn cache_isolated(self) -> bool {
        self.0 & Self::ISOLATE_CACHE != 0
    }

    fn boot_vectors_in_rom(self) -> bool {
        self.0 & Self::BOOT_VECTORS_IN_ROM != 0
    }

    /// Entering an exception pushes the interrupt/mode pair: current ->
    /// previous -> old, and enters kernel mode with interrupts disabled.
    fn push_mode_stack(&mut self) {
        let stack = (self.0 << 2) & Self::MODE_STACK_MASK;

        self.0 = (self.0 & !Self::MODE_STACK_MASK) | stack;
    }

    /// Returning from an exception pops the pair back: previous -> current,
    /// old -> previous. The old slot keeps its value.
    fn pop_mode_stack(&mut self) {
        let stack = (self.0 >> 2) & 0x0f;

        self.0 = (self.0 & !0x0f) | stack;
    }
}

/// Cause register (COP0 r13).
///
/// Field layout:
/// - bits 2-6: exception code
/// - bits 8-15: pending interrupt lines (bit 10 is the hardware line)
/// - bits 28-29: coprocessor number for CoprocessorUnusable
/// - bit 30: the faulting instruction was a taken branch
/// - bit 31: the faulting instruction sat in a branch delay slot
#[derive(Debug, Clone, Copy, Default)]
struct CauseRegister(u32);

impl CauseRegister {
    const CODE_SHIFT: u32 = 2;
    const CODE_MASK: u32 = 0x1f << Self::CODE_SHIFT;
    const PENDING_SHIFT: u32 = 8;
    const PENDING_MASK: u32 = 0xff << Self::PENDING_SHIFT;
    const BRANCH_TAKEN: u32 = 1 << 30;
    const BRANCH_DELAY: u32 = 1 << 31;

    fn set_code(&mut self, exception: Exception) {
        self.0 = (self.0 & !Self::CODE_MASK) | ((exception as u32) << Self::CODE_SHIFT);
    }

    fn pending(self) -> u32 {
        (self.0 >> Self::PENDING_SHIFT) & 0xff
    }

    fn set_hardware_pending(&mut self, pending: bool) {
        // The single hardware interrupt line is IP2
        let line = 4 << Self::PENDING_SHIFT;

        if pending {
            self.0 |= line;
        } else {
            self.0 &= !line;
        }
    }

    /// Software may only write the two soft interrupt bits (IP0/IP1).
    fn write_soft_pending(&mut self, value: u32) {
        let soft = 0x3 << Self::PENDING_SHIFT;

        self.0 = (self.0 & !soft) | (value & soft);
    }

    fn set_branch_state(&mut self, in_delay_slot: bool, taken: bool) {
        self.0 &= !(Self::BRANCH_DELAY | Self::BRANCH_TAKEN);

        if in_delay_slot {
            self.0 |= Self::BRANCH_DELAY;
        }
        if taken {
            self.0 |= Self::BRANCH_TAKEN;
        }
    }
}

/// The exception controller state.
pub struct Cop0 {
    /// Breakpoint-on-execute address (r3)
    bpc: u32,
    /// Breakpoint-on-data-access address (r5)
    bda: u32,
    /// Memorized jump address (r6)
    jumpdest: u32,
    /// Hardware breakpoint control (r7). Stored raw; the debug unit itself
    /// is not emulated.
    dcic: u32,
    /// Faulting virtual address of the last misaligned access (r8)
    bad_vaddr: u32,
    /// Data-access breakpoint mask (r9)
    bdam: u32,
    /// Execute breakpoint mask (r11)
    bpcm: u32,
    /// System status register (r12)
    sr: StatusRegister,
    /// Most recently recognized exception (r13)
    cause: CauseRegister,
    /// Return address from the exception handler (r14)
    epc: u32,
    /// Processor id (r15)
    prid: u32,
}

impl Cop0 {
    pub fn new() -> Cop0 {
        let mut cop0 = Cop0 {
            bpc: 0,
            bda: 0,
            jumpdest: 0,
            dcic: 0,
            bad_vaddr: 0,
            bdam: 0,
            bpcm: 0,
            sr: StatusRegister::default(),
            cause: CauseRegister::default(),
            epc: 0,
            prid: 0,
        };

        cop0.reset();
        cop0
    }

    pub fn reset(&mut self) {
        self.bpc = 0;
        self.bda = 0;
        self.jumpdest = 0;
        self.dcic = 0;
        self.bad_vaddr = 0;
        self.bdam = 0;
        self.bpcm = 0;
        self.sr = StatusRegister::default();
        self.cause = CauseRegister::default();
        self.epc = 0;
        self.prid = 2;
    }

    /// Read one of the populated coprocessor registers. Indices the
    /// hardware leaves unmapped are a fatal machine fault.
    pub fn read(&self, index: u32) -> u32 {
        match index {
            3 => self.bpc,
            5 => self.bda,
            6 => self.jumpdest,
            7 => self.dcic,
            8 => self.bad_vaddr,
            9 => self.bdam,
            11 => self.bpcm,
            12 => self.sr.0,
            13 => self.cause.0,
            14 => self.epc,
            15 => self.prid,
            _ => panic!("read of unmapped cop0 register r{}", index),
        }
    }

    /// Write one of the populated coprocessor registers.
    pub fn write(&mut self, index: u32, value: u32) {
        match index {
            3 => self.bpc = value,
            5 => self.bda = value,
            7 => self.dcic = value,
            9 => self.bdam = value,
            11 => self.bpcm = value,
            12 => self.sr.0 = value,
            // Read-only except for the two soft interrupt bits
            13 => self.cause.write_soft_pending(value),
            14 => self.epc = value,
            _ => panic!("write of unmapped cop0 register r{} = 0x{:08x}", index, value),
        }
    }

    /// Record the cause of a new exception and push the interrupt/mode
    /// stack, entering kernel mode with interrupts masked.
    pub fn enter_exception(&mut self, exception: Exception) {
        self.cause.set_code(exception);
        self.sr.push_mode_stack();
    }

    /// Pop the interrupt/mode stack on a privileged return-from-exception.
    pub fn return_from_exception(&mut self) {
        self.sr.pop_mode_stack();
    }

    pub fn set_bad_address(&mut self, address: u32) {
        self.bad_vaddr = address;
    }

    /// Record where the faulting instruction lived.
    pub fn set_exception_pc(&mut self, pc: u32) {
        self.epc = pc;
        self.cause.set_branch_state(false, false);
    }

    /// The faulting instruction sat in a branch delay slot: back the saved
    /// PC up to the branch itself and memorize the interrupted jump target.
    pub fn adjust_for_branch_delay(&mut self, branch_taken: bool, jump_target: u32) {
        self.epc = self.epc.wrapping_sub(4);
        self.cause.set_branch_state(true, branch_taken);

        if branch_taken {
            self.jumpdest = jump_target;
        }
    }

    /// Entry point of the exception handler, selected by the boot-vector
    /// configuration bit.
    pub fn handler_address(&self) -> u32 {
        if self.sr.boot_vectors_in_rom() {
            memory_map::EXCEPTION_VECTOR_ROM
        } else {
            memory_map::EXCEPTION_VECTOR_RAM
        }
    }

    /// Hardware interrupt line driven by the interrupt controller.
    pub fn set_interrupt_pending(&mut self, pending: bool) {
        self.cause.set_hardware_pending(pending);
    }

    /// True when an unmasked interrupt should preempt the next instruction.
    pub fn interrupt_pending(&self) -> bool {
        let active = self.cause.pending() & self.sr.interrupt_mask();

        active != 0 && self.sr.interrupt_enabled()
    }

    /// Read by the bus write path: stores are dropped while the cache is
    /// isolated.
    pub fn cache_isolated(&self) -> bool {
        self.sr.cache_isolated()
    }
}

impl Snapshot for Cop0 {
    fn serialize(&self, state: &mut SaveState) {
        state.put_u32(self.bpc);
        state.put_u32(self.bda);
        state.put_u32(self.jumpdest);
        state.put_u32(self.dcic);
        state.put_u32(self.bad_vaddr);
        state.put_u32(self.bdam);
        state.put_u32(self.bpcm);
        state.put_u32(self.sr.0);
        state.put_u32(self.cause.0);
        state.put_u32(self.epc);
        state.put_u32(self.prid);
    }

    fn deserialize(&mut self, state: &mut SaveState) -> Result<()> {
        self.bpc = state.take_u32()?;
        self.bda = state.take_u32()?;
        self.jumpdest = state.take_u32()?;
        self.dcic = state.take_u32()?;
        self.bad_vaddr = state.take_u32()?;
        self.bdam = state.take_u32()?;
        self.bpcm = state.take_u32()?;
        self.sr.0 = state.take_u32()?;
        self.cause.0 = state.take_u32()?;
        self.epc = state.take_u32()?;
        self.prid = state.take_u32()?;

        Ok(())
    }
}
