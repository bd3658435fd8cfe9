//! Interrupt delivery and exception entry/return sequencing.

use super::asm::*;
use crate::psx::cpu;
use crate::psx::irq::Interrupt;
use crate::psx::memory_map::{EXCEPTION_VECTOR_RAM, IRQ_BASE};

/// SR value unmasking the hardware interrupt line with interrupts enabled.
const SR_IE_IM2: u32 = (4 << 8) | 1;

#[test]
fn pending_interrupt_preempts_the_instruction() {
    let mut bus = machine_with_program(&[ori(2, 0, 1)]);

    bus.cop0.write(12, SR_IE_IM2);
    bus.irq.store::<u16>(4, 1); // unmask vblank
    bus.trigger_interrupt(Interrupt::VBlank);

    cpu::execute(&mut bus, 1);

    // The preempted instruction did not run; the cycle went to the first
    // handler instruction instead
    assert_eq!(bus.cpu.register(2), 0);
    assert_eq!(bus.cpu.pc(), EXCEPTION_VECTOR_RAM + 4);
    assert_eq!((bus.cop0.read(13) >> 2) & 0x1f, 0);
    assert_eq!(bus.cop0.read(14), PROGRAM_BASE);
}

#[test]
fn interrupted_program_resumes_after_rfe() {
    let mut bus = machine_with_program(&[
        ori(2, 0, 1),
        ori(3, 0, 2),
    ]);

    // Handler: acknowledge the request, fetch EPC and return through it
    load_program(
        &mut bus,
        EXCEPTION_VECTOR_RAM,
        &[
            lui(8, 0x1f80),
            sw(0, 8, 0x1070),   // I_STAT &= 0
            mfc0(9, 14),        // r9 <- EPC
            nop(),
            rfe(),
            jr(9),
            nop(),
        ],
    );

    bus.cop0.write(12, SR_IE_IM2);
    bus.irq.store::<u16>(4, 1);
    bus.trigger_interrupt(Interrupt::VBlank);

    // Step 1 enters the handler, then the handler runs and returns
    cpu::execute(&mut bus, 12);

    assert_eq!(bus.cpu.register(2), 1);
    assert_eq!(bus.cpu.register(3), 2);
}

#[test]
fn masked_interrupt_does_not_preempt() {
    let mut bus = machine_with_program(&[ori(2, 0, 1)]);

    bus.cop0.write(12, SR_IE_IM2);
    // Request latched but not unmasked in the controller
    bus.trigger_interrupt(Interrupt::VBlank);

    cpu::execute(&mut bus, 1);

    assert_eq!(bus.cpu.register(2), 1);
    assert_eq!(bus.cpu.pc(), PROGRAM_BASE + 4);
}

#[test]
fn interrupt_on_a_gte_command_skips_past_it() {
    let mut bus = machine_with_program(&[
        cop2(0x28),      // SQR about to execute when the interrupt lands
        ori(2, 0, 1),
    ]);

    bus.cop0.write(12, SR_IE_IM2);
    bus.irq.store::<u16>(4, 1);
    bus.trigger_interrupt(Interrupt::VBlank);

    cpu::execute(&mut bus, 1);

    // EPC was bumped past the GTE command so it cannot run twice
    assert_eq!(bus.cop0.read(14), PROGRAM_BASE + 4);
}

#[test]
fn software_acknowledge_clears_the_pending_line() {
    let mut bus = machine();

    bus.cop0.write(12, SR_IE_IM2);
    bus.irq.store::<u16>(4, 1);
    bus.trigger_interrupt(Interrupt::VBlank);
    assert!(bus.cop0.interrupt_pending());

    // Write-with-AND acknowledge through the bus
    bus.store::<u16>(0x1f80_1070, 0);
    assert!(!bus.cop0.interrupt_pending());
}

#[test]
fn timer_target_raises_its_interrupt() {
    let mut bus = machine();

    // Timer 0: target 100, IRQ at target
    bus.store::<u16>(0x1f80_1108, 100);
    bus.store::<u16>(0x1f80_1104, 1 << 4);
    bus.irq.store::<u16>(4, 1 << 4); // unmask timer 0

    bus.execute(128);

    let status: u16 = bus.load(IRQ_BASE);
    assert_ne!(status & (1 << 4), 0);
}

#[test]
fn instant_dma_completion_raises_its_interrupt() {
    let mut bus = machine();

    // DICR: enable channel 6 and the master enable
    bus.store::<u32>(0x1f80_10f4, (1 << 22) | (1 << 23));
    bus.irq.store::<u16>(4, 1 << 3);

    // Kick channel 6 (OTC)
    bus.store::<u32>(0x1f80_10e8, 1 << 24);
    bus.execute(64);

    let status: u16 = bus.load(IRQ_BASE);
    assert_ne!(status & (1 << 3), 0);

    // Master flag visible in DICR
    let dicr: u32 = bus.load(0x1f80_10f4);
    assert_ne!(dicr & (1 << 31), 0);
}

#[test]
fn cdrom_command_acknowledges_with_the_drive_status() {
    let mut bus = machine();

    // Unmask INT3 in the controller's enable register (bank 1)
    bus.store::<u8>(0x1f80_1800, 1);
    bus.store::<u8>(0x1f80_1802, 0x1f);

    // Getstat from bank 0
    bus.store::<u8>(0x1f80_1800, 0);
    bus.store::<u8>(0x1f80_1801, 0x01);

    bus.irq.store::<u16>(4, 1 << 2);
    bus.execute(1024);

    // Response FIFO holds the drive status
    let port: u8 = bus.load(0x1f80_1800);
    assert_ne!(port & (1 << 5), 0);
    assert_eq!(bus.load::<u8>(0x1f80_1801), 0x02);

    let status: u16 = bus.load(IRQ_BASE);
    assert_ne!(status & (1 << 2), 0);
}

#[test]
fn vblank_paces_frames() {
    let mut bus = machine_idle();

    bus.run_until_frame();

    assert_eq!(bus.gpu.frames(), 1);

    // The request line latched even though nothing unmasked it
    let status: u16 = bus.load(IRQ_BASE);
    assert_ne!(status & 1, 0);
}

#[test]
fn breakpoint_stops_before_the_instruction() {
    let mut bus = machine_with_program(&[ori(2, 0, 1), ori(3, 0, 2)]);

    bus.cpu.add_breakpoint(PROGRAM_BASE + 4);

    bus.execute(16);

    // Stopped with the second instruction unexecuted
    assert_eq!(bus.cpu.breakpoint_hit(), Some(PROGRAM_BASE + 4));
    assert_eq!(bus.cpu.register(2), 1);
    assert_eq!(bus.cpu.register(3), 0);

    // Still stopped until acknowledged
    bus.execute(16);
    assert_eq!(bus.cpu.register(3), 0);

    bus.cpu.acknowledge_breakpoint();
    bus.execute(1);
    assert_eq!(bus.cpu.register(3), 2);
}

#[test]
fn run_until_stops_at_the_address() {
    let mut bus = machine_with_program(&[
        ori(2, 0, 1),
        ori(3, 0, 2),
        ori(4, 0, 3),
    ]);

    bus.run_until(PROGRAM_BASE + 8);

    assert_eq!(bus.cpu.register(2), 1);
    assert_eq!(bus.cpu.register(3), 2);
    assert_eq!(bus.cpu.register(4), 0);
    assert!(bus.cpu.breakpoint_hit().is_none());
}
