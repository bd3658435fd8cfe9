//! CPU pipeline semantics: delay slots, branches, arithmetic edge cases.

use super::asm::*;
use crate::psx::cpu;

#[test]
fn load_delay_hides_the_value_for_one_instruction() {
    let mut bus = machine_with_program(&[
        lw(2, 1, 0),     // r2 <- [r1]
        addu(3, 2, 0),   // reads the stale r2
        addu(4, 2, 0),   // reads the loaded r2
    ]);

    bus.store::<u32>(0x8000_2000, 0x1234_5678);
    bus.cpu.set_register(1, 0x8000_2000);
    bus.cpu.set_register(2, 0xaaaa_aaaa);

    cpu::execute(&mut bus, 3);

    assert_eq!(bus.cpu.register(3), 0xaaaa_aaaa);
    assert_eq!(bus.cpu.register(4), 0x1234_5678);
}

#[test]
fn register_write_in_the_delay_shadow_wins_over_the_load() {
    let mut bus = machine_with_program(&[
        lw(2, 1, 0),      // queues r2 <- [r1]
        ori(2, 0, 0x55),  // direct write to r2 while the load is in flight
        nop(),
        nop(),
    ]);

    bus.store::<u32>(0x8000_2000, 0x1234_5678);
    bus.cpu.set_register(1, 0x8000_2000);

    cpu::execute(&mut bus, 4);

    assert_eq!(bus.cpu.register(2), 0x55);
}

#[test]
fn taken_branch_executes_its_delay_slot() {
    let mut bus = machine_with_program(&[
        beq(0, 0, 2),    // branch to +2 instructions after the delay slot
        ori(2, 0, 1),    // delay slot, must run
        ori(3, 0, 2),    // skipped
        ori(4, 0, 3),    // branch target
    ]);

    cpu::execute(&mut bus, 3);

    assert_eq!(bus.cpu.register(2), 1);
    assert_eq!(bus.cpu.register(3), 0);
    assert_eq!(bus.cpu.register(4), 3);
}

#[test]
fn untaken_branch_also_executes_its_delay_slot() {
    let mut bus = machine_with_program(&[
        bne(0, 0, 2),    // never taken
        ori(2, 0, 1),    // delay slot
        ori(3, 0, 2),    // falls through to here
    ]);

    cpu::execute(&mut bus, 3);

    assert_eq!(bus.cpu.register(2), 1);
    assert_eq!(bus.cpu.register(3), 2);
}

#[test]
fn jal_links_past_the_delay_slot() {
    let target = PROGRAM_BASE + 0x100;
    let mut bus = machine_with_program(&[
        jal(target),
        ori(2, 0, 1),    // delay slot
    ]);

    load_program(&mut bus, target, &[ori(3, 0, 7)]);

    cpu::execute(&mut bus, 3);

    assert_eq!(bus.cpu.register(31), PROGRAM_BASE + 8);
    assert_eq!(bus.cpu.register(2), 1);
    assert_eq!(bus.cpu.register(3), 7);
}

#[test]
fn jr_returns_through_the_link_register() {
    let mut bus = machine_with_program(&[
        jr(31),
        ori(2, 0, 1),    // delay slot
    ]);

    let target = PROGRAM_BASE + 0x40;
    load_program(&mut bus, target, &[ori(3, 0, 9)]);
    bus.cpu.set_register(31, target);

    cpu::execute(&mut bus, 3);

    assert_eq!(bus.cpu.register(2), 1);
    assert_eq!(bus.cpu.register(3), 9);
}

#[test]
fn add_overflow_traps_and_leaves_the_destination_alone() {
    let mut bus = machine_with_program(&[add(3, 1, 2)]);

    bus.cpu.set_register(1, 0x7fff_ffff);
    bus.cpu.set_register(2, 1);
    bus.cpu.set_register(3, 0xdead_beef);

    cpu::execute(&mut bus, 1);

    assert_eq!(bus.cpu.register(3), 0xdead_beef);
    // Cause code 12 (arithmetic overflow), EPC on the faulting instruction
    assert_eq!((bus.cop0.read(13) >> 2) & 0x1f, 12);
    assert_eq!(bus.cop0.read(14), PROGRAM_BASE);
    assert_eq!(bus.cpu.pc(), 0x8000_0080);
}

#[test]
fn addu_wraps_silently() {
    let mut bus = machine_with_program(&[addu(3, 1, 2)]);

    bus.cpu.set_register(1, 0x7fff_ffff);
    bus.cpu.set_register(2, 1);

    cpu::execute(&mut bus, 1);

    assert_eq!(bus.cpu.register(3), 0x8000_0000);
    assert_eq!(bus.cpu.pc(), PROGRAM_BASE + 4);
}

#[test]
fn addi_overflow_traps_like_add() {
    let mut bus = machine_with_program(&[addi(3, 1, -1)]);

    bus.cpu.set_register(1, 0x8000_0000);
    bus.cpu.set_register(3, 0x1111_1111);

    cpu::execute(&mut bus, 1);

    assert_eq!(bus.cpu.register(3), 0x1111_1111);
    assert_eq!((bus.cop0.read(13) >> 2) & 0x1f, 12);
}

#[test]
fn sub_overflow_traps_subu_wraps() {
    let mut bus = machine_with_program(&[sub(3, 1, 2), subu(4, 1, 2)]);

    bus.cpu.set_register(1, 0x8000_0000);
    bus.cpu.set_register(2, 1);

    cpu::execute(&mut bus, 1);
    assert_eq!(bus.cpu.register(3), 0);
    assert_eq!((bus.cop0.read(13) >> 2) & 0x1f, 12);

    // The machine trapped to the handler; run the second instruction
    // directly from there
    bus.cpu.set_program_counter(PROGRAM_BASE + 4);
    cpu::execute(&mut bus, 1);
    assert_eq!(bus.cpu.register(4), 0x7fff_ffff);
}

#[test]
fn div_by_zero_yields_the_substitute_values() {
    // Positive dividend
    let mut bus = machine_with_program(&[div(1, 2), mflo(3), mfhi(4)]);

    bus.cpu.set_register(1, 42);

    cpu::execute(&mut bus, 3);
    assert_eq!(bus.cpu.register(3), 0xffff_ffff);
    assert_eq!(bus.cpu.register(4), 42);

    // Negative dividend
    let mut bus = machine_with_program(&[div(1, 2), mflo(3), mfhi(4)]);

    bus.cpu.set_register(1, (-42i32) as u32);

    cpu::execute(&mut bus, 3);
    assert_eq!(bus.cpu.register(3), 1);
    assert_eq!(bus.cpu.register(4), (-42i32) as u32);
}

#[test]
fn div_min_by_minus_one_saturates() {
    let mut bus = machine_with_program(&[div(1, 2), mflo(3), mfhi(4)]);

    bus.cpu.set_register(1, 0x8000_0000);
    bus.cpu.set_register(2, 0xffff_ffff);

    cpu::execute(&mut bus, 3);

    assert_eq!(bus.cpu.register(3), 0x8000_0000);
    assert_eq!(bus.cpu.register(4), 0);
}

#[test]
fn divu_by_zero_yields_all_ones_quotient() {
    let mut bus = machine_with_program(&[divu(1, 2), mflo(3), mfhi(4)]);

    bus.cpu.set_register(1, 0x1234);

    cpu::execute(&mut bus, 3);

    assert_eq!(bus.cpu.register(3), 0xffff_ffff);
    assert_eq!(bus.cpu.register(4), 0x1234);
}

#[test]
fn unaligned_word_assembles_through_lwr_lwl_with_pending_load() {
    // Bytes 0x11..0x88 at an aligned base; read the word at base + 1
    let mut bus = machine_with_program(&[
        lwr(2, 1, 0),
        lwl(2, 1, 3),
        nop(),
        nop(),
    ]);

    bus.store::<u32>(0x8000_2000, 0x4433_2211);
    bus.store::<u32>(0x8000_2004, 0x8877_6655);
    bus.cpu.set_register(1, 0x8000_2001);

    cpu::execute(&mut bus, 4);

    assert_eq!(bus.cpu.register(2), 0x5544_3322);
}

#[test]
fn misaligned_load_sets_bad_vaddr() {
    let mut bus = machine_with_program(&[lw(2, 1, 1)]);

    bus.cpu.set_register(1, 0x8000_2000);

    cpu::execute(&mut bus, 1);

    // Cause 4 (address error on load), BadVaddr holds the address
    assert_eq!((bus.cop0.read(13) >> 2) & 0x1f, 4);
    assert_eq!(bus.cop0.read(8), 0x8000_2001);
    assert_eq!(bus.cpu.pc(), 0x8000_0080);
}

#[test]
fn misaligned_store_sets_bad_vaddr() {
    let mut bus = machine_with_program(&[sw(2, 1, 2)]);

    bus.cpu.set_register(1, 0x8000_2000);

    cpu::execute(&mut bus, 1);

    assert_eq!((bus.cop0.read(13) >> 2) & 0x1f, 5);
    assert_eq!(bus.cop0.read(8), 0x8000_2002);
}

#[test]
fn exception_in_delay_slot_reports_the_branch() {
    let mut bus = machine_with_program(&[
        beq(0, 0, 4),
        add(3, 1, 2),    // delay slot, overflows
    ]);

    bus.cpu.set_register(1, 0x7fff_ffff);
    bus.cpu.set_register(2, 1);

    cpu::execute(&mut bus, 2);

    // EPC points at the branch, the branch-delay bit is set
    assert_eq!(bus.cop0.read(14), PROGRAM_BASE);
    assert_ne!(bus.cop0.read(13) & (1 << 31), 0);
}

#[test]
fn gte_accessible_through_cop2_moves_and_commands() {
    let mut bus = machine_with_program(&[
        mtc2(1, 9),        // IR1 <- r1
        cop2(0x28),        // SQR, no shift
        mfc2(3, 25),       // r3 <- MAC1
        nop(),
        nop(),
    ]);

    bus.cpu.set_register(1, 3);

    cpu::execute(&mut bus, 5);

    assert_eq!(bus.cpu.register(3), 9);
}

#[test]
fn mfc0_goes_through_the_load_delay_slot() {
    let mut bus = machine_with_program(&[
        mtc0(1, 12),     // SR <- r1
        mfc0(2, 12),     // queues r2 <- SR
        addu(3, 2, 0),   // still sees the old r2
        addu(4, 2, 0),   // sees SR
    ]);

    bus.cpu.set_register(1, 0x1040_0000);
    bus.cpu.set_register(2, 0x7777_7777);

    cpu::execute(&mut bus, 4);

    assert_eq!(bus.cpu.register(3), 0x7777_7777);
    assert_eq!(bus.cpu.register(4), 0x1040_0000);
}

#[test]
#[should_panic]
fn reserved_opcode_is_fatal() {
    // Opcode 0x3f does not exist on this machine
    let mut bus = machine_with_program(&[0xfc00_0000]);

    cpu::execute(&mut bus, 1);
}
