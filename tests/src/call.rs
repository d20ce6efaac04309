use common::asm::*;

use crate::harness::*;

fn ret() -> u16 {
    emit_jmp(Reg::R7)
}

#[test]
fn jsr_forward() {
    let emu = run(&[
        emit_jsr(2),
        emit_add_imm(Reg::R1, Reg::R1, 1),
        halt(),
        // sub:
        emit_add_imm(Reg::R0, Reg::R0, 7),
        ret(),
    ]);
    assert_eq!(emu.reg_read(Reg::R0), 7);
    assert_eq!(emu.reg_read(Reg::R1), 1);
    assert_eq!(emu.reg_read(Reg::R7), START + 1);
}

#[test]
fn jsr_backward() {
    let emu = run(&[
        emit_br(true, true, true, 2),
        // sub:
        emit_add_imm(Reg::R0, Reg::R0, 3),
        ret(),
        emit_jsr(-3),
        halt(),
    ]);
    assert_eq!(emu.reg_read(Reg::R0), 3);
    assert_eq!(emu.reg_read(Reg::R7), START + 4);
}

#[test]
fn jsrr() {
    let emu = run(&[
        emit_lea(Reg::R2, 2),
        emit_jsrr(Reg::R2),
        halt(),
        // sub:
        emit_add_imm(Reg::R0, Reg::R0, 9),
        ret(),
    ]);
    assert_eq!(emu.reg_read(Reg::R0), 9);
    assert_eq!(emu.reg_read(Reg::R7), START + 2);
}

#[test]
fn jsrr_through_r7() {
    // The return address is saved before the base is read, so this just
    // falls through to the next instruction.
    let (mut emu, _) = load(&[
        emit_jsrr(Reg::R7),
        emit_add_imm(Reg::R0, Reg::R0, 1),
        halt(),
        emit_add_imm(Reg::R0, Reg::R0, 2),
        halt(),
    ]);
    emu.reg_write(Reg::R7, START + 3);
    finish(&mut emu);
    assert_eq!(emu.reg_read(Reg::R0), 1);
    assert_eq!(emu.reg_read(Reg::R7), START + 1);
    assert_eq!(emu.pc(), START + 3);
}

#[test]
fn jmp() {
    let (mut emu, _) = load(&[
        emit_jmp(Reg::R3),
        emit_add_imm(Reg::R0, Reg::R0, 1),
        halt(),
    ]);
    emu.reg_write(Reg::R3, START + 2);
    finish(&mut emu);
    assert_eq!(emu.reg_read(Reg::R0), 0);
    // Not a call.
    assert_eq!(emu.reg_read(Reg::R7), 0);
}

#[test]
fn calls_leave_cond() {
    let (mut emu, _) = load(&[
        emit_jsr(1),
        halt(),
        ret(),
    ]);
    emu.get_state_mut().set_cond(Cond::Neg);
    finish(&mut emu);
    assert_eq!(emu.cond(), Some(Cond::Neg));
}

#[test]
fn nested() {
    // The outer routine saves its return address in r6 across the inner call.
    let emu = run(&[
        emit_jsr(1),
        halt(),
        // outer:
        emit_add_reg(Reg::R6, Reg::R7, Reg::R5),
        emit_jsr(2),
        emit_jmp(Reg::R6),
        0x0000,
        // inner:
        emit_add_imm(Reg::R0, Reg::R0, 4),
        ret(),
    ]);
    assert_eq!(emu.reg_read(Reg::R0), 4);
    assert_eq!(emu.reg_read(Reg::R6), START + 1);
    assert_eq!(emu.reg_read(Reg::R7), START + 4);
}
