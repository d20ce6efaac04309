use common::asm::*;

use crate::harness::*;

#[test]
fn add_chain() {
    let emu = run(&[
        emit_and_imm(Reg::R0, Reg::R0, 0),
        emit_add_imm(Reg::R0, Reg::R0, 15),
        emit_add_imm(Reg::R0, Reg::R0, 15),
        emit_add_reg(Reg::R1, Reg::R0, Reg::R0),
        halt(),
    ]);
    assert_eq!(emu.reg_read(Reg::R0), 30);
    assert_eq!(emu.reg_read(Reg::R1), 60);
}

#[test]
fn imm5_extremes() {
    let emu = run(&[
        emit_add_imm(Reg::R0, Reg::R0, -16),
        emit_add_imm(Reg::R1, Reg::R1, 15),
        halt(),
    ]);
    assert_eq!(emu.reg_read(Reg::R0), 0xfff0);
    assert_eq!(emu.reg_read(Reg::R1), 15);
}

#[test]
fn add_overflow_wraps() {
    let (mut emu, _) = load(&[
        emit_add_reg(Reg::R2, Reg::R0, Reg::R1),
        emit_add_imm(Reg::R3, Reg::R1, 1),
        halt(),
    ]);
    emu.reg_write(Reg::R0, 0x7fff);
    emu.reg_write(Reg::R1, 0xffff);
    finish(&mut emu);
    assert_eq!(emu.reg_read(Reg::R2), 0x7ffe);
    assert_eq!(emu.reg_read(Reg::R3), 0);
    assert_eq!(emu.cond(), Some(Cond::Zero));
}

#[test]
fn and_mask() {
    let (mut emu, _) = load(&[
        emit_and_imm(Reg::R2, Reg::R1, 15),
        emit_and_imm(Reg::R3, Reg::R1, -1),
        emit_and_reg(Reg::R4, Reg::R1, Reg::R0),
        halt(),
    ]);
    emu.reg_write(Reg::R0, 0xff00);
    emu.reg_write(Reg::R1, 0xabcd);
    finish(&mut emu);
    assert_eq!(emu.reg_read(Reg::R2), 0x000d);
    assert_eq!(emu.reg_read(Reg::R3), 0xabcd);
    assert_eq!(emu.reg_read(Reg::R4), 0xab00);
}

#[test]
fn not_twice() {
    let (mut emu, _) = load(&[
        emit_not(Reg::R1, Reg::R0),
        emit_not(Reg::R2, Reg::R1),
        halt(),
    ]);
    emu.reg_write(Reg::R0, 0x0f0f);
    finish(&mut emu);
    assert_eq!(emu.reg_read(Reg::R1), 0xf0f0);
    assert_eq!(emu.reg_read(Reg::R2), 0x0f0f);
}

#[test]
fn subtract() {
    // r2 = r0 - r1, by negating r1.
    let (mut emu, _) = load(&[
        emit_not(Reg::R1, Reg::R1),
        emit_add_imm(Reg::R1, Reg::R1, 1),
        emit_add_reg(Reg::R2, Reg::R0, Reg::R1),
        halt(),
    ]);
    emu.reg_write(Reg::R0, 20);
    emu.reg_write(Reg::R1, 7);
    finish(&mut emu);
    assert_eq!(emu.reg_read(Reg::R2), 13);
}

#[test]
fn same_src_and_dst() {
    let (mut emu, _) = load(&[
        emit_add_reg(Reg::R5, Reg::R5, Reg::R5),
        emit_add_reg(Reg::R5, Reg::R5, Reg::R5),
        halt(),
    ]);
    emu.reg_write(Reg::R5, 3);
    finish(&mut emu);
    assert_eq!(emu.reg_read(Reg::R5), 12);
}
