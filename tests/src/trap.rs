use common::asm::*;

use crate::harness::*;

// Words of a zero-terminated string, one character each.
fn string(s: &str) -> Vec<u16> {
    s.bytes().map(u16::from).chain([0]).collect()
}

// Two characters per word, low byte first.
fn packed(s: &str) -> Vec<u16> {
    s.as_bytes()
        .chunks(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair.get(1).copied().unwrap_or(0)]))
        .chain([0])
        .collect()
}

#[test]
fn hello_puts() {
    let mut prog = vec![
        emit_lea(Reg::R0, 2),
        trap(TrapVector::Puts),
        halt(),
    ];
    prog.extend(string("Hello, World!\n"));
    let (emu, out) = run_with_input(&prog, b"");
    assert_eq!(out, "Hello, World!\n");
    assert_eq!(emu.reg_read(Reg::R0), START + 3);
}

#[test]
fn puts_ignores_high_byte() {
    let prog = [
        emit_lea(Reg::R0, 2),
        trap(TrapVector::Puts),
        halt(),
        0x4100 | b'o' as u16,
        0xff00 | b'k' as u16,
        0,
    ];
    let (_, out) = run_with_input(&prog, b"");
    assert_eq!(out, "ok");
}

#[test]
fn putsp() {
    for s in ["even", "odd", "x"] {
        let mut prog = vec![
            emit_lea(Reg::R0, 2),
            trap(TrapVector::Putsp),
            halt(),
        ];
        prog.extend(packed(s));
        let (_, out) = run_with_input(&prog, b"");
        assert_eq!(out, s);
    }
}

#[test]
fn out_loop() {
    // Prints "abc" by counting r0 up from 'a'.
    let (_, out) = run_with_input(&[
        emit_ld(Reg::R0, 7),
        emit_and_imm(Reg::R1, Reg::R1, 0),
        emit_add_imm(Reg::R1, Reg::R1, 3),
        trap(TrapVector::Out),
        emit_add_imm(Reg::R0, Reg::R0, 1),
        emit_add_imm(Reg::R1, Reg::R1, -1),
        emit_br(false, false, true, -4),
        halt(),
        b'a' as u16,
    ], b"");
    assert_eq!(out, "abc");
}

#[test]
fn getc_out_echo() {
    let prog = [
        trap(TrapVector::Getc),
        trap(TrapVector::Out),
        trap(TrapVector::Getc),
        trap(TrapVector::Out),
        halt(),
    ];
    let (emu, out) = run_with_input(&prog, b"hi");
    assert_eq!(out, "hi");
    assert_eq!(emu.reg_read(Reg::R0), b'i' as u16);
}

#[test]
fn in_prompt() {
    let (emu, out) = run_with_input(&[trap(TrapVector::In), halt()], b"Q");
    assert_eq!(out, "Enter a character: Q");
    assert_eq!(emu.reg_read(Reg::R0), b'Q' as u16);
}

#[test]
fn halt_stops_execution() {
    let (emu, out) = run_with_input(&[
        halt(),
        trap(TrapVector::Out),
    ], b"");
    assert_eq!(out, "");
    assert_eq!(emu.pc(), START + 1);
    assert_eq!(emu.num_ins(), 1);
}

#[test]
fn traps_keep_r7() {
    let (mut emu, _) = load(&[trap(TrapVector::Puts), halt()]);
    emu.reg_write(Reg::R0, 0x5000);
    emu.reg_write(Reg::R7, 0xbeef);
    finish(&mut emu);
    assert_eq!(emu.reg_read(Reg::R7), 0xbeef);
}
