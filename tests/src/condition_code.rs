use common::asm::*;

use crate::harness::*;

fn cond_after(prog: &[u16], setup: impl FnOnce(&mut emu_lib::Emulator)) -> Option<Cond> {
    let (mut emu, _) = load(prog);
    setup(&mut emu);
    finish(&mut emu);
    emu.cond()
}

#[test]
fn writers_set_cond() {
    let cases: &[(u16, u16, Cond)] = &[
        (emit_add_imm(Reg::R0, Reg::R1, 0), 0x8000, Cond::Neg),
        (emit_add_imm(Reg::R0, Reg::R1, 0), 0, Cond::Zero),
        (emit_add_imm(Reg::R0, Reg::R1, 0), 0x7fff, Cond::Pos),
        (emit_and_reg(Reg::R0, Reg::R1, Reg::R1), 0xffff, Cond::Neg),
        (emit_not(Reg::R0, Reg::R1), 0xffff, Cond::Zero),
        (emit_not(Reg::R0, Reg::R1), 0x8000, Cond::Pos),
        (emit_ldr(Reg::R0, Reg::R2, 0), 0, Cond::Neg),
    ];
    for &(ins, r1, expected) in cases {
        let got = cond_after(&[ins, halt()], |emu| {
            emu.reg_write(Reg::R1, r1);
            emu.reg_write(Reg::R2, 0x5000);
            emu.get_state_mut().mem_write(0x5000, 0xfffe);
        });
        assert_eq!(got, Some(expected), "{}", Ins::decode(ins));
    }
}

#[test]
fn non_writers_keep_cond() {
    let progs: &[&[u16]] = &[
        &[emit_st(Reg::R1, 5), halt()],
        &[emit_str(Reg::R1, Reg::R1, 0), halt()],
        &[emit_br(false, false, false, 0), halt()],
        &[emit_jsr(0), halt()],
        &[emit_lea(Reg::R3, 1), emit_jmp(Reg::R3), 0, halt()],
    ];
    for (i, prog) in progs.iter().enumerate() {
        let got = cond_after(prog, |emu| {
            emu.reg_write(Reg::R1, 0x4000);
            emu.get_state_mut().set_cond(Cond::Neg);
        });
        // The lea in the last program sets it.
        let expected = if i == progs.len() - 1 { Cond::Pos } else { Cond::Neg };
        assert_eq!(got, Some(expected), "program {i}");
    }
}

#[test]
fn traps_keep_cond_except_input() {
    let (mut emu, console) = load(&[
        trap(TrapVector::Out),
        halt(),
    ]);
    emu.reg_write(Reg::R0, b'x' as u16);
    emu.get_state_mut().set_cond(Cond::Neg);
    finish(&mut emu);
    assert_eq!(emu.cond(), Some(Cond::Neg));
    assert_eq!(console.take_output_string(), "xHALT\n");

    let (emu, _) = run_with_input(&[trap(TrapVector::Getc), halt()], b"\x00");
    assert_eq!(emu.cond(), Some(Cond::Zero));
}
