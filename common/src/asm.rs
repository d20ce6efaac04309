use crate::bits::{bit, field, sign_extend};

use std::fmt;

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive, ToPrimitive};
use derive_more::IsVariant;


#[derive(Debug, Clone, Copy, FromPrimitive, ToPrimitive, PartialEq, Eq, Hash)]
pub enum Reg {
    R0 = 0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
    PC,
    Cond,
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", format!("{:?}", self).to_lowercase())
    }
}

pub const NUM_REGS: usize = 10;
pub const NUM_GPRS: usize = 8;

impl Reg {
    pub const NUM_BITS: u32 = 3;
    pub const MASK: u16 = (1u16 << Self::NUM_BITS) - 1;

    // Only the general purpose registers are encodable.
    pub fn gpr(num: u16) -> Reg {
        Reg::from_u16(num & Self::MASK).unwrap()
    }

    pub fn encode(self) -> u16 {
        assert!(self.is_gpr(), "{self} can't be encoded in an instruction");
        self.to_u16().unwrap()
    }

    pub fn is_gpr(self) -> bool {
        (self as usize) < NUM_GPRS
    }

    pub fn all() -> impl Iterator<Item = Reg> {
        (0..NUM_REGS).filter_map(Reg::from_usize)
    }
}

////////////////////////////////////////////////////////////////////////////////

// Exactly one of these is held in the COND register.
#[derive(Debug, Clone, Copy, FromPrimitive, ToPrimitive, PartialEq, Eq, IsVariant)]
pub enum Cond {
    Pos = 1,
    Zero = 2,
    Neg = 4,
}

impl Cond {
    pub fn from_value(val: u16) -> Cond {
        if val == 0 {
            Cond::Zero
        } else if crate::bits::is_negative(val) {
            Cond::Neg
        } else {
            Cond::Pos
        }
    }

    pub fn bits(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for Cond {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let c = match self {
            Cond::Pos => 'p',
            Cond::Zero => 'z',
            Cond::Neg => 'n',
        };
        write!(f, "{c}")
    }
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, FromPrimitive, ToPrimitive, PartialEq, Eq)]
pub enum TrapVector {
    Getc = 0x20,
    Out,
    Puts,
    In,
    Putsp,
    Halt,
}

impl fmt::Display for TrapVector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", format!("{:?}", self).to_lowercase())
    }
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, FromPrimitive, ToPrimitive, PartialEq, Eq)]
pub enum Opcode {
    Br = 0,
    Add,
    Ld,
    St,
    Jsr,
    And,
    Ldr,
    Str,
    Rti, // Unused
    Not,
    Ldi,
    Sti,
    Jmp,
    Res, // Reserved
    Lea,
    Trap,
}

impl Opcode {
    pub const SHIFT: u32 = 12;
    pub const NUM_BITS: u32 = 4;

    fn emit(self) -> u16 {
        self.to_u16().unwrap() << Self::SHIFT
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", format!("{:?}", self).to_lowercase())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Field access. None of these validate anything; a field is just whatever bits
// are there.
////////////////////////////////////////////////////////////////////////////////

const DR_SHIFT: u32 = 9;
const SR1_SHIFT: u32 = 6;
const IMM_FLAG_BIT: u32 = 5;
const JSR_LONG_BIT: u32 = 11;
const BR_N_BIT: u32 = 11;
const BR_Z_BIT: u32 = 10;
const BR_P_BIT: u32 = 9;

pub const IMM5_BITS: u32 = 5;
pub const OFFSET6_BITS: u32 = 6;
pub const PC_OFFSET9_BITS: u32 = 9;
pub const PC_OFFSET11_BITS: u32 = 11;
pub const TRAP_VECTOR_BITS: u32 = 8;

fn mask(bits: u32) -> u16 {
    (1u16 << bits) - 1
}

pub fn opcode_of(ins: u16) -> Opcode {
    // Four bits, sixteen opcodes, so this can't fail.
    Opcode::from_u16(field(ins, Opcode::SHIFT, Opcode::NUM_BITS)).unwrap()
}

pub fn immediate_flag(ins: u16) -> bool {
    bit(ins, IMM_FLAG_BIT) == 1
}

pub fn jsr_long_flag(ins: u16) -> bool {
    bit(ins, JSR_LONG_BIT) == 1
}

// Also the source register of the stores.
pub fn dr(ins: u16) -> Reg {
    Reg::gpr(field(ins, DR_SHIFT, Reg::NUM_BITS))
}

// Also the base register of JMP, JSRR, LDR and STR.
pub fn sr1(ins: u16) -> Reg {
    Reg::gpr(field(ins, SR1_SHIFT, Reg::NUM_BITS))
}

pub fn sr2(ins: u16) -> Reg {
    Reg::gpr(field(ins, 0, Reg::NUM_BITS))
}

pub fn imm5(ins: u16) -> i16 {
    sign_extend(field(ins, 0, IMM5_BITS), IMM5_BITS) as i16
}

pub fn offset6(ins: u16) -> i16 {
    sign_extend(field(ins, 0, OFFSET6_BITS), OFFSET6_BITS) as i16
}

pub fn pc_offset9(ins: u16) -> i16 {
    sign_extend(field(ins, 0, PC_OFFSET9_BITS), PC_OFFSET9_BITS) as i16
}

pub fn pc_offset11(ins: u16) -> i16 {
    sign_extend(field(ins, 0, PC_OFFSET11_BITS), PC_OFFSET11_BITS) as i16
}

pub fn trap_vector(ins: u16) -> u8 {
    field(ins, 0, TRAP_VECTOR_BITS) as u8
}

// (n, z, p)
pub fn br_flags(ins: u16) -> (bool, bool, bool) {
    (bit(ins, BR_N_BIT) == 1, bit(ins, BR_Z_BIT) == 1, bit(ins, BR_P_BIT) == 1)
}

////////////////////////////////////////////////////////////////////////////////
// Encoding. Offsets and immediates are truncated to their field width.
////////////////////////////////////////////////////////////////////////////////

fn emit_dr_sr1(op: Opcode, dr: Reg, sr1: Reg) -> u16 {
    op.emit() | (dr.encode() << DR_SHIFT) | (sr1.encode() << SR1_SHIFT)
}

fn emit_pc_rel9(op: Opcode, reg: Reg, offset: i16) -> u16 {
    op.emit() | (reg.encode() << DR_SHIFT) | ((offset as u16) & mask(PC_OFFSET9_BITS))
}

fn emit_base_rel6(op: Opcode, reg: Reg, base: Reg, offset: i16) -> u16 {
    emit_dr_sr1(op, reg, base) | ((offset as u16) & mask(OFFSET6_BITS))
}

pub fn emit_add_reg(dr: Reg, sr1: Reg, sr2: Reg) -> u16 {
    emit_dr_sr1(Opcode::Add, dr, sr1) | sr2.encode()
}

pub fn emit_add_imm(dr: Reg, sr1: Reg, imm: i16) -> u16 {
    emit_dr_sr1(Opcode::Add, dr, sr1) | (1 << IMM_FLAG_BIT) | ((imm as u16) & mask(IMM5_BITS))
}

pub fn emit_and_reg(dr: Reg, sr1: Reg, sr2: Reg) -> u16 {
    emit_dr_sr1(Opcode::And, dr, sr1) | sr2.encode()
}

pub fn emit_and_imm(dr: Reg, sr1: Reg, imm: i16) -> u16 {
    emit_dr_sr1(Opcode::And, dr, sr1) | (1 << IMM_FLAG_BIT) | ((imm as u16) & mask(IMM5_BITS))
}

pub fn emit_br(n: bool, z: bool, p: bool, offset: i16) -> u16 {
    Opcode::Br.emit()
        | ((n as u16) << BR_N_BIT)
        | ((z as u16) << BR_Z_BIT)
        | ((p as u16) << BR_P_BIT)
        | ((offset as u16) & mask(PC_OFFSET9_BITS))
}

pub fn emit_jmp(base: Reg) -> u16 {
    Opcode::Jmp.emit() | (base.encode() << SR1_SHIFT)
}

pub fn emit_jsr(offset: i16) -> u16 {
    Opcode::Jsr.emit() | (1 << JSR_LONG_BIT) | ((offset as u16) & mask(PC_OFFSET11_BITS))
}

pub fn emit_jsrr(base: Reg) -> u16 {
    Opcode::Jsr.emit() | (base.encode() << SR1_SHIFT)
}

pub fn emit_ld(dr: Reg, offset: i16) -> u16 {
    emit_pc_rel9(Opcode::Ld, dr, offset)
}

pub fn emit_ldi(dr: Reg, offset: i16) -> u16 {
    emit_pc_rel9(Opcode::Ldi, dr, offset)
}

pub fn emit_ldr(dr: Reg, base: Reg, offset: i16) -> u16 {
    emit_base_rel6(Opcode::Ldr, dr, base, offset)
}

pub fn emit_lea(dr: Reg, offset: i16) -> u16 {
    emit_pc_rel9(Opcode::Lea, dr, offset)
}

// The low six bits of NOT are all ones.
pub fn emit_not(dr: Reg, sr: Reg) -> u16 {
    emit_dr_sr1(Opcode::Not, dr, sr) | mask(6)
}

pub fn emit_st(sr: Reg, offset: i16) -> u16 {
    emit_pc_rel9(Opcode::St, sr, offset)
}

pub fn emit_sti(sr: Reg, offset: i16) -> u16 {
    emit_pc_rel9(Opcode::Sti, sr, offset)
}

pub fn emit_str(sr: Reg, base: Reg, offset: i16) -> u16 {
    emit_base_rel6(Opcode::Str, sr, base, offset)
}

pub fn emit_trap(vector: u8) -> u16 {
    Opcode::Trap.emit() | vector as u16
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq, IsVariant)]
pub enum Operand {
    Reg(Reg),
    Imm(i16),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operand::Reg(r) => write!(f, "{r}"),
            Operand::Imm(imm) => write!(f, "#{imm}"),
        }
    }
}

// A decoded instruction. Offsets are already sign extended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IsVariant)]
pub enum Ins {
    Br { n: bool, z: bool, p: bool, offset: i16 },
    Add { dr: Reg, sr1: Reg, src2: Operand },
    Ld { dr: Reg, offset: i16 },
    St { sr: Reg, offset: i16 },
    Jsr { offset: i16 },
    Jsrr { base: Reg },
    And { dr: Reg, sr1: Reg, src2: Operand },
    Ldr { dr: Reg, base: Reg, offset: i16 },
    Str { sr: Reg, base: Reg, offset: i16 },
    Rti,
    Not { dr: Reg, sr: Reg },
    Ldi { dr: Reg, offset: i16 },
    Sti { sr: Reg, offset: i16 },
    Jmp { base: Reg },
    Res,
    Lea { dr: Reg, offset: i16 },
    Trap { vector: u8 },
}

impl Ins {
    fn decode_src2(ins: u16) -> Operand {
        if immediate_flag(ins) {
            Operand::Imm(imm5(ins))
        } else {
            Operand::Reg(sr2(ins))
        }
    }

    // Every word decodes to something; whether it can be executed is up to
    // the emulator.
    pub fn decode(ins: u16) -> Ins {
        match opcode_of(ins) {
            Opcode::Br => {
                let (n, z, p) = br_flags(ins);
                Ins::Br{n, z, p, offset: pc_offset9(ins)}
            },
            Opcode::Add => Ins::Add{dr: dr(ins), sr1: sr1(ins), src2: Self::decode_src2(ins)},
            Opcode::Ld => Ins::Ld{dr: dr(ins), offset: pc_offset9(ins)},
            Opcode::St => Ins::St{sr: dr(ins), offset: pc_offset9(ins)},
            Opcode::Jsr if jsr_long_flag(ins) => Ins::Jsr{offset: pc_offset11(ins)},
            Opcode::Jsr => Ins::Jsrr{base: sr1(ins)},
            Opcode::And => Ins::And{dr: dr(ins), sr1: sr1(ins), src2: Self::decode_src2(ins)},
            Opcode::Ldr => Ins::Ldr{dr: dr(ins), base: sr1(ins), offset: offset6(ins)},
            Opcode::Str => Ins::Str{sr: dr(ins), base: sr1(ins), offset: offset6(ins)},
            Opcode::Rti => Ins::Rti,
            Opcode::Not => Ins::Not{dr: dr(ins), sr: sr1(ins)},
            Opcode::Ldi => Ins::Ldi{dr: dr(ins), offset: pc_offset9(ins)},
            Opcode::Sti => Ins::Sti{sr: dr(ins), offset: pc_offset9(ins)},
            Opcode::Jmp => Ins::Jmp{base: sr1(ins)},
            Opcode::Res => Ins::Res,
            Opcode::Lea => Ins::Lea{dr: dr(ins), offset: pc_offset9(ins)},
            Opcode::Trap => Ins::Trap{vector: trap_vector(ins)},
        }
    }

    pub fn encode(&self) -> u16 {
        match *self {
            Ins::Br{n, z, p, offset} => emit_br(n, z, p, offset),
            Ins::Add{dr, sr1, src2: Operand::Reg(sr2)} => emit_add_reg(dr, sr1, sr2),
            Ins::Add{dr, sr1, src2: Operand::Imm(imm)} => emit_add_imm(dr, sr1, imm),
            Ins::Ld{dr, offset} => emit_ld(dr, offset),
            Ins::St{sr, offset} => emit_st(sr, offset),
            Ins::Jsr{offset} => emit_jsr(offset),
            Ins::Jsrr{base} => emit_jsrr(base),
            Ins::And{dr, sr1, src2: Operand::Reg(sr2)} => emit_and_reg(dr, sr1, sr2),
            Ins::And{dr, sr1, src2: Operand::Imm(imm)} => emit_and_imm(dr, sr1, imm),
            Ins::Ldr{dr, base, offset} => emit_ldr(dr, base, offset),
            Ins::Str{sr, base, offset} => emit_str(sr, base, offset),
            Ins::Rti => Opcode::Rti.emit(),
            Ins::Not{dr, sr} => emit_not(dr, sr),
            Ins::Ldi{dr, offset} => emit_ldi(dr, offset),
            Ins::Sti{sr, offset} => emit_sti(sr, offset),
            Ins::Jmp{base} => emit_jmp(base),
            Ins::Res => Opcode::Res.emit(),
            Ins::Lea{dr, offset} => emit_lea(dr, offset),
            Ins::Trap{vector} => emit_trap(vector),
        }
    }

    pub fn opcode(&self) -> Opcode {
        opcode_of(self.encode())
    }

    pub fn display_with_pc(&self, pc: u16) -> InsWithPc<'_> {
        InsWithPc(self, pc)
    }

    // With a pc, PC relative targets are printed as absolute addresses.
    pub fn fmt_with_pc(&self, f: &mut fmt::Formatter, pc: Option<u16>) -> fmt::Result {
        let target = |offset: i16| Target{offset, pc};
        match *self {
            Ins::Br{n: false, z: false, p: false, ..} => write!(f, "nop"),
            Ins::Br{n, z, p, offset} => {
                write!(f, "br")?;
                for (set, c) in [(n, 'n'), (z, 'z'), (p, 'p')] {
                    if set {
                        write!(f, "{c}")?;
                    }
                }
                write!(f, "\t{}", target(offset))
            },
            Ins::Add{dr, sr1, src2} => write!(f, "add\t{dr}, {sr1}, {src2}"),
            Ins::And{dr, sr1, src2} => write!(f, "and\t{dr}, {sr1}, {src2}"),
            Ins::Not{dr, sr} => write!(f, "not\t{dr}, {sr}"),
            Ins::Ld{dr, offset} => write!(f, "ld\t{dr}, {}", target(offset)),
            Ins::Ldi{dr, offset} => write!(f, "ldi\t{dr}, {}", target(offset)),
            Ins::Lea{dr, offset} => write!(f, "lea\t{dr}, {}", target(offset)),
            Ins::St{sr, offset} => write!(f, "st\t{sr}, {}", target(offset)),
            Ins::Sti{sr, offset} => write!(f, "sti\t{sr}, {}", target(offset)),
            Ins::Ldr{dr, base, offset} => write!(f, "ldr\t{dr}, {base}, #{offset}"),
            Ins::Str{sr, base, offset} => write!(f, "str\t{sr}, {base}, #{offset}"),
            Ins::Jsr{offset} => write!(f, "jsr\t{}", target(offset)),
            Ins::Jsrr{base} => write!(f, "jsrr\t{base}"),
            Ins::Jmp{base: Reg::R7} => write!(f, "ret"),
            Ins::Jmp{base} => write!(f, "jmp\t{base}"),
            Ins::Trap{vector} => {
                write!(f, "trap\tx{vector:02x}")?;
                if let Some(known) = TrapVector::from_u8(vector) {
                    write!(f, "\t; {known}")?;
                }
                Ok(())
            },
            Ins::Rti => write!(f, "rti"),
            Ins::Res => write!(f, "res"),
        }
    }
}

impl fmt::Display for Ins {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.fmt_with_pc(f, None)
    }
}

// Just for formatting, like Path::Display()
pub struct InsWithPc<'a>(&'a Ins, u16);

impl fmt::Display for InsWithPc<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt_with_pc(f, Some(self.1))
    }
}

struct Target {
    offset: i16,
    pc: Option<u16>, // Address of the instruction, not the incremented PC.
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.pc {
            Some(pc) => write!(f, "x{:04x}", pc.wrapping_add(1).wrapping_add(self.offset as u16)),
            None => write!(f, "#{}", self.offset),
        }
    }
}

// Groups of four bits, most significant first. Handy in logs.
pub fn nibbles(ins: u16) -> String {
    format!(
        "{:04b} {:04b} {:04b} {:04b}",
        ins >> 12, (ins >> 8) & 0xf, (ins >> 4) & 0xf, ins & 0xf,
    )
}
