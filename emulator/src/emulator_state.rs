use common::asm::{Cond, NUM_REGS, Reg};
use common::constants::{DEFAULT_ORIGIN, MEM_WORDS};

use std::fmt;

use bytemuck::cast_slice;
use log::trace;
use num_traits::{FromPrimitive, ToPrimitive};

// This is separate so a mutable borrow can be passed to the MMIO handlers.
// Accesses here are plain storage; device side effects live in the Emulator.
pub struct MachineState {
    num_ins: usize,
    mem: Vec<u16>,
    regs: [u16; NUM_REGS],
}

impl MachineState {
    pub fn new() -> Self {
        Self::with_origin(DEFAULT_ORIGIN)
    }

    pub fn with_origin(origin: u16) -> Self {
        let mut state = MachineState {
            num_ins: 0usize,
            mem: vec![0; MEM_WORDS],
            regs: [0; NUM_REGS],
        };
        state.reg_write(Reg::PC, origin);
        state.set_cond(Cond::Zero);
        state
    }

    pub fn inc_ins(&mut self) {
        self.num_ins += 1;
    }

    pub fn num_ins(&self) -> usize {
        self.num_ins
    }

    pub fn mem_read(&self, addr: u16) -> u16 {
        self.mem[addr as usize]
    }

    pub fn mem_write(&mut self, addr: u16, val: u16) {
        trace!("Mem: writing {val:#06x} to {addr:#06x}");
        self.mem[addr as usize] = val;
    }

    // Returns the number of words written; anything past the top of memory
    // is dropped.
    pub fn mem_write_slice(&mut self, start: u16, words: &[u16]) -> usize {
        let start = start as usize;
        let len = usize::min(words.len(), MEM_WORDS - start);
        self.mem[start..start + len].copy_from_slice(&words[..len]);
        len
    }

    pub fn reg_read(&self, reg: Reg) -> u16 {
        self.regs[reg.to_usize().unwrap()]
    }

    pub fn reg_write(&mut self, reg: Reg, val: u16) {
        trace!("Reg: writing {val:#06x} to {reg}");
        self.regs[reg.to_usize().unwrap()] = val;
    }

    pub fn pc(&self) -> u16 {
        self.reg_read(Reg::PC)
    }

    pub fn set_pc(&mut self, pc: u16) {
        self.reg_write(Reg::PC, pc);
    }

    // None only if COND was overwritten with something other than a single flag.
    pub fn cond(&self) -> Option<Cond> {
        Cond::from_u16(self.reg_read(Reg::Cond))
    }

    pub fn set_cond(&mut self, cond: Cond) {
        self.reg_write(Reg::Cond, cond.bits());
    }

    // Sets COND from a value just written to `reg`.
    pub fn update_cond(&mut self, reg: Reg) {
        let cond = Cond::from_value(self.reg_read(reg));
        self.set_cond(cond);
    }

    // Hash of all of memory, so a dump shows when anything changed.
    pub fn fingerprint(&self) -> u32 {
        const PRIME: i32 = 16777619;
        let bytes: &[u8] = cast_slice(self.mem.as_slice());

        let mut hash = 2166136261u32 as i32;
        for byte in bytes {
            hash = (hash ^ (*byte as i32)).wrapping_mul(PRIME);
        }

        // Arithmetic shifts, as the hash is signed.
        hash = hash.wrapping_add(hash << 13);
        hash ^= hash >> 7;
        hash = hash.wrapping_add(hash << 3);
        hash ^= hash >> 17;
        hash = hash.wrapping_add(hash << 5);
        hash as u32
    }

    pub fn dump(&self) -> StateDump<'_> {
        StateDump(self)
    }
}

impl Default for MachineState {
    fn default() -> Self {
        Self::new()
    }
}

// Just for formatting, like Path::Display()
pub struct StateDump<'a>(&'a MachineState);

impl fmt::Display for StateDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = self.0;
        writeln!(f, "Instruction: {}, Memory: {:#x}", state.num_ins(), state.fingerprint())?;
        for (i, reg) in Reg::all().enumerate() {
            write!(f, "\tR{i}({:#x})", state.reg_read(reg))?;
            if i + 1 < NUM_REGS {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
