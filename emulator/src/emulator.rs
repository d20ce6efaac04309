mod trap;

use common::asm::*;
use common::constants::DEFAULT_ORIGIN;
use objfile::ObjFile;

use crate::io::MMIOHandler;
use crate::io::console::Console;
use crate::io::keyboard::Keyboard;
use crate::{Fault, MachineState};

use std::collections::HashMap;
use std::ops::BitAnd;
use std::sync::{Arc, Mutex};

use delegate::delegate;
use log::{debug, warn};


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecRet {
    Continue,
    Halt,
}

#[derive(Debug, Clone)]
pub struct Config {
    // Initial PC.
    pub origin: u16,
    // Print registers and a memory fingerprint to stderr before every instruction.
    pub dump_state: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            origin: DEFAULT_ORIGIN,
            dump_state: false,
        }
    }
}


pub struct Emulator {
    state: MachineState,
    console: Arc<dyn Console>,
    mmio_handlers: HashMap<u16, Arc<Mutex<dyn MMIOHandler>>>,
    config: Config,
}

impl Emulator {
    // How often, in instructions, the console is asked about Ctrl-C.
    pub const INTERRUPT_CHECK_INTERVAL: usize = 4096;

    pub fn new(console: Arc<dyn Console>) -> Emulator {
        Self::with_config(console, Config::default())
    }

    pub fn with_config(console: Arc<dyn Console>, config: Config) -> Emulator {
        let mut emu = Emulator {
            state: MachineState::with_origin(config.origin),
            console: console.clone(),
            mmio_handlers: HashMap::new(),
            config,
        };
        emu.set_mmio_handler(Keyboard::new(console));
        emu
    }

    delegate! {
        to self.state {
            pub fn reg_read(&self, reg: Reg) -> u16;
            pub fn reg_write(&mut self, reg: Reg, val: u16);
            pub fn pc(&self) -> u16;
            pub fn cond(&self) -> Option<Cond>;
            pub fn num_ins(&self) -> usize;
        }
    }

    // Run until a halt or a fault.
    pub fn run(&mut self) -> Result<(), Fault> {
        loop {
            if self.run_ins()? == ExecRet::Halt {
                return Ok(());
            }
        }
    }

    pub fn run_at(&mut self, pc: u16) -> Result<(), Fault> {
        self.state.set_pc(pc);
        self.run()
    }

    // Like run(), but gives up after max_ins instructions, returning Continue.
    pub fn run_limited(&mut self, max_ins: usize) -> Result<ExecRet, Fault> {
        for _ in 0..max_ins {
            if self.run_ins()? == ExecRet::Halt {
                return Ok(ExecRet::Halt);
            }
        }
        Ok(ExecRet::Continue)
    }

    // Fetch, decode and execute a single instruction.
    pub fn run_ins(&mut self) -> Result<ExecRet, Fault> {
        if self.config.dump_state {
            eprintln!("{}", self.state.dump());
        }
        self.state.inc_ins();
        if self.state.num_ins() % Self::INTERRUPT_CHECK_INTERVAL == 0 {
            self.console.check_interrupt()?;
        }

        let pc = self.state.pc();
        let raw = self.mem_read(pc)?;
        // PC relative operands are relative to the next instruction.
        self.state.set_pc(pc.wrapping_add(1));

        let ins = Ins::decode(raw);
        debug!("PC: {pc:#06x}: {}", ins.display_with_pc(pc));
        self.exec(&ins, raw, pc)
    }

    // Returns the number of words written, which is less than words.len() if
    // the image runs off the top of memory.
    pub fn load_image(&mut self, words: &[u16], origin: u16) -> usize {
        let written = self.state.mem_write_slice(origin, words);
        if written < words.len() {
            warn!("Image at {origin:#06x} truncated to {written} of {} words", words.len());
        }
        written
    }

    pub fn load_obj(&mut self, obj: &ObjFile) -> usize {
        self.load_image(&obj.words, obj.origin)
    }

    pub fn set_mmio_handler_for<M, I>(&mut self, handler: M, addrs: I)
    where
        M: MMIOHandler + 'static,
        I: IntoIterator<Item = u16> {

        let handler = Arc::new(Mutex::new(handler));
        for addr in addrs.into_iter() {
            self.register_handler(handler.clone(), addr);
        }
    }

    pub fn set_mmio_handler(&mut self, handler: impl MMIOHandler + 'static) {
        let addrs = handler.default_addrs().to_vec();
        self.set_mmio_handler_for(handler, addrs);
    }

    fn register_handler(&mut self, handler: Arc<Mutex<dyn MMIOHandler>>, addr: u16) {
        let prev = self.mmio_handlers.insert(addr, handler);
        assert!(prev.is_none(), "Duplicate MMIOHandler for {addr:#06x}");
    }

    pub fn console(&self) -> &Arc<dyn Console> {
        &self.console
    }

    pub fn get_state(&self) -> &MachineState {
        &self.state
    }

    pub fn get_state_mut(&mut self) -> &mut MachineState {
        &mut self.state
    }


    ///////////////////////////////////////////////////////////////////////////


    pub fn mem_read(&mut self, addr: u16) -> Result<u16, Fault> {
        if let Some(handler) = self.mmio_handlers.get(&addr) {
            return handler.lock().unwrap().read_word(&mut self.state, addr);
        }
        Ok(self.state.mem_read(addr))
    }

    pub fn mem_write(&mut self, addr: u16, val: u16) -> Result<(), Fault> {
        if let Some(handler) = self.mmio_handlers.get(&addr) {
            return handler.lock().unwrap().write_word(&mut self.state, addr, val);
        }
        self.state.mem_write(addr, val);
        Ok(())
    }

    // Writes a destination register, which is what sets the condition codes.
    fn write_dr(&mut self, dr: Reg, val: u16) {
        self.state.reg_write(dr, val);
        self.state.update_cond(dr);
    }

    fn pc_relative(&self, offset: i16) -> u16 {
        self.state.pc().wrapping_add(offset as u16)
    }

    fn base_relative(&self, base: Reg, offset: i16) -> u16 {
        self.state.reg_read(base).wrapping_add(offset as u16)
    }

    fn operand_val(&self, src: Operand) -> u16 {
        match src {
            Operand::Reg(r) => self.state.reg_read(r),
            Operand::Imm(imm) => imm as u16,
        }
    }

    ///////////////////////////////////////////////////////////////////////////
    // Execute
    ///////////////////////////////////////////////////////////////////////////

    fn exec_alu(&mut self, dr: Reg, sr1: Reg, src2: Operand, op: fn(u16, u16) -> u16) {
        let res = op(self.state.reg_read(sr1), self.operand_val(src2));
        self.write_dr(dr, res);
    }

    fn exec_br(&mut self, n: bool, z: bool, p: bool, offset: i16) {
        let wanted = [(n, Cond::Neg), (z, Cond::Zero), (p, Cond::Pos)]
            .into_iter()
            .filter(|(set, _)| *set)
            .fold(0u16, |acc, (_, cond)| acc | cond.bits());

        if wanted & self.state.reg_read(Reg::Cond) != 0 {
            let target = self.pc_relative(offset);
            self.state.set_pc(target);
        }
    }

    fn exec_jsr(&mut self, target: u16) {
        let ret = self.state.pc();
        self.state.reg_write(Reg::R7, ret);
        self.state.set_pc(target);
    }

    fn exec(&mut self, ins: &Ins, raw: u16, pc: u16) -> Result<ExecRet, Fault> {
        match *ins {
            Ins::Add{dr, sr1, src2} => self.exec_alu(dr, sr1, src2, u16::wrapping_add),
            Ins::And{dr, sr1, src2} => self.exec_alu(dr, sr1, src2, u16::bitand),
            Ins::Not{dr, sr} => {
                let res = !self.state.reg_read(sr);
                self.write_dr(dr, res);
            },
            Ins::Br{n, z, p, offset} => self.exec_br(n, z, p, offset),
            Ins::Jmp{base} => {
                let target = self.state.reg_read(base);
                self.state.set_pc(target);
            },
            Ins::Jsr{offset} => {
                let target = self.pc_relative(offset);
                self.exec_jsr(target);
            },
            Ins::Jsrr{base} => {
                // R7 is written first, so jsrr r7 lands on the next instruction.
                let ret = self.state.pc();
                self.state.reg_write(Reg::R7, ret);
                let target = self.state.reg_read(base);
                self.state.set_pc(target);
            },
            Ins::Ld{dr, offset} => {
                let val = self.mem_read(self.pc_relative(offset))?;
                self.write_dr(dr, val);
            },
            Ins::Ldi{dr, offset} => {
                let addr = self.mem_read(self.pc_relative(offset))?;
                let val = self.mem_read(addr)?;
                self.write_dr(dr, val);
            },
            Ins::Ldr{dr, base, offset} => {
                let val = self.mem_read(self.base_relative(base, offset))?;
                self.write_dr(dr, val);
            },
            Ins::Lea{dr, offset} => {
                let addr = self.pc_relative(offset);
                self.write_dr(dr, addr);
            },
            Ins::St{sr, offset} => {
                self.mem_write(self.pc_relative(offset), self.state.reg_read(sr))?;
            },
            Ins::Sti{sr, offset} => {
                let addr = self.mem_read(self.pc_relative(offset))?;
                self.mem_write(addr, self.state.reg_read(sr))?;
            },
            Ins::Str{sr, base, offset} => {
                self.mem_write(self.base_relative(base, offset), self.state.reg_read(sr))?;
            },
            Ins::Trap{vector} => return self.exec_trap(vector, pc),
            Ins::Rti | Ins::Res => {
                return Err(Fault::ReservedOpcode{op: ins.opcode(), ins: raw, pc});
            },
        }

        Ok(ExecRet::Continue)
    }
}
