use common::asm::{Reg, TrapVector};
use common::constants::MEM_WORDS;

use crate::{Emulator, ExecRet, Fault};

use log::trace;
use num_traits::FromPrimitive;

impl Emulator {
    const IN_PROMPT: &'static [u8] = b"Enter a character: ";
    const HALT_NOTICE: &'static [u8] = b"HALT\n";

    // Each trap either completes its I/O and continues, halts, or faults.
    pub(super) fn exec_trap(&mut self, vector: u8, pc: u16) -> Result<ExecRet, Fault> {
        let Some(trap) = TrapVector::from_u8(vector) else {
            return Err(Fault::UnknownTrap{vector, pc});
        };
        trace!("Trap: {trap} at {pc:#06x}");

        match trap {
            TrapVector::Getc => self.trap_getc()?,
            TrapVector::Out => self.trap_out()?,
            TrapVector::Puts => self.trap_puts()?,
            TrapVector::In => self.trap_in()?,
            TrapVector::Putsp => self.trap_putsp()?,
            TrapVector::Halt => {
                self.trap_halt()?;
                return Ok(ExecRet::Halt);
            },
        }
        Ok(ExecRet::Continue)
    }

    fn set_r0_char(&mut self, ch: u8) {
        let state = self.get_state_mut();
        state.reg_write(Reg::R0, ch as u16);
        state.update_cond(Reg::R0);
    }

    fn trap_getc(&mut self) -> Result<(), Fault> {
        let ch = self.console().read_byte()?;
        self.set_r0_char(ch);
        Ok(())
    }

    fn trap_out(&mut self) -> Result<(), Fault> {
        let console = self.console().clone();
        console.write_byte(self.reg_read(Reg::R0) as u8)?;
        console.flush()?;
        Ok(())
    }

    // One character per word, low byte only.
    fn trap_puts(&mut self) -> Result<(), Fault> {
        let console = self.console().clone();
        let mut addr = self.reg_read(Reg::R0);
        // Bounded in case memory has no terminator at all.
        for _ in 0..MEM_WORDS {
            let val = self.mem_read(addr)?;
            if val == 0 {
                break;
            }
            console.write_byte(val as u8)?;
            addr = addr.wrapping_add(1);
        }
        console.flush()?;
        Ok(())
    }

    fn trap_in(&mut self) -> Result<(), Fault> {
        let console = self.console().clone();
        console.write_bytes(Self::IN_PROMPT)?;
        console.flush()?;
        let ch = console.read_byte()?;
        console.write_byte(ch)?;
        console.flush()?;
        self.set_r0_char(ch);
        Ok(())
    }

    // Two characters per word, low byte first. A zero high byte is skipped,
    // so odd length strings work.
    fn trap_putsp(&mut self) -> Result<(), Fault> {
        let console = self.console().clone();
        let mut addr = self.reg_read(Reg::R0);
        for _ in 0..MEM_WORDS {
            let val = self.mem_read(addr)?;
            if val == 0 {
                break;
            }
            let [low, high] = val.to_le_bytes();
            trace!("Trap: putsp {low:#04x} {high:#04x}");
            console.write_byte(low)?;
            if high != 0 {
                console.write_byte(high)?;
            }
            addr = addr.wrapping_add(1);
        }
        console.flush()?;
        Ok(())
    }

    fn trap_halt(&mut self) -> Result<(), Fault> {
        let console = self.console().clone();
        console.write_bytes(Self::HALT_NOTICE)?;
        console.flush()?;
        Ok(())
    }
}
