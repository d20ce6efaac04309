use std::sync::Arc;

use common::constants::{KBDR, KBSR, KBSR_READY};

use crate::io::MMIOHandler;
use crate::io::console::Console;
use crate::{Fault, MachineState};

use log::trace;

// Keyboard status and data registers. Only reading KBSR does anything: it
// polls the console and, if a character is waiting, latches it into KBDR.
// KBDR itself is plain memory.
pub struct Keyboard {
    device: Arc<dyn Console>,
}

impl Keyboard {
    pub fn new(device: Arc<dyn Console>) -> Self {
        Keyboard { device }
    }

    fn kbsr_read(&mut self, state: &mut MachineState) -> Result<u16, Fault> {
        if self.device.input_available()? {
            let ch = self.device.read_byte()?;
            trace!("Keyboard: latched {ch:#04x}");
            state.mem_write(KBSR, KBSR_READY);
            state.mem_write(KBDR, ch as u16);
        } else {
            state.mem_write(KBSR, 0);
        }
        Ok(state.mem_read(KBSR))
    }
}

impl MMIOHandler for Keyboard {
    fn read_word(&mut self, state: &mut MachineState, addr: u16) -> Result<u16, Fault> {
        match addr {
            KBSR => self.kbsr_read(state),
            _ => panic!("Keyboard doesn't handle address {addr:#06x}"),
        }
    }

    fn default_addrs(&self) -> &[u16] {
        &[KBSR]
    }
}
