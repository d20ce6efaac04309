pub mod console;
pub mod keyboard;

use crate::{Fault, MachineState};

// A device behind one or more memory addresses. Reads may have side effects
// (and may fail, e.g. when the console goes away); writes default to plain
// memory.
pub trait MMIOHandler: Send {
    fn default_addrs(&self) -> &[u16] {
        &[]
    }

    fn read_word(&mut self, state: &mut MachineState, addr: u16) -> Result<u16, Fault>;

    fn write_word(&mut self, state: &mut MachineState, addr: u16, val: u16) -> Result<(), Fault> {
        state.mem_write(addr, val);
        Ok(())
    }
}
