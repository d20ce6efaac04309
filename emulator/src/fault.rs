use common::asm::Opcode;

use crate::io::console::ConsoleError;

use thiserror::Error;

// Anything that stops a program other than a HALT trap.
#[derive(Debug, Error)]
pub enum Fault {
    #[error("reserved opcode {op} ({ins:#06x}) at {pc:#06x}")]
    ReservedOpcode { op: Opcode, ins: u16, pc: u16 },

    #[error("unknown trap vector {vector:#04x} at {pc:#06x}")]
    UnknownTrap { vector: u8, pc: u16 },

    #[error("console: {0}")]
    Console(#[from] ConsoleError),
}

impl Fault {
    pub fn is_interrupt(&self) -> bool {
        matches!(self, Fault::Console(ConsoleError::Interrupted))
    }
}
