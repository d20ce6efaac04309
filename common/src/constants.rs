pub const MEM_WORDS: usize = (u16::MAX as usize) + 1;

pub const DEFAULT_ORIGIN: u16 = 0x3000;

// Memory mapped keyboard registers
pub const KBSR: u16 = 0xfe00;
pub const KBDR: u16 = 0xfe02;
pub const KBSR_READY: u16 = 0x1 << 15;
