pub mod asm;
pub mod bits;
pub mod constants;
pub mod mem;
