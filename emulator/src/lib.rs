pub mod emulator;
pub mod emulator_state;
pub mod fault;
pub mod io;

pub use emulator::{Config, Emulator, ExecRet};
pub use emulator_state::{MachineState, StateDump};
pub use fault::Fault;
pub use io::MMIOHandler;
