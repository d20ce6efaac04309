use std::process::ExitCode;
use std::sync::Arc;

use emu_lib::io::console::StdConsole;
use emu_lib::{Config, Emulator};
use objfile::ObjFile;

use clap::Parser;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use log::{error, info, warn};


/// 16-bit LC-3 style emulator
#[derive(Parser)]
struct Args {
    /// Object file to execute
    #[arg(default_value = "a.obj")]
    image: String,

    /// Dump registers and a memory fingerprint before every instruction
    #[arg(short, long)]
    log: bool,

    /// Address at which to start executing, decimal or 0x-prefixed hex
    #[arg(long, value_parser = parse_addr)]
    start: Option<u16>,
}

fn parse_addr(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix('x')) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid address {s:?}: {e}"))
}


// Raw mode is only entered when stdin is a terminal, and left again on drop.
struct RawMode {
    enabled: bool,
}

impl RawMode {
    fn enter(terminal: bool) -> RawMode {
        let enabled = terminal && match enable_raw_mode() {
            Ok(()) => true,
            Err(e) => {
                warn!("Couldn't enable raw mode: {e}");
                false
            },
        };
        RawMode { enabled }
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if self.enabled {
            if let Err(e) = disable_raw_mode() {
                error!("Couldn't restore terminal: {e}");
            }
        }
    }
}


fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();

    let obj = match ObjFile::load(&args.image) {
        Ok(obj) => obj,
        Err(e) => {
            eprintln!("Failed to load image {}: {e}", args.image);
            return ExitCode::from(1);
        },
    };

    let config = Config {
        dump_state: args.log,
        ..Config::default()
    };
    let console = Arc::new(StdConsole::new());
    let mut emu = Emulator::with_config(console.clone(), config);
    let loaded = emu.load_obj(&obj);
    info!("Loaded {loaded} words at {:#06x}", obj.origin);

    let res = {
        let _raw = RawMode::enter(console.is_terminal());
        match args.start {
            Some(start) => emu.run_at(start),
            None => emu.run(),
        }
    };

    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(fault) if fault.is_interrupt() => {
            eprintln!("Control-C, quitting");
            ExitCode::from(2)
        },
        Err(fault) => {
            error!("{fault}");
            eprintln!("Fault after {} instructions: {fault}", emu.num_ins());
            ExitCode::from(1)
        },
    }
}
