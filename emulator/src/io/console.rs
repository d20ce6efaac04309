use std::collections::VecDeque;
use std::io::{self, stdin, stdout, BufReader, IsTerminal, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvError};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::trace;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("end of input")]
    EndOfInput,

    #[error("interrupted")]
    Interrupted,

    #[error(transparent)]
    Io(#[from] io::Error),
}

// What the traps and the keyboard registers talk to.
pub trait Console: Send + Sync {
    fn write_byte(&self, val: u8) -> Result<(), ConsoleError>;

    fn flush(&self) -> Result<(), ConsoleError> {
        Ok(())
    }

    // Must not block.
    fn input_available(&self) -> Result<bool, ConsoleError>;

    // Blocks until a character arrives.
    fn read_byte(&self) -> Result<u8, ConsoleError>;

    // Called periodically by the run loop, even if the program never reads
    // input. Must not block.
    fn check_interrupt(&self) -> Result<(), ConsoleError> {
        Ok(())
    }

    fn write_bytes(&self, vals: &[u8]) -> Result<(), ConsoleError> {
        for val in vals {
            self.write_byte(*val)?;
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////

// Input that can only be read blockingly (pipes, files), drained by a
// background thread so that polling never waits on the writer.
struct PipedInput {
    rx: Mutex<Receiver<io::Result<u8>>>,
    pending: Mutex<Option<u8>>,
}

impl PipedInput {
    fn spawn(reader: impl Read + Send + 'static) -> PipedInput {
        let (tx, rx) = channel();
        thread::spawn(move || {
            for byte in BufReader::new(reader).bytes() {
                let failed = byte.is_err();
                // The receiver is gone once the console is dropped.
                if tx.send(byte).is_err() || failed {
                    break;
                }
            }
            trace!("Console: input closed");
        });

        PipedInput {
            rx: Mutex::new(rx),
            pending: Mutex::new(None),
        }
    }

    fn poll(&self) -> Result<bool, ConsoleError> {
        let mut pending = self.pending.lock().unwrap();
        if pending.is_some() {
            return Ok(true);
        }
        match self.rx.lock().unwrap().try_recv() {
            Ok(byte) => {
                *pending = Some(byte?);
                Ok(true)
            },
            // Empty, or closed; a closed input shows up on the next read.
            Err(_) => Ok(false),
        }
    }

    fn read(&self) -> Result<u8, ConsoleError> {
        if let Some(byte) = self.pending.lock().unwrap().take() {
            return Ok(byte);
        }
        match self.rx.lock().unwrap().recv() {
            Ok(byte) => Ok(byte?),
            Err(RecvError) => Err(ConsoleError::EndOfInput),
        }
    }
}

enum Input {
    // Keys already read from the terminal but not yet consumed.
    Terminal(Mutex<VecDeque<u8>>),
    Piped(PipedInput),
}

// The process's own stdin/stdout. When stdin is a terminal, input is read as
// key events, which only makes sense once the caller has switched the
// terminal to raw mode.
pub struct StdConsole {
    input: Input,
}

impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl StdConsole {
    const DEL: u8 = 0x7f;
    const ESC: u8 = 0x1b;

    pub fn new() -> Self {
        let input = if stdin().is_terminal() {
            Input::Terminal(Mutex::new(VecDeque::new()))
        } else {
            Input::Piped(PipedInput::spawn(stdin()))
        };
        StdConsole { input }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.input, Input::Terminal(_))
    }

    fn key_to_byte(key: KeyEvent) -> Result<Option<u8>, ConsoleError> {
        if key.kind != KeyEventKind::Press {
            return Ok(None);
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let byte = match key.code {
            KeyCode::Char('c') if ctrl => return Err(ConsoleError::Interrupted),
            KeyCode::Char(c) if ctrl && c.is_ascii_alphabetic() => Some((c.to_ascii_uppercase() as u8) & 0x1f),
            KeyCode::Char(c) if c.is_ascii() => Some(c as u8),
            KeyCode::Enter => Some(b'\n'),
            KeyCode::Tab => Some(b'\t'),
            KeyCode::Backspace => Some(Self::DEL),
            KeyCode::Esc => Some(Self::ESC),
            _ => None,
        };
        Ok(byte)
    }

    // Next character from the terminal, or None if `wait` is false and there
    // isn't one queued.
    fn next_key(wait: bool) -> Result<Option<u8>, ConsoleError> {
        loop {
            if !wait && !event::poll(Duration::ZERO)? {
                return Ok(None);
            }
            if let Event::Key(key) = event::read()? {
                if let Some(byte) = Self::key_to_byte(key)? {
                    trace!("Console: key {byte:#04x}");
                    return Ok(Some(byte));
                }
            }
        }
    }
}

impl Console for StdConsole {
    fn write_byte(&self, val: u8) -> Result<(), ConsoleError> {
        let mut out = stdout().lock();
        // Raw mode turns off output processing, so do the newline translation here.
        if self.is_terminal() && val == b'\n' {
            out.write_all(b"\r\n")?;
        } else {
            out.write_all(&[val])?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), ConsoleError> {
        stdout().flush()?;
        Ok(())
    }

    fn input_available(&self) -> Result<bool, ConsoleError> {
        match &self.input {
            Input::Terminal(keys) => {
                let mut keys = keys.lock().unwrap();
                if keys.is_empty() {
                    keys.extend(Self::next_key(false)?);
                }
                Ok(!keys.is_empty())
            },
            Input::Piped(piped) => piped.poll(),
        }
    }

    fn read_byte(&self) -> Result<u8, ConsoleError> {
        match &self.input {
            Input::Terminal(keys) => {
                if let Some(byte) = keys.lock().unwrap().pop_front() {
                    return Ok(byte);
                }
                Self::next_key(true)?.ok_or(ConsoleError::EndOfInput)
            },
            Input::Piped(piped) => piped.read(),
        }
    }

    // Raw mode disables the terminal's own Ctrl-C handling, so look for it in
    // whatever has been typed, queueing everything else for the program.
    fn check_interrupt(&self) -> Result<(), ConsoleError> {
        let Input::Terminal(keys) = &self.input else {
            return Ok(());
        };
        let mut keys = keys.lock().unwrap();
        while let Some(byte) = Self::next_key(false)? {
            keys.push_back(byte);
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////

// In-memory console for tests and embedding.
#[derive(Default)]
pub struct PipeConsole {
    out_buf: Mutex<VecDeque<u8>>,
    in_buf: Mutex<VecDeque<u8>>,
    interrupted: AtomicBool,
}

impl PipeConsole {
    pub fn take_output(&self) -> VecDeque<u8> {
        std::mem::take(&mut self.out_buf.lock().unwrap())
    }

    pub fn take_output_string(&self) -> String {
        let out: Vec<u8> = self.take_output().into();
        String::from_utf8_lossy(&out).into_owned()
    }

    pub fn is_out_empty(&self) -> bool {
        self.out_buf.lock().unwrap().is_empty()
    }

    pub fn push_input(&self, val: u8) {
        self.in_buf.lock().unwrap().push_back(val);
    }

    pub fn write_input(&self, vals: &[u8]) {
        self.in_buf.lock().unwrap().extend(vals);
    }

    pub fn pending_input(&self) -> usize {
        self.in_buf.lock().unwrap().len()
    }

    // Reported once, by the next check_interrupt().
    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }
}

impl Console for PipeConsole {
    fn write_byte(&self, val: u8) -> Result<(), ConsoleError> {
        self.out_buf.lock().unwrap().push_back(val);
        Ok(())
    }

    fn input_available(&self) -> Result<bool, ConsoleError> {
        Ok(!self.in_buf.lock().unwrap().is_empty())
    }

    fn read_byte(&self) -> Result<u8, ConsoleError> {
        self.in_buf.lock().unwrap().pop_front().ok_or(ConsoleError::EndOfInput)
    }

    fn check_interrupt(&self) -> Result<(), ConsoleError> {
        if self.interrupted.swap(false, Ordering::SeqCst) {
            return Err(ConsoleError::Interrupted);
        }
        Ok(())
    }
}
