use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use common::constants::MEM_WORDS;
use common::mem::{ReadU16Be, WriteU16Be};

use log::warn;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjError {
    #[error("image has no origin word")]
    MissingOrigin,

    #[error("image has no words after the origin")]
    Empty,

    #[error(transparent)]
    Io(#[from] io::Error),
}

// An origin followed by the words to place there, all big-endian.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjFile {
    pub origin: u16,
    pub words: Vec<u16>,
}

impl ObjFile {
    pub fn new(origin: u16, words: Vec<u16>) -> ObjFile {
        ObjFile { origin, words }
    }

    // Words that would run past the top of memory are dropped.
    pub fn read_from(reader: &mut impl Read) -> Result<ObjFile, ObjError> {
        let origin = match reader.read_u16_be() {
            Ok(origin) => origin,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Err(ObjError::MissingOrigin),
            Err(e) => return Err(e.into()),
        };

        let capacity = MEM_WORDS - origin as usize;
        let mut words = vec![];
        let mut truncated = 0usize;
        loop {
            let word = match reader.read_u16_be() {
                Ok(word) => word,
                // Also covers a dangling odd byte.
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            };
            if words.len() < capacity {
                words.push(word);
            } else {
                truncated += 1;
            }
        }

        if truncated != 0 {
            warn!("Image at {origin:#06x} overflows memory; dropped {truncated} words");
        }

        if words.is_empty() {
            return Err(ObjError::Empty);
        }

        Ok(ObjFile { origin, words })
    }

    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        writer.write_u16_be(self.origin)?;
        for word in &self.words {
            writer.write_u16_be(*word)?;
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<ObjFile, ObjError> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::read_from(&mut reader)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()
    }
}
