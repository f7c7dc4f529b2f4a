//! FASTA sequence reader and writer
//!
//! The reader streams one record per call. A record starts at `>`; the
//! token up to the first whitespace is the name and the rest of the header
//! line is ignored. Every alphabetic byte up to the next `>` belongs to the
//! body, anything else (newlines, digits, gaps) is dropped. The `>` of the
//! following record is left in the stream.

use std::io::{BufRead, Write};
use thiserror::Error;

use super::{next_byte, peek_byte, PartialRecord, ResidueStager};
use crate::config::FileOpener;
use crate::sequence::{Sequence, SequenceError};
use crate::types::DUMMY_NAME;

/// Residues per line written by [`write_fasta`].
pub const FASTA_LINE_WIDTH: usize = 60;

#[derive(Debug, Error)]
pub enum FastaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Not a FASTA stream: first character is '{0}', expected '>'")]
    MissingHeader(char),
    #[error(transparent)]
    Sequence(#[from] SequenceError),
    #[error(transparent)]
    Partial(#[from] PartialRecord),
}

pub type FastaResult<T> = Result<T, FastaError>;

/// Streaming FASTA reader over any buffered source.
pub struct FastaReader<R> {
    reader: R,
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read the next record; `Ok(None)` at a clean end of stream.
    pub fn next_sequence(&mut self) -> FastaResult<Option<Sequence>> {
        let reader = &mut self.reader;

        // Skip leading whitespace
        while let Some(byte) = peek_byte(reader)? {
            if !byte.is_ascii_whitespace() {
                break;
            }
            reader.consume(1);
        }

        match next_byte(reader)? {
            None => return Ok(None),
            Some(b'>') => {}
            Some(other) => {
                log::warn!("first character read is '{}', not '>'; not a FASTA stream", other as char);
                return Err(FastaError::MissingHeader(other as char));
            }
        }

        let mut name = Vec::new();
        let terminator = loop {
            match next_byte(reader)? {
                None => {
                    log::warn!("FASTA stream ended inside a header line");
                    return Ok(None);
                }
                Some(byte) if byte.is_ascii_whitespace() => break byte,
                Some(byte) => name.push(byte),
            }
        };

        // Discard the description
        if terminator != b'\n' {
            while let Some(byte) = next_byte(reader)? {
                if byte == b'\n' {
                    break;
                }
            }
        }

        let name = if name.is_empty() {
            log::warn!("FASTA record without a name; assigning dummy name");
            DUMMY_NAME.to_string()
        } else {
            String::from_utf8_lossy(&name).into_owned()
        };

        let mut out = Sequence::empty(Some(name));
        let mut stager = ResidueStager::new();
        while let Some(byte) = peek_byte(reader)? {
            if byte == b'>' {
                break;
            }
            reader.consume(1);
            if byte.is_ascii_alphabetic() && stager.push(byte) {
                stager.flush(&mut out)?;
            }
        }
        stager.flush(&mut out)?;

        out.finalize();
        Ok(Some(out))
    }

    /// Read every remaining record.
    pub fn read_all(&mut self) -> FastaResult<Vec<Sequence>> {
        let mut sequences = Vec::new();
        while let Some(seq) = self.next_sequence()? {
            sequences.push(seq);
        }
        Ok(sequences)
    }
}

impl<R: BufRead> Iterator for FastaReader<R> {
    type Item = FastaResult<Sequence>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_sequence().transpose()
    }
}

/// Write a record with the body wrapped at [`FASTA_LINE_WIDTH`] residues.
///
/// The name is written as is. A name containing whitespace does not survive
/// a round trip: [`FastaReader`] keeps only its first token.
pub fn write_fasta<W: Write>(seq: &Sequence, writer: &mut W) -> std::io::Result<()> {
    if seq.name().contains(|c: char| c.is_ascii_whitespace()) {
        log::warn!("FASTA name [{}] contains whitespace; it will read back as its first word", seq.name());
    }
    writeln!(writer, ">{}", seq.name())?;
    for line in seq.residues().chunks(FASTA_LINE_WIDTH) {
        writer.write_all(line)?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

/// Open `name` through the configured search path and read its first record.
pub fn read_fasta_file(opener: &FileOpener, name: &str) -> FastaResult<Option<Sequence>> {
    let reader = opener.open(name).map_err(|e| {
        log::warn!("cannot open {} for reading FASTA", name);
        FastaError::Io(e)
    })?;
    FastaReader::new(reader).next_sequence()
}
