//! Text formats for sequences and scoring matrices
//!
//! Readers work on any `BufRead` source and pull one byte at a time through
//! the buffered window, so a record boundary can be left unconsumed for the
//! next call.

pub mod embl;
pub mod fasta;
pub mod matrix;
pub mod retrieve;

pub use embl::{read_embl_sequence, EmblError};
pub use fasta::{read_fasta_file, write_fasta, FastaError, FastaReader, FASTA_LINE_WIDTH};
pub use matrix::{
    read_matrix_file, write_matrix, write_matrix_with_alphabet, MatrixError, MatrixParser,
    DEFAULT_PROTEIN_ALPHABET,
};
pub use retrieve::{looks_like_accession, EfetchRetriever, RetrieveError, SequenceRetriever, SrsRetriever};

use std::io::{self, BufRead};
use thiserror::Error;

use crate::sequence::{Sequence, SequenceError};

/// A record whose residues could not all be stored. Holds everything read
/// before the failure.
#[derive(Debug, Error)]
#[error("record {} cut short after {} residues: {source}", .partial.name(), .partial.len())]
pub struct PartialRecord {
    partial: Box<Sequence>,
    #[source]
    source: SequenceError,
}

impl PartialRecord {
    pub fn new(partial: Sequence, source: SequenceError) -> Self {
        Self {
            partial: Box::new(partial),
            source,
        }
    }

    pub fn partial(&self) -> &Sequence {
        &self.partial
    }

    pub fn into_partial(self) -> Sequence {
        *self.partial
    }
}

/// Look at the next byte without consuming it.
pub(crate) fn peek_byte<R: BufRead>(reader: &mut R) -> io::Result<Option<u8>> {
    loop {
        match reader.fill_buf() {
            Ok(buf) => return Ok(buf.first().copied()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Consume and return the next byte.
pub(crate) fn next_byte<R: BufRead>(reader: &mut R) -> io::Result<Option<u8>> {
    let byte = peek_byte(reader)?;
    if byte.is_some() {
        reader.consume(1);
    }
    Ok(byte)
}

/// Collects residues into a block-sized staging buffer and flushes it into
/// the sequence whenever it fills.
pub(crate) struct ResidueStager {
    block: Vec<u8>,
}

impl ResidueStager {
    pub(crate) fn new() -> Self {
        Self {
            block: Vec::with_capacity(crate::types::SEQUENCE_BLOCK),
        }
    }

    /// Stage one residue; returns `true` when the block is due for a flush.
    pub(crate) fn push(&mut self, residue: u8) -> bool {
        self.block.push(residue);
        self.block.len() > crate::types::SEQUENCE_BLOCK - 2
    }

    /// Append the staged residues. On failure the record built so far is
    /// moved out of `seq` into the error.
    pub(crate) fn flush(&mut self, seq: &mut Sequence) -> Result<(), PartialRecord> {
        if self.block.is_empty() {
            return Ok(());
        }
        let result = seq.append(&self.block);
        self.block.clear();
        result.map_err(|source| {
            log::warn!(
                "could not store residues of {}; keeping the {} read so far",
                seq.name(),
                seq.len()
            );
            let placeholder = Sequence::from_raw(Some(seq.name().to_string()), Vec::new());
            PartialRecord::new(std::mem::replace(seq, placeholder), source)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_peek_then_next() {
        let mut reader = Cursor::new(b"ab".to_vec());
        assert_eq!(peek_byte(&mut reader).unwrap(), Some(b'a'));
        assert_eq!(next_byte(&mut reader).unwrap(), Some(b'a'));
        assert_eq!(next_byte(&mut reader).unwrap(), Some(b'b'));
        assert_eq!(peek_byte(&mut reader).unwrap(), None);
        assert_eq!(next_byte(&mut reader).unwrap(), None);
    }

    #[test]
    fn test_stager_flushes_full_blocks() {
        let mut seq = Sequence::empty(Some("s".to_string()));
        let mut stager = ResidueStager::new();
        let mut flushes = 0;

        for _ in 0..5000 {
            if stager.push(b'A') {
                stager.flush(&mut seq).unwrap();
                flushes += 1;
            }
        }
        stager.flush(&mut seq).unwrap();

        assert_eq!(flushes, 2);
        assert_eq!(seq.len(), 5000);
    }

    #[test]
    fn test_partial_record_keeps_residues() {
        let mut seq = Sequence::empty(Some("chr7".to_string()));
        seq.append(b"ACGTACGT").unwrap();
        let source = SequenceError::Buffer(crate::buffer::BufferError::Allocation {
            current: 2048,
            requested: 4096,
        });

        let err = PartialRecord::new(seq, source);
        assert_eq!(err.to_string(), "record chr7 cut short after 8 residues: could not grow residue buffer from 2048 to 4096 bytes");
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.partial().residues(), b"ACGTACGT");

        let fasta: fasta::FastaError = err.into();
        match fasta {
            fasta::FastaError::Partial(record) => assert_eq!(record.into_partial().name(), "chr7"),
            other => panic!("expected partial record, got {:?}", other),
        }
    }
}
