//! EMBL sequence-section reader
//!
//! Only the residues are read: everything up to and including the `SQ`
//! line is skipped, then letters are collected until the `//` terminator.

use std::io::BufRead;
use thiserror::Error;

use super::{next_byte, PartialRecord, ResidueStager};
use crate::sequence::{Sequence, SequenceError};

/// Name given to sequences read from an EMBL sequence section.
pub const EMBL_SEQUENCE_NAME: &str = "EMBLseq";

#[derive(Debug, Error)]
pub enum EmblError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Sequence(#[from] SequenceError),
    #[error(transparent)]
    Partial(#[from] PartialRecord),
}

pub type EmblResult<T> = Result<T, EmblError>;

/// Read the next EMBL sequence section. Returns `Ok(None)` if the stream
/// ends before an `SQ` line.
///
/// A missing `//` terminator is tolerated with a warning. After a proper
/// terminator the rest of its line is consumed, leaving the reader at the
/// start of the next entry.
pub fn read_embl_sequence<R: BufRead>(reader: &mut R) -> EmblResult<Option<Sequence>> {
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            log::warn!("reached end of EMBL stream without finding an SQ line");
            return Ok(None);
        }
        if line.starts_with(b"SQ") {
            break;
        }
    }

    let mut out = Sequence::empty(Some(EMBL_SEQUENCE_NAME.to_string()));
    let mut stager = ResidueStager::new();
    let mut terminated = false;

    while let Some(mut byte) = next_byte(reader)? {
        if byte == b'/' {
            match next_byte(reader)? {
                Some(b'/') => {
                    terminated = true;
                    break;
                }
                Some(following) => byte = following,
                None => break,
            }
        }
        if byte.is_ascii_alphabetic() && stager.push(byte) {
            stager.flush(&mut out)?;
        }
    }
    stager.flush(&mut out)?;

    if terminated {
        while let Some(byte) = next_byte(reader)? {
            if byte == b'\n' {
                break;
            }
        }
    } else {
        log::warn!("EMBL sequence region ended without a // terminator");
    }

    out.finalize();
    Ok(Some(out))
}
