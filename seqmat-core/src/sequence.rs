//! Biological sequences with a 1-based coordinate system
//!
//! A `Sequence` owns its residues in a [`ResidueBuffer`] and records where
//! those residues sit in biological coordinates through `offset` and `end`.
//! Forward sequences satisfy `offset <= end` and `end - offset + 1 == len`.
//! A reverse-strand sequence is stored with `offset > end`; reverse
//! complementing swaps the pair, so the convention propagates through every
//! derived sequence.
//!
//! Every transformation allocates a new, independently owned sequence.
//! Sharing one sequence between several owners goes through
//! [`SharedSequence`]: cloning the handle adds an owner and the residues are
//! released when the last handle is dropped.

use std::io::Write;
use std::sync::Arc;
use thiserror::Error;

use crate::buffer::{BufferError, ResidueBuffer};
use crate::codon::CodonTable;
use crate::types::{Coord, SequenceType, Strand, DEFAULT_NAME, DUMMY_NAME, TRANSLATION_SUFFIX};

#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("{operation} needs a DNA sequence, got type {found}")]
    NotDna {
        operation: &'static str,
        found: SequenceType,
    },
    #[error("invalid range [{start}:{end}] for sequence {name} of length {len}")]
    InvalidRange {
        name: String,
        start: i64,
        end: i64,
        len: usize,
    },
    #[error("sequence {0} has no residues")]
    Empty(String),
    #[error("{count} of {len} residues are not A, C, G, T or N")]
    TooManyNonBases { count: usize, len: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Buffer(#[from] BufferError),
}

pub type SequenceResult<T> = Result<T, SequenceError>;

/// Reference-counted sequence handle.
pub type SharedSequence = Arc<Sequence>;

/// Classify residues as DNA or protein from their A/C/G/T content.
///
/// Bytes that are not letters are left out of the tally but still count
/// towards the length. Short sequences need more than 95% ACGT to be called
/// DNA, sequences of 300 residues or more need more than 75%. The caller
/// must not pass an empty slice.
pub fn infer_type(residues: &[u8]) -> SequenceType {
    let acgt = residues
        .iter()
        .filter(|&&r| matches!(r.to_ascii_uppercase(), b'A' | b'C' | b'G' | b'T'))
        .count();
    let fraction = acgt as f64 / residues.len() as f64;

    let threshold = if residues.len() < 300 { 0.95 } else { 0.75 };
    if fraction > threshold {
        SequenceType::Dna
    } else {
        SequenceType::Protein
    }
}

/// True for the five characters the DNA machinery understands.
pub fn is_valid_base(residue: u8) -> bool {
    matches!(residue, b'A' | b'C' | b'G' | b'T' | b'N')
}

/// Complement of a single base, preserving case. IUPAC ambiguity codes map
/// to their complementary code; anything else is returned unchanged.
pub fn complement_base(base: u8) -> u8 {
    let complement = match base.to_ascii_uppercase() {
        b'A' => b'T',
        b'T' | b'U' => b'A',
        b'G' => b'C',
        b'C' => b'G',
        b'R' => b'Y',
        b'Y' => b'R',
        b'K' => b'M',
        b'M' => b'K',
        b'B' => b'V',
        b'V' => b'B',
        b'D' => b'H',
        b'H' => b'D',
        b'S' | b'W' | b'N' => base.to_ascii_uppercase(),
        _ => return base,
    };

    if base.is_ascii_lowercase() {
        complement.to_ascii_lowercase()
    } else {
        complement
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    name: String,
    residues: ResidueBuffer,
    offset: Coord,
    end: Coord,
    seq_type: SequenceType,
}

impl Sequence {
    fn alloc(name: String, residues: ResidueBuffer) -> Self {
        Self {
            name,
            residues,
            offset: 1,
            end: -1,
            seq_type: SequenceType::Unknown,
        }
    }

    /// Build a sequence by copying a name and body.
    ///
    /// A missing name becomes `SequenceName`. A missing body gives an empty
    /// sequence of unknown type; otherwise the type is inferred.
    pub fn from_strings(name: Option<&str>, body: Option<&str>) -> Self {
        let name = name.unwrap_or(DEFAULT_NAME).to_string();

        let body = match body {
            Some(body) => body,
            None => {
                let mut out = Self::alloc(name, ResidueBuffer::from_vec(Vec::new()));
                out.end = 0;
                return out;
            }
        };

        let mut out = Self::alloc(name, ResidueBuffer::from_vec(body.as_bytes().to_vec()));
        out.end = out.len() as Coord;
        if !out.is_empty() {
            out.seq_type = infer_type(out.residues());
        }
        out
    }

    /// Empty sequence with one block of capacity, ready to be filled by a
    /// format reader.
    pub fn empty(name: Option<String>) -> Self {
        let name = name.unwrap_or_else(|| {
            log::warn!("making an empty sequence with no name; assigning dummy name");
            DUMMY_NAME.to_string()
        });
        Self::alloc(name, ResidueBuffer::new())
    }

    /// Take ownership of an already allocated name and body without copying.
    /// Coordinates and type are left for the caller to set.
    pub fn from_raw(name: Option<String>, body: Vec<u8>) -> Self {
        let name = name.unwrap_or_else(|| {
            log::warn!("making a sequence with no name; assigning dummy name");
            DUMMY_NAME.to_string()
        });
        Self::alloc(name, ResidueBuffer::from_vec(body))
    }

    /// Zero-filled sequence of exactly `len` residues.
    pub fn with_length(name: impl Into<String>, len: usize) -> Self {
        Self::alloc(name.into(), ResidueBuffer::zeroed(len))
    }

    /// Wrap in a reference-counted handle.
    pub fn into_shared(self) -> SharedSequence {
        Arc::new(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn residues(&self) -> &[u8] {
        self.residues.as_slice()
    }

    pub fn residues_mut(&mut self) -> &mut [u8] {
        self.residues.as_mut_slice()
    }

    /// Residues as text, replacing anything that is not UTF-8.
    pub fn residues_lossy(&self) -> String {
        String::from_utf8_lossy(self.residues()).into_owned()
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.residues.capacity()
    }

    pub fn offset(&self) -> Coord {
        self.offset
    }

    pub fn end(&self) -> Coord {
        self.end
    }

    pub fn set_coords(&mut self, offset: Coord, end: Coord) {
        self.offset = offset;
        self.end = end;
    }

    pub fn sequence_type(&self) -> SequenceType {
        self.seq_type
    }

    /// Override the inferred type.
    pub fn set_sequence_type(&mut self, seq_type: SequenceType) {
        self.seq_type = seq_type;
    }

    pub fn is_dna(&self) -> bool {
        self.seq_type.is_dna()
    }

    pub fn is_reversed(&self) -> bool {
        self.offset > self.end
    }

    pub fn strand(&self) -> Strand {
        Strand::from_coords(self.offset, self.end)
    }

    /// Append residues to the buffer. Length bookkeeping is deferred to
    /// [`Sequence::finalize`].
    pub fn append(&mut self, more: &[u8]) -> SequenceResult<()> {
        self.residues.append(more).map_err(|e| {
            log::warn!("could not extend sequence {}: {}", self.name, e);
            SequenceError::from(e)
        })
    }

    /// Recompute `end` from the current length and re-infer the type.
    pub fn finalize(&mut self) {
        self.end = self.len() as Coord + self.offset - 1;
        self.seq_type = if self.is_empty() {
            SequenceType::Unknown
        } else {
            infer_type(self.residues())
        };
    }

    pub fn uppercase(&mut self) {
        self.residues.as_mut_slice().make_ascii_uppercase();
    }

    /// Coerce the sequence to DNA, tolerating a fraction of non-ACGTN residues.
    ///
    /// Residues are uppercased first, and stay uppercased even when the
    /// coercion is refused. When the non-conforming fraction is below
    /// `fraction` the type becomes DNA, offending residues become `N` and the
    /// number converted is returned. Otherwise the sequence is left as
    /// uppercased and the count is carried in the error.
    pub fn force_to_dna(&mut self, fraction: f64) -> SequenceResult<usize> {
        if self.is_empty() {
            log::warn!("trying to force sequence {} with a length of 0 to DNA", self.name);
            return Err(SequenceError::Empty(self.name.clone()));
        }

        self.uppercase();
        let count = self.residues().iter().filter(|&&r| !is_valid_base(r)).count();
        let len = self.len();

        if (count as f64 / len as f64) < fraction {
            self.seq_type = SequenceType::Dna;
            for residue in self.residues.as_mut_slice() {
                if !is_valid_base(*residue) {
                    *residue = b'N';
                }
            }
            Ok(count)
        } else {
            Err(SequenceError::TooManyNonBases { count, len })
        }
    }

    /// Copy residues `start..end` (zero-based, end exclusive) into a new
    /// sequence whose coordinates are rebased on this sequence's `offset`.
    ///
    /// The child is always rebased on its direct parent: truncating a child
    /// again must use indices into the child, not the grandparent.
    pub fn truncate(&self, start: usize, end: usize) -> SequenceResult<Sequence> {
        if end <= start || end > self.len() {
            log::warn!(
                "trying to truncate sequence {} from {} - {} when length is {}",
                self.name,
                start,
                end,
                self.len()
            );
            return Err(self.invalid_range(start as i64, end as i64));
        }

        let mut out = Sequence::from_raw(Some(self.name.clone()), self.residues()[start..end].to_vec());
        out.seq_type = self.seq_type;
        out.offset = self.offset + start as Coord;
        out.end = self.offset + end as Coord - 1;
        Ok(out)
    }

    /// Reverse complement into a new sequence with `offset` and `end`
    /// swapped, flipping its orientation.
    pub fn reverse_complement(&self) -> SequenceResult<Sequence> {
        if !self.is_dna() {
            log::warn!(
                "cannot reverse complement non-DNA sequence {}; type is {}",
                self.name,
                self.seq_type
            );
            return Err(SequenceError::NotDna {
                operation: "reverse complement",
                found: self.seq_type,
            });
        }

        let body = self.residues().iter().rev().map(|&b| complement_base(b)).collect();
        let mut out = Sequence::from_raw(Some(self.name.clone()), body);
        out.offset = self.end;
        out.end = self.offset;
        out.seq_type = self.seq_type;
        Ok(out)
    }

    /// Truncate with a coordinate pair that may be reversed.
    ///
    /// `a < b` is a plain [`Sequence::truncate`]. With `a > b` the range
    /// `b..a` is cut out and reverse complemented, so a reverse-strand hit
    /// reported as `(high, low)` comes back in its own orientation.
    pub fn magic_truncate(&self, a: i64, b: i64) -> SequenceResult<Sequence> {
        if !self.is_dna() {
            log::warn!(
                "cannot magic truncate non-DNA sequence {}; type is {}",
                self.name,
                self.seq_type
            );
            return Err(SequenceError::NotDna {
                operation: "magic truncate",
                found: self.seq_type,
            });
        }

        if a < 0 || b < 0 {
            log::warn!(
                "magic truncation on negative indices [{}:{}] of {}",
                a,
                b,
                self.name
            );
            return Err(self.invalid_range(a, b));
        }

        if a < b {
            self.truncate(a as usize, b as usize)
        } else {
            let forward = self.truncate(b as usize, a as usize)?;
            forward.reverse_complement()
        }
    }

    /// Translate codon by codon into a protein named `<name>.tr`.
    ///
    /// Translation stops once fewer than four residues remain past the
    /// current codon start, so trailing partial codons, and a final codon
    /// that ends exactly at the last residue, are not translated.
    pub fn translate(&self, table: &CodonTable) -> SequenceResult<Sequence> {
        if !self.is_dna() {
            log::warn!(
                "trying to translate non-DNA sequence {}; type is {}",
                self.name,
                self.seq_type
            );
            return Err(SequenceError::NotDna {
                operation: "translate",
                found: self.seq_type,
            });
        }

        let residues = self.residues();
        let mut body = Vec::with_capacity(residues.len() / 3 + 1);
        let mut i = 0;
        while i + 3 < residues.len() {
            body.push(table.translate_codon(&residues[i..i + 3]));
            i += 3;
        }

        let mut out = Sequence::from_raw(Some(format!("{}{}", self.name, TRANSLATION_SUFFIX)), body);
        out.seq_type = SequenceType::Protein;
        out.end = out.len() as Coord;
        Ok(out)
    }

    /// Write `"<index> <residue>"` lines for indices `start..end`.
    pub fn write_residue_list<W: Write>(&self, start: usize, end: usize, writer: &mut W) -> SequenceResult<()> {
        if start > end || end > self.len() {
            return Err(self.invalid_range(start as i64, end as i64));
        }
        for (i, &residue) in self.residues()[start..end].iter().enumerate() {
            writeln!(writer, "{} {}", start + i, residue as char)?;
        }
        Ok(())
    }

    fn invalid_range(&self, start: i64, end: i64) -> SequenceError {
        SequenceError::InvalidRange {
            name: self.name.clone(),
            start,
            end,
            len: self.len(),
        }
    }
}
