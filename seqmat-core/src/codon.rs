//! Codon tables for DNA to protein translation.

use std::io::BufRead;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid codon table line {line}: {message}")]
    InvalidLine { line: usize, message: String },
    #[error("Codon table is missing {0} codon(s)")]
    Incomplete(usize),
}

pub type CodonResult<T> = Result<T, CodonError>;

/// Residue emitted for codons containing ambiguous or non-nucleotide bases.
pub const UNKNOWN_AMINO_ACID: u8 = b'X';

/// NCBI table 1, codons ordered AAA, AAC, AAG, AAT, ACA, ... TTT.
const STANDARD_CODE: &[u8; 64] =
    b"KNKNTTTTRSRSIIMIQHQHPPPPRRRRLLLLEDEDAAAAGGGGVVVV*Y*YSSSS*CWCLFLF";

fn base_index(base: u8) -> Option<usize> {
    match base.to_ascii_uppercase() {
        b'A' => Some(0),
        b'C' => Some(1),
        b'G' => Some(2),
        b'T' | b'U' => Some(3),
        _ => None,
    }
}

fn codon_index(codon: &[u8]) -> Option<usize> {
    if codon.len() < 3 {
        return None;
    }
    Some(base_index(codon[0])? * 16 + base_index(codon[1])? * 4 + base_index(codon[2])?)
}

/// Mapping from the 64 unambiguous codons to amino-acid symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodonTable {
    amino_acids: [u8; 64],
}

impl Default for CodonTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl CodonTable {
    /// The standard genetic code.
    pub fn standard() -> Self {
        Self {
            amino_acids: *STANDARD_CODE,
        }
    }

    /// Read a table of `<codon> <amino acid>` lines. Blank lines and lines
    /// starting with `#` are ignored; all 64 codons must be present.
    pub fn from_reader<R: BufRead>(reader: R) -> CodonResult<Self> {
        let mut amino_acids = [0u8; 64];
        let mut seen = [false; 64];

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let mut fields = trimmed.split_whitespace();
            let (codon, aa) = match (fields.next(), fields.next()) {
                (Some(codon), Some(aa)) => (codon, aa),
                _ => {
                    return Err(CodonError::InvalidLine {
                        line: line_num + 1,
                        message: format!("expected '<codon> <aa>', got '{}'", trimmed),
                    })
                }
            };

            let index = match codon_index(codon.as_bytes()) {
                Some(index) if codon.len() == 3 => index,
                _ => {
                    return Err(CodonError::InvalidLine {
                        line: line_num + 1,
                        message: format!("'{}' is not a codon", codon),
                    })
                }
            };

            amino_acids[index] = aa.as_bytes()[0];
            seen[index] = true;
        }

        let missing = seen.iter().filter(|&&s| !s).count();
        if missing > 0 {
            return Err(CodonError::Incomplete(missing));
        }

        Ok(Self { amino_acids })
    }

    /// Amino acid for the first three bases of `codon`.
    pub fn translate_codon(&self, codon: &[u8]) -> u8 {
        match codon_index(codon) {
            Some(index) => self.amino_acids[index],
            None => UNKNOWN_AMINO_ACID,
        }
    }

    pub fn is_stop(&self, codon: &[u8]) -> bool {
        self.translate_codon(codon) == b'*'
    }
}
