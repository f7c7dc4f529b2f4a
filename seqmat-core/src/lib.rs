//! seqmat core library
//!
//! Biological sequences with 1-based, strand-aware coordinates, FASTA and
//! EMBL readers, and 26x26 substitution matrices with their text format.

pub mod buffer;
pub mod codon;
pub mod config;
pub mod io;
pub mod scoring;
pub mod sequence;
pub mod types;

// Re-export commonly used types and functions
pub use buffer::{BufferError, ResidueBuffer};
pub use codon::CodonTable;
pub use config::{Config, FileOpener};
pub use io::{read_embl_sequence, write_fasta, write_matrix, FastaReader, MatrixParser};
pub use scoring::{safe_lookup, ProbMatrix, Score, ScoreMatrix, SharedScoreMatrix, IMPOSSIBLE_SCORE};
pub use sequence::{infer_type, Sequence, SequenceError, SequenceResult, SharedSequence};
pub use types::{Coord, SequenceType, Strand};

/// Version information for the seqmat core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
