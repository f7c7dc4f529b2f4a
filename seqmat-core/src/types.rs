use serde::{Deserialize, Serialize};
use std::fmt;

/// 1-based biological coordinate. Signed because a freshly allocated
/// sequence carries `end = -1` until its length is known.
pub type Coord = i64;

/// Allocation granularity of residue buffers, in bytes.
pub const SEQUENCE_BLOCK: usize = 2048;

/// Name given to sequences built from strings without a name.
pub const DEFAULT_NAME: &str = "SequenceName";

/// Name given to buffers created without any name at all.
pub const DUMMY_NAME: &str = "DummyName";

/// Suffix appended to the name of a translated sequence.
pub const TRANSLATION_SUFFIX: &str = ".tr";

/// Molecule type of a sequence. Inferred from content unless forced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SequenceType {
    #[default]
    Unknown,
    Protein,
    Dna,
    Cdna,
    Genomic,
    Est,
    Rna,
}

impl SequenceType {
    /// True for every nucleotide type that can be complemented and translated.
    pub fn is_dna(self) -> bool {
        matches!(
            self,
            SequenceType::Dna | SequenceType::Cdna | SequenceType::Genomic | SequenceType::Est
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SequenceType::Unknown => "Unknown type",
            SequenceType::Protein => "Protein",
            SequenceType::Dna => "Dna",
            SequenceType::Cdna => "cDNA",
            SequenceType::Genomic => "Genomic",
            SequenceType::Est => "Est",
            SequenceType::Rna => "RNA",
        }
    }
}

impl fmt::Display for SequenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orientation of a sequence relative to the strand its coordinates refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    /// Orientation implied by a stored `(offset, end)` pair; `offset > end`
    /// marks the reverse strand.
    pub fn from_coords(offset: Coord, end: Coord) -> Self {
        if offset > end {
            Strand::Reverse
        } else {
            Strand::Forward
        }
    }
}
