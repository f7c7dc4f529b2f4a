//! Substitution matrices in score and probability space
//!
//! Both matrices are 26x26 tables addressed by residue letter. Lookups go
//! through [`residue_index`], which maps `A`..`Z` (either case) to a row and
//! rejects everything else, so out-of-alphabet symbols never reach the
//! table.
//!
//! Scores are integer log-odds in thousandths of a bit. Converting a
//! probability `p` gives `round(1000 * log2(p))`.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub type Score = i32;
pub type Probability = f64;

/// Number of rows and columns in a matrix.
pub const ALPHABET_SIZE: usize = 26;

/// Score returned for impossible events and for failed lookups.
pub const IMPOSSIBLE_SCORE: Score = -10_000_000;

/// Score units per bit.
pub const INTEGER_FACTOR: f64 = 1000.0;

/// Reference-counted score matrix handle.
pub type SharedScoreMatrix = Arc<ScoreMatrix>;

/// Row/column of a residue letter, or `None` outside `A`..`Z`.
pub fn residue_index(symbol: u8) -> Option<usize> {
    let upper = symbol.to_ascii_uppercase();
    if upper.is_ascii_uppercase() {
        Some((upper - b'A') as usize)
    } else {
        None
    }
}

pub fn probability_to_score(p: Probability) -> Score {
    if !p.is_finite() || p <= 0.0 {
        return IMPOSSIBLE_SCORE;
    }
    let score = (p.log2() * INTEGER_FACTOR).round();
    if score < IMPOSSIBLE_SCORE as f64 {
        IMPOSSIBLE_SCORE
    } else {
        score as Score
    }
}

pub fn score_to_probability(score: Score) -> Probability {
    2f64.powf(score as f64 / INTEGER_FACTOR)
}

/// Probability implied by a half-bit log-odds value.
pub fn halfbit_to_probability(halfbit: Score) -> Probability {
    2f64.powf(halfbit as f64 / 2.0)
}

/// Integer log-odds substitution scores, e.g. BLOSUM or PAM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreMatrix {
    comp: [[Score; ALPHABET_SIZE]; ALPHABET_SIZE],
    name: Option<String>,
}

impl Default for ScoreMatrix {
    fn default() -> Self {
        Self::blank()
    }
}

impl ScoreMatrix {
    /// All-zero matrix.
    pub fn blank() -> Self {
        Self {
            comp: [[0; ALPHABET_SIZE]; ALPHABET_SIZE],
            name: None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    /// Score for a pair of residue letters.
    pub fn score(&self, a: u8, b: u8) -> Option<Score> {
        Some(self.comp[residue_index(a)?][residue_index(b)?])
    }

    /// Score for a pair of row/column indices.
    pub fn score_at(&self, i: usize, j: usize) -> Option<Score> {
        self.comp.get(i)?.get(j).copied()
    }

    /// Set a cell; returns `false` if either letter is outside the alphabet.
    pub fn set(&mut self, a: u8, b: u8, score: Score) -> bool {
        match (residue_index(a), residue_index(b)) {
            (Some(i), Some(j)) => {
                self.comp[i][j] = score;
                true
            }
            _ => false,
        }
    }

    pub fn rows(&self) -> &[[Score; ALPHABET_SIZE]; ALPHABET_SIZE] {
        &self.comp
    }

    /// Convert every probability to a log-odds score, keeping the name.
    pub fn from_probability(prob: &ProbMatrix) -> Self {
        let mut out = Self::blank();
        for (i, row) in prob.comp.iter().enumerate() {
            for (j, &p) in row.iter().enumerate() {
                out.comp[i][j] = probability_to_score(p);
            }
        }
        out.name = prob.name.clone();
        out
    }

    /// Legacy: re-express a half-bit matrix (such as BLOSUM62) in score
    /// units by rebasing the logarithm.
    ///
    /// This is not statistically meaningful; it only exists for callers that
    /// relied on it to feed published matrices into score-space code.
    pub fn rebase_halfbit_to_score(halfbit: &ScoreMatrix) -> Self {
        let mut out = Self::blank();
        for (i, row) in halfbit.comp.iter().enumerate() {
            for (j, &h) in row.iter().enumerate() {
                out.comp[i][j] = probability_to_score(halfbit_to_probability(h));
            }
        }
        out.name = halfbit.name.clone();
        out
    }

    /// Multiply every score by `factor` in place.
    ///
    /// `IMPOSSIBLE_SCORE` cells are left as they are. Products that do not
    /// fit in a `Score` saturate.
    pub fn scale(&mut self, factor: Score) {
        let mut saturated = 0usize;
        for cell in self.comp.iter_mut().flatten() {
            let score = *cell;
            if score == IMPOSSIBLE_SCORE {
                continue;
            }
            *cell = match score.checked_mul(factor) {
                Some(scaled) => scaled,
                None => {
                    saturated += 1;
                    score.saturating_mul(factor)
                }
            };
        }
        if saturated > 0 {
            log::warn!("scaling matrix by {} saturated {} cells", factor, saturated);
        }
    }

    pub fn is_symmetric(&self) -> bool {
        (0..ALPHABET_SIZE).all(|i| (0..i).all(|j| self.comp[i][j] == self.comp[j][i]))
    }

    pub fn into_shared(self) -> SharedScoreMatrix {
        Arc::new(self)
    }
}

/// Bounds-checked lookup that never fails: a missing matrix or an index
/// outside the alphabet yields [`IMPOSSIBLE_SCORE`].
pub fn safe_lookup(matrix: Option<&ScoreMatrix>, i: usize, j: usize) -> Score {
    match matrix {
        Some(matrix) => match matrix.score_at(i, j) {
            Some(score) => score,
            None => {
                log::warn!("matrix lookup out of range [{}][{}]", i, j);
                IMPOSSIBLE_SCORE
            }
        },
        None => {
            log::warn!("matrix lookup on a missing matrix");
            IMPOSSIBLE_SCORE
        }
    }
}

/// Pairwise substitution probabilities. Rows need not sum to one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbMatrix {
    comp: [[Probability; ALPHABET_SIZE]; ALPHABET_SIZE],
    name: Option<String>,
}

impl Default for ProbMatrix {
    fn default() -> Self {
        Self::blank()
    }
}

impl ProbMatrix {
    /// Matrix with every probability set to 1.0.
    pub fn blank() -> Self {
        Self {
            comp: [[1.0; ALPHABET_SIZE]; ALPHABET_SIZE],
            name: None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub fn probability(&self, a: u8, b: u8) -> Option<Probability> {
        Some(self.comp[residue_index(a)?][residue_index(b)?])
    }

    pub fn set(&mut self, a: u8, b: u8, p: Probability) -> bool {
        match (residue_index(a), residue_index(b)) {
            (Some(i), Some(j)) => {
                self.comp[i][j] = p;
                true
            }
            _ => false,
        }
    }

    /// Legacy: read a half-bit matrix as probabilities, `2^(h/2)` per cell.
    ///
    /// Like [`ScoreMatrix::rebase_halfbit_to_score`] this is a compatibility
    /// conversion, not a sound statistical one.
    pub fn rebase_halfbit_to_probability(halfbit: &ScoreMatrix) -> Self {
        let mut out = Self::blank();
        for (i, row) in halfbit.comp.iter().enumerate() {
            for (j, &h) in row.iter().enumerate() {
                out.comp[i][j] = halfbit_to_probability(h);
            }
        }
        out.name = halfbit.name.clone();
        out
    }
}
