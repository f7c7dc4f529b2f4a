//! BLAST-style substitution matrix text format
//!
//! ```text
//! # optional comments
//!    A   R   N ...
//! A   4  -1  -2 ...
//! R  -1   5   0 ...
//! ```
//!
//! The header declares the column order; each following row starts with its
//! own symbol and lists one value per column. Symbols must be upper-case
//! letters or `*`. Values in a `*` row or column are checked but not kept,
//! since the matrices only address `A`..`Z`.

use std::io::{BufRead, Write};
use thiserror::Error;

use crate::config::FileOpener;
use crate::scoring::{residue_index, ProbMatrix, Probability, Score, ScoreMatrix};

/// Column order used when no alphabet is given.
pub const DEFAULT_PROTEIN_ALPHABET: &str = "ARNDCQEGHILKMFPSTWYVBZX*";

const STOP_SYMBOL: u8 = b'*';

#[derive(Debug, Error)]
pub enum MatrixError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Bad matrix alphabet '{0}'")]
    BadAlphabet(String),
    #[error("Matrix has no header line")]
    MissingHeader,
    #[error("Matrix ended before the row for '{0}'")]
    MissingRow(char),
    #[error("Line {line}: expected row '{expected}', found '{found}'")]
    RowMismatch { line: usize, expected: char, found: String },
    #[error("Line {line}: expected {expected} values, found {found}")]
    ColumnCount { line: usize, expected: usize, found: usize },
    #[error("Line {line}: invalid value '{value}'")]
    InvalidValue { line: usize, value: String },
}

pub type MatrixResult<T> = Result<T, MatrixError>;

/// Parser for the BLAST matrix layout.
pub struct MatrixParser;

impl MatrixParser {
    /// Check that an alphabet is usable as a matrix header: non-empty,
    /// only `A`..`Z` and `*`, and no symbol twice.
    pub fn validate_alphabet(alphabet: &[u8]) -> MatrixResult<()> {
        let mut seen = [false; 256];
        let bad = alphabet.is_empty()
            || alphabet.iter().any(|&symbol| {
                let allowed = symbol.is_ascii_uppercase() || symbol == STOP_SYMBOL;
                let repeated = std::mem::replace(&mut seen[symbol as usize], true);
                !allowed || repeated
            });

        if bad {
            let shown = String::from_utf8_lossy(alphabet).into_owned();
            log::warn!("bad matrix alphabet [{}]", shown);
            return Err(MatrixError::BadAlphabet(shown));
        }
        Ok(())
    }

    /// Read an integer score matrix.
    pub fn read_scores<R: BufRead>(reader: R) -> MatrixResult<ScoreMatrix> {
        let mut matrix = ScoreMatrix::blank();
        Self::read_table(
            reader,
            |raw| raw.parse::<Score>().ok(),
            |a, b, score| {
                matrix.set(a, b, score);
            },
        )?;
        Ok(matrix)
    }

    /// Read a matrix of floating-point substitution probabilities. Every
    /// cell must be finite and strictly positive.
    pub fn read_probabilities<R: BufRead>(reader: R) -> MatrixResult<ProbMatrix> {
        let mut matrix = ProbMatrix::blank();
        Self::read_table(
            reader,
            |raw| raw.parse::<Probability>().ok().filter(|p| p.is_finite() && *p > 0.0),
            |a, b, p| {
                matrix.set(a, b, p);
            },
        )?;
        Ok(matrix)
    }

    fn read_table<R, T, P, F>(reader: R, parse: P, mut store: F) -> MatrixResult<()>
    where
        R: BufRead,
        P: Fn(&str) -> Option<T>,
        F: FnMut(u8, u8, T),
    {
        let mut lines = reader
            .lines()
            .enumerate()
            .map(|(i, line)| line.map(|l| (i + 1, l)))
            .filter(|line| match line {
                Ok((_, text)) => {
                    let trimmed = text.trim();
                    !trimmed.is_empty() && !trimmed.starts_with('#')
                }
                Err(_) => true,
            });

        let (_, header) = lines.next().ok_or(MatrixError::MissingHeader)??;
        let mut alphabet = Vec::new();
        for token in header.split_whitespace() {
            if token.len() != 1 {
                log::warn!("bad matrix alphabet token [{}]", token);
                return Err(MatrixError::BadAlphabet(header.trim().to_string()));
            }
            alphabet.push(token.as_bytes()[0]);
        }
        Self::validate_alphabet(&alphabet)?;

        for &row_symbol in &alphabet {
            let (line_num, line) = lines
                .next()
                .ok_or(MatrixError::MissingRow(row_symbol as char))??;

            let mut fields = line.split_whitespace();
            let label = fields.next().unwrap_or_default();
            if label.as_bytes() != [row_symbol] {
                return Err(MatrixError::RowMismatch {
                    line: line_num,
                    expected: row_symbol as char,
                    found: label.to_string(),
                });
            }

            let values: Vec<&str> = fields.collect();
            if values.len() != alphabet.len() {
                return Err(MatrixError::ColumnCount {
                    line: line_num,
                    expected: alphabet.len(),
                    found: values.len(),
                });
            }

            for (&column_symbol, raw) in alphabet.iter().zip(values) {
                let value = parse(raw).ok_or_else(|| MatrixError::InvalidValue {
                    line: line_num,
                    value: raw.to_string(),
                })?;
                if row_symbol != STOP_SYMBOL && column_symbol != STOP_SYMBOL {
                    store(row_symbol, column_symbol, value);
                }
            }
        }

        Ok(())
    }
}

/// Write a matrix in the standard protein column order.
pub fn write_matrix<W: Write>(matrix: &ScoreMatrix, writer: &mut W) -> MatrixResult<()> {
    write_matrix_with_alphabet(matrix, DEFAULT_PROTEIN_ALPHABET, writer)
}

/// Write a matrix with rows and columns in `alphabet` order. Cells on a `*`
/// row or column are written as the lowest score among the other symbols.
pub fn write_matrix_with_alphabet<W: Write>(
    matrix: &ScoreMatrix,
    alphabet: &str,
    writer: &mut W,
) -> MatrixResult<()> {
    let symbols = alphabet.as_bytes();
    MatrixParser::validate_alphabet(symbols)?;

    let letters: Vec<usize> = symbols.iter().filter_map(|&s| residue_index(s)).collect();
    let stop_score = letters
        .iter()
        .flat_map(|&i| letters.iter().filter_map(move |&j| matrix.score_at(i, j)))
        .min()
        .unwrap_or(0);

    // First line of the name only
    if let Some(name) = matrix.name().and_then(|name| name.lines().next()) {
        writeln!(writer, "# {}", name)?;
    }

    write!(writer, " ")?;
    for &symbol in symbols {
        write!(writer, " {:>3}", symbol as char)?;
    }
    writeln!(writer)?;

    for &row in symbols {
        write!(writer, "{}", row as char)?;
        for &column in symbols {
            let score = matrix.score(row, column).unwrap_or(stop_score);
            write!(writer, " {:>3}", score)?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

/// Open `name` through the configured search path and read a score matrix
/// named after the file.
pub fn read_matrix_file(opener: &FileOpener, name: &str) -> MatrixResult<ScoreMatrix> {
    let reader = opener.open(name)?;
    let mut matrix = MatrixParser::read_scores(reader)?;
    matrix.set_name(Some(name.to_string()));
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const NUCLEOTIDE: &str = "# simple nucleotide matrix\n\
                              \x20  A  C  G  T\n\
                              A  5 -4 -4 -4\n\
                              C -4  5 -4 -4\n\
                              G -4 -4  5 -4\n\
                              T -4 -4 -4  5\n";

    #[test]
    fn test_read_scores() {
        let matrix = MatrixParser::read_scores(Cursor::new(NUCLEOTIDE)).unwrap();
        assert_eq!(matrix.score(b'A', b'A'), Some(5));
        assert_eq!(matrix.score(b'A', b'T'), Some(-4));
        assert_eq!(matrix.score(b'T', b'T'), Some(5));
        assert_eq!(matrix.score(b'W', b'W'), Some(0));
    }

    #[test]
    fn test_validate_alphabet() {
        assert!(MatrixParser::validate_alphabet(b"ARNDCQEGHILKMFPSTWYVBZX*").is_ok());
        assert!(MatrixParser::validate_alphabet(b"ACGT").is_ok());
        assert!(MatrixParser::validate_alphabet(b"").is_err());
        assert!(MatrixParser::validate_alphabet(b"ACGa").is_err());
        assert!(MatrixParser::validate_alphabet(b"AC1T").is_err());
        assert!(MatrixParser::validate_alphabet(b"ACGA").is_err());
    }

    #[test]
    fn test_rejects_malformed_alphabet() {
        let data = " AB C\nAB 1 2\nC 1 2\n";
        assert!(matches!(
            MatrixParser::read_scores(Cursor::new(data)),
            Err(MatrixError::BadAlphabet(_))
        ));

        let lower = " a c\na 1 0\nc 0 1\n";
        assert!(matches!(
            MatrixParser::read_scores(Cursor::new(lower)),
            Err(MatrixError::BadAlphabet(_))
        ));
    }

    #[test]
    fn test_rejects_malformed_rows() {
        let swapped = "  A C\nC 1 0\nA 0 1\n";
        assert!(matches!(
            MatrixParser::read_scores(Cursor::new(swapped)),
            Err(MatrixError::RowMismatch { line: 2, expected: 'A', .. })
        ));

        let short = "  A C\nA 1\nC 0 1\n";
        assert!(matches!(
            MatrixParser::read_scores(Cursor::new(short)),
            Err(MatrixError::ColumnCount { line: 2, expected: 2, found: 1 })
        ));

        let truncated = "  A C\nA 1 0\n";
        assert!(matches!(
            MatrixParser::read_scores(Cursor::new(truncated)),
            Err(MatrixError::MissingRow('C'))
        ));

        let garbage = "  A C\nA 1 x\nC 0 1\n";
        assert!(matches!(
            MatrixParser::read_scores(Cursor::new(garbage)),
            Err(MatrixError::InvalidValue { line: 2, .. })
        ));

        assert!(matches!(
            MatrixParser::read_scores(Cursor::new("# only comments\n")),
            Err(MatrixError::MissingHeader)
        ));
    }

    #[test]
    fn test_stop_symbol_is_skipped() {
        let data = "  A *\nA 4 -9\n* -9 1\n";
        let matrix = MatrixParser::read_scores(Cursor::new(data)).unwrap();
        assert_eq!(matrix.score(b'A', b'A'), Some(4));
        assert_eq!(matrix.score(b'A', b'*'), None);
    }

    #[test]
    fn test_read_probabilities() {
        let data = "  A C\nA 0.5 0.25\nC 0.25 0.5\n";
        let matrix = MatrixParser::read_probabilities(Cursor::new(data)).unwrap();
        assert_eq!(matrix.probability(b'A', b'C'), Some(0.25));
        assert_eq!(matrix.probability(b'C', b'C'), Some(0.5));
        assert_eq!(matrix.probability(b'G', b'G'), Some(1.0));
    }

    #[test]
    fn test_write_layout() {
        let matrix = MatrixParser::read_scores(Cursor::new(NUCLEOTIDE)).unwrap();
        let mut out = Vec::new();
        write_matrix_with_alphabet(&matrix, "ACGT*", &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "    A   C   G   T   *");
        assert_eq!(lines[1], "A   5  -4  -4  -4  -4");
        assert_eq!(lines[5], "*  -4  -4  -4  -4  -4");
    }

    #[test]
    fn test_write_rejects_bad_alphabet() {
        let matrix = ScoreMatrix::blank();
        assert!(matches!(
            write_matrix_with_alphabet(&matrix, "AAC", &mut Vec::new()),
            Err(MatrixError::BadAlphabet(_))
        ));
    }

    #[test]
    fn test_write_then_read_default_alphabet() {
        let mut matrix = ScoreMatrix::blank();
        matrix.set_name(Some("toy".to_string()));
        matrix.set(b'W', b'W', 11);
        matrix.set(b'A', b'W', -3);
        matrix.set(b'X', b'B', -1);

        let mut out = Vec::new();
        write_matrix(&matrix, &mut out).unwrap();
        assert!(out.starts_with(b"# toy\n"));

        let back = MatrixParser::read_scores(Cursor::new(out)).unwrap();
        for &a in DEFAULT_PROTEIN_ALPHABET.as_bytes() {
            for &b in DEFAULT_PROTEIN_ALPHABET.as_bytes() {
                assert_eq!(back.score(a, b), matrix.score(a, b));
            }
        }
    }

    #[test]
    fn test_probabilities_must_be_positive_and_finite() {
        for bad in ["NaN", "inf", "-inf", "-0.5", "0", "0.0"] {
            let data = format!("  A C\nA 0.5 {}\nC 0.25 0.5\n", bad);
            match MatrixParser::read_probabilities(Cursor::new(data)) {
                Err(MatrixError::InvalidValue { line, value }) => {
                    assert_eq!(line, 2);
                    assert_eq!(value, bad);
                }
                other => panic!("{} should be rejected, got {:?}", bad, other.map(|_| ())),
            }
        }
    }

    #[test]
    fn test_multiline_name_keeps_table_readable() {
        let mut matrix = ScoreMatrix::blank();
        matrix.set_name(Some("blosum62\nA 1".to_string()));
        matrix.set(b'A', b'A', 4);

        let mut out = Vec::new();
        write_matrix_with_alphabet(&matrix, "AC", &mut out).unwrap();
        assert!(out.starts_with(b"# blosum62\n  "));

        let back = MatrixParser::read_scores(Cursor::new(out)).unwrap();
        assert_eq!(back.score(b'A', b'A'), Some(4));
    }
}
