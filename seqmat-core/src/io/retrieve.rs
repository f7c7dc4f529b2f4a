//! Sequence retrieval through external database tools
//!
//! Each retriever runs a command-line tool that prints FASTA on stdout and
//! parses the first record it returns.

use regex::Regex;
use std::io::Cursor;
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use thiserror::Error;

use super::fasta::{FastaError, FastaReader};
use crate::config::RetrieveConfig;
use crate::sequence::Sequence;

const ACCESSION_PREFIX: &str = "WP:";

#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error("Could not run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool} failed with exit code {code:?}: {stderr}")]
    ToolFailed { tool: String, code: Option<i32>, stderr: String },
    #[error("{tool} returned no sequence for '{query}'")]
    NoRecord { tool: String, query: String },
    #[error(transparent)]
    Fasta(#[from] FastaError),
}

pub type RetrieveResult<T> = Result<T, RetrieveError>;

/// Alphabetic prefix followed by at least one digit and nothing else.
pub fn looks_like_accession(name: &str) -> bool {
    static ACCESSION: OnceLock<Option<Regex>> = OnceLock::new();
    ACCESSION
        .get_or_init(|| Regex::new(r"^[A-Za-z]*[0-9]+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(name))
}

/// Trait for external sequence sources
pub trait SequenceRetriever {
    /// Fetch the first sequence matching `query`
    fn fetch(&self, query: &str) -> RetrieveResult<Sequence>;

    /// Tool name, for logging
    fn name(&self) -> &'static str;

    /// Whether the backing binary can be found on PATH
    fn is_available(&self) -> bool;
}

/// Retrieves sequences with `efetch -f`.
pub struct EfetchRetriever {
    binary_path: String,
}

impl EfetchRetriever {
    pub fn new() -> Self {
        Self::from_config(&RetrieveConfig::default())
    }

    pub fn from_config(config: &RetrieveConfig) -> Self {
        Self {
            binary_path: config.efetch.clone(),
        }
    }

    /// Arguments for `query`. `WP:` queries carrying an accession number are
    /// looked up by accession.
    pub fn command_args(query: &str) -> Vec<String> {
        let mut args = vec!["-f".to_string()];
        if let Some(rest) = query.strip_prefix(ACCESSION_PREFIX) {
            if looks_like_accession(rest) {
                args.push("-a".to_string());
            }
        }
        args.push(query.to_string());
        args
    }
}

impl Default for EfetchRetriever {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceRetriever for EfetchRetriever {
    fn fetch(&self, query: &str) -> RetrieveResult<Sequence> {
        run_and_parse(self.name(), &self.binary_path, &Self::command_args(query), query)
    }

    fn name(&self) -> &'static str {
        "efetch"
    }

    fn is_available(&self) -> bool {
        which::which(&self.binary_path).is_ok()
    }
}

/// Retrieves sequences from SRS with `getz -d '[db:id]'`.
pub struct SrsRetriever {
    binary_path: String,
}

impl SrsRetriever {
    pub fn new() -> Self {
        Self::from_config(&RetrieveConfig::default())
    }

    pub fn from_config(config: &RetrieveConfig) -> Self {
        Self {
            binary_path: config.getz.clone(),
        }
    }

    pub fn command_args(query: &str) -> Vec<String> {
        vec!["-d".to_string(), format!("[{}]", query)]
    }

    /// Fetch entry `id` of database `db`, e.g. `swissprot` and `ROA1_HUMAN`.
    pub fn fetch_db(&self, db: &str, id: &str) -> RetrieveResult<Sequence> {
        self.fetch(&format!("{}:{}", db, id))
    }
}

impl Default for SrsRetriever {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceRetriever for SrsRetriever {
    fn fetch(&self, query: &str) -> RetrieveResult<Sequence> {
        run_and_parse(self.name(), &self.binary_path, &Self::command_args(query), query)
    }

    fn name(&self) -> &'static str {
        "getz"
    }

    fn is_available(&self) -> bool {
        which::which(&self.binary_path).is_ok()
    }
}

fn run_and_parse(tool: &str, binary: &str, args: &[String], query: &str) -> RetrieveResult<Sequence> {
    let mut cmd = Command::new(binary);
    cmd.args(args).stdin(Stdio::null());

    log::debug!("Running {}: {:?}", tool, cmd);

    let output = cmd.output().map_err(|source| {
        log::warn!("could not run {} for [{}]", tool, query);
        RetrieveError::Spawn {
            tool: tool.to_string(),
            source,
        }
    })?;

    if !output.status.success() {
        return Err(RetrieveError::ToolFailed {
            tool: tool.to_string(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    // Only the first record is used
    let mut reader = FastaReader::new(Cursor::new(output.stdout));
    reader.next_sequence()?.ok_or_else(|| RetrieveError::NoRecord {
        tool: tool.to_string(),
        query: query.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_like_accession() {
        assert!(looks_like_accession("P12345"));
        assert!(looks_like_accession("AB000263"));
        assert!(looks_like_accession("12345"));
        assert!(!looks_like_accession("ROA1_HUMAN"));
        assert!(!looks_like_accession("P1234A"));
        assert!(!looks_like_accession("ABC"));
        assert!(!looks_like_accession(""));
    }

    #[test]
    fn test_efetch_args() {
        assert_eq!(EfetchRetriever::command_args("WP:CE00001"), vec!["-f", "-a", "WP:CE00001"]);
        assert_eq!(EfetchRetriever::command_args("WP:ROA1_HUMAN"), vec!["-f", "WP:ROA1_HUMAN"]);
        assert_eq!(EfetchRetriever::command_args("SW:ROA1_HUMAN"), vec!["-f", "SW:ROA1_HUMAN"]);
    }

    #[test]
    fn test_srs_args() {
        assert_eq!(SrsRetriever::command_args("swissprot:ROA1_HUMAN"), vec!["-d", "[swissprot:ROA1_HUMAN]"]);
    }

    #[test]
    fn test_missing_binary() {
        let config = RetrieveConfig {
            efetch: "seqmat-no-such-efetch".to_string(),
            getz: "seqmat-no-such-getz".to_string(),
        };

        let efetch = EfetchRetriever::from_config(&config);
        assert!(!efetch.is_available());
        assert!(matches!(efetch.fetch("WP:CE00001"), Err(RetrieveError::Spawn { .. })));

        let srs = SrsRetriever::from_config(&config);
        assert!(!srs.is_available());
        assert!(matches!(srs.fetch_db("swissprot", "ROA1_HUMAN"), Err(RetrieveError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_parses_tool_output() {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-getz");
        {
            let mut file = std::fs::File::create(&script).unwrap();
            writeln!(file, "#!/bin/sh\nprintf '>ROA1_HUMAN\\nMSKSESPKEP\\n>second\\nAAAA\\n'").unwrap();
        }
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let srs = SrsRetriever::from_config(&RetrieveConfig {
            getz: script.to_string_lossy().into_owned(),
            ..RetrieveConfig::default()
        });
        let seq = srs.fetch_db("swissprot", "ROA1_HUMAN").unwrap();
        assert_eq!(seq.name(), "ROA1_HUMAN");
        assert_eq!(seq.residues(), b"MSKSESPKEP");
    }
}
