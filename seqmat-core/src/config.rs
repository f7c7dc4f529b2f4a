//! Configuration and configuration-resolved file opening
//!
//! Supports loading configuration from seqmat.toml files. The `[search]`
//! section drives [`FileOpener`], which turns a logical file name such as
//! `blosum62.bla` into a readable stream.

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Configuration file looked for in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "seqmat.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub retrieve: RetrieveConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Directories searched, in order, for data files
    #[serde(default)]
    pub paths: Vec<PathBuf>,

    /// Environment variable naming the shared configuration directory
    #[serde(default = "default_env_var")]
    pub env_var: String,

    /// Environment variable naming a personal configuration directory
    #[serde(default = "default_personal_env_var")]
    pub personal_env_var: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieveConfig {
    /// efetch binary used for accession retrieval
    #[serde(default = "default_efetch")]
    pub efetch: String,

    /// getz binary used for SRS retrieval
    #[serde(default = "default_getz")]
    pub getz: String,
}

fn default_env_var() -> String { "WISECONFIGDIR".to_string() }
fn default_personal_env_var() -> String { "WISEPERSONALDIR".to_string() }
fn default_efetch() -> String { "efetch".to_string() }
fn default_getz() -> String { "getz".to_string() }

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            env_var: default_env_var(),
            personal_env_var: default_personal_env_var(),
        }
    }
}

impl Default for RetrieveConfig {
    fn default() -> Self {
        Self {
            efetch: default_efetch(),
            getz: default_getz(),
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(path)?
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    log::info!("Loading configuration from: {}", DEFAULT_CONFIG_FILE);
                    Self::load_from_file(&default_path)?
                } else {
                    log::info!("Using default configuration");
                    Self::default()
                }
            }
        };

        Ok(config)
    }

    /// Load configuration from a specific TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file: {}", path.display()))?;

        Ok(config)
    }

    pub fn file_opener(&self) -> FileOpener {
        FileOpener::new(self.search.clone())
    }
}

/// Resolves logical file names against the configured search path.
#[derive(Debug, Clone, Default)]
pub struct FileOpener {
    search: SearchConfig,
}

impl FileOpener {
    pub fn new(search: SearchConfig) -> Self {
        Self { search }
    }

    /// Candidate locations for `name`, in the order they are tried: the
    /// name itself, each configured directory, then the directories named by
    /// the two environment variables.
    pub fn candidates(&self, name: &str) -> Vec<PathBuf> {
        let mut candidates = vec![PathBuf::from(name)];

        // Absolute paths are never re-rooted
        if Path::new(name).is_absolute() {
            return candidates;
        }

        candidates.extend(self.search.paths.iter().map(|dir| dir.join(name)));
        for var in [&self.search.env_var, &self.search.personal_env_var] {
            if let Some(dir) = std::env::var_os(var) {
                candidates.push(PathBuf::from(dir).join(name));
            }
        }
        candidates
    }

    /// First existing candidate for `name`.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        self.candidates(name).into_iter().find(|path| path.is_file())
    }

    /// Open `name` for reading, decompressing `.gz` files on the fly.
    pub fn open(&self, name: &str) -> io::Result<Box<dyn BufRead>> {
        let path = match self.resolve(name) {
            Some(path) => path,
            None => {
                let tried: Vec<String> = self
                    .candidates(name)
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect();
                log::warn!("cannot open {}; tried {}", name, tried.join(", "));
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("cannot find {} (tried {})", name, tried.join(", ")),
                ));
            }
        };

        log::debug!("resolved {} to {}", name, path.display());
        let file = File::open(&path)?;
        if path.to_string_lossy().ends_with(".gz") {
            Ok(Box::new(BufReader::new(GzDecoder::new(file))))
        } else {
            Ok(Box::new(BufReader::new(file)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Read, Write};
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.search.paths.is_empty());
        assert_eq!(config.search.env_var, "WISECONFIGDIR");
        assert_eq!(config.retrieve.efetch, "efetch");
        assert_eq!(config.retrieve.getz, "getz");
    }

    #[test]
    fn test_load_from_file() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "[search]\npaths = [\"/opt/matrices\"]\n\n[retrieve]\ngetz = \"/usr/local/bin/getz\"")?;

        let loaded = Config::load(Some(temp_file.path()))?;
        assert_eq!(loaded.search.paths, vec![PathBuf::from("/opt/matrices")]);
        assert_eq!(loaded.retrieve.getz, "/usr/local/bin/getz");
        assert_eq!(loaded.retrieve.efetch, "efetch");
        assert_eq!(loaded.file_opener().candidates("pam250")[1], PathBuf::from("/opt/matrices/pam250"));
        Ok(())
    }

    #[test]
    fn test_load_rejects_bad_toml() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "[search\npaths = 3")?;
        assert!(Config::load_from_file(temp_file.path()).is_err());
        Ok(())
    }

    #[test]
    fn test_partial_config_uses_defaults() -> Result<()> {
        let config: Config = toml::from_str("[search]\npaths = [\"data\"]\n")?;
        assert_eq!(config.search.paths, vec![PathBuf::from("data")]);
        assert_eq!(config.search.personal_env_var, "WISEPERSONALDIR");
        assert_eq!(config.retrieve.efetch, "efetch");
        Ok(())
    }

    #[test]
    fn test_opener_searches_configured_paths() -> Result<()> {
        let first = tempdir()?;
        let second = tempdir()?;
        std::fs::write(second.path().join("matrix.txt"), "second")?;

        let opener = FileOpener::new(SearchConfig {
            paths: vec![first.path().to_path_buf(), second.path().to_path_buf()],
            env_var: "SEQMAT_TEST_UNSET_DIR".to_string(),
            personal_env_var: "SEQMAT_TEST_UNSET_PERSONAL".to_string(),
        });

        let mut content = String::new();
        opener.open("matrix.txt")?.read_to_string(&mut content)?;
        assert_eq!(content, "second");

        std::fs::write(first.path().join("matrix.txt"), "first")?;
        let mut content = String::new();
        opener.open("matrix.txt")?.read_to_string(&mut content)?;
        assert_eq!(content, "first");
        Ok(())
    }

    #[test]
    fn test_opener_missing_file() {
        let opener = FileOpener::default();
        let err = opener.open("definitely-not-here.fa").err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_opener_decompresses_gzip() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("seq.fa.gz");
        let mut encoder = GzEncoder::new(File::create(&path)?, Compression::default());
        encoder.write_all(b">s1\nACGT\n")?;
        encoder.finish()?;

        let mut content = String::new();
        FileOpener::default()
            .open(path.to_str().unwrap())?
            .read_to_string(&mut content)?;
        assert_eq!(content, ">s1\nACGT\n");
        Ok(())
    }
}
