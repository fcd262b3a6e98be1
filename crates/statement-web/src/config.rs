//! Read `config.toml` for server address, storage paths and statement wording.
//!
//! Every field has a default, so the file is optional. CLI flags and
//! environment variables override individual values after loading.

use anyhow::{Context, Result};
use serde::Deserialize;
use statement_core::Labels;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerSection,
    pub storage: StorageSection,
    pub labels: Labels,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Listen address, e.g. `127.0.0.1:3000`.
    pub addr: String,
    /// Largest accepted upload body, in megabytes.
    pub max_upload_mb: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:3000".to_string(),
            max_upload_mb: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Root of the upload store (spreadsheets, metadata records, PDFs).
    pub data_dir: PathBuf,
    /// Directory served under `/static`.
    pub static_dir: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            static_dir: PathBuf::from("public"),
        }
    }
}

impl Config {
    /// Load from an explicit file, or from `./config.toml` when present.
    ///
    /// An explicitly named file must exist; the implicit one may not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context(
            "Invalid config.toml. Check for:\n\
             - Invalid TOML syntax (missing quotes, brackets, etc.)\n\
             - labels.columns must list exactly six labels\n\n\
             See config.toml.example for the expected format.",
        )?;
        Ok(config)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.server.max_upload_mb * 1024 * 1024
    }
}
