use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sift_import::StatementFormat;
use std::fs;
use std::path::{Path, PathBuf};

pub const RULES_FILE: &str = "categories.json";
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rule file location; defaults to `categories.json` in the data dir.
    pub rules_path: Option<PathBuf>,
    /// Label printed after amounts, e.g. "EUR".
    pub currency: Option<String>,
    pub format: StatementFormat,
}

impl Config {
    pub fn rules_path(&self, data_dir: &Path) -> PathBuf {
        self.rules_path
            .clone()
            .unwrap_or_else(|| data_dir.join(RULES_FILE))
    }
}

/// Platform data directory (`~/.local/share/sift` on Linux), or the working
/// directory when the platform has none.
pub fn data_dir() -> PathBuf {
    match directories::ProjectDirs::from("com", "sift", "Sift") {
        Some(dirs) => dirs.data_dir().to_path_buf(),
        None => {
            tracing::warn!("no home directory found; using the working directory");
            PathBuf::from(".")
        }
    }
}

/// Reads `path`; a missing file means defaults.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", path.display()))
}
