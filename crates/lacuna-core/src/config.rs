//! Persisted search defaults (chunk size, top-k, ...) in the app data directory.
//! Every field is optional; command-line flags override whatever is set here.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::app_data;
use crate::output::OutputFormat;
use crate::search::{chunk_size_for_budget, SearchOptions, DEFAULT_CHUNK_SIZE, DEFAULT_QUERY_BATCH_SIZE};

const CONFIG_FILENAME: &str = "config.toml";

/// Number of distant-closest items kept when nothing else is configured.
pub const DEFAULT_TOP_K: usize = 1000;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Reference rows per similarity block. Takes precedence over `memory_budget_mb`.
    pub chunk_size: Option<usize>,
    /// Memory allowed for one similarity block plus its reference chunk, in MiB.
    pub memory_budget_mb: Option<usize>,
    /// Query rows per similarity block.
    pub query_batch_size: Option<usize>,
    pub top_k: Option<usize>,
    pub parallel: Option<bool>,
    pub format: Option<OutputFormat>,
}

impl Config {
    /// Resolve engine options for a query pool of `query_rows` vectors of dimension `dim`.
    pub fn search_options(&self, query_rows: usize, dim: usize) -> SearchOptions {
        let query_batch_size = self.query_batch_size.unwrap_or(DEFAULT_QUERY_BATCH_SIZE);
        let chunk_size = match (self.chunk_size, self.memory_budget_mb) {
            (Some(c), _) => c,
            (None, Some(mb)) => {
                chunk_size_for_budget(query_rows.min(query_batch_size), dim, mb.saturating_mul(1 << 20))
            }
            (None, None) => DEFAULT_CHUNK_SIZE,
        };
        SearchOptions {
            chunk_size,
            query_batch_size,
            parallel: self.parallel.unwrap_or(false),
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k.unwrap_or(DEFAULT_TOP_K)
    }

    pub fn format(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }
}

/// Path of the config file, if the app data directory can be determined.
pub fn config_path() -> Option<PathBuf> {
    app_data::app_data_dir().map(|d| d.join(CONFIG_FILENAME))
}

/// Load config from the app data directory. Returns default config if missing or invalid.
pub fn load_config() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };
    match load_config_from(&path) {
        Ok(config) => config,
        Err(ConfigError::Read(_)) => Config::default(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring invalid config");
            Config::default()
        }
    }
}

/// Load config from an explicit file.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
    toml::from_str(&s).map_err(ConfigError::Parse)
}

/// Save config to the app data directory.
pub fn save_config(config: &Config) -> Result<(), ConfigError> {
    let path = config_path().ok_or(ConfigError::NoDataDir)?;
    save_config_to(config, &path)
}

pub fn save_config_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    std::fs::write(path, config.to_toml()?).map_err(ConfigError::Write)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine app data directory")]
    NoDataDir,
    #[error("failed to read config: {0}")]
    Read(std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("failed to write config: {0}")]
    Write(std::io::Error),
}
