//! Compiler configuration, loaded from a JSON file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Failure to load a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file does not exist: {0}")]
    NotFound(String),

    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Physical names of the tables the transaction log is stored in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableNames {
    pub requests: String,
    pub responses: String,
    pub headers: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            requests: "requests".to_string(),
            responses: "responses".to_string(),
            headers: "headers".to_string(),
        }
    }
}

/// Settings for [`crate::sql_compiler::SqlCompiler`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub tables: TableNames,
    /// Escape `%`, `_` and `!` in user values so `contains` matches them literally.
    /// When off, values are wrapped in `%...%` as typed.
    pub escape_like_wildcards: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            tables: TableNames::default(),
            escape_like_wildcards: true,
        }
    }
}

impl CompilerConfig {
    /// Loads the configuration from a JSON file. Keys that are absent keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let display = path_ref.display().to_string();

        if !path_ref.exists() {
            return Err(ConfigError::NotFound(display));
        }

        let content = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }
}
