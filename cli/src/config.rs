//! `~/.tsn/config.toml`: how to run the compiler.
//!
//! ```toml
//! [compiler]
//! command = "gs2json"
//! args = []
//! timeout_secs = 30
//! ```
//!
//! `TSN_COMPILER` in the environment replaces `command`.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tsn_types::{CompilerConfig, CompilerConfigError};

/// Environment variable naming the compiler executable.
pub const COMPILER_ENV: &str = "TSN_COMPILER";

#[derive(Debug, Default, Deserialize)]
pub struct LangsrvConfig {
    pub compiler: Option<CompilerConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid TSN_COMPILER: {0}")]
    Env(#[from] CompilerConfigError),
}

impl LangsrvConfig {
    /// Load the user config. A missing file is `Ok(None)`.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Compiler settings after applying the environment override.
    pub fn compiler_config(
        &self,
        env_command: Option<String>,
    ) -> Result<CompilerConfig, ConfigError> {
        let base = self.compiler.clone().unwrap_or_default();
        match env_command {
            Some(command) => Ok(base.with_command(command)?),
            None => Ok(base),
        }
    }
}

/// Root of everything the server keeps on disk: `~/.tsn`.
#[must_use]
pub fn tsn_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".tsn"))
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    tsn_dir().map(|dir| dir.join("config.toml"))
}
