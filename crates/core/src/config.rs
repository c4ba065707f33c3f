use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::StoryError;
use crate::resource::ResourceLimiter;
use crate::scan::ScanLimits;

/// Engine tuning, read from a TOML file. Missing keys take their defaults.
///
/// ```toml
/// undo_limit = 64
///
/// [scan]
/// max_steps = 512
/// max_depth = 16
///
/// [limits]
/// max_scenes = 4096
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Saves kept on the undo stack; the oldest is dropped first.
    pub undo_limit: usize,
    pub scan: ScanLimits,
    pub limits: ResourceLimiter,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            undo_limit: 64,
            scan: ScanLimits::default(),
            limits: ResourceLimiter::default(),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("config file not found at {0}")]
    #[diagnostic(
        code(config::not_found),
        help("run `storypath config --init <file>` to write the defaults")
    )]
    NotFound(PathBuf),

    #[error("failed to parse config: {0}")]
    #[diagnostic(code(config::parse_error))]
    Parse(#[from] toml::de::Error),

    #[error("failed to write config: {0}")]
    #[diagnostic(code(config::write_error))]
    Write(#[from] toml::ser::Error),

    #[error("io error: {0}")]
    #[diagnostic(code(config::io_error))]
    Io(#[from] std::io::Error),
}

impl From<ConfigError> for StoryError {
    fn from(err: ConfigError) -> Self {
        StoryError::Config(err.to_string())
    }
}

impl EngineConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Loads a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
