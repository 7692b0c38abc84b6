//! Error types for Sluice

use std::path::PathBuf;

/// Sluice error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to read input stream: {0}")]
    InputRead(std::io::Error),

    #[error("Failed to open {}: {source}", path.display())]
    FileOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to rename {} to {}: {source}", from.display(), to.display())]
    FileRename {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write to active file: {0}")]
    FileWrite(std::io::Error),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// Result type alias for Sluice
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::ConfigError(msg.into())
    }
}
