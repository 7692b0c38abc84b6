//! Configuration loading for Sluice
//!
//! Supports multiple configuration file formats:
//! - TOML (.toml)
//! - YAML (.yaml, .yml)
//! - JSON (.json)
//!
//! All fields have defaults, so an empty file (or no file at all) is a
//! valid configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::constants::*;
use crate::error::{Error, Result};

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(ConfigFormat::Toml),
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            "json" => Some(ConfigFormat::Json),
            _ => None,
        }
    }

    /// Detect format from file path
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// Policy for naming retired files at rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenamePolicy {
    /// Suffix the base name with the rotation wall-clock time
    #[default]
    Timestamp,
    /// Suffix the base name with a monotonically increasing counter
    Serial,
}

impl FromStr for RenamePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "timestamp" => Ok(RenamePolicy::Timestamp),
            "serial" => Ok(RenamePolicy::Serial),
            other => Err(Error::config(format!(
                "unknown rename policy '{}' (expected 'timestamp' or 'serial')",
                other
            ))),
        }
    }
}

/// Line processor selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorKind {
    /// Identity: lines pass through unchanged
    #[default]
    None,
    /// Prepend a fixed string to every line
    Prefix,
}

impl FromStr for ProcessorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "none" => Ok(ProcessorKind::None),
            "prefix" => Ok(ProcessorKind::Prefix),
            other => Err(Error::config(format!(
                "unknown processor '{}' (expected 'none' or 'prefix')",
                other
            ))),
        }
    }
}

/// Sluice configuration, immutable for the engine's lifetime
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Output directory for the active file and retired files
    pub dir: PathBuf,
    /// Base name of the active file
    pub file_name: String,
    /// Maximum lines per file before rotation (0 = unlimited)
    pub max_lines: u64,
    /// Maximum bytes per file before rotation (0 = unlimited)
    pub max_bytes: u64,
    /// Seconds between background flushes (0 = flush only on rotation/exit)
    pub flush_interval_secs: u64,
    /// Naming policy for retired files
    pub rename_policy: RenamePolicy,
    /// Maximum age of retired files in seconds (0 = unlimited)
    pub max_age_secs: u64,
    /// Maximum number of retired files to keep (0 = unlimited)
    pub max_count: u64,
    /// Line processor to apply before writing
    pub processor: ProcessorKind,
    /// Prefix string for the `prefix` processor
    pub prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_DIR),
            file_name: DEFAULT_FILE_NAME.to_string(),
            max_lines: DEFAULT_MAX_LINES,
            max_bytes: DEFAULT_MAX_BYTES,
            flush_interval_secs: DEFAULT_FLUSH_INTERVAL_SECS,
            rename_policy: RenamePolicy::default(),
            max_age_secs: DEFAULT_MAX_AGE_SECS,
            max_count: DEFAULT_MAX_COUNT,
            processor: ProcessorKind::default(),
            prefix: String::new(),
        }
    }
}

impl Config {
    /// Load configuration from a file, detecting the format from its
    /// extension.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }

        let format = ConfigFormat::from_path(path).ok_or_else(|| {
            Error::config(format!(
                "unrecognized config file extension: {}",
                path.display()
            ))
        })?;

        let contents = std::fs::read_to_string(path)?;
        let config: Config = match format {
            ConfigFormat::Toml => toml::from_str(&contents)?,
            ConfigFormat::Yaml => serde_yaml::from_str(&contents)?,
            ConfigFormat::Json => serde_json::from_str(&contents)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Search a directory for a config file by well-known names, in
    /// priority order. Returns `None` if no candidate exists.
    pub fn discover_in(dir: &Path) -> Option<PathBuf> {
        CONFIG_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Search the current working directory for a config file.
    pub fn discover() -> Option<PathBuf> {
        Self::discover_in(Path::new("."))
    }

    /// Check field-level invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.file_name.is_empty() {
            return Err(Error::config("file_name must not be empty"));
        }
        if self.file_name.contains(std::path::MAIN_SEPARATOR) {
            return Err(Error::config(
                "file_name must be a bare file name, not a path",
            ));
        }
        if self.dir.as_os_str().is_empty() {
            return Err(Error::config("dir must not be empty"));
        }
        Ok(())
    }

    /// Full path of the active file
    pub fn active_path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    /// Flush interval as a `Duration`, `None` when disabled
    pub fn flush_interval(&self) -> Option<Duration> {
        (self.flush_interval_secs > 0).then(|| Duration::from_secs(self.flush_interval_secs))
    }

    /// Retention max age as a `Duration`, `None` when unlimited
    pub fn max_age(&self) -> Option<Duration> {
        (self.max_age_secs > 0).then(|| Duration::from_secs(self.max_age_secs))
    }
}
