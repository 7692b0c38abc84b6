//! CLI argument definitions

use clap::Parser;
use sluice_core::{Config, ProcessorKind, Result};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sluice")]
#[command(
    version,
    about = "Pipe stdin into size-rotated, retention-pruned log files"
)]
pub struct Cli {
    /// Config file path (default: search ./sluice.{toml,yaml,yml,json})
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Active file name
    #[arg(short, long)]
    pub file_name: Option<String>,

    /// Maximum lines per file before rotation (0 = unlimited)
    #[arg(long)]
    pub max_lines: Option<u64>,

    /// Maximum bytes per file before rotation (0 = unlimited)
    #[arg(long)]
    pub max_bytes: Option<u64>,

    /// Seconds between background flushes (0 = flush only on rotation/exit)
    #[arg(long)]
    pub flush_interval: Option<u64>,

    /// Naming policy for retired files: "timestamp" or "serial"
    #[arg(short, long)]
    pub rename_policy: Option<String>,

    /// Maximum age of retired files in seconds (0 = unlimited)
    #[arg(long)]
    pub max_age: Option<u64>,

    /// Maximum number of retired files to keep (0 = unlimited)
    #[arg(long)]
    pub max_count: Option<u64>,

    /// Prepend this string to every line
    #[arg(long)]
    pub prefix: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Apply command-line overrides on top of the file-based config
    pub fn apply_overrides(&self, config: &mut Config) -> Result<()> {
        if let Some(dir) = &self.dir {
            config.dir = dir.clone();
        }
        if let Some(file_name) = &self.file_name {
            config.file_name = file_name.clone();
        }
        if let Some(max_lines) = self.max_lines {
            config.max_lines = max_lines;
        }
        if let Some(max_bytes) = self.max_bytes {
            config.max_bytes = max_bytes;
        }
        if let Some(flush_interval) = self.flush_interval {
            config.flush_interval_secs = flush_interval;
        }
        if let Some(policy) = &self.rename_policy {
            config.rename_policy = policy.parse()?;
        }
        if let Some(max_age) = self.max_age {
            config.max_age_secs = max_age;
        }
        if let Some(max_count) = self.max_count {
            config.max_count = max_count;
        }
        if let Some(prefix) = &self.prefix {
            config.processor = ProcessorKind::Prefix;
            config.prefix = prefix.clone();
        }
        Ok(())
    }
}
