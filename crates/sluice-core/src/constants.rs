//! Constants and default values for Sluice

/// Default output directory
pub const DEFAULT_DIR: &str = "logs";

/// Default active file name
pub const DEFAULT_FILE_NAME: &str = "out.log";

/// Default maximum lines per file (0 = unlimited)
pub const DEFAULT_MAX_LINES: u64 = 0;

/// Default maximum bytes per file (0 = unlimited)
pub const DEFAULT_MAX_BYTES: u64 = 100 * 1024 * 1024;

/// Default flush interval in seconds (0 = flush only on rotation/exit)
pub const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 5;

/// Default maximum age of retired files in seconds (0 = unlimited)
pub const DEFAULT_MAX_AGE_SECS: u64 = 0;

/// Default maximum number of retired files to keep (0 = unlimited)
pub const DEFAULT_MAX_COUNT: u64 = 0;

/// Width of the zero-padded serial suffix.
///
/// Lexical and numeric order of serial names agree up to 10^9 - 1
/// rotations.
pub const SERIAL_SUFFIX_WIDTH: usize = 9;

/// Default config file names to search for (in priority order)
pub const CONFIG_FILES: &[&str] = &[
    "sluice.toml",
    "sluice.yaml",
    "sluice.yml",
    "sluice.json",
];
