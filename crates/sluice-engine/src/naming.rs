//! Naming policy for retired files
//!
//! At rotation the active file is renamed to a name that never existed
//! in the directory before. Two variants:
//!
//! - `timestamp`: `{base}.{YYYYmmddTHHMMSS.nnnnnnnnn}` in UTC, so
//!   lexical order always matches rotation order regardless of DST
//!   transitions in the host timezone; a zero-padded `-0001`, `-0002`,
//!   ... suffix disambiguates should two rotations ever land on the
//!   same nanosecond.
//! - `serial`: `{base}.{NNNNNNNNN}`, zero-padded so lexical and numeric
//!   order agree. The counter is seeded from the largest serial suffix
//!   already present in the directory, so names stay unique across
//!   process restarts.

use chrono::Utc;
use sluice_core::{RenamePolicy, Result, SERIAL_SUFFIX_WIDTH};
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%.9f";

/// Assigns a unique name to a retired file at rotation time
pub enum NamingPolicy {
    Timestamp,
    Serial { next: u64 },
}

impl NamingPolicy {
    /// Build the policy for a directory, seeding the serial counter
    /// from any retired files already present.
    pub fn new(policy: RenamePolicy, dir: &Path, base: &str) -> Result<Self> {
        match policy {
            RenamePolicy::Timestamp => Ok(NamingPolicy::Timestamp),
            RenamePolicy::Serial => {
                let next = highest_serial(dir, base)?.map_or(1, |n| n + 1);
                Ok(NamingPolicy::Serial { next })
            }
        }
    }

    /// Produce the path the active file is renamed to.
    ///
    /// The returned path is guaranteed not to exist in `dir` at the
    /// time of the call. Each call consumes one rotation occurrence:
    /// under the serial policy the counter advances exactly once.
    pub fn retired_path(&mut self, dir: &Path, base: &str) -> PathBuf {
        match self {
            NamingPolicy::Timestamp => timestamp_path(dir, base, &current_stamp()),
            NamingPolicy::Serial { next } => loop {
                let candidate = dir.join(format!(
                    "{}.{:0width$}",
                    base,
                    next,
                    width = SERIAL_SUFFIX_WIDTH
                ));
                *next += 1;
                if !candidate.exists() {
                    return candidate;
                }
            },
        }
    }
}

/// Rotation wall-clock time in UTC, nanosecond resolution
fn current_stamp() -> String {
    Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// First nonexistent path for a timestamp-named retired file.
///
/// Same-nanosecond rotations get a zero-padded `-0001`, `-0002`, ...
/// suffix, keeping lexical order intact through the first 9999
/// collisions of one stamp.
fn timestamp_path(dir: &Path, base: &str, stamp: &str) -> PathBuf {
    let candidate = dir.join(format!("{}.{}", base, stamp));
    if !candidate.exists() {
        return candidate;
    }
    let mut n = 1u32;
    loop {
        let candidate = dir.join(format!("{}.{}-{:04}", base, stamp, n));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Largest serial suffix among `{base}.NNNNNNNNN` files in `dir`
fn highest_serial(dir: &Path, base: &str) -> Result<Option<u64>> {
    if !dir.exists() {
        return Ok(None);
    }
    let prefix = format!("{}.", base);
    let mut highest = None;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let Some(suffix) = name.strip_prefix(&prefix) else {
            continue;
        };
        if suffix.len() == SERIAL_SUFFIX_WIDTH && suffix.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = suffix.parse::<u64>() {
                highest = Some(highest.map_or(n, |h: u64| h.max(n)));
            }
        }
    }
    Ok(highest)
}
