//! Retention sweeper for retired files
//!
//! After each rotation the sweeper inspects the output directory and
//! deletes retired files that violate the age or count limits. A file
//! that cannot be deleted is logged and left for the next sweep.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// Prunes retired files by age and by count
pub struct RetentionSweeper {
    max_age: Option<Duration>,
    max_count: Option<usize>,
}

impl RetentionSweeper {
    pub fn new(max_age: Option<Duration>, max_count: Option<u64>) -> Self {
        Self {
            max_age,
            max_count: max_count.map(|n| n as usize),
        }
    }

    /// Delete retired files violating the limits.
    ///
    /// Every file in `dir` other than `active_name` counts as retired.
    /// Age is judged by filesystem modification time; the count limit
    /// keeps the most recently modified files. Deletion failures are
    /// non-fatal.
    pub fn sweep(&self, dir: &Path, active_name: &str) {
        if self.max_age.is_none() && self.max_count.is_none() {
            return;
        }

        let mut retired = match list_retired(dir, active_name) {
            Ok(files) => files,
            Err(e) => {
                warn!("Retention sweep of {} failed: {}", dir.display(), e);
                return;
            }
        };

        let now = SystemTime::now();
        if let Some(max_age) = self.max_age {
            retired.retain(|(path, modified)| {
                let expired = now
                    .duration_since(*modified)
                    .map_or(false, |age| age > max_age);
                // A file whose deletion failed is still on disk and
                // still occupies the count budget
                !(expired && remove_retired(path))
            });
        }

        if let Some(max_count) = self.max_count {
            if retired.len() > max_count {
                // Oldest first; delete the excess from the front
                retired.sort_by_key(|(_, modified)| *modified);
                for (path, _) in &retired[..retired.len() - max_count] {
                    remove_retired(path);
                }
            }
        }
    }
}

/// Delete one retired file, reporting whether it is actually gone
fn remove_retired(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("Deleted retired file: {}", path.display());
            true
        }
        // Left in place, retried on the next sweep
        Err(e) => {
            warn!("Failed to delete {}: {}", path.display(), e);
            false
        }
    }
}

fn list_retired(dir: &Path, active_name: &str) -> std::io::Result<Vec<(PathBuf, SystemTime)>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name() == active_name {
            continue;
        }
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        files.push((entry.path(), metadata.modified()?));
    }
    Ok(files)
}
