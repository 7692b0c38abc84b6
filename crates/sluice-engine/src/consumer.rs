//! The rotation engine: consumes an input stream into rotated files

use parking_lot::Mutex;
use sluice_core::{Config, Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, warn};

use crate::naming::NamingPolicy;
use crate::processor::LineProcessor;
use crate::retention::RetentionSweeper;

/// Active file state, shared between the read loop and the flush task.
///
/// Every mutation happens under one mutex, so the flush task can never
/// observe a half-rotated file.
struct ActiveFile {
    path: PathBuf,
    writer: BufWriter<File>,
    lines_written: u64,
    bytes_written: u64,
    dirty: bool,
}

impl ActiveFile {
    fn open(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| Error::FileOpen {
                path: path.clone(),
                source: e,
            })?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            lines_written: 0,
            bytes_written: 0,
            dirty: false,
        })
    }

    /// Append one line. A newline byte is added only when the source
    /// line carried one, keeping the output byte-identical with the
    /// input.
    fn write_line(&mut self, line: &[u8], terminated: bool) -> Result<()> {
        self.writer.write_all(line).map_err(Error::FileWrite)?;
        let mut written = line.len() as u64;
        if terminated {
            self.writer.write_all(b"\n").map_err(Error::FileWrite)?;
            written += 1;
        }
        self.lines_written += 1;
        self.bytes_written += written;
        self.dirty = true;
        Ok(())
    }

    /// Push buffered bytes to durable storage
    fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(Error::FileWrite)?;
        self.writer.get_ref().sync_data().map_err(Error::FileWrite)?;
        self.dirty = false;
        Ok(())
    }

    /// Close and rename the active file, then reopen it empty.
    ///
    /// The old handle is dropped when the writer is replaced; renaming
    /// an open file is fine on POSIX.
    fn rotate(&mut self, naming: &mut NamingPolicy, dir: &Path, base: &str) -> Result<PathBuf> {
        self.flush()?;
        let retired = naming.retired_path(dir, base);
        std::fs::rename(&self.path, &retired).map_err(|e| Error::FileRename {
            from: self.path.clone(),
            to: retired.clone(),
            source: e,
        })?;

        let file = OpenOptions::new()
            .create_new(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| Error::FileOpen {
                path: self.path.clone(),
                source: e,
            })?;
        self.writer = BufWriter::new(file);
        self.lines_written = 0;
        self.bytes_written = 0;
        self.dirty = false;
        Ok(retired)
    }
}

/// Streaming log consumer.
///
/// Reads newline-delimited bytes from an input stream and persists
/// them to `dir/file_name`, rotating per the configured thresholds and
/// pruning retired files after each rotation.
pub struct Consumer {
    config: Config,
    processor: Box<dyn LineProcessor>,
}

impl Consumer {
    pub fn new(config: Config, processor: Box<dyn LineProcessor>) -> Self {
        Self { config, processor }
    }

    /// Consume the entire input stream, blocking until it is exhausted
    /// or a fatal error occurs.
    ///
    /// On return the directory holds exactly one active file (flushed,
    /// possibly empty) plus the retired files the retention limits
    /// allow. End of input never triggers a rotation; only the
    /// configured thresholds do.
    pub async fn start<R>(mut self, input: R) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        std::fs::create_dir_all(&self.config.dir)?;

        let dir = self.config.dir.clone();
        let base = self.config.file_name.clone();
        let active_path = self.config.active_path();

        let mut naming = NamingPolicy::new(self.config.rename_policy, &dir, &base)?;
        let sweeper = RetentionSweeper::new(
            self.config.max_age(),
            (self.config.max_count > 0).then_some(self.config.max_count),
        );

        // A non-empty active file left over from a previous run is
        // retired up front, so counters always describe a fresh file.
        if let Ok(metadata) = std::fs::metadata(&active_path) {
            if metadata.len() > 0 {
                let retired = naming.retired_path(&dir, &base);
                std::fs::rename(&active_path, &retired).map_err(|e| Error::FileRename {
                    from: active_path.clone(),
                    to: retired.clone(),
                    source: e,
                })?;
                debug!("Retired leftover active file to {}", retired.display());
                sweeper.sweep(&dir, &base);
            }
        }

        let active = Arc::new(Mutex::new(ActiveFile::open(active_path)?));

        let flush_task = self.config.flush_interval().map(|period| {
            let active = Arc::clone(&active);
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(period);
                loop {
                    interval.tick().await;
                    let mut active = active.lock();
                    if active.dirty {
                        if let Err(e) = active.flush() {
                            // Bytes stay buffered; the next flush retries
                            warn!("Periodic flush failed: {}", e);
                        }
                    }
                }
            })
        });

        let result = self
            .consume(input, &active, &mut naming, &sweeper, &dir, &base)
            .await;

        if let Some(task) = flush_task {
            task.abort();
        }

        // Final flush; best-effort when the loop already failed
        let flushed = active.lock().flush();
        result.and(flushed)
    }

    async fn consume<R>(
        &mut self,
        input: R,
        active: &Mutex<ActiveFile>,
        naming: &mut NamingPolicy,
        sweeper: &RetentionSweeper,
        dir: &Path,
        base: &str,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let mut reader = BufReader::new(input);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let n = reader
                .read_until(b'\n', &mut buf)
                .await
                .map_err(Error::InputRead)?;
            if n == 0 {
                return Ok(());
            }

            let terminated = buf.last() == Some(&b'\n');
            if terminated {
                buf.pop();
            }
            let line = self.processor.process(&buf);

            // Write and rotation form one critical section; the sweep
            // only touches retired files and runs outside the lock.
            let rotated = {
                let mut active = active.lock();
                active.write_line(&line, terminated)?;
                if self.threshold_reached(&active) {
                    Some(active.rotate(naming, dir, base)?)
                } else {
                    None
                }
            };

            if let Some(retired) = rotated {
                debug!("Rotated active file to {}", retired.display());
                sweeper.sweep(dir, base);
            }
        }
    }

    fn threshold_reached(&self, active: &ActiveFile) -> bool {
        (self.config.max_lines > 0 && active.lines_written >= self.config.max_lines)
            || (self.config.max_bytes > 0 && active.bytes_written >= self.config.max_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::{NoProcessor, PrefixProcessor};
    use sluice_core::RenamePolicy;
    use std::fs;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;
    use tokio::io::AsyncWriteExt;

    fn test_config(dir: &Path) -> Config {
        Config {
            dir: dir.to_path_buf(),
            file_name: "out.log".to_string(),
            max_lines: 40,
            max_bytes: 1_000_000,
            flush_interval_secs: 5,
            rename_policy: RenamePolicy::Timestamp,
            max_age_secs: 3600,
            max_count: 500,
            ..Config::default()
        }
    }

    async fn run(config: Config, input: &[u8]) -> Result<()> {
        Consumer::new(config, Box::new(NoProcessor))
            .start(input)
            .await
    }

    /// Directory contents sorted by name. The active file sorts first
    /// because every retired name extends it with a suffix.
    fn sorted_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Concatenation of retired files in rotation order, then the
    /// active file.
    fn concatenated(dir: &Path) -> Vec<u8> {
        let names = sorted_names(dir);
        let mut out = Vec::new();
        for name in names.iter().skip(1).chain(names.first()) {
            out.extend_from_slice(&fs::read(dir.join(name)).unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_rollover_timestamp() {
        let dir = TempDir::new().unwrap();
        let input: String = (1..=84).map(|i| format!("line {}\n", i)).collect();

        run(test_config(dir.path()), input.as_bytes()).await.unwrap();

        let names = sorted_names(dir.path());
        assert_eq!(names.len(), 3);
        assert_eq!(names[0], "out.log");

        // Retired files hold 40 lines each, the active file the rest
        for (name, expected) in names.iter().zip([4usize, 40, 40]) {
            let data = fs::read(dir.path().join(name)).unwrap();
            let lines = data.iter().filter(|&&b| b == b'\n').count();
            assert_eq!(lines, expected, "wrong line count in {}", name);
        }

        assert_eq!(concatenated(dir.path()), input.as_bytes());
    }

    #[tokio::test]
    async fn test_rollover_serial() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(dir.path());
        config.rename_policy = RenamePolicy::Serial;
        let input: String = (1..=84).map(|i| format!("line {}\n", i)).collect();

        run(config, input.as_bytes()).await.unwrap();

        let names = sorted_names(dir.path());
        assert_eq!(
            names,
            vec!["out.log", "out.log.000000001", "out.log.000000002"]
        );

        // The smallest serial holds the first 40 lines
        let first: String = (1..=40).map(|i| format!("line {}\n", i)).collect();
        assert_eq!(
            fs::read(dir.path().join("out.log.000000001")).unwrap(),
            first.as_bytes()
        );
        assert_eq!(concatenated(dir.path()), input.as_bytes());
    }

    #[tokio::test]
    async fn test_huge_multibyte_line_no_trailing_newline() {
        let dir = TempDir::new().unwrap();
        // Arabic, Devanagari and Tibetan text, one unterminated line
        let input = "مرحبا بالعالم नमस्ते दुनिया བཀྲ་ཤིས་བདེ་ལེགས། ".repeat(2048);

        run(test_config(dir.path()), input.as_bytes()).await.unwrap();

        let names = sorted_names(dir.path());
        assert_eq!(names, vec!["out.log"]);
        assert_eq!(
            fs::read(dir.path().join("out.log")).unwrap(),
            input.as_bytes()
        );
    }

    #[tokio::test]
    async fn test_blank_lines_preserved() {
        let dir = TempDir::new().unwrap();
        let input = "first\n\n\nmiddle\n\nlast\n";

        run(test_config(dir.path()), input.as_bytes()).await.unwrap();

        assert_eq!(sorted_names(dir.path()), vec!["out.log"]);
        assert_eq!(
            fs::read(dir.path().join("out.log")).unwrap(),
            input.as_bytes()
        );
    }

    #[tokio::test]
    async fn test_empty_input() {
        let dir = TempDir::new().unwrap();

        run(test_config(dir.path()), b"").await.unwrap();

        assert_eq!(sorted_names(dir.path()), vec!["out.log"]);
        assert_eq!(
            fs::metadata(dir.path().join("out.log")).unwrap().len(),
            0
        );
    }

    #[tokio::test]
    async fn test_unterminated_final_line_across_rotation() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(dir.path());
        config.max_lines = 2;
        config.rename_policy = RenamePolicy::Serial;
        let input = b"one\ntwo\nthree\nfour\nfive";

        run(config, input).await.unwrap();

        let names = sorted_names(dir.path());
        assert_eq!(names.len(), 3);
        assert_eq!(
            fs::read(dir.path().join("out.log")).unwrap(),
            b"five"
        );
        assert_eq!(concatenated(dir.path()), input);
    }

    #[tokio::test]
    async fn test_rotation_by_bytes() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(dir.path());
        config.max_lines = 0;
        config.max_bytes = 10;
        config.rename_policy = RenamePolicy::Serial;
        // 5 bytes per line; the threshold trips every second line
        let input = b"aaaa\nbbbb\ncccc\ndddd\n";

        run(config, input).await.unwrap();

        let names = sorted_names(dir.path());
        assert_eq!(
            names,
            vec!["out.log", "out.log.000000001", "out.log.000000002"]
        );
        assert_eq!(
            fs::read(dir.path().join("out.log.000000001")).unwrap(),
            b"aaaa\nbbbb\n"
        );
        assert_eq!(
            fs::metadata(dir.path().join("out.log")).unwrap().len(),
            0
        );
        assert_eq!(concatenated(dir.path()), input);
    }

    #[tokio::test]
    async fn test_leftover_active_file_is_retired() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(dir.path());
        config.rename_policy = RenamePolicy::Serial;
        fs::write(dir.path().join("out.log"), b"stale\n").unwrap();

        run(config, b"fresh\n").await.unwrap();

        assert_eq!(
            fs::read(dir.path().join("out.log")).unwrap(),
            b"fresh\n"
        );
        assert_eq!(
            fs::read(dir.path().join("out.log.000000001")).unwrap(),
            b"stale\n"
        );
    }

    #[tokio::test]
    async fn test_prefix_processor_applies_per_line() {
        let dir = TempDir::new().unwrap();
        let consumer = Consumer::new(
            test_config(dir.path()),
            Box::new(PrefixProcessor::new("web: ".as_bytes())),
        );

        consumer.start(&b"one\ntwo"[..]).await.unwrap();

        assert_eq!(
            fs::read(dir.path().join("out.log")).unwrap(),
            b"web: one\nweb: two"
        );
    }

    #[tokio::test]
    async fn test_retention_runs_after_rotation() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(dir.path());
        config.max_lines = 1;
        config.max_count = 2;
        config.rename_policy = RenamePolicy::Serial;

        let (mut tx, rx) = tokio::io::duplex(64);
        let handle = tokio::spawn(Consumer::new(config, Box::new(NoProcessor)).start(rx));

        // Spaced out so retired files carry distinct modification times
        for line in ["one\n", "two\n", "three\n", "four\n"] {
            tx.write_all(line.as_bytes()).await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        drop(tx);
        handle.await.unwrap().unwrap();

        let names = sorted_names(dir.path());
        assert_eq!(
            names,
            vec!["out.log", "out.log.000000003", "out.log.000000004"]
        );
        assert_eq!(
            fs::read(dir.path().join("out.log.000000004")).unwrap(),
            b"four\n"
        );
        assert_eq!(fs::metadata(dir.path().join("out.log")).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_periodic_flush_reaches_disk_mid_stream() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(dir.path());
        config.flush_interval_secs = 1;
        let active = dir.path().join("out.log");

        let (mut tx, rx) = tokio::io::duplex(64);
        let handle = tokio::spawn(Consumer::new(config, Box::new(NoProcessor)).start(rx));

        tx.write_all(b"hello\n").await.unwrap();

        // The line sits in the write buffer until a flush tick lands
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if fs::read(&active).map_or(false, |data| data == b"hello\n") {
                break;
            }
            assert!(Instant::now() < deadline, "line never flushed to disk");
            tokio::time::sleep(Duration::from_millis(25)).await;
        }

        drop(tx);
        handle.await.unwrap().unwrap();
    }
}
