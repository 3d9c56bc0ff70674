//! Size-rotated file sink
//!
//! The active file is always the configured basename. When the next record
//! would push it past the size limit, the active file becomes archive `1`,
//! older archives shift up by one and the oldest beyond the retention count
//! is deleted. Archives are named by inserting the index before the
//! extension: `chika.log`, `chika.1.log`, `chika.2.log`, ...

use crate::core::{FormatPattern, LogRecord, LoggerError, PatternFormatter, Result, Sink};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Size and retention limits for [`RotatingFileSink`]
///
/// # Examples
///
/// ```
/// use chika_log::sinks::RotationPolicy;
///
/// let policy = RotationPolicy::new()
///     .with_max_size(50 * 1024 * 1024)
///     .with_max_files(7)
///     .with_check_at_first(true);
/// assert_eq!(policy.archive_count(), 6);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Size limit of a single file in bytes
    pub max_file_size: u64,
    /// Maximum number of retained files, active file included
    pub max_files: usize,
    /// Delete archives beyond the retention count when the sink opens
    pub check_at_first: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_file_size: crate::core::config::DEFAULT_MAX_FILE_SIZE,
            max_files: crate::core::config::DEFAULT_MAX_FILES,
            check_at_first: false,
        }
    }
}

impl RotationPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_files(mut self, count: usize) -> Self {
        self.max_files = count;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_check_at_first(mut self, enabled: bool) -> Self {
        self.check_at_first = enabled;
        self
    }

    /// Number of numbered archives kept next to the active file.
    /// A `max_files` of 0 behaves like 1.
    #[must_use]
    pub fn archive_count(&self) -> usize {
        self.max_files.max(1) - 1
    }
}

pub struct RotatingFileSink {
    base_path: PathBuf,
    policy: RotationPolicy,
    writer: Option<BufWriter<File>>,
    current_size: u64,
    formatter: PatternFormatter,
    buffer: String,
}

impl RotatingFileSink {
    /// Create a sink with the default policy
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created or opened
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_policy(path, RotationPolicy::default())
    }

    /// # Errors
    ///
    /// Returns error if the policy has a zero size limit, if stale archives
    /// cannot be removed, or if the file cannot be created or opened
    pub fn with_policy<P: AsRef<Path>>(path: P, policy: RotationPolicy) -> Result<Self> {
        if policy.max_file_size == 0 {
            return Err(LoggerError::config(
                "RotatingFileSink",
                "max_file_size must be non-zero",
            ));
        }

        let base_path = path.as_ref().to_path_buf();

        // Create parent directory if it doesn't exist
        if let Some(parent) = base_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                LoggerError::io_operation(
                    "create log directory",
                    format!("Failed to create directory '{}'", parent.display()),
                    e,
                )
            })?;
        }

        let mut sink = Self {
            base_path,
            policy,
            writer: None,
            current_size: 0,
            formatter: PatternFormatter::new(&FormatPattern::standard()),
            buffer: String::with_capacity(256),
        };

        if sink.policy.check_at_first {
            sink.remove_stale_archives()?;
        }
        sink.reopen()?;
        Ok(sink)
    }

    /// Path of archive `index`; index 0 is the active file
    #[must_use]
    pub fn archive_path(&self, index: usize) -> PathBuf {
        if index == 0 {
            return self.base_path.clone();
        }
        let stem = self
            .base_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("chika");
        let name = match self.base_path.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{}.{}.{}", stem, index, ext),
            None => format!("{}.{}", stem, index),
        };
        self.base_path.with_file_name(name)
    }

    /// Archive index encoded in `file_name`, if it names one of our archives
    fn archive_index(&self, file_name: &str) -> Option<usize> {
        let stem = self.base_path.file_stem()?.to_str()?;
        let rest = file_name.strip_prefix(stem)?.strip_prefix('.')?;
        let digits = match self.base_path.extension().and_then(|e| e.to_str()) {
            Some(ext) => rest.strip_suffix(ext)?.strip_suffix('.')?,
            None => rest,
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().filter(|index| *index > 0)
    }

    /// Delete archives whose index lies beyond the retention count
    fn remove_stale_archives(&self) -> Result<()> {
        let dir = match self.base_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let keep = self.policy.archive_count();

        let entries = fs::read_dir(&dir).map_err(|e| {
            LoggerError::io_operation(
                "scan log directory",
                format!("Failed to read directory '{}'", dir.display()),
                e,
            )
        })?;

        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(index) = name.to_str().and_then(|n| self.archive_index(n)) else {
                continue;
            };
            if index > keep {
                fs::remove_file(entry.path()).map_err(|e| {
                    LoggerError::io_operation(
                        "remove stale archive",
                        format!("Failed to remove '{}'", entry.path().display()),
                        e,
                    )
                })?;
            }
        }
        Ok(())
    }

    /// Open the active file for appending and pick up its current size
    fn reopen(&mut self) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.base_path)
            .map_err(|e| {
                LoggerError::file_sink(
                    self.base_path.display().to_string(),
                    format!("Failed to open: {}", e),
                )
            })?;

        let metadata = file.metadata().map_err(|e| {
            LoggerError::file_sink(
                self.base_path.display().to_string(),
                format!("Cannot access file metadata: {}", e),
            )
        })?;

        self.current_size = metadata.len();
        self.writer = Some(BufWriter::new(file));
        Ok(())
    }

    /// Rename with one delayed retry; antivirus scanners and indexers can
    /// briefly hold a freshly closed file open.
    fn rename_with_retry(from: &Path, to: &Path) -> std::io::Result<()> {
        if to.exists() {
            fs::remove_file(to)?;
        }
        fs::rename(from, to).or_else(|_| {
            thread::sleep(Duration::from_millis(100));
            if to.exists() {
                fs::remove_file(to)?;
            }
            fs::rename(from, to)
        })
    }

    fn rotate(&mut self) -> Result<()> {
        // Explicitly drop writer to release file handle before renaming
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to flush before rotation: {}", e),
                )
            })?;
        }

        // Shift archives up by one; renaming into the last slot drops the oldest
        for index in (1..=self.policy.archive_count()).rev() {
            let src = self.archive_path(index - 1);
            if !src.exists() {
                continue;
            }
            let target = self.archive_path(index);
            Self::rename_with_retry(&src, &target).map_err(|e| {
                LoggerError::file_rotation(
                    src.display().to_string(),
                    format!("Failed to rename to '{}': {}", target.display(), e),
                )
            })?;
        }

        // Without archives the active file still exists and is truncated
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.base_path)
            .map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to create new log file: {}", e),
                )
            })?;

        self.writer = Some(BufWriter::new(file));
        self.current_size = 0;
        Ok(())
    }

    /// Bytes in the active file, buffered output included
    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.base_path
    }

    #[must_use]
    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }
}

impl Sink for RotatingFileSink {
    fn log(&mut self, record: &LogRecord) -> Result<()> {
        self.buffer.clear();
        self.formatter.format(record, &mut self.buffer);
        let len = self.buffer.len() as u64;

        // A previous rotation failed after closing the active file
        if self.writer.is_none() {
            self.reopen()?;
        }

        // Never split a record: an empty file takes it even when oversized
        if self.current_size > 0 && self.current_size + len > self.policy.max_file_size {
            self.rotate()?;
        }

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::file_sink(self.base_path.display().to_string(), "Writer not initialized"))?;
        writer.write_all(self.buffer.as_bytes()).map_err(|e| {
            LoggerError::file_sink(
                self.base_path.display().to_string(),
                format!("Failed to write log record: {}", e),
            )
        })?;
        self.current_size += len;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush().map_err(|e| {
                LoggerError::file_sink(
                    self.base_path.display().to_string(),
                    format!("Failed to flush: {}", e),
                )
            })?;
        }
        Ok(())
    }

    fn set_pattern(&mut self, pattern: &FormatPattern) {
        self.formatter.set_pattern(pattern);
    }

    fn name(&self) -> &str {
        "rotating_file"
    }
}

impl Drop for RotatingFileSink {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            // Best effort flush - ignore errors during drop
            let _ = writer.flush();
        }
    }
}
