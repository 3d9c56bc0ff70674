//! Logger configuration
//!
//! [`LoggerConfig`] is a plain value holding every tunable of a logger. All
//! fields are public and have documented defaults; the `with_*` methods give
//! a fluent way to override them:
//!
//! ```
//! use chika_log::{Destinations, LogLevel, LoggerConfig, OverflowPolicy};
//!
//! let config = LoggerConfig::default()
//!     .with_destinations(Destinations::CONSOLE | Destinations::FILE)
//!     .with_rotate_basename("logs/server.log")
//!     .with_rotate_max_file_size(16 * 1024 * 1024)
//!     .with_overflow_policy(OverflowPolicy::Block)
//!     .with_level(LogLevel::Debug);
//! assert!(config.destinations.contains(Destinations::FILE));
//! ```

use super::error::{LoggerError, Result};
use super::format_pattern::FormatPattern;
use super::log_level::LogLevel;
use super::overflow_policy::OverflowPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::ops::{BitOr, BitOrAssign};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_ROTATE_BASENAME: &str = "chika.log";
pub const DEFAULT_MAX_FILE_SIZE: u64 = 4 * 1024 * 1024;
pub const DEFAULT_MAX_FILES: usize = 10;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_QUEUE_CAPACITY: usize = 16384;
pub const DEFAULT_LOGGER_NAME: &str = "chika";

/// Bitmask of output destinations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Destinations(u8);

impl Destinations {
    pub const NONE: Destinations = Destinations(0);
    /// Standard output / standard error
    pub const CONSOLE: Destinations = Destinations(0x01);
    /// Size-rotated log file
    pub const FILE: Destinations = Destinations(0x02);
    /// Colorize console output; has no effect without `CONSOLE`
    pub const COLOR: Destinations = Destinations(0x04);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn from_bits(bits: u8) -> Self {
        Destinations(bits & 0x07)
    }

    pub const fn contains(self, other: Destinations) -> bool {
        self.0 & other.0 == other.0
    }
}

impl From<u8> for Destinations {
    fn from(bits: u8) -> Self {
        Destinations::from_bits(bits)
    }
}

impl From<Destinations> for u8 {
    fn from(destinations: Destinations) -> Self {
        destinations.bits()
    }
}

impl Default for Destinations {
    fn default() -> Self {
        Destinations::CONSOLE
    }
}

impl BitOr for Destinations {
    type Output = Destinations;

    fn bitor(self, rhs: Self) -> Self::Output {
        Destinations(self.0 | rhs.0)
    }
}

impl BitOrAssign for Destinations {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// When the color console sink emits escape codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    Always,
    /// Only when the target stream is a terminal
    #[default]
    Automatic,
    Never,
}

/// Callback receiving sink and pipeline failures
///
/// The default handler treats any failure as fatal: it prints a diagnostic,
/// flushes the standard streams and aborts the process.
#[derive(Clone)]
pub struct ErrorHandler(Arc<dyn Fn(&LoggerError) + Send + Sync>);

impl ErrorHandler {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&LoggerError) + Send + Sync + 'static,
    {
        ErrorHandler(Arc::new(handler))
    }

    pub fn abort_on_error() -> Self {
        Self::new(|err| {
            eprintln!("[LOGGER ERROR] Unrecoverable error in logging subsystem: {}", err);
            eprintln!("[LOGGER ERROR] Aborting process (default error handler)");
            let _ = std::io::stderr().flush();
            let _ = std::io::stdout().flush();
            std::process::abort();
        })
    }

    /// Swallow all failures
    pub fn ignore() -> Self {
        Self::new(|_| {})
    }

    #[inline]
    pub fn handle(&self, err: &LoggerError) {
        (self.0)(err)
    }
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::abort_on_error()
    }
}

impl fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ErrorHandler")
    }
}

/// All tunables of a [`Logger`](crate::Logger)
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Rendered by `%n`
    pub name: String,

    /// Active log file; archives are numbered next to it
    pub rotate_basename: PathBuf,
    pub rotate_max_file_size: u64,
    /// Maximum number of retained files, active file included
    pub rotate_max_files: usize,
    /// Delete stale archives beyond the retention count when the file sink opens
    pub rotate_check_at_first: bool,

    /// Records at or above this level flush all sinks after being written
    pub flush_level: LogLevel,
    /// Period of the background flush; zero disables it
    pub flush_interval: Duration,

    pub destinations: Destinations,
    pub color_mode: ColorMode,

    pub thread_count: usize,
    pub queue_capacity: usize,
    pub overflow_policy: OverflowPolicy,

    pub format: FormatPattern,
    /// Minimum level; records below it are discarded at the call site
    pub level: LogLevel,

    pub error_handler: ErrorHandler,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_LOGGER_NAME.to_string(),
            rotate_basename: PathBuf::from(DEFAULT_ROTATE_BASENAME),
            rotate_max_file_size: DEFAULT_MAX_FILE_SIZE,
            rotate_max_files: DEFAULT_MAX_FILES,
            rotate_check_at_first: false,
            flush_level: LogLevel::Critical,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            destinations: Destinations::CONSOLE,
            color_mode: ColorMode::Automatic,
            thread_count: 1,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            overflow_policy: OverflowPolicy::DropOldest,
            format: FormatPattern::standard(),
            level: LogLevel::from_env(),
            error_handler: ErrorHandler::abort_on_error(),
        }
    }
}

impl LoggerConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the values a logger cannot be built with
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(LoggerError::config(
                "LoggerConfig",
                "queue_capacity must be non-zero",
            ));
        }
        if self.thread_count == 0 {
            return Err(LoggerError::config(
                "LoggerConfig",
                "thread_count must be at least 1",
            ));
        }
        if self.destinations.contains(Destinations::FILE) && self.rotate_max_file_size == 0 {
            return Err(LoggerError::config(
                "RotatingFileSink",
                "rotate_max_file_size must be non-zero",
            ));
        }
        Ok(())
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_rotate_basename(mut self, path: impl Into<PathBuf>) -> Self {
        self.rotate_basename = path.into();
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_rotate_max_file_size(mut self, bytes: u64) -> Self {
        self.rotate_max_file_size = bytes;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_rotate_max_files(mut self, count: usize) -> Self {
        self.rotate_max_files = count;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_rotate_check_at_first(mut self, enabled: bool) -> Self {
        self.rotate_check_at_first = enabled;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_flush_level(mut self, level: LogLevel) -> Self {
        self.flush_level = level;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_destinations(mut self, destinations: Destinations) -> Self {
        self.destinations = destinations;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_color_mode(mut self, mode: ColorMode) -> Self {
        self.color_mode = mode;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_thread_count(mut self, count: usize) -> Self {
        self.thread_count = count;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_format(mut self, format: impl Into<FormatPattern>) -> Self {
        self.format = format.into();
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_error_handler(mut self, handler: ErrorHandler) -> Self {
        self.error_handler = handler;
        self
    }
}
