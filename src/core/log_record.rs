//! Log record structure

use super::log_level::LogLevel;
use chrono::{DateTime, Local};
use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

// Thread-local cache so each thread draws its id from the counter once
thread_local! {
    static THREAD_ID_CACHE: Cell<u64> = const { Cell::new(0) };
}

/// Small process-unique id of the calling thread, rendered by `%t`
pub fn current_thread_id() -> u64 {
    THREAD_ID_CACHE.with(|cache| {
        let cached = cache.get();
        if cached != 0 {
            return cached;
        }
        let id = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
        cache.set(id);
        id
    })
}

/// Call-site information captured by the logging macros
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: &'static str,
    pub line: u32,
    pub function: &'static str,
}

impl SourceLocation {
    pub const fn new(file: &'static str, line: u32, function: &'static str) -> Self {
        Self {
            file,
            line,
            function,
        }
    }

    /// File name without its directory components (`%s`)
    pub fn short_file(&self) -> &'static str {
        self.file
            .rsplit(|c| c == '/' || c == '\\')
            .next()
            .unwrap_or(self.file)
    }
}

/// A single log event, immutable once created at the call site
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub level: LogLevel,
    pub timestamp: DateTime<Local>,
    pub thread_id: u64,
    pub logger_name: Arc<str>,
    pub source: Option<SourceLocation>,
    pub message: String,
}

impl LogRecord {
    pub fn new(level: LogLevel, logger_name: Arc<str>, message: String) -> Self {
        Self {
            level,
            timestamp: Local::now(),
            thread_id: current_thread_id(),
            logger_name,
            source: None,
            message,
        }
    }

    pub fn with_source(mut self, source: SourceLocation) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
