//! Core logger types and traits

pub mod config;
pub mod error;
pub mod format_pattern;
pub mod formatter;
pub mod log_level;
pub mod log_record;
pub mod logger;
pub mod metrics;
pub mod overflow_policy;
mod periodic;
mod pipeline;
pub mod registry;
pub mod sink;

pub use config::{ColorMode, Destinations, ErrorHandler, LoggerConfig};
pub use error::{LoggerError, Result};
pub use format_pattern::{Directive, FormatPattern, FormatPatternBuilder};
pub use formatter::PatternFormatter;
pub use log_level::{LogLevel, LEVEL_ENV_VAR};
pub use log_record::{current_thread_id, LogRecord, SourceLocation};
pub use logger::{FatalRequested, Logger, DEFAULT_SHUTDOWN_TIMEOUT};
pub use metrics::LoggerMetrics;
pub use overflow_policy::OverflowPolicy;
pub use registry::{LoggerRegistry, LoggerRegistryBuilder};
pub use sink::Sink;
