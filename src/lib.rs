//! # Chika Log
//!
//! An embeddable asynchronous logging facility. Records are rendered with a
//! configurable pattern and delivered by worker threads to console and
//! size-rotated file sinks.
//!
//! ## Features
//!
//! - **Asynchronous**: producers push into a bounded queue with a selectable
//!   overflow policy (block, drop newest, drop oldest)
//! - **Sinks**: colored console, split stdout/stderr console, rotating file
//! - **Patterns**: `%`-directive layouts built from strings or a typed builder
//! - **Flushing**: explicit, severity-triggered and periodic
//! - **Registry**: one lazily built logger per registry or per process
//!
//! ## Example
//!
//! ```
//! use chika_log::{info, Destinations, LogLevel, Logger, LoggerConfig};
//!
//! let config = LoggerConfig::new()
//!     .with_destinations(Destinations::NONE)
//!     .with_level(LogLevel::Debug)
//!     .with_format("%Y-%m-%d %H:%M:%S [%l] %v");
//! let logger = Logger::new(config).unwrap();
//!
//! info!(logger, "listening on port {}", 8080);
//! logger.flush();
//! ```

pub mod core;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        ColorMode, Destinations, Directive, ErrorHandler, FatalRequested, FormatPattern,
        FormatPatternBuilder, LogLevel, LogRecord, Logger, LoggerConfig, LoggerError,
        LoggerMetrics, LoggerRegistry, OverflowPolicy, Result, Sink, SourceLocation,
        DEFAULT_SHUTDOWN_TIMEOUT,
    };
    pub use crate::sinks::{ColorConsoleSink, RotatingFileSink, SplitConsoleSink};
}

pub use crate::core::registry::{inject_config, logger, shutdown};
pub use crate::core::{
    ColorMode, Destinations, Directive, ErrorHandler, FatalRequested, FormatPattern,
    FormatPatternBuilder, LogLevel, LogRecord, Logger, LoggerConfig, LoggerError, LoggerMetrics,
    LoggerRegistry, LoggerRegistryBuilder, OverflowPolicy, PatternFormatter, Result, Sink,
    SourceLocation, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use crate::sinks::{ColorConsoleSink, RotatingFileSink, RotationPolicy, SplitConsoleSink};
