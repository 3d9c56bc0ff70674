//! Logging macros for ergonomic log message formatting.
//!
//! These macros provide a convenient interface for logging with automatic
//! string formatting, similar to `println!` and `format!`. They attach the
//! call site (file, line and function) to every record, and skip formatting
//! entirely when the level is filtered out.
//!
//! # Examples
//!
//! ```
//! use chika_log::prelude::*;
//! use chika_log::info;
//!
//! let logger = Logger::new(LoggerConfig::new().with_destinations(Destinations::NONE)).unwrap();
//!
//! // Basic logging
//! info!(logger, "Server started");
//!
//! // With format arguments
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//!
//! // The process-wide logger works the same way
//! info!(chika_log::logger(), "Ready");
//! ```

/// Name of the enclosing function, without its module path.
///
/// Inside a closure this is the name of the function defining the closure.
#[macro_export]
macro_rules! function_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let path = type_name_of(f);
        let path = path.strip_suffix("::f").unwrap_or(path);
        let mut path = path;
        while let Some(outer) = path.strip_suffix("::{{closure}}") {
            path = outer;
        }
        match path.rfind("::") {
            Some(pos) => &path[pos + 2..],
            None => path,
        }
    }};
}

/// The [`SourceLocation`](crate::SourceLocation) of the macro call.
#[macro_export]
macro_rules! source_location {
    () => {
        $crate::SourceLocation::new(::std::file!(), ::std::line!(), $crate::function_name!())
    };
}

/// Log a message with automatic formatting.
///
/// # Examples
///
/// ```
/// # use chika_log::prelude::*;
/// # let logger = Logger::new(LoggerConfig::new().with_destinations(Destinations::NONE)).unwrap();
/// use chika_log::log;
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        let logger = &$logger;
        let level = $level;
        if logger.should_log(level) {
            logger.log_at(level, $crate::source_location!(), ::std::format!($($arg)+));
        }
    }};
}

/// Log a trace-level message.
///
/// # Examples
///
/// ```
/// # use chika_log::prelude::*;
/// # let logger = Logger::new(LoggerConfig::new().with_destinations(Destinations::NONE)).unwrap();
/// # logger.set_level(LogLevel::Trace);
/// use chika_log::trace;
/// trace!(logger, "Entering function: calculate()");
/// trace!(logger, "Variable value: {}", 42);
/// ```
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Trace, $($arg)+)
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
///
/// # Examples
///
/// ```
/// # use chika_log::prelude::*;
/// # let logger = Logger::new(LoggerConfig::new().with_destinations(Destinations::NONE)).unwrap();
/// use chika_log::info;
/// info!(logger, "Application started");
/// info!(logger, "Processing {} items", 100);
/// ```
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

/// Log an error-level message.
///
/// # Examples
///
/// ```
/// # use chika_log::prelude::*;
/// # let logger = Logger::new(LoggerConfig::new().with_destinations(Destinations::NONE)).unwrap();
/// use chika_log::error;
/// error!(logger, "Failed to connect to database");
/// error!(logger, "Error code: {}, message: {}", 500, "Internal error");
/// ```
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a critical-level message.
#[macro_export]
macro_rules! critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Critical, $($arg)+)
    };
}

/// Log a critical message, flush, stop the logger and abort the process.
///
/// Use [`Logger::fatal`](crate::Logger::fatal) to keep control after the
/// record is written.
///
/// # Examples
///
/// ```no_run
/// # use chika_log::prelude::*;
/// # let logger = Logger::new(LoggerConfig::default()).unwrap();
/// use chika_log::fatal;
/// fatal!(logger, "Unable to recover from error: {}", "disk full");
/// ```
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)+) => {
        (&$logger)
            .fatal_at($crate::source_location!(), ::std::format!($($arg)+))
            .terminate()
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{ErrorHandler, LogLevel, Logger, LoggerConfig, Sink};
    use crate::sinks::console::test_support::SharedBuffer;
    use crate::sinks::{ConsoleStreams, SplitConsoleSink};
    use std::time::Duration;

    fn logger(pattern: &str) -> (Logger, SharedBuffer, SharedBuffer) {
        let out = SharedBuffer::default();
        let err = SharedBuffer::default();
        let sink: Box<dyn Sink> = Box::new(SplitConsoleSink::with_streams(ConsoleStreams::new(
            out.clone(),
            err.clone(),
        )));
        let config = LoggerConfig::new()
            .with_level(LogLevel::Info)
            .with_format(pattern)
            .with_flush_interval(Duration::ZERO)
            .with_error_handler(ErrorHandler::ignore());
        (Logger::with_sinks(config, vec![sink]).unwrap(), out, err)
    }

    #[test]
    fn test_function_name() {
        assert_eq!(function_name!(), "test_function_name");
        let from_closure = || function_name!();
        assert_eq!(from_closure(), "test_function_name");
    }

    #[test]
    fn test_source_location() {
        let here = source_location!();
        assert_eq!(here.file, file!());
        assert_eq!(here.line, line!() - 2);
        assert_eq!(here.function, "test_source_location");
    }

    #[test]
    fn test_level_macros() {
        let (logger, out, err) = logger("%l %v");
        trace!(logger, "Trace message");
        debug!(logger, "Count: {}", 5);
        info!(logger, "Items: {}", 100);
        warn!(logger, "Retry {} of {}", 1, 3);
        error!(logger, "Code: {}", 500);
        critical!(logger, "Failure: {}", "system");
        log!(logger, LogLevel::Info, "Formatted: {}", 42);
        logger.flush();

        assert_eq!(out.contents(), "info Items: 100\nwarning Retry 1 of 3\ninfo Formatted: 42\n");
        assert_eq!(err.contents(), "error Code: 500\ncritical Failure: system\n");
    }

    #[test]
    fn test_macros_attach_call_site() {
        let (logger, out, _) = logger("%s %! %v");
        info!(logger, "located");
        logger.flush();
        assert_eq!(out.contents(), "macros.rs test_macros_attach_call_site located\n");
    }

    #[test]
    fn test_filtered_arguments_are_not_evaluated() {
        let (logger, _, _) = logger("%v");
        let mut evaluated = false;
        debug!(logger, "{}", {
            evaluated = true;
            "expensive"
        });
        assert!(!evaluated);
    }

    #[test]
    fn test_logger_by_reference() {
        let (logger, out, _) = logger("%v");
        let handle = &logger;
        info!(handle, "through a reference");
        handle.flush();
        assert_eq!(out.contents(), "through a reference\n");
    }
}
