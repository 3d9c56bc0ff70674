//! Logger registries
//!
//! [`LoggerRegistry`] is the explicit form: the configuration is fixed when
//! the registry is built and the logger is constructed on first access.
//! The free functions [`inject_config`] and [`logger`] provide the same
//! behavior for a single process-wide instance.

use super::{
    config::LoggerConfig,
    error::{LoggerError, Result},
    logger::{Logger, DEFAULT_SHUTDOWN_TIMEOUT},
};
use parking_lot::Mutex;
use std::sync::OnceLock;

/// Build the logger, falling back to a stopped one when construction fails
fn construct(config: LoggerConfig) -> Logger {
    let handler = config.error_handler.clone();
    let fallback = config.clone();
    match Logger::new(config) {
        Ok(logger) => logger,
        Err(err) => {
            eprintln!("[LOGGER ERROR] Failed to build logger: {}", err);
            handler.handle(&err);
            Logger::stopped(&fallback)
        }
    }
}

/// Holds one lazily constructed [`Logger`]
///
/// # Example
///
/// ```
/// use chika_log::{Destinations, LoggerConfig, LoggerRegistry};
///
/// let registry = LoggerRegistry::builder()
///     .config(LoggerConfig::new().with_destinations(Destinations::NONE))
///     .build();
///
/// let first = registry.logger();
/// let second = registry.logger();
/// assert!(std::ptr::eq(first, second));
/// ```
pub struct LoggerRegistry {
    pending: Mutex<Option<LoggerConfig>>,
    logger: OnceLock<Logger>,
}

#[derive(Default)]
pub struct LoggerRegistryBuilder {
    config: Option<LoggerConfig>,
}

impl LoggerRegistryBuilder {
    #[must_use]
    pub fn config(mut self, config: LoggerConfig) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn build(self) -> LoggerRegistry {
        LoggerRegistry {
            pending: Mutex::new(self.config),
            logger: OnceLock::new(),
        }
    }
}

impl LoggerRegistry {
    pub fn builder() -> LoggerRegistryBuilder {
        LoggerRegistryBuilder::default()
    }

    /// A registry using the default configuration
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// The registry's logger, constructed on the first call. Concurrent
    /// first callers all receive the same instance.
    pub fn logger(&self) -> &Logger {
        self.logger.get_or_init(|| {
            let config = self.pending.lock().take().unwrap_or_default();
            construct(config)
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.logger.get().is_some()
    }
}

impl Default for LoggerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

enum Injection {
    Open(Option<LoggerConfig>),
    Closed,
}

static INJECTED: Mutex<Injection> = parking_lot::const_mutex(Injection::Open(None));
static GLOBAL: OnceLock<Logger> = OnceLock::new();

/// Supply the configuration of the process-wide logger
///
/// # Errors
///
/// Returns [`LoggerError::AlreadyInitialized`] once [`logger`] has been
/// called; the running logger keeps its configuration.
pub fn inject_config(config: LoggerConfig) -> Result<()> {
    match &mut *INJECTED.lock() {
        Injection::Open(slot) => {
            *slot = Some(config);
            Ok(())
        }
        Injection::Closed => Err(LoggerError::AlreadyInitialized),
    }
}

/// The process-wide logger, built on first call from the injected
/// configuration or the defaults
pub fn logger() -> &'static Logger {
    GLOBAL.get_or_init(|| {
        let config = match std::mem::replace(&mut *INJECTED.lock(), Injection::Closed) {
            Injection::Open(config) => config.unwrap_or_default(),
            Injection::Closed => LoggerConfig::default(),
        };
        construct(config)
    })
}

/// Drain and stop the process-wide logger, if it was ever built
///
/// Statics are never dropped, so call this before the process exits to
/// write out what is still queued.
pub fn shutdown() -> bool {
    GLOBAL
        .get()
        .map_or(true, |logger| logger.shutdown(DEFAULT_SHUTDOWN_TIMEOUT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Destinations, ErrorHandler, LogLevel};
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn quiet() -> LoggerConfig {
        LoggerConfig::new()
            .with_destinations(Destinations::NONE)
            .with_error_handler(ErrorHandler::ignore())
    }

    #[test]
    fn test_builder_config_is_used() {
        let registry = LoggerRegistry::builder()
            .config(quiet().with_name("svc").with_level(LogLevel::Debug))
            .build();
        assert!(!registry.is_initialized());

        let logger = registry.logger();
        assert!(registry.is_initialized());
        assert_eq!(logger.name(), "svc");
        assert_eq!(logger.level(), LogLevel::Debug);
    }

    #[test]
    fn test_concurrent_first_access_yields_one_logger() {
        let registry = Arc::new(LoggerRegistry::builder().config(quiet()).build());
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    registry.logger() as *const Logger as usize
                })
            })
            .collect();

        let addresses: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(addresses.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_construction_failure_falls_back_to_stopped_logger() {
        let failures = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&failures);
        let config = quiet()
            .with_queue_capacity(0)
            .with_error_handler(ErrorHandler::new(move |e| seen.lock().push(e.to_string())));

        let registry = LoggerRegistry::builder().config(config).build();
        let logger = registry.logger();

        assert!(logger.is_shut_down());
        logger.info("discarded");
        assert_eq!(failures.lock().len(), 1);
    }
}
