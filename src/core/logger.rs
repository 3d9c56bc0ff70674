//! Main logger implementation

use super::{
    config::{Destinations, LoggerConfig},
    error::{LoggerError, Result},
    format_pattern::FormatPattern,
    log_level::LogLevel,
    log_record::{LogRecord, SourceLocation},
    metrics::LoggerMetrics,
    overflow_policy::OverflowPolicy,
    periodic::PeriodicFlusher,
    pipeline::{on_worker_thread, AsyncMessage, DeliveryQueue, Dispatcher, FlushGate, WorkerPool},
    sink::Sink,
};
use crate::sinks::{ColorConsoleSink, RotatingFileSink, RotationPolicy, SplitConsoleSink};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default shutdown timeout for logger cleanup (5 seconds)
///
/// This timeout is used when the logger is dropped without explicit shutdown.
/// For custom timeout control, use the `shutdown()` method instead.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Signal returned after a fatal record has been delivered
///
/// The logger has already flushed its sinks and shut its pipeline down.
/// Deciding to end the process is left to the caller; [`fatal!`](crate::fatal)
/// always does.
#[must_use = "a fatal record was logged; call `terminate()` or end the process"]
#[derive(Debug)]
pub struct FatalRequested {
    _private: (),
}

impl FatalRequested {
    /// Abort the process after flushing the standard streams
    pub fn terminate(self) -> ! {
        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();
        std::process::abort()
    }
}

/// Asynchronous logger feeding a set of sinks through worker threads
///
/// # Example
///
/// ```
/// use chika_log::{Destinations, LogLevel, Logger, LoggerConfig};
///
/// let config = LoggerConfig::new()
///     .with_destinations(Destinations::NONE)
///     .with_level(LogLevel::Debug);
/// let logger = Logger::new(config).unwrap();
///
/// logger.debug("cache warmed");
/// logger.set_format("%l %v");
/// logger.flush();
/// ```
pub struct Logger {
    name: Arc<str>,
    min_level: AtomicU8,
    dispatcher: Arc<Dispatcher>,
    queue: DeliveryQueue,
    workers: Mutex<Option<WorkerPool>>,
    thread_count: usize,
    /// Keeps the tickets of concurrent explicit flushes from interleaving
    flush_serial: Mutex<()>,
    flusher: Mutex<Option<PeriodicFlusher>>,
    /// Metrics for observability (delivered, dropped, evicted, ...)
    metrics: Arc<LoggerMetrics>,
}

impl Logger {
    /// Build a logger with the sinks selected by `config.destinations`
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid, the log file cannot be
    /// opened or a thread cannot be spawned
    pub fn new(config: LoggerConfig) -> Result<Self> {
        config.validate()?;
        let sinks = Self::build_sinks(&config)?;
        Self::with_sinks(config, sinks)
    }

    /// Build a logger around caller-supplied sinks, ignoring
    /// `config.destinations`. The configured format is applied to every sink.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or a thread cannot be
    /// spawned
    pub fn with_sinks(config: LoggerConfig, mut sinks: Vec<Box<dyn Sink>>) -> Result<Self> {
        config.validate()?;
        for sink in sinks.iter_mut() {
            sink.set_pattern(&config.format);
        }

        let metrics = Arc::new(LoggerMetrics::new());
        let dispatcher = Arc::new(Dispatcher::new(
            sinks,
            config.flush_level,
            config.error_handler.clone(),
            Arc::clone(&metrics),
        ));

        // Workers exist before anything can be queued; teardown closes the
        // queue first and joins them afterwards.
        let (queue, receiver) = DeliveryQueue::new(
            config.queue_capacity,
            config.overflow_policy,
            Arc::clone(&metrics),
        );
        let workers = WorkerPool::spawn(config.thread_count, receiver, &dispatcher)?;
        let flusher = PeriodicFlusher::start(config.flush_interval, &dispatcher)?;

        Ok(Self {
            name: Arc::from(config.name.as_str()),
            min_level: AtomicU8::new(config.level as u8),
            dispatcher,
            queue,
            workers: Mutex::new(Some(workers)),
            thread_count: config.thread_count,
            flush_serial: Mutex::new(()),
            flusher: Mutex::new(flusher),
            metrics,
        })
    }

    /// A logger with no sinks and a closed pipeline; every record is discarded
    pub(crate) fn stopped(config: &LoggerConfig) -> Self {
        let metrics = Arc::new(LoggerMetrics::new());
        let dispatcher = Arc::new(Dispatcher::new(
            Vec::new(),
            config.flush_level,
            config.error_handler.clone(),
            Arc::clone(&metrics),
        ));
        let (queue, _receiver) = DeliveryQueue::new(1, config.overflow_policy, Arc::clone(&metrics));
        queue.close();

        Self {
            name: Arc::from(config.name.as_str()),
            min_level: AtomicU8::new(config.level as u8),
            dispatcher,
            queue,
            workers: Mutex::new(None),
            thread_count: 0,
            flush_serial: Mutex::new(()),
            flusher: Mutex::new(None),
            metrics,
        }
    }

    fn build_sinks(config: &LoggerConfig) -> Result<Vec<Box<dyn Sink>>> {
        let mut sinks: Vec<Box<dyn Sink>> = Vec::new();
        let destinations = config.destinations;

        if destinations.contains(Destinations::CONSOLE) {
            if destinations.contains(Destinations::COLOR) {
                sinks.push(Box::new(ColorConsoleSink::new(config.color_mode)));
            } else {
                sinks.push(Box::new(SplitConsoleSink::new()));
            }
        }

        if destinations.contains(Destinations::FILE) {
            let policy = RotationPolicy::new()
                .with_max_size(config.rotate_max_file_size)
                .with_max_files(config.rotate_max_files)
                .with_check_at_first(config.rotate_check_at_first);
            sinks.push(Box::new(RotatingFileSink::with_policy(
                &config.rotate_basename,
                policy,
            )?));
        }

        Ok(sinks)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn should_log(&self, level: LogLevel) -> bool {
        level >= self.level()
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        if !self.should_log(level) {
            return;
        }
        let record = LogRecord::new(level, Arc::clone(&self.name), message.into());
        self.queue.push(record);
    }

    /// Log with the call site attached; used by the logging macros
    pub fn log_at(&self, level: LogLevel, source: SourceLocation, message: impl Into<String>) {
        if !self.should_log(level) {
            return;
        }
        let record =
            LogRecord::new(level, Arc::clone(&self.name), message.into()).with_source(source);
        self.queue.push(record);
    }

    #[inline]
    pub fn trace(&self, message: impl Into<String>) {
        self.log(LogLevel::Trace, message);
    }

    #[inline]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    #[inline]
    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    #[inline]
    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    #[inline]
    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    #[inline]
    pub fn critical(&self, message: impl Into<String>) {
        self.log(LogLevel::Critical, message);
    }

    /// Deliver a critical record, flush every sink and shut the pipeline down
    ///
    /// The record bypasses the overflow policy. Records logged afterwards
    /// are discarded.
    pub fn fatal(&self, message: impl Into<String>) -> FatalRequested {
        let record = LogRecord::new(LogLevel::Critical, Arc::clone(&self.name), message.into());
        self.escalate(record)
    }

    pub fn fatal_at(&self, source: SourceLocation, message: impl Into<String>) -> FatalRequested {
        let record = LogRecord::new(LogLevel::Critical, Arc::clone(&self.name), message.into())
            .with_source(source);
        self.escalate(record)
    }

    fn escalate(&self, record: LogRecord) -> FatalRequested {
        // Closed, or full while on a worker: write it directly
        if !self.queue.push_blocking(AsyncMessage::Log(record.clone())) {
            self.dispatcher.dispatch(&record);
        }
        self.flush();
        self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
        FatalRequested { _private: () }
    }

    /// Replace the layout of every sink. Records already queued may be
    /// rendered with either layout.
    pub fn set_format(&self, pattern: impl Into<FormatPattern>) {
        self.dispatcher.set_pattern(&pattern.into());
    }

    pub fn set_level(&self, level: LogLevel) {
        self.min_level.store(level as u8, Ordering::Relaxed);
    }

    pub fn level(&self) -> LogLevel {
        LogLevel::from_index(self.min_level.load(Ordering::Relaxed))
    }

    /// Wait until everything queued before this call is written, then flush
    /// every sink
    ///
    /// Under `DropOldest` a full queue may evict the flush request itself;
    /// the sinks are still flushed but earlier records may be in flight.
    /// Called from a sink error handler, it only flushes the sinks.
    pub fn flush(&self) {
        if self.thread_count > 0 && !on_worker_thread() {
            let gate = FlushGate::new(self.thread_count);
            let queued = {
                let _serial = self.flush_serial.lock();
                (0..self.thread_count)
                    .all(|_| self.queue.push_blocking(AsyncMessage::Flush(Arc::clone(&gate))))
            };
            if queued {
                gate.wait();
            } else {
                // Closed: workers have drained or are draining on their own
                gate.cancel();
            }
        }
        self.dispatcher.flush_sinks();
    }

    /// Records at or above `level` flush all sinks right after being written
    pub fn set_flush_level(&self, level: LogLevel) {
        self.dispatcher.set_flush_level(level);
    }

    pub fn flush_level(&self) -> LogLevel {
        self.dispatcher.flush_level()
    }

    /// Restart the periodic flush with a new period; zero disables it
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::LoggerStopped`] after shutdown, or an error if
    /// the flush thread cannot be spawned
    pub fn set_flush_interval(&self, interval: Duration) -> Result<()> {
        let mut flusher = self.flusher.lock();
        if self.is_shut_down() {
            return Err(LoggerError::LoggerStopped);
        }
        if let Some(previous) = flusher.take() {
            previous.stop();
        }
        *flusher = PeriodicFlusher::start(interval, &self.dispatcher)?;
        Ok(())
    }

    /// Current periodic flush period, if enabled
    pub fn flush_interval(&self) -> Option<Duration> {
        self.flusher.lock().as_ref().map(PeriodicFlusher::interval)
    }

    pub fn overflow_policy(&self) -> OverflowPolicy {
        self.queue.policy()
    }

    /// Records waiting in the queue
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn sink_count(&self) -> usize {
        self.dispatcher.sink_count()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.lock().as_ref().map_or(0, WorkerPool::len)
    }

    /// Get the logger metrics for detailed observability
    ///
    /// # Example
    ///
    /// ```
    /// use chika_log::{Destinations, Logger, LoggerConfig};
    ///
    /// let logger = Logger::new(LoggerConfig::new().with_destinations(Destinations::NONE)).unwrap();
    /// logger.info("hello");
    /// logger.flush();
    ///
    /// let metrics = logger.metrics();
    /// println!("Delivered: {}", metrics.delivered_count());
    /// println!("Loss rate: {:.2}%", metrics.loss_rate());
    /// ```
    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    pub fn is_shut_down(&self) -> bool {
        self.queue.is_closed()
    }

    /// Gracefully shutdown the logger with a custom timeout
    ///
    /// Closes the queue, lets the workers drain what is already queued,
    /// joins them and flushes every sink. Calling it again is a no-op.
    ///
    /// **Note**: When the logger is dropped without calling `shutdown()` explicitly,
    /// it uses [`DEFAULT_SHUTDOWN_TIMEOUT`] (5 seconds). Use this method if you need
    /// a different timeout.
    ///
    /// # Returns
    ///
    /// `true` if the workers finished within the timeout, `false` otherwise
    ///
    /// # Example
    ///
    /// ```no_run
    /// use chika_log::{Logger, LoggerConfig};
    /// use std::time::Duration;
    ///
    /// let logger = Logger::new(LoggerConfig::default()).unwrap();
    /// logger.info("Important message");
    ///
    /// if !logger.shutdown(Duration::from_secs(10)) {
    ///     eprintln!("Warning: Logger shutdown timed out");
    /// }
    /// ```
    pub fn shutdown(&self, timeout: Duration) -> bool {
        self.queue.close();

        if let Some(flusher) = self.flusher.lock().take() {
            flusher.stop();
        }

        let Some(workers) = self.workers.lock().take() else {
            return true;
        };
        let joined = workers.join(timeout);

        // Final flush
        self.dispatcher.flush_sinks();
        joined
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &self.level())
            .field("flush_level", &self.flush_level())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorHandler;

    #[derive(Clone, Default)]
    struct Captured {
        lines: Arc<Mutex<Vec<String>>>,
        flushes: Arc<Mutex<usize>>,
    }

    struct CaptureSink {
        captured: Captured,
        formatter: crate::core::PatternFormatter,
    }

    impl CaptureSink {
        fn new(captured: &Captured) -> Box<dyn Sink> {
            Box::new(Self {
                captured: captured.clone(),
                formatter: crate::core::PatternFormatter::new(&FormatPattern::standard()),
            })
        }
    }

    impl Sink for CaptureSink {
        fn log(&mut self, record: &LogRecord) -> Result<()> {
            let mut line = String::new();
            self.formatter.format(record, &mut line);
            self.captured.lines.lock().push(line);
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            *self.captured.flushes.lock() += 1;
            Ok(())
        }

        fn set_pattern(&mut self, pattern: &FormatPattern) {
            self.formatter.set_pattern(pattern);
        }

        fn name(&self) -> &str {
            "capture"
        }
    }

    fn config() -> LoggerConfig {
        LoggerConfig::new()
            .with_destinations(Destinations::NONE)
            .with_level(LogLevel::Info)
            .with_format("%l %v")
            .with_flush_interval(Duration::ZERO)
            .with_error_handler(ErrorHandler::ignore())
    }

    fn capture_logger(config: LoggerConfig) -> (Logger, Captured) {
        let captured = Captured::default();
        let logger = Logger::with_sinks(config, vec![CaptureSink::new(&captured)]).unwrap();
        (logger, captured)
    }

    #[test]
    fn test_level_filtering() {
        let (logger, captured) = capture_logger(config());
        logger.trace("hidden");
        logger.debug("hidden");
        logger.info("shown");
        logger.critical("shown too");
        logger.flush();

        assert_eq!(*captured.lines.lock(), vec!["info shown\n", "critical shown too\n"]);
    }

    #[test]
    fn test_set_level_takes_effect() {
        let (logger, captured) = capture_logger(config());
        assert!(!logger.should_log(LogLevel::Debug));

        logger.set_level(LogLevel::Trace);
        assert_eq!(logger.level(), LogLevel::Trace);
        logger.trace("now visible");
        logger.flush();

        assert_eq!(*captured.lines.lock(), vec!["trace now visible\n"]);
    }

    #[test]
    fn test_set_format_accepts_string_and_pattern() {
        let (logger, captured) = capture_logger(config());
        logger.set_format("<%v>");
        logger.info("a");
        logger.flush();

        logger.set_format(FormatPattern::builder().level().text(": ").message().build());
        logger.warn("b");
        logger.flush();

        assert_eq!(*captured.lines.lock(), vec!["<a>\n", "warning: b\n"]);
    }

    #[test]
    fn test_log_at_carries_source() {
        let (logger, captured) = capture_logger(config());
        logger.set_format("%s:%# %! %v");
        let here = SourceLocation::new("src/server/main.rs", 42, "serve");
        logger.log_at(LogLevel::Info, here, "listening");
        logger.flush();

        assert_eq!(*captured.lines.lock(), vec!["main.rs:42 serve listening\n"]);
    }

    #[test]
    fn test_flush_level() {
        let (logger, captured) = capture_logger(config());
        assert_eq!(logger.flush_level(), LogLevel::Critical);

        logger.set_flush_level(LogLevel::Warn);
        logger.info("no flush");
        logger.warn("flush");
        // Drain without an explicit flush
        logger.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);

        // One flush for the warning, one final flush at shutdown
        assert_eq!(*captured.flushes.lock(), 2);
    }

    #[test]
    fn test_explicit_flush_waits_for_queue() {
        let (logger, captured) = capture_logger(config());
        for i in 0..500 {
            logger.info(format!("m{}", i));
        }
        logger.flush();

        assert_eq!(captured.lines.lock().len(), 500);
        assert!(*captured.flushes.lock() >= 1);
        assert_eq!(logger.metrics().delivered_count(), 500);
    }

    #[test]
    fn test_flush_with_many_workers_covers_every_earlier_record() {
        let (logger, captured) = capture_logger(
            config()
                .with_thread_count(4)
                .with_overflow_policy(OverflowPolicy::Block),
        );
        for round in 1..=200 {
            for i in 0..64 {
                logger.info(format!("r{} m{}", round, i));
            }
            logger.flush();
            assert_eq!(captured.lines.lock().len(), round * 64, "round {}", round);
        }
    }

    #[test]
    fn test_concurrent_flushes_complete() {
        let (logger, captured) = capture_logger(
            config()
                .with_thread_count(3)
                .with_overflow_policy(OverflowPolicy::Block),
        );
        let logger = Arc::new(logger);

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let logger = Arc::clone(&logger);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        logger.info(format!("t{} m{}", t, i));
                        if i % 10 == 0 {
                            logger.flush();
                        }
                    }
                    logger.flush();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(captured.lines.lock().len(), 200);
    }

    struct FailingSink;

    impl Sink for FailingSink {
        fn log(&mut self, _record: &LogRecord) -> Result<()> {
            Err(LoggerError::other("disk unplugged"))
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }

        fn set_pattern(&mut self, _pattern: &FormatPattern) {}

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[test]
    fn test_handler_logging_under_block_does_not_stall() {
        use std::sync::{OnceLock, Weak};

        let slot: Arc<OnceLock<Weak<Logger>>> = Arc::new(OnceLock::new());
        let handler_slot = Arc::clone(&slot);
        let handler = ErrorHandler::new(move |err| {
            if let Some(logger) = handler_slot.get().and_then(Weak::upgrade) {
                logger.warn(format!("sink failed: {}", err));
                logger.flush();
            }
        });
        let config = config()
            .with_overflow_policy(OverflowPolicy::Block)
            .with_queue_capacity(4)
            .with_error_handler(handler);
        let logger = Arc::new(Logger::with_sinks(config, vec![Box::new(FailingSink)]).unwrap());
        assert!(slot.set(Arc::downgrade(&logger)).is_ok());

        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let producer = {
            let logger = Arc::clone(&logger);
            std::thread::spawn(move || {
                for i in 0..100 {
                    logger.info(format!("m{}", i));
                }
                let _ = done_tx.send(());
            })
        };

        assert!(done_rx.recv_timeout(Duration::from_secs(10)).is_ok());
        producer.join().unwrap();
        assert!(logger.shutdown(DEFAULT_SHUTDOWN_TIMEOUT));
        assert!(logger.metrics().sink_error_count() >= 100);
    }

    #[test]
    fn test_records_after_shutdown_are_discarded() {
        let (logger, captured) = capture_logger(config());
        logger.info("before");
        assert!(logger.shutdown(DEFAULT_SHUTDOWN_TIMEOUT));
        assert!(logger.is_shut_down());
        assert_eq!(logger.worker_count(), 0);

        logger.info("after");
        logger.flush();
        assert!(logger.shutdown(DEFAULT_SHUTDOWN_TIMEOUT));

        assert_eq!(*captured.lines.lock(), vec!["info before\n"]);
    }

    #[test]
    fn test_fatal_delivers_flushes_and_stops() {
        let (logger, captured) = capture_logger(config());
        logger.info("first");
        let _signal = logger.fatal("going down");
        logger.error("ignored");

        assert!(logger.is_shut_down());
        assert_eq!(*captured.lines.lock(), vec!["info first\n", "critical going down\n"]);
        assert!(*captured.flushes.lock() >= 1);
    }

    #[test]
    fn test_flush_interval_restart() {
        let (logger, _) = capture_logger(config());
        assert_eq!(logger.flush_interval(), None);

        logger.set_flush_interval(Duration::from_millis(250)).unwrap();
        assert_eq!(logger.flush_interval(), Some(Duration::from_millis(250)));

        logger.set_flush_interval(Duration::ZERO).unwrap();
        assert_eq!(logger.flush_interval(), None);

        logger.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
        assert!(matches!(
            logger.set_flush_interval(Duration::from_secs(1)),
            Err(LoggerError::LoggerStopped)
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = Logger::new(config().with_queue_capacity(0));
        assert!(matches!(result, Err(LoggerError::InvalidConfiguration { .. })));

        let result = Logger::new(config().with_thread_count(0));
        assert!(matches!(result, Err(LoggerError::InvalidConfiguration { .. })));
    }

    #[test]
    fn test_sink_selection() {
        let logger = Logger::new(config()).unwrap();
        assert_eq!(logger.sink_count(), 0);

        let logger = Logger::new(config().with_destinations(Destinations::COLOR)).unwrap();
        assert_eq!(logger.sink_count(), 0);

        let logger = Logger::new(config().with_destinations(Destinations::CONSOLE)).unwrap();
        assert_eq!(logger.sink_count(), 1);

        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::new(
            config()
                .with_destinations(Destinations::CONSOLE | Destinations::COLOR | Destinations::FILE)
                .with_rotate_basename(dir.path().join("chika.log")),
        )
        .unwrap();
        assert_eq!(logger.sink_count(), 2);
    }

    #[test]
    fn test_multiple_workers() {
        let (logger, captured) = capture_logger(config().with_thread_count(4));
        assert_eq!(logger.worker_count(), 4);
        for i in 0..200 {
            logger.info(format!("m{}", i));
        }
        assert!(logger.shutdown(DEFAULT_SHUTDOWN_TIMEOUT));
        assert_eq!(captured.lines.lock().len(), 200);
    }

    #[test]
    fn test_stopped_logger_discards() {
        let logger = Logger::stopped(&config());
        assert!(logger.is_shut_down());
        assert_eq!(logger.sink_count(), 0);
        logger.error("nowhere");
        logger.flush();
        assert_eq!(logger.metrics().delivered_count(), 0);
    }
}
