//! Background thread flushing the sink set on a fixed interval

use super::{
    error::{LoggerError, Result},
    pipeline::Dispatcher,
};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

pub(crate) struct PeriodicFlusher {
    stop: Option<Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
    interval: Duration,
}

impl PeriodicFlusher {
    /// Start flushing every `interval`. A zero interval starts nothing.
    ///
    /// The thread holds only a weak handle to the sink set and exits once
    /// the logger owning it is gone.
    pub(crate) fn start(interval: Duration, dispatcher: &Arc<Dispatcher>) -> Result<Option<Self>> {
        if interval.is_zero() {
            return Ok(None);
        }

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let weak: Weak<Dispatcher> = Arc::downgrade(dispatcher);
        let handle = thread::Builder::new()
            .name("chika-flusher".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => match weak.upgrade() {
                        Some(dispatcher) => dispatcher.flush_sinks(),
                        None => break,
                    },
                    // Stop requested or the owner dropped the sender
                    _ => break,
                }
            })
            .map_err(|e| LoggerError::worker_spawn("chika-flusher", e))?;

        Ok(Some(Self {
            stop: Some(stop_tx),
            handle: Some(handle),
            interval,
        }))
    }

    pub(crate) fn interval(&self) -> Duration {
        self.interval
    }

    /// Stop the thread and wait for an in-progress flush to finish
    pub(crate) fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        drop(self.stop.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                eprintln!("[LOGGER ERROR] Periodic flush thread panicked");
            }
        }
    }
}

impl Drop for PeriodicFlusher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        ErrorHandler, FormatPattern, LogLevel, LogRecord, LoggerMetrics, Sink,
    };
    use parking_lot::Mutex;
    use std::time::Instant;

    struct FlushCounter(Arc<Mutex<usize>>);

    impl Sink for FlushCounter {
        fn log(&mut self, _record: &LogRecord) -> Result<()> {
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            *self.0.lock() += 1;
            Ok(())
        }

        fn set_pattern(&mut self, _pattern: &FormatPattern) {}

        fn name(&self) -> &str {
            "flush_counter"
        }
    }

    fn dispatcher() -> (Arc<Dispatcher>, Arc<Mutex<usize>>) {
        let count = Arc::new(Mutex::new(0));
        let dispatcher = Dispatcher::new(
            vec![Box::new(FlushCounter(Arc::clone(&count)))],
            LogLevel::Critical,
            ErrorHandler::ignore(),
            Arc::new(LoggerMetrics::new()),
        );
        (Arc::new(dispatcher), count)
    }

    #[test]
    fn test_zero_interval_disables() {
        let (dispatcher, _) = dispatcher();
        assert!(PeriodicFlusher::start(Duration::ZERO, &dispatcher).unwrap().is_none());
    }

    #[test]
    fn test_flushes_on_interval() {
        let (dispatcher, count) = dispatcher();
        let flusher = PeriodicFlusher::start(Duration::from_millis(20), &dispatcher)
            .unwrap()
            .unwrap();
        assert_eq!(flusher.interval(), Duration::from_millis(20));

        let deadline = Instant::now() + Duration::from_secs(5);
        while *count.lock() < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        flusher.stop();

        let after_stop = *count.lock();
        assert!(after_stop >= 3);
        thread::sleep(Duration::from_millis(60));
        assert_eq!(*count.lock(), after_stop);
    }

    #[test]
    fn test_stop_is_prompt() {
        let (dispatcher, count) = dispatcher();
        let flusher = PeriodicFlusher::start(Duration::from_secs(3600), &dispatcher)
            .unwrap()
            .unwrap();

        let start = Instant::now();
        drop(flusher);
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(*count.lock(), 0);
    }
}
