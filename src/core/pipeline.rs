//! Asynchronous delivery pipeline
//!
//! Producers push records into a bounded queue; a fixed pool of worker
//! threads drains it and hands every record to each sink of the shared sink
//! set. Overflow handling happens entirely on the producer side, which keeps
//! a receiver of its own so that `DropOldest` can evict the head of the
//! queue.

use super::{
    config::ErrorHandler,
    error::{LoggerError, Result},
    format_pattern::FormatPattern,
    log_level::LogLevel,
    log_record::LogRecord,
    metrics::LoggerMetrics,
    overflow_policy::OverflowPolicy,
    sink::Sink,
};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::{Condvar, Mutex, RwLock};
use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

thread_local! {
    static ON_WORKER: Cell<bool> = const { Cell::new(false) };
}

/// Whether the current thread is one of the pipeline workers
pub(crate) fn on_worker_thread() -> bool {
    ON_WORKER.with(Cell::get)
}

/// Messages carried by the delivery queue
pub(crate) enum AsyncMessage {
    Log(LogRecord),
    /// One of the tickets of an explicit flush; each worker takes one
    Flush(Arc<FlushGate>),
}

/// Rendezvous for an explicit flush
///
/// The flusher queues one ticket per worker. A worker that dequeues a
/// ticket has finished every record it took before, and it holds the ticket
/// until all workers have arrived, so it cannot take a second one. Once the
/// last worker arrives, everything queued ahead of the tickets is written.
pub(crate) struct FlushGate {
    state: Mutex<GateState>,
    released: Condvar,
}

struct GateState {
    pending: usize,
    cancelled: bool,
}

impl FlushGate {
    pub(crate) fn new(workers: usize) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(GateState {
                pending: workers,
                cancelled: false,
            }),
            released: Condvar::new(),
        })
    }

    /// Called by a worker holding a ticket; returns when the gate opens
    fn arrive(&self) {
        let mut state = self.state.lock();
        state.pending = state.pending.saturating_sub(1);
        if state.pending == 0 {
            self.released.notify_all();
            return;
        }
        while state.pending > 0 && !state.cancelled {
            self.released.wait(&mut state);
        }
    }

    /// Open the gate without waiting for the remaining workers, e.g. when a
    /// ticket was evicted or never queued
    pub(crate) fn cancel(&self) {
        self.state.lock().cancelled = true;
        self.released.notify_all();
    }

    /// Block until every worker arrived or the gate was cancelled. Returns
    /// `true` only in the first case.
    pub(crate) fn wait(&self) -> bool {
        let mut state = self.state.lock();
        while state.pending > 0 && !state.cancelled {
            self.released.wait(&mut state);
        }
        state.pending == 0
    }
}

/// Result of offering a record to the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PushOutcome {
    Queued,
    /// The queue was full and the record was discarded
    Dropped,
    /// The queue was full and its oldest entry was evicted to make room
    Overwrote,
    /// The pipeline has been shut down
    Closed,
}

/// Producer side of the bounded delivery queue
pub(crate) struct DeliveryQueue {
    sender: RwLock<Option<Sender<AsyncMessage>>>,
    /// Used only to evict the head under `DropOldest`
    evictor: Receiver<AsyncMessage>,
    policy: OverflowPolicy,
    metrics: Arc<LoggerMetrics>,
}

impl DeliveryQueue {
    /// Create the queue and the receiver the workers drain
    pub(crate) fn new(
        capacity: usize,
        policy: OverflowPolicy,
        metrics: Arc<LoggerMetrics>,
    ) -> (Self, Receiver<AsyncMessage>) {
        let (sender, receiver) = bounded(capacity);
        let queue = Self {
            sender: RwLock::new(Some(sender)),
            evictor: receiver.clone(),
            policy,
            metrics,
        };
        (queue, receiver)
    }

    pub(crate) fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Cloned out of the lock so that blocking never holds it
    fn sender(&self) -> Option<Sender<AsyncMessage>> {
        self.sender.read().clone()
    }

    /// Offer a record, applying the overflow policy when the queue is full
    pub(crate) fn push(&self, record: LogRecord) -> PushOutcome {
        let Some(sender) = self.sender() else {
            return PushOutcome::Closed;
        };

        let message = match sender.try_send(AsyncMessage::Log(record)) {
            Ok(()) => return PushOutcome::Queued,
            Err(TrySendError::Disconnected(_)) => return PushOutcome::Closed,
            Err(TrySendError::Full(message)) => message,
        };

        self.metrics.record_queue_full();

        match self.policy {
            // A worker waiting for room in the queue only it drains would
            // never wake up
            OverflowPolicy::Block if on_worker_thread() => self.drop_newest(),
            OverflowPolicy::Block => {
                self.metrics.record_block();
                match sender.send(message) {
                    Ok(()) => PushOutcome::Queued,
                    Err(_) => PushOutcome::Closed,
                }
            }
            OverflowPolicy::DropNewest => self.drop_newest(),
            OverflowPolicy::DropOldest => self.push_evicting(&sender, message),
        }
    }

    fn drop_newest(&self) -> PushOutcome {
        let dropped = self.metrics.record_dropped();
        // Alert on first drop and periodically thereafter
        if dropped == 0 || (dropped + 1) % 1000 == 0 {
            eprintln!(
                "[LOGGER WARNING] Queue full, {} records dropped. \
                 Consider increasing queue capacity or using a different overflow policy.",
                dropped + 1
            );
        }
        PushOutcome::Dropped
    }

    fn push_evicting(&self, sender: &Sender<AsyncMessage>, mut message: AsyncMessage) -> PushOutcome {
        loop {
            // Workers may have made room since the last attempt
            if let Ok(evicted) = self.evictor.try_recv() {
                self.discard(evicted);
            }
            match sender.try_send(message) {
                Ok(()) => return PushOutcome::Overwrote,
                Err(TrySendError::Full(returned)) => message = returned,
                Err(TrySendError::Disconnected(_)) => return PushOutcome::Closed,
            }
        }
    }

    fn discard(&self, evicted: AsyncMessage) {
        match evicted {
            AsyncMessage::Log(_) => {
                self.metrics.record_evicted();
            }
            AsyncMessage::Flush(gate) => gate.cancel(),
        }
    }

    /// Enqueue ignoring the overflow policy, waiting for space if needed.
    /// Returns `false` once the pipeline is closed, or when called from a
    /// worker and the queue is full.
    pub(crate) fn push_blocking(&self, message: AsyncMessage) -> bool {
        let Some(sender) = self.sender() else {
            return false;
        };
        if on_worker_thread() {
            return sender.try_send(message).is_ok();
        }
        sender.send(message).is_ok()
    }

    /// Drop the sender so workers drain what is queued and exit
    pub(crate) fn close(&self) {
        drop(self.sender.write().take());
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.sender.read().is_none()
    }

    pub(crate) fn len(&self) -> usize {
        self.evictor.len()
    }
}

/// Shared sink set plus the rules applied after each record is written
pub(crate) struct Dispatcher {
    sinks: Mutex<Vec<Box<dyn Sink>>>,
    flush_level: AtomicU8,
    error_handler: ErrorHandler,
    metrics: Arc<LoggerMetrics>,
}

impl Dispatcher {
    pub(crate) fn new(
        sinks: Vec<Box<dyn Sink>>,
        flush_level: LogLevel,
        error_handler: ErrorHandler,
        metrics: Arc<LoggerMetrics>,
    ) -> Self {
        Self {
            sinks: Mutex::new(sinks),
            flush_level: AtomicU8::new(flush_level as u8),
            error_handler,
            metrics,
        }
    }

    /// Write a record to every sink, flushing all of them when the record
    /// reaches the flush level
    pub(crate) fn dispatch(&self, record: &LogRecord) {
        let mut failures = Vec::new();
        {
            let mut sinks = self.sinks.lock();
            for sink in sinks.iter_mut() {
                if let Err(e) = isolate(sink, |s| s.log(record)) {
                    failures.push(e);
                }
            }
            if record.level >= self.flush_level() {
                Self::flush_all(&mut sinks, &mut failures);
                self.metrics.record_flush();
            }
        }
        self.metrics.record_delivered();
        self.report(failures);
    }

    pub(crate) fn flush_sinks(&self) {
        let mut failures = Vec::new();
        Self::flush_all(&mut self.sinks.lock(), &mut failures);
        self.metrics.record_flush();
        self.report(failures);
    }

    fn flush_all(sinks: &mut [Box<dyn Sink>], failures: &mut Vec<LoggerError>) {
        for sink in sinks.iter_mut() {
            if let Err(e) = isolate(sink, |s| s.flush()) {
                failures.push(e);
            }
        }
    }

    /// Failures are handed over after the sink lock is released, so a
    /// handler may log through the same logger. On a worker such records
    /// never wait for queue space.
    fn report(&self, failures: Vec<LoggerError>) {
        for err in failures {
            self.metrics.record_sink_error();
            self.error_handler.handle(&err);
        }
    }

    pub(crate) fn set_pattern(&self, pattern: &FormatPattern) {
        for sink in self.sinks.lock().iter_mut() {
            sink.set_pattern(pattern);
        }
    }

    pub(crate) fn flush_level(&self) -> LogLevel {
        LogLevel::from_index(self.flush_level.load(Ordering::Relaxed))
    }

    pub(crate) fn set_flush_level(&self, level: LogLevel) {
        self.flush_level.store(level as u8, Ordering::Relaxed);
    }

    pub(crate) fn sink_count(&self) -> usize {
        self.sinks.lock().len()
    }
}

/// Run one sink operation, turning a panic into `SinkPanicked` so the other
/// sinks keep receiving records
fn isolate<F>(sink: &mut Box<dyn Sink>, op: F) -> Result<()>
where
    F: FnOnce(&mut dyn Sink) -> Result<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(|| op(sink.as_mut()))) {
        Ok(result) => result,
        Err(payload) => Err(LoggerError::sink_panicked(
            sink.name(),
            panic_message(payload.as_ref()),
        )),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Dedicated threads draining the delivery queue
pub(crate) struct WorkerPool {
    handles: Vec<thread::JoinHandle<()>>,
}

impl WorkerPool {
    pub(crate) fn spawn(
        count: usize,
        receiver: Receiver<AsyncMessage>,
        dispatcher: &Arc<Dispatcher>,
    ) -> Result<Self> {
        let mut handles = Vec::with_capacity(count);
        for index in 0..count {
            let name = format!("chika-worker-{}", index);
            let receiver = receiver.clone();
            let dispatcher = Arc::clone(dispatcher);
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || Self::run(receiver, dispatcher))
                .map_err(|e| LoggerError::worker_spawn(name, e))?;
            handles.push(handle);
        }
        Ok(Self { handles })
    }

    fn run(receiver: Receiver<AsyncMessage>, dispatcher: Arc<Dispatcher>) {
        ON_WORKER.with(|flag| flag.set(true));
        // Ends once every sender is gone and the queue is drained
        for message in receiver.iter() {
            match message {
                AsyncMessage::Log(record) => dispatcher.dispatch(&record),
                AsyncMessage::Flush(gate) => gate.arrive(),
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every worker to exit. Returns `false` if the timeout expired
    /// first or a worker panicked.
    pub(crate) fn join(self, timeout: Duration) -> bool {
        let start = Instant::now();
        let mut clean = true;

        for handle in self.handles {
            loop {
                if handle.is_finished() {
                    // Thread finished, join it to check for panics
                    if let Err(e) = handle.join() {
                        eprintln!("[LOGGER ERROR] Worker thread panicked during shutdown: {:?}", e);
                        clean = false;
                    }
                    break;
                }

                if start.elapsed() >= timeout {
                    eprintln!(
                        "[LOGGER WARNING] Worker threads did not finish within timeout. \
                         Some records may be lost."
                    );
                    return false;
                }

                // Small sleep to avoid busy-waiting
                thread::sleep(Duration::from_millis(10));
            }
        }

        clean
    }
}
