//! Sink trait for log output destinations

use super::{error::Result, format_pattern::FormatPattern, log_record::LogRecord};

/// A destination for formatted records
///
/// Sinks are driven by the delivery workers, which serialize access to the
/// whole sink set, so implementations need no internal locking. Each sink
/// renders records with its own formatter.
pub trait Sink: Send {
    /// Format and write one record
    fn log(&mut self, record: &LogRecord) -> Result<()>;

    /// Push buffered output to its final destination
    fn flush(&mut self) -> Result<()>;

    /// Replace the layout used for subsequent records
    fn set_pattern(&mut self, pattern: &FormatPattern);

    fn name(&self) -> &str;
}
