//! Console sink splitting output between stdout and stderr, without color

use super::console::{console_write_error, ConsoleStreams};
use crate::core::{FormatPattern, LogRecord, PatternFormatter, Result, Sink};

/// Writes `Error` and above to the error stream, the rest to the standard
/// stream. Color markers in the pattern are ignored.
pub struct SplitConsoleSink {
    streams: ConsoleStreams,
    formatter: PatternFormatter,
    buffer: String,
}

impl SplitConsoleSink {
    pub fn new() -> Self {
        Self::with_streams(ConsoleStreams::stdio())
    }

    pub fn with_streams(streams: ConsoleStreams) -> Self {
        Self {
            streams,
            formatter: PatternFormatter::new(&FormatPattern::standard()),
            buffer: String::with_capacity(256),
        }
    }
}

impl Default for SplitConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for SplitConsoleSink {
    fn log(&mut self, record: &LogRecord) -> Result<()> {
        self.buffer.clear();
        self.formatter.format(record, &mut self.buffer);
        let (writer, _) = self.streams.route(record.level);
        writer
            .write_all(self.buffer.as_bytes())
            .map_err(|e| console_write_error("split_console", e))
    }

    fn flush(&mut self) -> Result<()> {
        self.streams
            .flush()
            .map_err(|e| console_write_error("split_console", e))
    }

    fn set_pattern(&mut self, pattern: &FormatPattern) {
        self.formatter.set_pattern(pattern);
    }

    fn name(&self) -> &str {
        "split_console"
    }
}
