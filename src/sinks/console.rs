//! Color console sink and the stream pair shared by both console sinks

use crate::core::{
    ColorMode, FormatPattern, LogLevel, LogRecord, LoggerError, PatternFormatter, Result, Sink,
};
use colored::{control, Color, Colorize};
use std::io::{self, IsTerminal, Write};
use std::ops::Range;

/// Standard and error writers of a console sink
///
/// Records at `Error` and above go to the error writer, everything else to
/// the standard writer.
pub struct ConsoleStreams {
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
    out_is_terminal: bool,
    err_is_terminal: bool,
}

impl ConsoleStreams {
    /// The process's stdout and stderr
    pub fn stdio() -> Self {
        Self {
            out_is_terminal: io::stdout().is_terminal(),
            err_is_terminal: io::stderr().is_terminal(),
            out: Box::new(io::stdout()),
            err: Box::new(io::stderr()),
        }
    }

    /// Arbitrary writers, never treated as terminals
    pub fn new(out: impl Write + Send + 'static, err: impl Write + Send + 'static) -> Self {
        Self {
            out: Box::new(out),
            err: Box::new(err),
            out_is_terminal: false,
            err_is_terminal: false,
        }
    }

    /// Writer for `level` and whether it is a terminal
    pub(crate) fn route(&mut self, level: LogLevel) -> (&mut dyn Write, bool) {
        if level.is_error_stream() {
            (self.err.as_mut(), self.err_is_terminal)
        } else {
            (self.out.as_mut(), self.out_is_terminal)
        }
    }

    pub(crate) fn flush(&mut self) -> io::Result<()> {
        self.err.flush()?;
        self.out.flush()
    }
}

pub(crate) fn console_write_error(sink: &str, source: io::Error) -> LoggerError {
    LoggerError::io_operation("writing to console", format!("{} sink failed", sink), source)
}

/// Console sink that colorizes the `%^ ... %$` region by severity
///
/// `Automatic` colors only when the target stream is a terminal and
/// `colored` allows it (`NO_COLOR`, `CLICOLOR`, `CLICOLOR_FORCE`). `Always`
/// forces colors on through [`colored::control::set_override`].
///
/// # Example
///
/// ```
/// use chika_log::sinks::ColorConsoleSink;
/// use chika_log::{ColorMode, LogLevel};
///
/// let mut sink = ColorConsoleSink::new(ColorMode::Always);
/// sink.set_color(LogLevel::Info, colored::Color::BrightGreen);
/// ```
pub struct ColorConsoleSink {
    streams: ConsoleStreams,
    formatter: PatternFormatter,
    colors: [Color; 6],
    mode: ColorMode,
    buffer: String,
}

impl ColorConsoleSink {
    pub fn new(mode: ColorMode) -> Self {
        Self::with_streams(ConsoleStreams::stdio(), mode)
    }

    pub fn with_streams(streams: ConsoleStreams, mode: ColorMode) -> Self {
        if mode == ColorMode::Always {
            control::set_override(true);
        }
        Self {
            streams,
            formatter: PatternFormatter::new(&FormatPattern::standard()),
            colors: [
                Color::Cyan,
                Color::Blue,
                Color::Green,
                Color::Yellow,
                Color::Red,
                Color::Red,
            ],
            mode,
            buffer: String::with_capacity(256),
        }
    }

    pub fn set_color(&mut self, level: LogLevel, color: Color) {
        self.colors[level.index()] = color;
    }

    pub fn color(&self, level: LogLevel) -> Color {
        self.colors[level.index()]
    }

    pub fn mode(&self) -> ColorMode {
        self.mode
    }
}

fn write_colored(
    writer: &mut dyn Write,
    line: &str,
    region: Range<usize>,
    color: Color,
) -> io::Result<()> {
    write!(
        writer,
        "{}{}{}",
        &line[..region.start],
        line[region.clone()].color(color),
        &line[region.end..]
    )
}

impl Sink for ColorConsoleSink {
    fn log(&mut self, record: &LogRecord) -> Result<()> {
        self.buffer.clear();
        let region = self.formatter.format(record, &mut self.buffer);
        let color = self.colors[record.level.index()];
        let (writer, is_terminal) = self.streams.route(record.level);

        let colorize = match self.mode {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Automatic => is_terminal && control::SHOULD_COLORIZE.should_colorize(),
        };

        let written = match region {
            Some(region) if colorize => write_colored(writer, &self.buffer, region, color),
            _ => writer.write_all(self.buffer.as_bytes()),
        };
        written.map_err(|e| console_write_error("color_console", e))
    }

    fn flush(&mut self) -> Result<()> {
        self.streams
            .flush()
            .map_err(|e| console_write_error("color_console", e))
    }

    fn set_pattern(&mut self, pattern: &FormatPattern) {
        self.formatter.set_pattern(pattern);
    }

    fn name(&self) -> &str {
        "color_console"
    }
}
