//! Pattern renderer
//!
//! Compiles a [`FormatPattern`] once into segments and renders records into
//! a caller-provided buffer. Each sink owns its own formatter, so elapsed
//! time directives measure the gap between records seen by that sink.

use super::format_pattern::{Directive, FormatPattern};
use super::log_record::LogRecord;
use chrono::{DateTime, Datelike, Local, Timelike};
use std::fmt::Write;
use std::ops::Range;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Directive(Directive),
}

#[derive(Debug, Clone)]
pub struct PatternFormatter {
    segments: Vec<Segment>,
    last_record_time: DateTime<Local>,
    process_id: u32,
}

impl PatternFormatter {
    pub fn new(pattern: &FormatPattern) -> Self {
        Self {
            segments: Self::compile(pattern.as_str()),
            last_record_time: Local::now(),
            process_id: std::process::id(),
        }
    }

    pub fn set_pattern(&mut self, pattern: &FormatPattern) {
        self.segments = Self::compile(pattern.as_str());
    }

    /// Split a pattern into literal runs and directives.
    /// Unknown `%x` sequences and a trailing `%` stay literal.
    fn compile(pattern: &str) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = pattern.chars();

        while let Some(c) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }
            match chars.next() {
                Some(flag) => match Directive::from_flag(flag) {
                    Some(directive) => {
                        if !literal.is_empty() {
                            segments.push(Segment::Literal(std::mem::take(&mut literal)));
                        }
                        segments.push(Segment::Directive(directive));
                    }
                    None => {
                        literal.push('%');
                        literal.push(flag);
                    }
                },
                None => literal.push('%'),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        segments
    }

    /// Render `record` followed by a newline into `buf`.
    ///
    /// Returns the byte range of the color region when the pattern contains
    /// `%^` followed by `%$`.
    pub fn format(&mut self, record: &LogRecord, buf: &mut String) -> Option<Range<usize>> {
        let elapsed = (record.timestamp - self.last_record_time)
            .to_std()
            .unwrap_or(Duration::ZERO);
        self.last_record_time = record.timestamp;

        let ts = &record.timestamp;
        let mut color_begin = None;
        let mut color_end = None;

        for segment in &self.segments {
            let directive = match segment {
                Segment::Literal(text) => {
                    buf.push_str(text);
                    continue;
                }
                Segment::Directive(directive) => *directive,
            };

            // Writing into a String cannot fail
            let _ = match directive {
                Directive::Message => {
                    buf.push_str(&record.message);
                    Ok(())
                }
                Directive::ThreadId => write!(buf, "{}", record.thread_id),
                Directive::ProcessId => write!(buf, "{}", self.process_id),
                Directive::LoggerName => {
                    buf.push_str(&record.logger_name);
                    Ok(())
                }
                Directive::Level => {
                    buf.push_str(record.level.to_str());
                    Ok(())
                }
                Directive::Year => write!(buf, "{:04}", ts.year()),
                Directive::Month => write!(buf, "{:02}", ts.month()),
                Directive::Day => write!(buf, "{:02}", ts.day()),
                Directive::Hour => write!(buf, "{:02}", ts.hour()),
                Directive::Minute => write!(buf, "{:02}", ts.minute()),
                Directive::Second => write!(buf, "{:02}", ts.second()),
                Directive::Microsecond => {
                    write!(buf, "{:06}", (ts.nanosecond() % 1_000_000_000) / 1_000)
                }
                Directive::Nanosecond => write!(buf, "{:09}", ts.nanosecond() % 1_000_000_000),
                Directive::Percent => {
                    buf.push('%');
                    Ok(())
                }
                Directive::SourceFile => {
                    if let Some(source) = &record.source {
                        buf.push_str(source.short_file());
                    }
                    Ok(())
                }
                Directive::FullSourcePath => {
                    if let Some(source) = &record.source {
                        buf.push_str(source.file);
                    }
                    Ok(())
                }
                Directive::FunctionName => {
                    if let Some(source) = &record.source {
                        buf.push_str(source.function);
                    }
                    Ok(())
                }
                Directive::LineNumber => match &record.source {
                    Some(source) => write!(buf, "{}", source.line),
                    None => Ok(()),
                },
                Directive::ElapsedMillis => write!(buf, "{}", elapsed.as_millis()),
                Directive::ElapsedMicros => write!(buf, "{}", elapsed.as_micros()),
                Directive::ElapsedNanos => write!(buf, "{}", elapsed.as_nanos()),
                Directive::ElapsedSecs => write!(buf, "{}", elapsed.as_secs()),
                Directive::ColorBegin => {
                    color_begin = Some(buf.len());
                    Ok(())
                }
                Directive::ColorEnd => {
                    color_end = Some(buf.len());
                    Ok(())
                }
            };
        }

        buf.push('\n');

        match (color_begin, color_end) {
            (Some(begin), Some(end)) if begin <= end => Some(begin..end),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log_level::LogLevel;
    use crate::core::log_record::SourceLocation;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn fixed_datetime() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 1, 15, 7, 5, 3)
            .single()
            .expect("valid datetime")
            + chrono::Duration::nanoseconds(123_456_789)
    }

    fn record(level: LogLevel, message: &str) -> LogRecord {
        LogRecord::new(level, Arc::from("chika"), message.to_string())
            .with_timestamp(fixed_datetime())
            .with_source(SourceLocation::new("src/net/server.rs", 42, "net::server::run"))
    }

    fn render(pattern: &str, record: &LogRecord) -> (String, Option<Range<usize>>) {
        let mut formatter = PatternFormatter::new(&FormatPattern::from(pattern));
        let mut buf = String::new();
        let range = formatter.format(record, &mut buf);
        (buf, range)
    }

    #[test]
    fn test_time_directives() {
        let (out, _) = render("%Y/%m/%d-%H:%M:%S.%f|%F", &record(LogLevel::Info, "x"));
        assert_eq!(out, "2024/01/15-07:05:03.123456|123456789\n");
    }

    #[test]
    fn test_standard_layout() {
        let rec = record(LogLevel::Warn, "disk almost full");
        let (out, range) = render(FormatPattern::standard().as_str(), &rec);
        let expected = format!(
            "2024/01/15-07:05:03.123456 {} net::server::run [warning] disk almost full - server.rs:42\n",
            rec.thread_id
        );
        assert_eq!(out, expected);
        let range = range.expect("color range");
        assert_eq!(&out[range], "warning");
    }

    #[test]
    fn test_source_and_identity_directives() {
        let rec = record(LogLevel::Error, "m");
        let (out, _) = render("%n|%g|%s|%!|%#|%P|%%", &rec);
        assert_eq!(
            out,
            format!(
                "chika|src/net/server.rs|server.rs|net::server::run|42|{}|%\n",
                std::process::id()
            )
        );
    }

    #[test]
    fn test_missing_source_renders_empty() {
        let rec = LogRecord::new(LogLevel::Info, Arc::from("chika"), "m".to_string());
        let (out, _) = render("[%s:%#] %!%v", &rec);
        assert_eq!(out, "[:] m\n");
    }

    #[test]
    fn test_unknown_directives_pass_through() {
        let rec = record(LogLevel::Info, "msg");
        let (out, range) = render("%q %v 100%", &rec);
        assert_eq!(out, "%q msg 100%\n");
        assert_eq!(range, None);
    }

    #[test]
    fn test_color_range_requires_both_markers() {
        let rec = record(LogLevel::Info, "msg");
        assert_eq!(render("%^%l %v", &rec).1, None);
        assert_eq!(render("%$%l%^ %v", &rec).1, None);
        assert_eq!(render("<%^%l%$>", &rec).1, Some(1..5));
    }

    #[test]
    fn test_elapsed_since_previous_record() {
        let mut formatter = PatternFormatter::new(&FormatPattern::from("%o|%i|%O"));
        let first = record(LogLevel::Info, "a");
        let second = record(LogLevel::Info, "b")
            .with_timestamp(fixed_datetime() + chrono::Duration::milliseconds(2_500));

        let mut buf = String::new();
        formatter.format(&first, &mut buf);
        buf.clear();
        formatter.format(&second, &mut buf);
        assert_eq!(buf, "2500|2500000|2\n");

        // Going backwards in time clamps to zero
        buf.clear();
        formatter.format(&first, &mut buf);
        assert_eq!(buf, "0|0|0\n");
    }

    #[test]
    fn test_set_pattern_recompiles() {
        let rec = record(LogLevel::Debug, "hello");
        let mut formatter = PatternFormatter::new(&FormatPattern::from("%v"));
        formatter.set_pattern(&FormatPattern::from("%l:%v"));
        let mut buf = String::new();
        formatter.format(&rec, &mut buf);
        assert_eq!(buf, "debug:hello\n");
    }
}
