//! Format patterns and their builder
//!
//! A [`FormatPattern`] is an immutable template made of literal text and
//! two-character directives such as `%Y` or `%v`. Patterns are assembled
//! with [`FormatPatternBuilder`], whose methods consume and return the
//! builder so calls chain naturally:
//!
//! ```
//! use chika_log::FormatPattern;
//!
//! let pattern = FormatPattern::builder()
//!     .hour().text(":").minute().text(" [")
//!     .level().text("] ")
//!     .message()
//!     .build();
//! assert_eq!(pattern.as_str(), "%H:%M [%l] %v");
//! ```

use std::fmt;

/// A single placeholder understood by the pattern renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    /// `%v` message content
    Message,
    /// `%t` thread id
    ThreadId,
    /// `%P` process id
    ProcessId,
    /// `%n` logger name
    LoggerName,
    /// `%l` severity name
    Level,
    /// `%Y` four-digit year
    Year,
    /// `%m` month 01-12
    Month,
    /// `%d` day 01-31
    Day,
    /// `%H` hour 00-23
    Hour,
    /// `%M` minute 00-59
    Minute,
    /// `%S` second 00-59
    Second,
    /// `%f` microsecond fraction
    Microsecond,
    /// `%F` nanosecond fraction
    Nanosecond,
    /// `%%` literal percent sign
    Percent,
    /// `%s` source file name without directories
    SourceFile,
    /// `%g` source file as given by the call site
    FullSourcePath,
    /// `%!` function name
    FunctionName,
    /// `%#` line number
    LineNumber,
    /// `%o` elapsed milliseconds since the previous record
    ElapsedMillis,
    /// `%i` elapsed microseconds since the previous record
    ElapsedMicros,
    /// `%u` elapsed nanoseconds since the previous record
    ElapsedNanos,
    /// `%O` elapsed seconds since the previous record
    ElapsedSecs,
    /// `%^` start of the color region
    ColorBegin,
    /// `%$` end of the color region
    ColorEnd,
}

impl Directive {
    pub const ALL: [Directive; 24] = [
        Directive::Message,
        Directive::ThreadId,
        Directive::ProcessId,
        Directive::LoggerName,
        Directive::Level,
        Directive::Year,
        Directive::Month,
        Directive::Day,
        Directive::Hour,
        Directive::Minute,
        Directive::Second,
        Directive::Microsecond,
        Directive::Nanosecond,
        Directive::Percent,
        Directive::SourceFile,
        Directive::FullSourcePath,
        Directive::FunctionName,
        Directive::LineNumber,
        Directive::ElapsedMillis,
        Directive::ElapsedMicros,
        Directive::ElapsedNanos,
        Directive::ElapsedSecs,
        Directive::ColorBegin,
        Directive::ColorEnd,
    ];

    /// The character following `%`
    pub const fn flag(self) -> char {
        match self {
            Directive::Message => 'v',
            Directive::ThreadId => 't',
            Directive::ProcessId => 'P',
            Directive::LoggerName => 'n',
            Directive::Level => 'l',
            Directive::Year => 'Y',
            Directive::Month => 'm',
            Directive::Day => 'd',
            Directive::Hour => 'H',
            Directive::Minute => 'M',
            Directive::Second => 'S',
            Directive::Microsecond => 'f',
            Directive::Nanosecond => 'F',
            Directive::Percent => '%',
            Directive::SourceFile => 's',
            Directive::FullSourcePath => 'g',
            Directive::FunctionName => '!',
            Directive::LineNumber => '#',
            Directive::ElapsedMillis => 'o',
            Directive::ElapsedMicros => 'i',
            Directive::ElapsedNanos => 'u',
            Directive::ElapsedSecs => 'O',
            Directive::ColorBegin => '^',
            Directive::ColorEnd => '$',
        }
    }

    /// The full token, e.g. `"%v"`
    pub const fn token(self) -> &'static str {
        match self {
            Directive::Message => "%v",
            Directive::ThreadId => "%t",
            Directive::ProcessId => "%P",
            Directive::LoggerName => "%n",
            Directive::Level => "%l",
            Directive::Year => "%Y",
            Directive::Month => "%m",
            Directive::Day => "%d",
            Directive::Hour => "%H",
            Directive::Minute => "%M",
            Directive::Second => "%S",
            Directive::Microsecond => "%f",
            Directive::Nanosecond => "%F",
            Directive::Percent => "%%",
            Directive::SourceFile => "%s",
            Directive::FullSourcePath => "%g",
            Directive::FunctionName => "%!",
            Directive::LineNumber => "%#",
            Directive::ElapsedMillis => "%o",
            Directive::ElapsedMicros => "%i",
            Directive::ElapsedNanos => "%u",
            Directive::ElapsedSecs => "%O",
            Directive::ColorBegin => "%^",
            Directive::ColorEnd => "%$",
        }
    }

    pub fn from_flag(flag: char) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.flag() == flag)
    }
}

/// Immutable rendering template for log records
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FormatPattern {
    pattern: String,
}

impl FormatPattern {
    #[must_use]
    pub fn builder() -> FormatPatternBuilder {
        FormatPatternBuilder::new()
    }

    /// The layout used by the default configuration:
    /// `%Y/%m/%d-%H:%M:%S.%f %t %! [%^%l%$] %v - %s:%#`
    #[must_use]
    #[rustfmt::skip]
    pub fn standard() -> Self {
        FormatPatternBuilder::new()
            .year().text("/").month().text("/").day().text("-")
            .hour().text(":").minute().text(":").second().text(".").microsecond().text(" ")
            .thread_id().text(" ")
            .function_name().text(" [")
            .color_begin().level().color_end().text("] ")
            .message().text(" - ")
            .source_file().text(":").line_number()
            .build()
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }
}

impl Default for FormatPattern {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Display for FormatPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

impl AsRef<str> for FormatPattern {
    fn as_ref(&self) -> &str {
        &self.pattern
    }
}

impl From<&str> for FormatPattern {
    fn from(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
        }
    }
}

impl From<String> for FormatPattern {
    fn from(pattern: String) -> Self {
        Self { pattern }
    }
}

macro_rules! directive_methods {
    ($($(#[$doc:meta])* $name:ident => $directive:ident),+ $(,)?) => {
        $(
            $(#[$doc])*
            #[must_use = "builder methods return a new value and do not modify the original"]
            pub fn $name(self) -> Self {
                self.directive(Directive::$directive)
            }
        )+
    };
}

/// Ownership-transferring builder for [`FormatPattern`]
///
/// Text added with [`text`](Self::text) is appended verbatim, so a `%` inside
/// it is interpreted by the renderer; use [`percent_sign`](Self::percent_sign)
/// for a literal percent.
#[derive(Debug, Clone)]
pub struct FormatPatternBuilder {
    pattern: String,
}

impl FormatPatternBuilder {
    pub fn new() -> Self {
        Self {
            pattern: String::with_capacity(64),
        }
    }

    /// Start from an existing pattern string
    pub fn from_pattern(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    /// Append literal text
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn text(mut self, text: impl AsRef<str>) -> Self {
        self.pattern.push_str(text.as_ref());
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn directive(mut self, directive: Directive) -> Self {
        self.pattern.push_str(directive.token());
        self
    }

    directive_methods! {
        /// `%v`
        message => Message,
        /// `%t`
        thread_id => ThreadId,
        /// `%P`
        process_id => ProcessId,
        /// `%n`
        logger_name => LoggerName,
        /// `%l`
        level => Level,
        year => Year,
        month => Month,
        day => Day,
        hour => Hour,
        minute => Minute,
        second => Second,
        /// `%f`, six digits
        microsecond => Microsecond,
        /// `%F`, nine digits
        nanosecond => Nanosecond,
        /// `%%`
        percent_sign => Percent,
        /// `%s`
        source_file => SourceFile,
        /// `%g`
        full_source_path => FullSourcePath,
        /// `%!`
        function_name => FunctionName,
        /// `%#`
        line_number => LineNumber,
        elapsed_millis => ElapsedMillis,
        elapsed_micros => ElapsedMicros,
        elapsed_nanos => ElapsedNanos,
        elapsed_secs => ElapsedSecs,
        /// `%^`, only console sinks colorize
        color_begin => ColorBegin,
        /// `%$`
        color_end => ColorEnd,
    }

    /// Finish the pattern; the accumulated buffer moves into the result
    pub fn build(self) -> FormatPattern {
        FormatPattern {
            pattern: self.pattern,
        }
    }
}

impl Default for FormatPatternBuilder {
    fn default() -> Self {
        Self::new()
    }
}
