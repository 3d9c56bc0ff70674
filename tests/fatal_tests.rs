//! Fatal escalation tests
//!
//! `fatal!` aborts the process, so the test re-runs this binary as a child
//! with an environment variable selecting the scenario, then inspects the
//! exit status and the log file the child left behind.

use chika_log::{
    fatal, info, Destinations, ErrorHandler, FormatPattern, LogLevel, LogRecord, Logger,
    LoggerConfig, LoggerError, Result, Sink,
};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const CHILD_LOG_VAR: &str = "CHIKA_FATAL_TEST_LOG";
const CHILD_HANDLER_VAR: &str = "CHIKA_DEFAULT_HANDLER_TEST";

struct UnpluggedSink;

impl Sink for UnpluggedSink {
    fn log(&mut self, _record: &LogRecord) -> Result<()> {
        Err(LoggerError::other("disk unplugged"))
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn set_pattern(&mut self, _pattern: &FormatPattern) {}

    fn name(&self) -> &str {
        "unplugged"
    }
}

fn child_logger(path: PathBuf) -> Logger {
    let config = LoggerConfig::new()
        .with_destinations(Destinations::FILE)
        .with_rotate_basename(path)
        .with_level(LogLevel::Info)
        .with_format("[%l] %v")
        .with_error_handler(ErrorHandler::ignore());
    Logger::new(config).expect("Failed to create logger")
}

/// Runs only inside the child process
#[test]
#[allow(unreachable_code)]
fn fatal_child_process() {
    let Some(path) = env::var_os(CHILD_LOG_VAR) else {
        return;
    };
    let logger = child_logger(PathBuf::from(path));

    for i in 0..10 {
        info!(logger, "before {}", i);
    }
    fatal!(logger, "unrecoverable: {}", "disk full");
    info!(logger, "after");
}

#[test]
fn test_fatal_flushes_then_terminates() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("fatal.log");

    let status = Command::new(env::current_exe().unwrap())
        .args(["--exact", "fatal_child_process", "--nocapture", "--test-threads=1"])
        .env(CHILD_LOG_VAR, &log_file)
        .status()
        .expect("Failed to run child");
    assert!(!status.success(), "child exited normally: {:?}", status);

    let content = fs::read_to_string(&log_file).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 11);
    assert_eq!(lines[0], "[info] before 0");
    assert_eq!(lines[9], "[info] before 9");
    assert_eq!(lines[10], "[critical] unrecoverable: disk full");
    assert!(!content.contains("after"));
}

#[test]
fn test_fatal_without_termination() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("signal.log");
    let logger = child_logger(log_file.clone());

    logger.info("ok");
    let signal = logger.fatal("stopping");
    logger.info("discarded");
    drop(signal);

    assert!(logger.is_shut_down());
    assert_eq!(
        fs::read_to_string(&log_file).unwrap(),
        "[info] ok\n[critical] stopping\n"
    );
}

/// Runs only inside the child process; the default handler must abort
#[test]
fn default_handler_child_process() {
    if env::var_os(CHILD_HANDLER_VAR).is_none() {
        return;
    }
    let config = LoggerConfig::new()
        .with_destinations(Destinations::NONE)
        .with_level(LogLevel::Info)
        .with_flush_interval(Duration::ZERO);
    let logger = Logger::with_sinks(config, vec![Box::new(UnpluggedSink)])
        .expect("Failed to create logger");

    logger.info("doomed");
    logger.flush();
    thread::sleep(Duration::from_secs(10));
    println!("survived");
}

#[test]
fn test_default_handler_reports_then_aborts() {
    let output = Command::new(env::current_exe().unwrap())
        .args(["--exact", "default_handler_child_process", "--nocapture", "--test-threads=1"])
        .env(CHILD_HANDLER_VAR, "1")
        .output()
        .expect("Failed to run child");
    assert!(!output.status.success(), "child exited normally: {:?}", output.status);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[LOGGER ERROR] Unrecoverable error in logging subsystem"), "{}", stderr);
    assert!(stderr.contains("disk unplugged"), "{}", stderr);
    assert!(!String::from_utf8_lossy(&output.stdout).contains("survived"));
}
