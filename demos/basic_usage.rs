//! Basic logger usage example
//!
//! Demonstrates the colored console sink, the logging macros and changing
//! the minimum level and layout at runtime.
//!
//! Run with: cargo run --example basic_usage

use chika_log::prelude::*;
use chika_log::{debug, info, trace, warn};

fn main() -> Result<()> {
    println!("=== Chika Log - Basic Usage Example ===\n");

    let config = LoggerConfig::new()
        .with_destinations(Destinations::CONSOLE | Destinations::COLOR)
        .with_level(LogLevel::Trace);
    let logger = Logger::new(config)?;

    println!("1. Logging at different levels:");
    logger.trace("This is a trace message");
    logger.debug("This is a debug message");
    logger.info("This is an info message");
    logger.warn("This is a warning message");
    logger.error("This is an error message");
    logger.critical("This is a critical message");
    logger.flush();

    println!("\n2. Logging with different minimum levels:");
    logger.set_level(LogLevel::Info);
    println!("   Minimum level set to INFO - trace and debug won't show:");
    trace!(logger, "Trace message (hidden)");
    debug!(logger, "Debug message (hidden)");
    info!(logger, "Info message (visible)");
    warn!(logger, "Warning message {} (visible)", 2);
    logger.flush();

    println!("\n3. Custom layout:");
    logger.set_format(
        FormatPattern::builder()
            .hour()
            .text(":")
            .minute()
            .text(":")
            .second()
            .text(" ")
            .color_begin()
            .level()
            .color_end()
            .text(" (")
            .function_name()
            .text(") ")
            .message()
            .build(),
    );
    info!(logger, "Rendered with a built pattern");
    logger.flush();

    println!("\n=== Example completed successfully! ===");

    Ok(())
}
