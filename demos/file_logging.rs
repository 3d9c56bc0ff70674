//! File logging example
//!
//! Writes through the rotating file sink with a small size limit so that a
//! few hundred records produce several archives.
//!
//! Run with: cargo run --example file_logging

use chika_log::prelude::*;
use chika_log::info;
use std::fs;

fn main() -> Result<()> {
    println!("=== Chika Log - File Logging Example ===\n");

    let dir = std::env::temp_dir().join("chika_log_demo");
    let config = LoggerConfig::new()
        .with_destinations(Destinations::FILE)
        .with_rotate_basename(dir.join("demo.log"))
        .with_rotate_max_file_size(4 * 1024)
        .with_rotate_max_files(4)
        .with_rotate_check_at_first(true)
        .with_format("%Y-%m-%d %H:%M:%S.%f [%n] %l: %v");
    let logger = Logger::new(config)?;

    for i in 0..300 {
        info!(logger, "Processing item {} of {}", i + 1, 300);
    }
    logger.flush();

    println!("Log files in {}:", dir.display());
    let mut files: Vec<_> = fs::read_dir(&dir)?
        .filter_map(|entry| entry.ok())
        .collect();
    files.sort_by_key(|entry| entry.file_name());
    for entry in files {
        println!("   {:<16} {:>6} bytes", entry.file_name().to_string_lossy(), entry.metadata()?.len());
    }

    println!("\n=== Example completed successfully! ===");

    Ok(())
}
