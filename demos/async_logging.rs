//! Asynchronous logging example
//!
//! Several producer threads share the process-wide logger; a bounded queue
//! with the drop-oldest policy keeps them from ever blocking.
//!
//! Run with: cargo run --example async_logging

use chika_log::prelude::*;
use chika_log::{info, warn};
use std::thread;
use std::time::Instant;

fn main() -> Result<()> {
    println!("=== Chika Log - Async Logging Example ===\n");

    chika_log::inject_config(
        LoggerConfig::new()
            .with_name("async-demo")
            .with_destinations(Destinations::CONSOLE)
            .with_queue_capacity(256)
            .with_thread_count(2)
            .with_overflow_policy(OverflowPolicy::DropOldest)
            .with_flush_level(LogLevel::Warn)
            .with_format("%H:%M:%S.%f [%n] [t%t] %l %v"),
    )?;

    let start = Instant::now();
    let producers: Vec<_> = (0..4)
        .map(|id| {
            thread::spawn(move || {
                for i in 0..250 {
                    info!(chika_log::logger(), "producer {} record {}", id, i);
                }
                warn!(chika_log::logger(), "producer {} done", id);
            })
        })
        .collect();

    for producer in producers {
        producer.join().expect("producer panicked");
    }
    let elapsed = start.elapsed();

    let logger = chika_log::logger();
    logger.flush();

    let metrics = logger.metrics();
    println!("\nProduced 1004 records in {:?}", elapsed);
    println!("   delivered: {}", metrics.delivered_count());
    println!("   evicted:   {}", metrics.evicted_count());
    println!("   loss rate: {:.2}%", metrics.loss_rate());

    chika_log::shutdown();
    println!("\n=== Example completed successfully! ===");

    Ok(())
}
