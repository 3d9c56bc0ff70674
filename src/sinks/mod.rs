//! Sink implementations

pub mod console;
pub mod rotating_file;
pub mod split_console;

pub use console::{ColorConsoleSink, ConsoleStreams};
pub use rotating_file::{RotatingFileSink, RotationPolicy};
pub use split_console::SplitConsoleSink;
