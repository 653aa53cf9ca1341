//! Presentation layer for chanconf
//!
//! This crate contains CLI definitions, output formatters
//! and progress reporters.

pub mod cli;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use cli::commands::{AddOrgArgs, BatchArgs, Cli, Command, OutputFormat, RemoveOrgArgs, ShowArgs};
pub use output::console::ConsoleFormatter;
pub use progress::reporter::{ProgressReporter, SimpleProgress};
