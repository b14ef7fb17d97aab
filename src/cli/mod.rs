// CLI module for oggopus
//
// Only compiled into the binary, which needs the `libopus` feature.

pub mod commands;
pub mod config;
pub mod output;

pub use config::{Commands, Config, OutputFormat};
pub use output::OutputFormatter;

/// Result type for CLI operations
pub type CliResult<T> = anyhow::Result<T>;
