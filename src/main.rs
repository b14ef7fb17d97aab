// CLI binary entry point for oggopus
//
// This is the main entry point for the oggopus command-line tool.

mod cli;

use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{commands, Config};

fn main() {
    let config = Config::parse();
    init_logging(&config);

    if let Err(e) = commands::run(&config) {
        eprintln!("✗ {:#}", e);
        process::exit(1);
    }
}

/// Install the log subscriber; `RUST_LOG` overrides the flags
fn init_logging(config: &Config) {
    let default_filter = if config.verbose {
        "oggopus=debug"
    } else if config.quiet {
        "error"
    } else {
        "oggopus=warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
