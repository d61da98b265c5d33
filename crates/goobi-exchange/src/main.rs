//! Goobi Exchange CLI - selective export and import of a Goobi installation
//!
//! This is the main entry point for the goobi-exchange command-line interface.

mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

fn main() -> Result<()> {
    // Parse CLI args
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose, cli.quiet);

    // Run command
    match cli.command {
        Commands::Export(args) => commands::export::run(args, cli.config.as_deref(), cli.quiet),
        Commands::Import(args) => commands::import::run(args, cli.config.as_deref(), cli.quiet),
        Commands::Excludes(args) => commands::excludes::run(args, cli.config.as_deref()),
    }
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            // Run messages are printed as a report at the end; -v streams them live
            0 => EnvFilter::new("warn,goobi_exchange_dump::message=off"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}
