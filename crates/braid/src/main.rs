//! braid CLI - multi-source documentation sites.
//!
//! Provides commands for:
//! - `build`: Resolve the site once and report it
//! - `watch`: Resolve the site and re-resolve it on every change
//! - `clean`: Remove cached git checkouts

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{BuildArgs, CleanArgs, WatchArgs};
use output::Output;

/// braid - multi-source documentation sites.
#[derive(Parser)]
#[command(name = "braid", version, about)]
struct Cli {
    /// Show progress logs (clones, fetches, passes).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the site and print a summary or the full model.
    Build(BuildArgs),
    /// Resolve the site and keep it current while files change.
    Watch(WatchArgs),
    /// Remove cached git checkouts.
    Clean(CleanArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Build(args) => args.execute(),
        Commands::Watch(args) => args.execute(),
        Commands::Clean(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
