//! wcgate CLI - OAuth 1.0a signing gateway for the `WooCommerce` REST API.
//!
//! Provides commands for:
//! - `serve`: Start the gateway
//! - `sign`: Print the signed request the gateway would send

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{ServeArgs, SignArgs};
use output::Output;

/// wcgate - OAuth 1.0a signing gateway.
#[derive(Parser)]
#[command(name = "wcgate", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server.
    Serve(ServeArgs),
    /// Sign a request and print the Authorization header.
    Sign(SignArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // Check if verbose flag is set for serve command
    let verbose = matches!(&cli.command, Commands::Serve(args) if args.verbose);

    // Initialize tracing with appropriate log level
    // --verbose enables INFO level, otherwise use RUST_LOG (ERROR when unset)
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match cli.command {
        Commands::Serve(args) => match tokio::runtime::Runtime::new() {
            Ok(rt) => rt.block_on(args.execute()),
            Err(e) => Err(error::CliError::Server(format!(
                "Failed to create tokio runtime: {e}"
            ))),
        },
        Commands::Sign(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
