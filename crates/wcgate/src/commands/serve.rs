//! `wcgate serve` command implementation.

use std::path::PathBuf;

use clap::Args;
use wcgate_config::{CliSettings, Config};
use wcgate_server::{run_server, server_config_from_config};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover wcgate.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Origin allowed to call the gateway from a browser (overrides config).
    #[arg(long)]
    allowed_origin: Option<String>,

    /// Enable verbose output (request logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            host: self.host,
            port: self.port,
            allowed_origin: self.allowed_origin,
        };

        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        // Print startup info (never the secret)
        output.info(&format!(
            "Starting server on {}:{}",
            config.server.host, config.server.port
        ));
        output.info(&format!("Upstream API: {}", config.upstream.api_root()));
        output.info(&format!("Consumer key: {}", config.upstream.consumer_key));
        output.info(&format!("Allowed origin: {}", config.cors.allowed_origin));
        match config.upstream.timeout_secs {
            Some(secs) => output.info(&format!("Upstream timeout: {secs}s")),
            None => output.info("Upstream timeout: none"),
        }

        run_server(server_config_from_config(&config))
            .await
            .map_err(|e| CliError::Server(e.to_string()))?;

        Ok(())
    }
}
