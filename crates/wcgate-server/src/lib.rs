//! HTTP gateway for the `WooCommerce` REST API.
//!
//! Browser clients cannot hold the store's consumer secret, so they call this
//! gateway instead. It signs each request with one-legged OAuth 1.0a
//! (HMAC-SHA1) and forwards it, relaying the upstream status and body back
//! with CORS headers attached.
//!
//! # Quick Start
//!
//! ```ignore
//! use wcgate_config::Config;
//! use wcgate_server::{run_server, server_config_from_config};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::load(None, None).unwrap();
//!     run_server(server_config_from_config(&config)).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Browser ──HTTP──► axum (wcgate-server)
//!                        │
//!                        ├─► OPTIONS: preflight, answered locally
//!                        │
//!                        └─► GET/POST ──► OAuthSigner (wcgate-oauth)
//!                                              │
//!                                              └─► ureq ──► {api_root}/{resource}
//! ```

mod app;
mod error;
mod handlers;
mod middleware;
mod resource;
mod state;
mod upstream;

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use state::AppState;
use wcgate_oauth::{Credentials, OAuthSigner};

pub use error::GatewayError;
pub use handlers::proxy::forwarded_parameters;
pub use resource::validate_resource;
pub use upstream::{Upstream, UpstreamError, UpstreamRequest, UpstreamResponse, UreqUpstream};

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// URL resources are appended to, e.g. `https://shop.example.com/wp-json/wc/v3`.
    pub api_root: String,
    /// Consumer credentials for signing.
    pub credentials: Credentials,
    /// Value of `Access-Control-Allow-Origin`.
    pub allowed_origin: String,
    /// Upstream call timeout (`None` waits indefinitely).
    pub upstream_timeout: Option<Duration>,
}

/// Run the server.
///
/// # Arguments
///
/// * `config` - Server configuration
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let upstream: Arc<dyn Upstream> = Arc::new(UreqUpstream::new(config.upstream_timeout));
    run_server_with_upstream(config, upstream).await
}

/// Run the server against a caller-provided upstream client.
///
/// # Errors
///
/// Returns an error if the allowed origin is not a valid header value or the
/// server fails to start.
pub async fn run_server_with_upstream(
    config: ServerConfig,
    upstream: Arc<dyn Upstream>,
) -> Result<(), Box<dyn std::error::Error>> {
    let allowed_origin = HeaderValue::from_str(&config.allowed_origin)?;

    let state = Arc::new(AppState {
        signer: OAuthSigner::new(config.credentials),
        nonces: AppState::seeded_nonces(),
        clock: wcgate_oauth::unix_timestamp,
        upstream,
        api_root: config.api_root.trim_end_matches('/').to_owned(),
        allowed_origin,
    });

    let app = app::create_router(state);

    // Bind and run server
    let addr = SocketAddr::from_str(&format!("{}:{}", config.host, config.port))?;
    tracing::info!(address = %addr, upstream = %config.api_root, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}

/// Create server configuration from the loaded config.
#[must_use]
pub fn server_config_from_config(config: &wcgate_config::Config) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        api_root: config.upstream.api_root(),
        credentials: Credentials::new(
            config.upstream.consumer_key.clone(),
            config.upstream.consumer_secret.clone(),
        ),
        allowed_origin: config.cors.allowed_origin.clone(),
        upstream_timeout: config.upstream.timeout_secs.map(Duration::from_secs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_from_config() {
        let config = sample_config();
        let server = server_config_from_config(&config);

        assert_eq!(server.port, 9000);
        assert_eq!(server.api_root, "https://shop.example.com/wp-json/wc/v3");
        assert_eq!(server.credentials.consumer_key(), "ck");
        assert_eq!(server.upstream_timeout, Some(Duration::from_secs(5)));
        assert!(!format!("{server:?}").contains("\"cs\""));
    }

    fn sample_config() -> wcgate_config::Config {
        let mut config = wcgate_config::Config::default();
        config.server.port = 9000;
        config.upstream.base_url = "https://shop.example.com/".to_owned();
        config.upstream.consumer_key = "ck".to_owned();
        config.upstream.consumer_secret = "cs".to_owned();
        config.upstream.timeout_secs = Some(5);
        config
    }
}
