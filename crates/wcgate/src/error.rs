//! CLI error types.

use wcgate_config::ConfigError;
use wcgate_oauth::OAuthError;
use wcgate_server::GatewayError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    OAuth(#[from] OAuthError),

    #[error("{0}")]
    Gateway(#[from] GatewayError),

    #[error("{0}")]
    Server(String),

    #[error("{0}")]
    Validation(String),
}
