//! Gateway error type and its HTTP mapping.

use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use wcgate_oauth::OAuthError;

use crate::middleware::cors::ALLOWED_METHODS;
use crate::upstream::UpstreamError;

/// Error terminating a request before (or instead of) relaying an upstream
/// response. Upstream error statuses are relayed, not mapped here.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Method outside GET, POST and OPTIONS.
    #[error("Method {0} not allowed.")]
    MethodNotSupported(Method),

    /// POST without a JSON content type.
    #[error("Content type {0} not allowed, expected application/json.")]
    UnsupportedContentType(String),

    /// No `resource` query parameter.
    #[error("Missing resource query parameter.")]
    MissingResource,

    /// `resource` is not a plain API path.
    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    /// POST body is not valid JSON.
    #[error("Invalid JSON body: {0}")]
    InvalidBody(String),

    /// Upstream could not be reached.
    #[error("{0}")]
    Upstream(#[from] UpstreamError),

    /// Request could not be signed.
    #[error("request signing failed: {0}")]
    Signing(#[from] OAuthError),

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match &self {
            Self::MethodNotSupported(_) => (
                StatusCode::METHOD_NOT_ALLOWED,
                [(header::ALLOW, ALLOWED_METHODS)],
                self.to_string(),
            )
                .into_response(),
            Self::UnsupportedContentType(_) => {
                (StatusCode::METHOD_NOT_ALLOWED, self.to_string()).into_response()
            }
            Self::MissingResource | Self::InvalidResource(_) | Self::InvalidBody(_) => {
                tracing::debug!(error = %self, "Rejected request");
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            Self::Upstream(_) => {
                tracing::warn!(error = %self, "Upstream call failed");
                (StatusCode::BAD_GATEWAY, self.to_string()).into_response()
            }
            Self::Signing(_) | Self::Internal(_) => {
                tracing::error!(error = %self, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}
