//! Error types for request signing.

/// Error while signing a request.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// The HMAC could not be keyed.
    #[error("HMAC-SHA1 signing failed: {0}")]
    Signing(String),

    /// A query string was passed as part of the signature base URL.
    #[error("base URL must not contain a query string: {0}")]
    QueryInBaseUrl(String),
}
