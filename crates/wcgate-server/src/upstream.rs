//! Upstream HTTP client.
//!
//! The dispatcher talks to the upstream API through the [`Upstream`] trait so
//! tests can observe outbound calls without a network. The production
//! implementation is a blocking `ureq` agent, run on tokio's blocking pool.

use std::time::Duration;

use axum::http::Method;
use ureq::Agent;

/// One outbound call to the upstream API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamRequest {
    /// GET with only the `Authorization` header.
    Get {
        /// Full URL including the forwarded query string.
        url: String,
        /// `Authorization` header value.
        authorization: String,
    },
    /// POST with a JSON body.
    Post {
        /// Full URL.
        url: String,
        /// `Authorization` header value.
        authorization: String,
        /// Serialized JSON body.
        body: Vec<u8>,
    },
}

impl UpstreamRequest {
    /// HTTP method of the call.
    pub fn method(&self) -> Method {
        match self {
            Self::Get { .. } => Method::GET,
            Self::Post { .. } => Method::POST,
        }
    }

    /// Target URL of the call.
    pub fn url(&self) -> &str {
        match self {
            Self::Get { url, .. } | Self::Post { url, .. } => url,
        }
    }

    /// `Authorization` header value.
    pub fn authorization(&self) -> &str {
        match self {
            Self::Get { authorization, .. } | Self::Post { authorization, .. } => authorization,
        }
    }
}

/// Status and raw body returned by the upstream API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body bytes.
    pub body: Vec<u8>,
}

/// Upstream transport failure. An error status is not a failure.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// Connection, TLS, timeout or protocol error.
    #[error("upstream request failed: {0}")]
    Transport(#[from] ureq::Error),
}

/// Sends signed requests to the upstream API.
pub trait Upstream: Send + Sync {
    /// Perform the call and return the upstream status and body.
    ///
    /// Blocks until the upstream answers; callers on an async runtime must
    /// run it on a blocking thread.
    fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, UpstreamError>;
}

/// Upstream client backed by a `ureq` agent.
pub struct UreqUpstream {
    agent: Agent,
}

impl UreqUpstream {
    /// Create a client. `timeout` bounds the whole call; `None` waits forever.
    pub fn new(timeout: Option<Duration>) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(timeout)
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent }
    }
}

impl Upstream for UreqUpstream {
    fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
        let response = match request {
            UpstreamRequest::Get { url, authorization } => self
                .agent
                .get(url)
                .header("Authorization", authorization)
                .call()?,
            UpstreamRequest::Post {
                url,
                authorization,
                body,
            } => self
                .agent
                .post(url)
                .header("Authorization", authorization)
                .header("Content-Type", "application/json")
                .send(body.as_slice())?,
        };

        let status = response.status().as_u16();
        let body = response.into_body().read_to_vec()?;
        Ok(UpstreamResponse { status, body })
    }
}
