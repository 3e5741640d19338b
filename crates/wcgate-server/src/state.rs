//! Application state.
//!
//! Shared state for all request handlers. Everything is read-only except the
//! nonce source, which sits behind a mutex.

use std::sync::{Arc, Mutex, PoisonError};

use axum::http::HeaderValue;
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use wcgate_oauth::{NONCE_LENGTH, OAuthError, OAuthSigner, ParameterSet, SignedRequest};

use crate::upstream::Upstream;

/// Produces the `oauth_timestamp` value for a request.
pub(crate) type Clock = fn() -> String;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Signer holding the consumer credentials.
    pub(crate) signer: OAuthSigner,
    /// Random source for nonces.
    pub(crate) nonces: Mutex<StdRng>,
    /// Timestamp source.
    pub(crate) clock: Clock,
    /// Client for the upstream API.
    pub(crate) upstream: Arc<dyn Upstream>,
    /// URL every resource is appended to, without trailing slash.
    pub(crate) api_root: String,
    /// Value of `Access-Control-Allow-Origin`.
    pub(crate) allowed_origin: HeaderValue,
}

impl AppState {
    /// Nonce source seeded from the thread RNG.
    pub(crate) fn seeded_nonces() -> Mutex<StdRng> {
        let seed: [u8; 32] = rand::rng().random();
        Mutex::new(StdRng::from_seed(seed))
    }

    /// Upstream URL for a validated resource path.
    pub(crate) fn resource_url(&self, resource: &str) -> String {
        format!("{}/{resource}", self.api_root)
    }

    /// Sign a request with the next nonce and the current timestamp.
    pub(crate) fn authorize(
        &self,
        method: &str,
        url: &str,
        params: &ParameterSet,
    ) -> Result<SignedRequest, OAuthError> {
        let nonce = {
            // A panic mid-draw leaves the generator usable
            let mut rng = self.nonces.lock().unwrap_or_else(PoisonError::into_inner);
            wcgate_oauth::generate_nonce(&mut *rng, NONCE_LENGTH)
        };
        self.signer.authorize_with(method, url, params, &nonce, &(self.clock)())
    }
}
