//! One-legged OAuth 1.0a request signing.
//!
//! Signs requests with HMAC-SHA1 using only a consumer key and secret, the
//! flow the `WooCommerce` REST API accepts over plain HTTP. The crate performs
//! no I/O. The random source is always passed in, and
//! [`OAuthSigner::authorize_with`] also fixes the nonce and timestamp.
//!
//! ```
//! use wcgate_oauth::{Credentials, OAuthSigner, ParameterSet};
//!
//! let signer = OAuthSigner::new(Credentials::new("ck", "cs"));
//! let signed = signer
//!     .authorize_with(
//!         "GET",
//!         "https://example.com/wp-json/wc/v3/orders",
//!         &ParameterSet::new(),
//!         "abc",
//!         "1700000000",
//!     )
//!     .unwrap();
//! assert!(signed.header.contains("oauth_signature=\"itT6lTC3i%2FqDC%2FQBaDeLhdR3rG0%3D\""));
//! ```

mod encode;
mod error;
mod nonce;
mod params;
mod signature;

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngExt;

pub use encode::percent_encode;
pub use error::OAuthError;
pub use nonce::{NONCE_LENGTH, generate_nonce};
pub use params::{OAUTH_VERSION, ParameterSet, SIGNATURE_METHOD, normalize, protocol_parameters};
pub use signature::{build_authorization_header, build_base_string, sign};

/// Consumer credentials issued by the upstream API.
#[derive(Clone)]
pub struct Credentials {
    consumer_key: String,
    consumer_secret: String,
}

impl Credentials {
    /// Create credentials from a consumer key and secret.
    pub fn new(consumer_key: impl Into<String>, consumer_secret: impl Into<String>) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
        }
    }

    /// The consumer key (sent in clear in every `Authorization` header).
    pub fn consumer_key(&self) -> &str {
        &self.consumer_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .finish()
    }
}

/// Result of signing one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    /// The exact string that was signed.
    pub base_string: String,
    /// Base64 HMAC-SHA1 signature.
    pub signature: String,
    /// Value for the `Authorization` header.
    pub header: String,
}

/// Signs requests with a fixed set of consumer credentials.
#[derive(Debug, Clone)]
pub struct OAuthSigner {
    credentials: Credentials,
}

impl OAuthSigner {
    /// Create a signer for the given credentials.
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// The credentials this signer uses.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Sign a request with a nonce drawn from `rng` and the current time.
    ///
    /// # Arguments
    /// * `method` - HTTP method (GET, POST, ...)
    /// * `base_url` - URL without query string
    /// * `params` - Non-protocol parameters to include in the signature
    /// * `rng` - Random source for the nonce
    pub fn authorize<R: RngExt + ?Sized>(
        &self,
        method: &str,
        base_url: &str,
        params: &ParameterSet,
        rng: &mut R,
    ) -> Result<SignedRequest, OAuthError> {
        let nonce = generate_nonce(rng, NONCE_LENGTH);
        self.authorize_with(method, base_url, params, &nonce, &unix_timestamp())
    }

    /// Sign a request with a caller-supplied nonce and timestamp.
    pub fn authorize_with(
        &self,
        method: &str,
        base_url: &str,
        params: &ParameterSet,
        nonce: &str,
        timestamp: &str,
    ) -> Result<SignedRequest, OAuthError> {
        let protocol = protocol_parameters(&self.credentials.consumer_key, nonce, timestamp);
        let signature_params = params.merge(&protocol);

        let base_string = build_base_string(method, base_url, &normalize(&signature_params))?;
        let signature = sign(&base_string, &self.credentials.consumer_secret)?;
        let header = build_authorization_header(
            &self.credentials.consumer_key,
            nonce,
            &signature,
            timestamp,
        );

        Ok(SignedRequest {
            base_string,
            signature,
            header,
        })
    }
}

/// Seconds since the Unix epoch, stringified.
pub fn unix_timestamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
        .to_string()
}
