//! OAuth 1.0a HMAC-SHA1 signature generation (RFC 5849 Section 3.4).

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::encode::percent_encode;
use crate::error::OAuthError;
use crate::params::{OAUTH_VERSION, SIGNATURE_METHOD};

type HmacSha1 = Hmac<Sha1>;

/// Build OAuth signature base string per RFC 5849 Section 3.4.1.
///
/// Format: `HTTP_METHOD&encoded_base_url&encoded_parameters`
///
/// `base_url` must not carry a query string; query parameters belong in
/// `normalized_params` only.
pub fn build_base_string(
    method: &str,
    base_url: &str,
    normalized_params: &str,
) -> Result<String, OAuthError> {
    if base_url.contains('?') {
        return Err(OAuthError::QueryInBaseUrl(base_url.to_owned()));
    }

    Ok(format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(base_url),
        percent_encode(normalized_params)
    ))
}

/// Sign a base string with HMAC-SHA1 and return the base64-encoded digest.
///
/// The key is `encode(consumer_secret)&`: one-legged requests have no token
/// secret.
pub fn sign(base_string: &str, consumer_secret: &str) -> Result<String, OAuthError> {
    let key = format!("{}&", percent_encode(consumer_secret));
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| OAuthError::Signing(e.to_string()))?;
    mac.update(base_string.as_bytes());
    Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
}

/// Format the `Authorization` header value.
pub fn build_authorization_header(
    consumer_key: &str,
    nonce: &str,
    signature: &str,
    timestamp: &str,
) -> String {
    format!(
        "OAuth oauth_consumer_key=\"{}\", oauth_nonce=\"{}\", oauth_signature=\"{}\", \
         oauth_signature_method=\"{SIGNATURE_METHOD}\", oauth_timestamp=\"{}\", \
         oauth_version=\"{OAUTH_VERSION}\"",
        percent_encode(consumer_key),
        percent_encode(nonce),
        percent_encode(signature),
        percent_encode(timestamp),
    )
}
